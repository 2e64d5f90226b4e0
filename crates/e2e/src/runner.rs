//! Suite runner: scenarios in, JSON results out
//!
//! Every iteration gets its own browser session, its own picker and an empty
//! `SelectionState`. A failed iteration is recorded and the next one starts
//! from scratch.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use cableguy_common::{PlugOption, RandomPicker, VerificationResult};

use crate::driver::BrowserDriver;
use crate::error::E2eResult;
use crate::playwright::PlaywrightDriver;
use crate::scenario::Scenario;
use crate::workflow::Workflow;

/// Result of one workflow iteration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub scenario: String,
    pub iteration: u32,
    /// Seed that reproduces this iteration's choices
    pub seed: Option<u64>,
    pub started_at: DateTime<Utc>,
    pub success: bool,
    pub duration_ms: u64,
    pub begin_option: Option<PlugOption>,
    pub end_option: Option<PlugOption>,
    pub brand: Option<String>,
    pub verification: Option<VerificationResult>,
    pub error: Option<String>,
}

/// Result of running all scenarios
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<RunResult>,
}

impl SuiteResult {
    fn push(&mut self, result: RunResult) {
        self.total += 1;
        if result.success {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Opens and closes browser sessions for the runner
#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: BrowserDriver;

    async fn open(&self, scenario: &Scenario) -> E2eResult<Self::Session>;

    async fn close(&self, session: Self::Session);
}

/// Live sessions through the Playwright bridge
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaywrightSessions;

#[async_trait]
impl SessionFactory for PlaywrightSessions {
    type Session = PlaywrightDriver;

    async fn open(&self, scenario: &Scenario) -> E2eResult<PlaywrightDriver> {
        let driver = PlaywrightDriver::launch(scenario.browser.clone()).await?;
        if let Err(e) = driver.open().await {
            driver.close().await?;
            return Err(e);
        }
        Ok(driver)
    }

    async fn close(&self, session: PlaywrightDriver) {
        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {}", e);
        }
    }
}

/// Runs scenarios and writes their results
pub struct SuiteRunner {
    output_dir: PathBuf,
}

impl SuiteRunner {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Run a list of scenarios
    pub async fn run_scenarios<F: SessionFactory>(
        &self,
        factory: &F,
        scenarios: &[Scenario],
    ) -> SuiteResult {
        let start = Instant::now();
        let mut suite = SuiteResult::default();

        info!("Running {} scenario(s)...", scenarios.len());

        for scenario in scenarios {
            for result in self.run_scenario(factory, scenario).await {
                suite.push(result);
            }
        }

        suite.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Results: {} passed, {} failed ({} ms)",
            suite.passed, suite.failed, suite.duration_ms
        );
        suite
    }

    /// Run every iteration of one scenario
    pub async fn run_scenario<F: SessionFactory>(
        &self,
        factory: &F,
        scenario: &Scenario,
    ) -> Vec<RunResult> {
        let workflow = match Workflow::new(&scenario.workflow) {
            Ok(workflow) => workflow,
            Err(e) => {
                error!("✗ {} - {}", scenario.name, e);
                let mut result = RunResult::new(scenario, 0, None);
                result.error = Some(e.to_string());
                return vec![result];
            }
        };

        let mut results = Vec::with_capacity(scenario.iterations as usize);
        for iteration in 0..scenario.iterations {
            let result = self
                .run_iteration(factory, scenario, &workflow, iteration)
                .await;
            if result.success {
                info!(
                    "✓ {} #{} ({} ms)",
                    result.scenario, result.iteration, result.duration_ms
                );
            } else {
                error!(
                    "✗ {} #{} - {} (seed {:?})",
                    result.scenario,
                    result.iteration,
                    result.error.as_deref().unwrap_or("unknown error"),
                    result.seed
                );
            }
            results.push(result);
        }
        results
    }

    async fn run_iteration<F: SessionFactory>(
        &self,
        factory: &F,
        scenario: &Scenario,
        workflow: &Workflow,
        iteration: u32,
    ) -> RunResult {
        let seed = scenario
            .workflow
            .selection
            .seed
            .map(|s| s.wrapping_add(iteration as u64));
        let mut result = RunResult::new(scenario, iteration, seed);
        let start = Instant::now();
        debug!("Starting {} #{} (run {})", scenario.name, iteration, result.run_id);

        let session = match factory.open(scenario).await {
            Ok(session) => session,
            Err(e) => {
                result.error = Some(format!("session setup failed: {}", e));
                result.duration_ms = start.elapsed().as_millis() as u64;
                return result;
            }
        };

        let mut picker = RandomPicker::from_seed_option(seed);
        let outcome = workflow.run(&session, &mut picker).await;
        factory.close(session).await;

        match outcome {
            Ok(report) => {
                result.begin_option = Some(report.begin_option.clone());
                result.end_option = Some(report.end_option.clone());
                result.brand = Some(report.brand.clone());
                result.verification = Some(report.verification);
                result.success = report.passed();
                if let Err(e) = report.into_result() {
                    result.error = Some(e.to_string());
                }
            }
            Err(e) => {
                result.error = Some(e.to_string());
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }

    /// Write results to JSON file
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("cableguy-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl RunResult {
    fn new(scenario: &Scenario, iteration: u32, seed: Option<u64>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            scenario: scenario.name.clone(),
            iteration,
            seed,
            started_at: Utc::now(),
            success: false,
            duration_ms: 0,
            begin_option: None,
            end_option: None,
            brand: None,
            verification: None,
            error: None,
        }
    }
}
