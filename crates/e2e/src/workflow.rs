//! Workflow orchestration
//!
//! Begin slot, end slot, brand choice, count verification. The running
//! `SelectionState` is created empty here, passed by value into each stage
//! and replaced by what the stage returns.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use cableguy_common::{
    Brand, Error, PlugOption, RandomPicker, SelectionConfig, SelectionState, Slot,
    VerificationResult, Verifier, WorkflowConfig,
};

use crate::correlator::ResponseCorrelator;
use crate::driver::BrowserDriver;
use crate::error::E2eResult;
use crate::slot::SlotSelector;

/// Everything a finished workflow run observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub begin_option: PlugOption,
    pub end_option: PlugOption,
    pub brand: String,
    pub verification: VerificationResult,
    pub state: SelectionState,
}

impl WorkflowReport {
    pub fn passed(&self) -> bool {
        self.verification.passed
    }

    /// Hard error for callers that treat a mismatch as failure
    pub fn into_result(self) -> E2eResult<Self> {
        self.verification.into_result(&self.brand)?;
        Ok(self)
    }
}

/// Sequences the stages of one configurator session
#[derive(Debug, Clone)]
pub struct Workflow {
    selection: SelectionConfig,
    correlator: ResponseCorrelator,
}

impl Workflow {
    pub fn new(config: &WorkflowConfig) -> E2eResult<Self> {
        config.validate()?;
        Ok(Self {
            selection: config.selection.clone(),
            correlator: ResponseCorrelator::from_config(&config.correlation)?,
        })
    }

    pub fn correlator(&self) -> &ResponseCorrelator {
        &self.correlator
    }

    /// Run begin, end, brand choice and verification against one session
    pub async fn run<D, R>(
        &self,
        driver: &D,
        picker: &mut RandomPicker<R>,
    ) -> E2eResult<WorkflowReport>
    where
        D: BrowserDriver + ?Sized,
        R: Rng + Send,
    {
        let state = SelectionState::new();

        let (state, begin_option) = self.select_slot(Slot::Begin, state, driver, picker).await?;
        let (state, end_option) = self.select_slot(Slot::End, state, driver, picker).await?;
        let state = self.select_brand(state, picker)?;

        let (brand, _) = state.ground_truth()?;
        let brand = brand.to_string();
        let actual = driver.read_rendered_count(&brand).await?;
        let verification = Verifier::verify_state(&state, actual)?;

        Ok(WorkflowReport {
            begin_option,
            end_option,
            brand,
            verification,
            state,
        })
    }

    async fn select_slot<D, R>(
        &self,
        slot: Slot,
        state: SelectionState,
        driver: &D,
        picker: &mut RandomPicker<R>,
    ) -> E2eResult<(SelectionState, PlugOption)>
    where
        D: BrowserDriver + ?Sized,
        R: Rng + Send,
    {
        let mut selector = SlotSelector::new(slot);
        let selection = selector.run(driver, picker, &self.correlator).await?;

        match driver.selected_slot_label(slot).await {
            Ok(Some(label)) => debug!("{} slot now shows '{}'", slot, label),
            Ok(None) => {}
            Err(e) => warn!("Could not confirm {} slot selection: {}", slot, e),
        }

        info!(
            "{} slot done: '{}', {} brands listed",
            slot,
            selection.option.display_name,
            selection.record.total_brands()
        );
        Ok((state.with_record(slot, selection.record), selection.option))
    }

    /// Choose the brand under test from the latest record
    pub fn select_brand<R: Rng>(
        &self,
        state: SelectionState,
        picker: &mut RandomPicker<R>,
    ) -> E2eResult<SelectionState> {
        let brand = {
            let record = state.latest_record().ok_or_else(|| {
                Error::PreconditionViolation(
                    "brand selection requested before any slot record".to_string(),
                )
            })?;
            choose_brand(&record.brands, self.selection.preferred_brand.as_deref(), picker)?
        };

        info!("Brand under test: '{}' (backend count {})", brand.name, brand.count);
        Ok(state.with_brand(&brand))
    }
}

/// Preferred brand if listed (first match), otherwise a random one
pub fn choose_brand<R: Rng>(
    brands: &[Brand],
    preferred: Option<&str>,
    picker: &mut RandomPicker<R>,
) -> E2eResult<Brand> {
    if brands.is_empty() {
        return Err(Error::NoOptionsFound {
            surface: "brand".to_string(),
        }
        .into());
    }

    if let Some(name) = preferred {
        match brands.iter().find(|b| b.name == name) {
            Some(brand) => return Ok(brand.clone()),
            None => debug!("Preferred brand '{}' not listed, picking at random", name),
        }
    }

    Ok(picker.pick_from(brands)?.clone())
}
