//! Declarative YAML scenarios

use serde::{Deserialize, Serialize};
use std::path::Path;

use cableguy_common::WorkflowConfig;

use crate::error::{E2eError, E2eResult};
use crate::playwright::PlaywrightConfig;

/// A workflow scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// How many independent sessions to run
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Correlation and selection settings
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Browser settings
    #[serde(default)]
    pub browser: PlaywrightConfig,
}

fn default_iterations() -> u32 {
    1
}

impl Scenario {
    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::ScenarioParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios from a directory
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut scenarios = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            scenarios.push(Self::from_file(entry.path())?);
        }

        Ok(scenarios)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios
            .iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }

    fn validate(&self) -> E2eResult<()> {
        if self.name.trim().is_empty() {
            return Err(E2eError::ScenarioParse("scenario name is empty".to_string()));
        }
        if self.iterations == 0 {
            return Err(E2eError::ScenarioParse(format!(
                "scenario '{}' has zero iterations",
                self.name
            )));
        }
        self.workflow.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_minimal_scenario() {
        let scenario = Scenario::from_yaml("name: smoke\n").unwrap();
        assert_eq!(scenario.name, "smoke");
        assert_eq!(scenario.iterations, 1);
        assert_eq!(scenario.workflow, WorkflowConfig::default());
        assert_eq!(scenario.browser, PlaywrightConfig::default());
    }

    #[test]
    fn test_parse_full_scenario() {
        let yaml = r#"
name: random-bnc-pair
description: Random plug pair, verify the Sennheiser count
tags: [smoke, brands]
iterations: 3
workflow:
  correlation:
    endpoint_token: cableguy_ajax
    timeout_ms: 8000
  selection:
    seed: 1234
    preferred_brand: Sennheiser
browser:
  browser: webkit
  viewport:
    width: 1920
    height: 1080
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.iterations, 3);
        assert_eq!(scenario.tags, vec!["smoke", "brands"]);
        assert_eq!(scenario.workflow.correlation.timeout_ms, 8000);
        assert_eq!(scenario.workflow.selection.seed, Some(1234));
        assert_eq!(scenario.browser.viewport.width, 1920);
    }

    #[test]
    fn test_rejects_zero_iterations() {
        let err = Scenario::from_yaml("name: none\niterations: 0\n").unwrap_err();
        assert!(matches!(err, E2eError::ScenarioParse(_)));
    }

    #[test]
    fn test_rejects_invalid_workflow() {
        let yaml = "name: x\nworkflow:\n  correlation:\n    timeout_ms: 0\n";
        assert!(Scenario::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_all_and_filter() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.yaml"), "name: a\ntags: [smoke]\n").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/b.yml"), "name: b\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a scenario").unwrap();

        let scenarios = Scenario::load_all(dir.path()).unwrap();
        let mut names: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);

        let smoke = Scenario::filter_by_tag(&scenarios, "smoke");
        assert_eq!(smoke.len(), 1);
        assert_eq!(smoke[0].name, "a");
    }
}
