//! Core types for the configurator workflow

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Configurator endpoint being filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Begin,
    End,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Begin => "begin",
            Slot::End => "end",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a rendered option list.
///
/// `position` indexes the list this option was enumerated from and nothing
/// else; a list read after the next surface opening may differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlugOption {
    pub display_name: String,
    pub position: usize,
}

/// Brand entry reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub name: String,
    pub count: u64,
}

/// Structured facts pulled out of one correlated response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Which side the plug list describes, when the backend says so
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    pub plug_messages: Vec<String>,
    pub brands: Vec<Brand>,
    pub articles_count: u64,
}

impl ExtractedRecord {
    /// First brand with the given name; later duplicates are ignored.
    pub fn brand(&self, name: &str) -> Option<&Brand> {
        self.brands.iter().find(|b| b.name == name)
    }

    /// Number of brands listed (duplicates included)
    pub fn total_brands(&self) -> usize {
        self.brands.len()
    }
}

/// Running context of one workflow run.
///
/// Every stage takes the state by value and hands back an updated copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub begin_record: Option<ExtractedRecord>,
    pub end_record: Option<ExtractedRecord>,
    pub chosen_brand: Option<String>,
    pub ground_truth_count: Option<u64>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record produced by a slot pass; supersedes any earlier one for that slot
    pub fn with_record(self, slot: Slot, record: ExtractedRecord) -> Self {
        match slot {
            Slot::Begin => Self {
                begin_record: Some(record),
                ..self
            },
            Slot::End => Self {
                end_record: Some(record),
                ..self
            },
        }
    }

    /// Most recent record (end slot first)
    pub fn latest_record(&self) -> Option<&ExtractedRecord> {
        self.end_record.as_ref().or(self.begin_record.as_ref())
    }

    /// Fix the brand under test and its backend count
    pub fn with_brand(self, brand: &Brand) -> Self {
        Self {
            chosen_brand: Some(brand.name.clone()),
            ground_truth_count: Some(brand.count),
            ..self
        }
    }

    /// Ground truth for verification. Missing means a stage was skipped.
    pub fn ground_truth(&self) -> Result<(&str, u64)> {
        match (&self.chosen_brand, self.ground_truth_count) {
            (Some(brand), Some(count)) => Ok((brand.as_str(), count)),
            _ => Err(Error::PreconditionViolation(
                "verification requested before a brand count was correlated".to_string(),
            )),
        }
    }
}

/// Outcome of comparing a rendered count with the backend's count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub expected: u64,
    pub actual: u64,
    pub passed: bool,
}

impl VerificationResult {
    /// Turn a failed comparison into a `VerificationMismatch` error
    pub fn into_result(self, subject: &str) -> Result<Self> {
        if self.passed {
            Ok(self)
        } else {
            Err(Error::VerificationMismatch {
                subject: subject.to_string(),
                expected: self.expected,
                actual: self.actual,
            })
        }
    }
}
