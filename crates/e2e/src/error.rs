//! Error types for the browser-facing workflow

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error(transparent)]
    Workflow(#[from] cableguy_common::Error),

    #[error("Browser driver error: {0}")]
    Driver(String),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl E2eError {
    /// Only a verification mismatch leaves the rest of a suite meaningful.
    pub fn is_fatal(&self) -> bool {
        match self {
            E2eError::Workflow(e) => e.is_fatal(),
            _ => true,
        }
    }

    /// Core taxonomy error, if this is one
    pub fn workflow(&self) -> Option<&cableguy_common::Error> {
        match self {
            E2eError::Workflow(e) => Some(e),
            _ => None,
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
