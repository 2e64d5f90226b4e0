//! Cableguy Common Library
//!
//! Data model and pure logic of the configurator selection workflow: the
//! tolerant payload extractor, the random picker, the verifier and the
//! workflow configuration. Nothing here talks to a browser.

pub mod config;
pub mod error;
pub mod extract;
pub mod network;
pub mod picker;
pub mod types;
pub mod verify;

// Re-export commonly used types
pub use config::{CorrelationConfig, SelectionConfig, WorkflowConfig};
pub use error::{Error, Result};
pub use extract::{normalize_whitespace, ParseStrategy, ResultExtractor};
pub use network::{NetworkResponse, ResourceType};
pub use picker::RandomPicker;
pub use types::*;
pub use verify::Verifier;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
