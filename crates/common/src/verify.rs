//! Cross-source count verification

use tracing::{info, warn};

use crate::types::{SelectionState, VerificationResult};
use crate::Result;

/// Compares what the UI renders against what the backend reported
#[derive(Debug, Clone, Copy, Default)]
pub struct Verifier;

impl Verifier {
    /// Plain equality; both values are kept for diagnostics
    pub fn verify(expected: u64, actual: u64) -> VerificationResult {
        VerificationResult {
            expected,
            actual,
            passed: expected == actual,
        }
    }

    /// Verify the rendered count against the state's ground truth.
    ///
    /// Fails with `PreconditionViolation` when no brand count has been
    /// correlated yet. A mismatch is not an error here.
    pub fn verify_state(state: &SelectionState, actual: u64) -> Result<VerificationResult> {
        let (brand, expected) = state.ground_truth()?;
        let result = Self::verify(expected, actual);
        if result.passed {
            info!("Brand '{}' count verified: {}", brand, actual);
        } else {
            warn!(
                "Brand '{}' count mismatch: backend {} vs rendered {}",
                brand, expected, actual
            );
        }
        Ok(result)
    }
}
