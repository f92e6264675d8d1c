use serde::{Deserialize, Serialize};

use crate::probs::Outcome;

/// Opaque per-match recommendation from an external intelligence source
/// (market sentiment, team form, whatever the provider runs internally).
/// The engine only reads the three fields below and never reproduces the
/// provider's derivation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IntelSignal {
    pub recommended: Outcome,
    /// Provider confidence in [0,1]. Values outside the range are clamped at
    /// the point of use rather than rejected.
    pub confidence: f64,
    pub contrarian: Outcome,
}

impl IntelSignal {
    pub fn clamped_confidence(&self) -> f64 {
        self.confidence.clamp(0.0, 1.0)
    }
}
