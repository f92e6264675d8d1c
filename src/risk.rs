use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::probs::Prob3;

/// How aggressively generated systems chase longshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Safe,
    Balanced,
    Risky,
}

impl RiskProfile {
    /// Bias factor applied in [`adjust`]: negative pushes mass toward
    /// favorites, positive toward underdogs.
    pub fn bias_factor(self) -> f64 {
        match self {
            RiskProfile::Safe => -0.7,
            RiskProfile::Balanced => 0.0,
            RiskProfile::Risky => 0.7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskProfile::Safe => "safe",
            RiskProfile::Balanced => "balanced",
            RiskProfile::Risky => "risky",
        }
    }
}

impl FromStr for RiskProfile {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Ok(RiskProfile::Safe),
            "balanced" => Ok(RiskProfile::Balanced),
            "risky" => Ok(RiskProfile::Risky),
            other => Err(EngineError::UnknownProfile(other.to_string())),
        }
    }
}

/// Skew a probability triple by the profile's bias factor.
///
/// Each component is scaled by `1 + factor * (0.5 - p)` and the triple is
/// renormalized. The `(0.5 - p)` term shrinks the adjustment near coin-flip
/// probabilities, so even contests barely move while clear favorites and
/// longshots move most.
pub fn adjust(probs: Prob3, profile: RiskProfile) -> Prob3 {
    let factor = profile.bias_factor();
    if factor == 0.0 {
        return probs;
    }

    let biased = |p: f64| (p * (1.0 + factor * (0.5 - p))).clamp(0.0, 1.0);
    Prob3 {
        home: biased(probs.home),
        draw: biased(probs.draw),
        away: biased(probs.away),
    }
    .renormalized()
}
