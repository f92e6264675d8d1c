use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::probs::{Outcome, Prob3};
use crate::risk::RiskProfile;

/// Stryktipset coupons always carry exactly 13 matches.
pub const SLATE_SIZE: usize = 13;

/// One row costs one unit stake.
pub const UNIT_STAKE: f64 = 1.0;

/// How many of the three outcomes a system covers for one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageClass {
    Single,
    Half,
    Full,
}

impl CoverageClass {
    pub fn cardinality(self) -> usize {
        match self {
            CoverageClass::Single => 1,
            CoverageClass::Half => 2,
            CoverageClass::Full => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CoverageClass::Single => "single",
            CoverageClass::Half => "half",
            CoverageClass::Full => "full",
        }
    }
}

/// Counts of half/full/single covers over the slate. The counts must sum to
/// the slate size; the row count follows directly from the multiplicities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    pub halves: usize,
    pub fulls: usize,
    pub singles: usize,
}

impl SystemConfig {
    pub fn new(halves: usize, fulls: usize, singles: usize) -> Self {
        Self {
            halves,
            fulls,
            singles,
        }
    }

    pub fn validate(&self, slate_size: usize) -> Result<(), EngineError> {
        if self.halves + self.fulls + self.singles != slate_size {
            return Err(EngineError::ConfigMismatch {
                halves: self.halves,
                fulls: self.fulls,
                singles: self.singles,
                expected: slate_size,
            });
        }
        Ok(())
    }

    /// 2^halves x 3^fulls; singles contribute a factor of one.
    pub fn total_rows(&self) -> u64 {
        2u64.pow(self.halves as u32) * 3u64.pow(self.fulls as u32)
    }

    pub fn cost(&self) -> f64 {
        self.total_rows() as f64 * UNIT_STAKE
    }
}

impl Default for SystemConfig {
    /// A mid-size 96-row system, the shape most commonly played.
    fn default() -> Self {
        Self {
            halves: 5,
            fulls: 1,
            singles: 7,
        }
    }
}

/// Coverage decision for one match: the assigned class and the concrete
/// outcomes it keeps, together with the probabilities the decision was made
/// under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchPlan {
    pub match_id: String,
    pub class: CoverageClass,
    pub covered: Vec<Outcome>,
    pub probs: Prob3,
}

impl MatchPlan {
    pub fn covers(&self, outcome: Outcome) -> bool {
        self.covered.contains(&outcome)
    }

    /// Probability that this match lands in its covered set.
    pub fn hit_prob(&self) -> f64 {
        self.covered.iter().map(|o| self.probs.get(*o)).sum()
    }

    /// Average pick probability across the covered outcomes. Each covered
    /// outcome appears in the same share of expanded rows, so this is the
    /// per-row expected contribution of the match.
    pub fn mean_covered_prob(&self) -> f64 {
        if self.covered.is_empty() {
            return 0.0;
        }
        self.hit_prob() / self.covered.len() as f64
    }
}

/// One fully specified coupon row: a pick per match in slate order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedRow {
    pub picks: Vec<Outcome>,
    /// Sum of pick probabilities, the analytic expectation of the number of
    /// correct matches on this row.
    pub expected_correct: f64,
}

impl GeneratedRow {
    /// Coupon notation, e.g. "1X211XX2111X2".
    pub fn signs(&self) -> String {
        self.picks.iter().map(|o| o.sign()).collect()
    }
}

/// The finished product of one generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSystem {
    pub id: String,
    pub profile: RiskProfile,
    pub config: SystemConfig,
    pub plans: Vec<MatchPlan>,
    pub total_rows: u64,
    pub cost: f64,
    /// System-average expected correct count over all rows.
    pub expected_correct: f64,
    pub expected_payout: f64,
    /// Present only when the caller asked for the materialized rows;
    /// lightweight responses carry the count alone.
    pub rows: Option<Vec<GeneratedRow>>,
}

impl GeneratedSystem {
    /// The materialized row with the highest analytic expectation, if rows
    /// were kept.
    pub fn best_row(&self) -> Option<&GeneratedRow> {
        self.rows
            .as_ref()?
            .iter()
            .max_by(|a, b| a.expected_correct.total_cmp(&b.expected_correct))
    }
}
