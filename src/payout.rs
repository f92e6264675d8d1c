use serde::{Deserialize, Serialize};

/// Correct counts that pay out, smallest tier first.
pub const PAYOUT_THRESHOLDS: [u32; 4] = [10, 11, 12, 13];

/// Step-function payout model over the winning correct counts.
///
/// Real pari-mutuel payouts depend on the pool size and the number of winners
/// in each tier, neither of which is known when a system is generated. The
/// fixed magnitudes here only reproduce the order-of-magnitude spread between
/// tiers (a handful of units at 10 correct, jackpot scale at 13) and must be
/// read as a planning approximation, never as a promised return.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PayoutTable {
    /// Unit payouts for 10, 11, 12 and 13 correct, in threshold order.
    pub tiers: [f64; 4],
}

impl Default for PayoutTable {
    fn default() -> Self {
        Self {
            tiers: [50.0, 500.0, 10_000.0, 1_500_000.0],
        }
    }
}

impl PayoutTable {
    /// Payout for a correct count, fractional or simulated-integer. Monotonic
    /// step: the highest threshold at or below `correct` decides the tier,
    /// anything under the lowest threshold pays nothing.
    pub fn payout(&self, correct: f64) -> f64 {
        let mut paid = 0.0;
        for (idx, threshold) in PAYOUT_THRESHOLDS.iter().enumerate() {
            if correct >= *threshold as f64 {
                paid = self.tiers[idx];
            }
        }
        paid
    }
}
