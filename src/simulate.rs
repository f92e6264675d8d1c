use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, validate_iterations};
use crate::payout::{PAYOUT_THRESHOLDS, PayoutTable};
use crate::probs::{Outcome, Prob3};

pub const MIN_ITERATIONS: u64 = 1_000;
pub const MAX_ITERATIONS: u64 = 1_000_000;
pub const DEFAULT_ITERATIONS: u64 = 100_000;

// Bootstrap replicates run a reduced trial count each; the percentile spread
// across replicates is the interval.
const BOOTSTRAP_REPLICATES: usize = 1_000;
const BOOTSTRAP_INNER_TRIALS: u64 = 1_000;

// Trials between cancellation checks inside a worker.
const CANCEL_CHECK_STRIDE: u64 = 1_024;

// Golden-ratio increment; keeps derived per-worker seeds well separated.
const SEED_STREAM_STEP: u64 = 0x9E37_79B9_7F4A_7C15;
// Offsets the bootstrap seed space away from the main run's worker seeds.
const BOOTSTRAP_SEED_SALT: u64 = 0xB007_5EED;

#[derive(Debug, Clone, Copy)]
pub struct SimParams {
    pub iterations: u64,
    pub with_confidence_intervals: bool,
    pub confidence_level: f64,
    /// Master seed. Worker and bootstrap seeds are derived from it, so equal
    /// seeds reproduce equal results regardless of thread count.
    pub seed: u64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            with_confidence_intervals: false,
            confidence_level: 0.95,
            seed: 0,
        }
    }
}

/// Shared flag a caller can flip to abort a running simulation. Partial
/// tallies are discarded on cancellation, never reused.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

/// Monte Carlo estimate of how a fixed row performs under the probability
/// model. Bucket probabilities cover the paying correct counts 10 through 13.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub iterations: u64,
    pub average_correct: f64,
    pub expected_payout: f64,
    /// P(exactly k correct) for k = 10, 11, 12, 13.
    pub exactly: [f64; 4],
    /// P(at least k correct) for the same thresholds.
    pub at_least: [f64; 4],
    pub average_correct_ci: Option<ConfidenceInterval>,
    pub expected_payout_ci: Option<ConfidenceInterval>,
}

/// Per-worker bucket tallies. Merging is plain summation, so the reduction
/// over workers is order-independent.
#[derive(Debug, Clone, Copy)]
struct Tally {
    exact: [u64; 4],
    at_least: [u64; 4],
    correct_sum: u64,
    trials: u64,
}

impl Tally {
    fn zero() -> Self {
        Self {
            exact: [0; 4],
            at_least: [0; 4],
            correct_sum: 0,
            trials: 0,
        }
    }

    fn record(&mut self, correct: u32) {
        self.correct_sum += correct as u64;
        self.trials += 1;
        for (idx, threshold) in PAYOUT_THRESHOLDS.iter().enumerate() {
            if correct == *threshold {
                self.exact[idx] += 1;
            }
            if correct >= *threshold {
                self.at_least[idx] += 1;
            }
        }
    }

    fn merge(mut self, other: Tally) -> Tally {
        for idx in 0..4 {
            self.exact[idx] += other.exact[idx];
            self.at_least[idx] += other.at_least[idx];
        }
        self.correct_sum += other.correct_sum;
        self.trials += other.trials;
        self
    }

    fn average_correct(&self) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        self.correct_sum as f64 / self.trials as f64
    }

    fn expected_payout(&self, payouts: &PayoutTable) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        self.exact
            .iter()
            .zip(&payouts.tiers)
            .map(|(count, tier)| *count as f64 / self.trials as f64 * tier)
            .sum()
    }
}

/// Draw a realized outcome by walking the cumulative distribution.
fn sample_outcome(probs: &Prob3, rng: &mut impl Rng) -> Outcome {
    let u: f64 = rng.gen_range(0.0..1.0);
    if u < probs.home {
        Outcome::Home
    } else if u < probs.home + probs.draw {
        Outcome::Draw
    } else {
        Outcome::Away
    }
}

/// Run one batch of independent trials. Returns `None` if the token fired
/// mid-batch; the partial tally is dropped on the floor.
fn run_trials(
    picks: &[Outcome],
    probs: &[Prob3],
    trials: u64,
    seed: u64,
    cancel: &CancelToken,
) -> Option<Tally> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut tally = Tally::zero();

    for trial in 0..trials {
        if trial % CANCEL_CHECK_STRIDE == 0 && cancel.is_cancelled() {
            return None;
        }
        let mut correct = 0u32;
        for (pick, p) in picks.iter().zip(probs) {
            if sample_outcome(p, &mut rng) == *pick {
                correct += 1;
            }
        }
        tally.record(correct);
    }

    Some(tally)
}

fn derive_seed(master: u64, stream: u64) -> u64 {
    master.wrapping_add(stream.wrapping_mul(SEED_STREAM_STEP))
}

/// Split a trial budget into one span per worker, spreading the remainder.
fn partition_trials(total: u64, workers: u64) -> Vec<u64> {
    let base = total / workers;
    let remainder = total % workers;
    (0..workers)
        .map(|w| base + u64::from(w < remainder))
        .collect()
}

/// Estimate the correct-count distribution of one row by Monte Carlo.
///
/// Trials are independent, so the budget is partitioned across the rayon
/// pool and per-worker tallies are summed afterwards. Each worker seeds its
/// own RNG from the master seed, which keeps runs reproducible whatever the
/// thread count happens to be.
pub fn simulate_row(
    picks: &[Outcome],
    probs: &[Prob3],
    payouts: &PayoutTable,
    params: &SimParams,
    cancel: &CancelToken,
) -> Result<SimulationResult, EngineError> {
    validate_iterations(params.iterations)?;
    debug_assert_eq!(picks.len(), probs.len());

    // Upstream renormalizes at every stage boundary, so drift here would be a
    // bug; correct it anyway rather than sampling from a skewed triple.
    let probs: Vec<Prob3> = probs
        .iter()
        .map(|p| if p.is_normalized() { *p } else { p.renormalized() })
        .collect();

    let workers = rayon::current_num_threads().max(1) as u64;
    let spans = partition_trials(params.iterations, workers);
    debug!(
        iterations = params.iterations,
        workers,
        seed = params.seed,
        "simulation started"
    );

    let tallies: Vec<Option<Tally>> = spans
        .par_iter()
        .enumerate()
        .map(|(worker, span)| {
            run_trials(
                picks,
                &probs,
                *span,
                derive_seed(params.seed, worker as u64),
                cancel,
            )
        })
        .collect();

    let mut total = Tally::zero();
    for tally in tallies {
        match tally {
            Some(t) => total = total.merge(t),
            None => return Err(EngineError::Cancelled),
        }
    }

    let exactly = std::array::from_fn(|i| total.exact[i] as f64 / total.trials as f64);
    let at_least = std::array::from_fn(|i| total.at_least[i] as f64 / total.trials as f64);

    let (average_correct_ci, expected_payout_ci) = if params.with_confidence_intervals {
        let (avg_ci, pay_ci) = bootstrap_intervals(picks, &probs, payouts, params, cancel)?;
        (Some(avg_ci), Some(pay_ci))
    } else {
        (None, None)
    };

    Ok(SimulationResult {
        iterations: params.iterations,
        average_correct: total.average_correct(),
        expected_payout: total.expected_payout(payouts),
        exactly,
        at_least,
        average_correct_ci,
        expected_payout_ci,
    })
}

/// Percentile bootstrap: many small replicate runs, each with its own seed;
/// the spread of their point estimates bounds the estimator's noise.
fn bootstrap_intervals(
    picks: &[Outcome],
    probs: &[Prob3],
    payouts: &PayoutTable,
    params: &SimParams,
    cancel: &CancelToken,
) -> Result<(ConfidenceInterval, ConfidenceInterval), EngineError> {
    let replicate_seed_base = derive_seed(params.seed ^ BOOTSTRAP_SEED_SALT, 1);

    let replicates: Vec<Option<(f64, f64)>> = (0..BOOTSTRAP_REPLICATES)
        .into_par_iter()
        .map(|replicate| {
            run_trials(
                picks,
                probs,
                BOOTSTRAP_INNER_TRIALS,
                derive_seed(replicate_seed_base, replicate as u64),
                cancel,
            )
            .map(|tally| (tally.average_correct(), tally.expected_payout(payouts)))
        })
        .collect();

    let mut averages = Vec::with_capacity(BOOTSTRAP_REPLICATES);
    let mut payouts_sampled = Vec::with_capacity(BOOTSTRAP_REPLICATES);
    for replicate in replicates {
        match replicate {
            Some((avg, pay)) => {
                averages.push(avg);
                payouts_sampled.push(pay);
            }
            None => return Err(EngineError::Cancelled),
        }
    }

    Ok((
        percentile_interval(&mut averages, params.confidence_level),
        percentile_interval(&mut payouts_sampled, params.confidence_level),
    ))
}

/// [alpha/2, 1 - alpha/2] percentile bounds of a replicate collection.
fn percentile_interval(samples: &mut [f64], confidence_level: f64) -> ConfidenceInterval {
    samples.sort_by(|a, b| a.total_cmp(b));
    let alpha = (1.0 - confidence_level.clamp(0.0, 1.0)).clamp(0.0, 1.0);
    let n = samples.len();
    let lo = ((n as f64 * alpha / 2.0).floor() as usize).min(n - 1);
    let hi = ((n as f64 * (1.0 - alpha / 2.0)).ceil() as usize)
        .saturating_sub(1)
        .min(n - 1);
    ConfidenceInterval {
        lower: samples[lo],
        upper: samples[hi.max(lo)],
    }
}
