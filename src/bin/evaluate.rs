use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use stryk_engine::expand::DEFAULT_ROW_CEILING;
use stryk_engine::generate::{GenerateRequest, generate_system};
use stryk_engine::probs::{MatchOdds, Prob3};
use stryk_engine::risk::RiskProfile;
use stryk_engine::simulate::{CancelToken, SimParams, simulate_row};
use stryk_engine::system::{SLATE_SIZE, SystemConfig};

// This binary is intentionally simple: it loads one coupon from disk, builds
// a system for it, and runs a deep simulation with confidence intervals. No
// network, no persistence; it exists for manual evaluation runs.
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/slate.json"));

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("reading coupon from {}", path.display()))?;
    let slate: Vec<MatchOdds> = serde_json::from_str(&raw).context("parsing coupon JSON")?;

    let profile = match std::env::var("RISK_PROFILE") {
        Ok(raw) => RiskProfile::from_str(&raw)?,
        Err(_) => RiskProfile::Safe,
    };
    let halves = env_usize("SYSTEM_HALVES", 5).min(SLATE_SIZE);
    let fulls = env_usize("SYSTEM_FULLS", 1).min(SLATE_SIZE - halves);
    let config = SystemConfig::new(halves, fulls, SLATE_SIZE - halves - fulls);
    let seed = env_u64("SEED", 1);

    let mut request = GenerateRequest::new(slate, profile, config, seed);
    request.row_ceiling = env_u64("ROW_CEILING", DEFAULT_ROW_CEILING);
    let system = generate_system(&request)?;

    println!("System {}", system.id);
    println!(
        "{} rows, cost {:.0}, expected correct {:.2}",
        system.total_rows, system.cost, system.expected_correct
    );

    let best = system
        .best_row()
        .context("system was generated with rows included")?;
    println!("Best row {}", best.signs());

    let probs: Vec<Prob3> = system.plans.iter().map(|p| p.probs).collect();
    let params = SimParams {
        iterations: env_u64("SIM_ITERATIONS", 200_000).clamp(1_000, 1_000_000),
        with_confidence_intervals: true,
        confidence_level: 0.95,
        seed,
    };
    let result = simulate_row(&best.picks, &probs, &request.payouts, &params, &CancelToken::new())?;

    println!(
        "Simulated {} trials: avg {:.3} correct, payout {:.1}",
        result.iterations, result.average_correct, result.expected_payout
    );
    for (idx, k) in [10u32, 11, 12, 13].iter().enumerate() {
        println!("  P(>= {k}) = {:.6}", result.at_least[idx]);
    }
    if let (Some(avg_ci), Some(pay_ci)) = (result.average_correct_ci, result.expected_payout_ci) {
        println!(
            "95% CI: avg [{:.3}, {:.3}], payout [{:.1}, {:.1}]",
            avg_ci.lower, avg_ci.upper, pay_ci.lower, pay_ci.upper
        );
    }

    Ok(())
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(default)
}
