use std::env;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;

use stryk_engine::expand::DEFAULT_ROW_CEILING;
use stryk_engine::fake_slate::{demo_signals, demo_slate};
use stryk_engine::generate::{GenerateRequest, generate_system};
use stryk_engine::probs::{Prob3, normalize_odds};
use stryk_engine::risk::RiskProfile;
use stryk_engine::simulate::{
    CancelToken, DEFAULT_ITERATIONS, MAX_ITERATIONS, MIN_ITERATIONS, SimParams, simulate_row,
};
use stryk_engine::system::{SLATE_SIZE, SystemConfig};
use stryk_engine::value::{ValueParams, analyze_match};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let profile = match env::var("RISK_PROFILE") {
        Ok(raw) => RiskProfile::from_str(&raw)?,
        Err(_) => RiskProfile::Balanced,
    };
    let halves = env_usize("SYSTEM_HALVES", 5).min(SLATE_SIZE);
    let fulls = env_usize("SYSTEM_FULLS", 1).min(SLATE_SIZE - halves);
    let config = SystemConfig::new(halves, fulls, SLATE_SIZE - halves - fulls);

    let seed = env_u64("SEED", 42);
    let iterations = env_u64("SIM_ITERATIONS", DEFAULT_ITERATIONS).clamp(MIN_ITERATIONS, MAX_ITERATIONS);
    let with_ci = env::var("SIM_CI").map(|v| v == "1").unwrap_or(false);
    let row_ceiling = env_u64("ROW_CEILING", DEFAULT_ROW_CEILING);

    let slate = demo_slate(seed);
    let signals = demo_signals(&slate, seed);

    println!(
        "Coupon: {} matches, {} profile, {}H/{}F/{}S",
        slate.len(),
        profile.as_str(),
        config.halves,
        config.fulls,
        config.singles
    );
    println!();

    let value_params = ValueParams::default();
    let mut any_value = false;
    for odds in &slate {
        let normalized = normalize_odds(odds)?;
        let report = analyze_match(odds, &normalized, None, &value_params);
        for bet in &report.bets {
            any_value = true;
            println!(
                "Value: {} {} @ {:.2}  edge {:+.3}  kelly {:.3}  stake {:.1}",
                odds.match_id,
                bet.outcome.sign(),
                odds.get(bet.outcome),
                bet.edge,
                bet.kelly_fraction,
                bet.stake
            );
        }
    }
    if !any_value {
        println!("Value: no positive-edge outcome on this coupon");
    }
    println!();

    let mut request = GenerateRequest::new(slate.clone(), profile, config, seed);
    request.signals = signals;
    request.row_ceiling = row_ceiling;
    let system = generate_system(&request)?;

    for (odds, plan) in slate.iter().zip(&system.plans) {
        let signs: String = plan.covered.iter().map(|o| o.sign()).collect();
        println!(
            "{:<9} {:<16} - {:<16} {:<6} {}",
            plan.match_id,
            odds.home_team,
            odds.away_team,
            plan.class.as_str(),
            signs
        );
    }
    println!();
    println!(
        "System {}: {} rows, cost {:.0}, expected correct {:.2}, payout est {:.0}",
        system.id, system.total_rows, system.cost, system.expected_correct, system.expected_payout
    );

    let Some(best) = system.best_row() else {
        return Ok(());
    };
    println!("Best row: {}  (analytic {:.2} correct)", best.signs(), best.expected_correct);

    let probs: Vec<Prob3> = system.plans.iter().map(|p| p.probs).collect();
    let params = SimParams {
        iterations,
        with_confidence_intervals: with_ci,
        confidence_level: 0.95,
        seed,
    };
    let result = simulate_row(&best.picks, &probs, &request.payouts, &params, &CancelToken::new())?;

    println!();
    println!(
        "Simulated {} trials: avg {:.3} correct, payout {:.1}",
        result.iterations, result.average_correct, result.expected_payout
    );
    for (idx, k) in [10u32, 11, 12, 13].iter().enumerate() {
        println!(
            "  {:>2}+ correct: {:>8.5}   exactly {}: {:>8.5}",
            k, result.at_least[idx], k, result.exactly[idx]
        );
    }
    if let (Some(avg_ci), Some(pay_ci)) = (result.average_correct_ci, result.expected_payout_ci) {
        println!(
            "  95% CI: avg [{:.3}, {:.3}], payout [{:.1}, {:.1}]",
            avg_ci.lower, avg_ci.upper, pay_ci.lower, pay_ci.upper
        );
    }

    Ok(())
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(default)
}
