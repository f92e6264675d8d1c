use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::probs::{MatchOdds, Outcome, Prob3};
use crate::signals::IntelSignal;
use crate::system::SLATE_SIZE;

// Enough club names for a full coupon without repeats.
const TEAMS: [&str; 26] = [
    "AIK",
    "Hammarby",
    "Djurgarden",
    "Malmo FF",
    "IFK Goteborg",
    "Hacken",
    "Elfsborg",
    "Norrkoping",
    "Kalmar FF",
    "Mjallby",
    "Sirius",
    "Degerfors",
    "Varnamo",
    "Halmstad",
    "Brommapojkarna",
    "GAIS",
    "Osters IF",
    "Helsingborg",
    "Orebro",
    "Sundsvall",
    "Landskrona",
    "Trelleborg",
    "Utsikten",
    "Sandviken",
    "Skovde AIK",
    "Orgryte",
];

const SIGNAL_SEED_SALT: u64 = 0x51_6E_A1;

/// Deterministic stand-in for a real coupon feed: 13 matches with plausible
/// 1X2 prices. Favorite strength varies across the slate and each book runs
/// a margin in the usual 1.02-1.12 band.
pub fn demo_slate(seed: u64) -> Vec<MatchOdds> {
    let mut rng = StdRng::seed_from_u64(seed);

    (0..SLATE_SIZE)
        .map(|i| {
            let probs = random_true_probs(&mut rng);
            let margin = rng.gen_range(1.02..1.12);

            // Work backwards from "true" probabilities: the book quotes
            // implied = p * margin_share, so odds = 1 / (p * margin).
            let price = |p: f64| (1.0 / (p * margin)).max(1.01);

            MatchOdds {
                match_id: format!("match-{:02}", i + 1),
                home_team: TEAMS[2 * i].to_string(),
                away_team: TEAMS[2 * i + 1].to_string(),
                home: price(probs.home),
                draw: price(probs.draw),
                away: price(probs.away),
            }
        })
        .collect()
}

fn random_true_probs(rng: &mut impl Rng) -> Prob3 {
    // Home strength spans near coin flips to heavy favorites; draws sit in
    // the band football actually produces.
    let home = rng.gen_range(0.25..0.62);
    let draw = rng.gen_range(0.18..0.32);
    let away: f64 = (1.0_f64 - home - draw).max(0.05);
    Prob3 { home, draw, away }.renormalized()
}

/// Demo intelligence signals for part of a slate. Roughly every other match
/// gets one; the rest stay silent, which the consumers treat as normal.
pub fn demo_signals(slate: &[MatchOdds], seed: u64) -> HashMap<String, IntelSignal> {
    let mut rng = StdRng::seed_from_u64(seed ^ SIGNAL_SEED_SALT);
    let mut signals = HashMap::new();

    for odds in slate {
        if !rng.gen_bool(0.6) {
            continue;
        }
        // The demo provider just leans on the prices: shortest odds get the
        // nod, longest odds are the contrarian shout.
        let favorite = shortest_price(odds);
        let longshot = longest_price(odds);
        signals.insert(
            odds.match_id.clone(),
            IntelSignal {
                recommended: favorite,
                confidence: rng.gen_range(0.35..0.90),
                contrarian: longshot,
            },
        );
    }

    signals
}

fn shortest_price(odds: &MatchOdds) -> Outcome {
    let mut best = Outcome::Home;
    for outcome in Outcome::ALL {
        if odds.get(outcome) < odds.get(best) {
            best = outcome;
        }
    }
    best
}

fn longest_price(odds: &MatchOdds) -> Outcome {
    let mut worst = Outcome::Home;
    for outcome in Outcome::ALL {
        if odds.get(outcome) > odds.get(worst) {
            worst = outcome;
        }
    }
    worst
}
