use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::probs::{MatchOdds, NormalizedOdds, Outcome, Prob3};

// Confidence starts at an agnostic 0.5 and earns bonuses for probability
// extremity and for model/market agreement.
const CONFIDENCE_BASE: f64 = 0.5;
const EXTREMITY_BONUS_MAX: f64 = 0.3;
const AGREEMENT_BONUS_MAX: f64 = 0.2;
// Discrepancy at which the agreement bonus has fully decayed.
const DISCREPANCY_SPAN: f64 = 0.25;

#[derive(Debug, Clone, Copy)]
pub struct ValueParams {
    pub bankroll: f64,
    /// Hard cap on any single stake, as a fraction of bankroll. Full Kelly on
    /// a fat edge can suggest ruinous stakes; the cap bounds the drawdown.
    pub max_stake_frac: f64,
    /// Weight given to an external market-sentiment triple when one is
    /// supplied; the rest stays on the model probabilities.
    pub market_weight: f64,
}

impl Default for ValueParams {
    fn default() -> Self {
        Self {
            bankroll: 1_000.0,
            max_stake_frac: 0.25,
            market_weight: 0.30,
        }
    }
}

/// One positive-edge opportunity on a single outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueBet {
    pub match_id: String,
    pub outcome: Outcome,
    /// Expected value minus one: `p * odds - 1`.
    pub edge: f64,
    pub kelly_fraction: f64,
    pub confidence: f64,
    pub stake: f64,
}

/// Value analysis for one match. An empty `bets` list is the normal result
/// when no outcome beats the bookmaker's price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchValue {
    pub match_id: String,
    pub arbitrage: bool,
    pub bets: Vec<ValueBet>,
}

/// Full Kelly fraction `edge / (odds - 1)`; zero whenever there is no edge.
pub fn kelly_fraction(p: f64, odds: f64) -> f64 {
    if odds <= 1.0 {
        return 0.0;
    }
    let edge = p * odds - 1.0;
    if edge <= 0.0 {
        return 0.0;
    }
    edge / (odds - 1.0)
}

/// The best positive edge across the three outcomes, if any. Used by the
/// coverage allocator to score how much a match rewards extra cover.
pub fn best_positive_edge(probs: &Prob3, odds: &MatchOdds) -> Option<(Outcome, f64)> {
    let mut best: Option<(Outcome, f64)> = None;
    for outcome in Outcome::ALL {
        let edge = probs.get(outcome) * odds.get(outcome) - 1.0;
        if edge > 0.0 && best.map_or(true, |(_, b)| edge > b) {
            best = Some((outcome, edge));
        }
    }
    best
}

/// Kelly-criterion scan of one match.
///
/// The model probabilities are the de-vigged book probabilities, optionally
/// blended with an opaque market-sentiment triple. Stakes are full Kelly
/// capped at `max_stake_frac` of bankroll.
pub fn analyze_match(
    odds: &MatchOdds,
    normalized: &NormalizedOdds,
    market: Option<Prob3>,
    params: &ValueParams,
) -> MatchValue {
    let model = blend(normalized.probs, market, params.market_weight);

    if normalized.is_arbitrage() {
        debug!(
            match_id = %odds.match_id,
            margin = normalized.margin,
            "book margin at or below 1.0, prices admit arbitrage"
        );
    }

    let mut bets = Vec::new();
    for outcome in Outcome::ALL {
        let p = model.get(outcome);
        let price = odds.get(outcome);
        let edge = p * price - 1.0;
        if edge <= 0.0 {
            continue;
        }

        let fraction = kelly_fraction(p, price);
        let stake = (fraction * params.bankroll).min(params.max_stake_frac * params.bankroll);

        bets.push(ValueBet {
            match_id: odds.match_id.clone(),
            outcome,
            edge,
            kelly_fraction: fraction,
            confidence: confidence(p, market.map(|m| m.get(outcome))),
            stake,
        });
    }

    MatchValue {
        match_id: odds.match_id.clone(),
        arbitrage: normalized.is_arbitrage(),
        bets,
    }
}

fn blend(model: Prob3, market: Option<Prob3>, market_weight: f64) -> Prob3 {
    let Some(market) = market else {
        return model;
    };
    let w = market_weight.clamp(0.0, 1.0);
    Prob3 {
        home: (1.0 - w) * model.home + w * market.home,
        draw: (1.0 - w) * model.draw + w * market.draw,
        away: (1.0 - w) * model.away + w * market.away,
    }
    .renormalized()
}

fn confidence(p: f64, market_p: Option<f64>) -> f64 {
    // Distance above the uniform 1/3 line, scaled to [0,1].
    let extremity = ((p - 1.0 / 3.0) / (2.0 / 3.0)).max(0.0);
    let mut score = CONFIDENCE_BASE + EXTREMITY_BONUS_MAX * extremity;

    if let Some(mp) = market_p {
        let agreement = 1.0 - ((p - mp).abs() / DISCREPANCY_SPAN).min(1.0);
        score += AGREEMENT_BONUS_MAX * agreement;
    }

    score.clamp(0.0, 1.0)
}
