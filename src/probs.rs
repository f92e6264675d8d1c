use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Tolerance for the "probabilities sum to 1" invariant. Triples are
/// renormalized after every transformation, so drift beyond this means a bug
/// upstream rather than accumulated float error.
pub const PROB_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];

    pub fn index(self) -> usize {
        match self {
            Outcome::Home => 0,
            Outcome::Draw => 1,
            Outcome::Away => 2,
        }
    }

    /// The 1X2 sign used on printed coupons.
    pub fn sign(self) -> &'static str {
        match self {
            Outcome::Home => "1",
            Outcome::Draw => "X",
            Outcome::Away => "2",
        }
    }
}

/// Probability triple over the three 1X2 outcomes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Prob3 {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl Prob3 {
    pub fn uniform() -> Self {
        Self {
            home: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away: 1.0 / 3.0,
        }
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    pub fn sum(&self) -> f64 {
        self.home + self.draw + self.away
    }

    pub fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() <= PROB_TOLERANCE
    }

    /// Rescale so the components sum to 1. A degenerate all-zero triple falls
    /// back to uniform rather than dividing by zero.
    pub fn renormalized(&self) -> Prob3 {
        let sum = self.sum();
        if sum <= 0.0 {
            return Prob3::uniform();
        }
        Prob3 {
            home: self.home / sum,
            draw: self.draw / sum,
            away: self.away / sum,
        }
    }

    /// Shannon entropy in bits; 0 for a certain outcome, log2(3) for uniform.
    pub fn entropy_bits(&self) -> f64 {
        [self.home, self.draw, self.away]
            .iter()
            .filter(|p| **p > 0.0)
            .map(|p| -p * p.log2())
            .sum()
    }

    /// Ties resolve in Home, Draw, Away order so callers stay deterministic.
    pub fn most_likely(&self) -> Outcome {
        let mut best = Outcome::Home;
        for outcome in Outcome::ALL {
            if self.get(outcome) > self.get(best) {
                best = outcome;
            }
        }
        best
    }

    pub fn least_likely(&self) -> Outcome {
        let mut worst = Outcome::Home;
        for outcome in Outcome::ALL {
            if self.get(outcome) < self.get(worst) {
                worst = outcome;
            }
        }
        worst
    }
}

/// Bookmaker prices for one match. Decimal odds, each strictly above 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOdds {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl MatchOdds {
    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let valid = |v: f64| v.is_finite() && v > 1.0;
        if valid(self.home) && valid(self.draw) && valid(self.away) {
            Ok(())
        } else {
            Err(EngineError::InvalidOdds {
                match_id: self.match_id.clone(),
                home: self.home,
                draw: self.draw,
                away: self.away,
            })
        }
    }
}

/// De-vigged probabilities plus the margin they were extracted from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NormalizedOdds {
    pub probs: Prob3,
    /// Sum of implied probabilities. Books run 1.02-1.12; a value at or below
    /// 1.0 means the prices admit a theoretical arbitrage.
    pub margin: f64,
}

impl NormalizedOdds {
    pub fn is_arbitrage(&self) -> bool {
        self.margin <= 1.0
    }
}

/// Strip the bookmaker margin: implied = 1/odds, then rescale by the summed
/// implied probability. An arbitrage margin still normalizes; the condition is
/// surfaced via [`NormalizedOdds::is_arbitrage`] instead of failing.
pub fn normalize_odds(odds: &MatchOdds) -> Result<NormalizedOdds, EngineError> {
    odds.validate()?;

    let implied = Prob3 {
        home: 1.0 / odds.home,
        draw: 1.0 / odds.draw,
        away: 1.0 / odds.away,
    };
    let margin = implied.sum();

    Ok(NormalizedOdds {
        probs: implied.renormalized(),
        margin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn odds(home: f64, draw: f64, away: f64) -> MatchOdds {
        MatchOdds {
            match_id: "m1".to_string(),
            home_team: "H".to_string(),
            away_team: "A".to_string(),
            home,
            draw,
            away,
        }
    }

    #[test]
    fn normalization_strips_margin() {
        let n = normalize_odds(&odds(2.0, 3.0, 4.0)).unwrap();
        assert!((n.margin - (0.5 + 1.0 / 3.0 + 0.25)).abs() < 1e-12);
        assert!((n.probs.home - 0.4615).abs() < 1e-3);
        assert!((n.probs.draw - 0.3077).abs() < 1e-3);
        assert!((n.probs.away - 0.2308).abs() < 1e-3);
        assert!(n.probs.is_normalized());
        assert!(!n.is_arbitrage());
    }

    #[test]
    fn odds_at_or_below_one_are_rejected() {
        assert!(normalize_odds(&odds(1.0, 3.0, 4.0)).is_err());
        assert!(normalize_odds(&odds(2.0, 0.8, 4.0)).is_err());
        assert!(normalize_odds(&odds(2.0, 3.0, f64::NAN)).is_err());
    }

    #[test]
    fn arbitrage_margin_is_a_signal_not_an_error() {
        // Implied sum 1/3 + 1/3 + 1/4 < 1.
        let n = normalize_odds(&odds(3.0, 3.0, 4.0)).unwrap();
        assert!(n.is_arbitrage());
        assert!(n.probs.is_normalized());
    }

    #[test]
    fn entropy_extremes() {
        let certain = Prob3 {
            home: 1.0,
            draw: 0.0,
            away: 0.0,
        };
        assert_eq!(certain.entropy_bits(), 0.0);
        let spread = Prob3::uniform().entropy_bits();
        assert!((spread - 3.0_f64.log2()).abs() < 1e-12);
    }

    #[test]
    fn renormalize_recovers_from_zero_sum() {
        let zero = Prob3 {
            home: 0.0,
            draw: 0.0,
            away: 0.0,
        };
        assert!(zero.renormalized().is_normalized());
    }

    #[test]
    fn likelihood_ties_resolve_in_coupon_order() {
        let flat = Prob3::uniform();
        assert_eq!(flat.most_likely(), Outcome::Home);
        assert_eq!(flat.least_likely(), Outcome::Home);
    }
}
