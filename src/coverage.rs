use rand::Rng;
use tracing::debug;

use crate::error::EngineError;
use crate::probs::{Outcome, Prob3};
use crate::risk::RiskProfile;
use crate::signals::IntelSignal;
use crate::system::{CoverageClass, MatchPlan, SystemConfig};

// Strategic value blends how undecided a match looks with how mispriced it is.
const UNCERTAINTY_WEIGHT: f64 = 0.6;
const VALUE_WEIGHT: f64 = 0.4;
/// Kelly edge at which the value term saturates. A +50% edge is already
/// extreme for 1X2 football prices.
const EDGE_SCALE: f64 = 0.5;

// Base weights for the risky single-pick lottery, before noise.
const RISKY_VALUE_WEIGHT: f64 = 0.4;
const RISKY_CONTRARIAN_WEIGHT: f64 = 0.3;
const RISKY_SAFE_WEIGHT: f64 = 0.3;

/// Thresholds and probabilities for the randomized allocation branches.
///
/// None of these fall out of a model; they set how often the balanced and
/// risky profiles deviate from the deterministic ranking, and are exposed so
/// operators can tune the chaos instead of inheriting baked-in constants.
#[derive(Debug, Clone, Copy)]
pub struct AllocatorTuning {
    /// Chance that a balanced allocation shuffles its middle ranks at all.
    pub balanced_shuffle_prob: f64,
    /// Pairwise swaps applied inside the middle window when it does.
    pub balanced_swap_count: usize,
    /// Confidence at or above which balanced singles trust the safe pick.
    pub balanced_confidence_threshold: f64,
    /// Multiplicative noise half-width applied to risky strategic scores.
    pub risky_score_noise: f64,
    /// Fraction span of the list a risky allocation swaps across.
    pub risky_swap_min_frac: f64,
    pub risky_swap_max_frac: f64,
    /// Chance a risky allocation reverses the whole ranking.
    pub risky_reversal_prob: f64,
    /// Chance a risky single ignores analysis and picks uniformly at random.
    pub risky_uniform_pick_prob: f64,
    /// Chance a risky single avoids every suggested pick on purpose.
    pub risky_avoid_picks_prob: f64,
    /// Chance a risky half keeps the longshot next to the favorite instead of
    /// fading the favorite entirely.
    pub risky_keep_longshot_prob: f64,
}

impl Default for AllocatorTuning {
    fn default() -> Self {
        Self {
            balanced_shuffle_prob: 0.5,
            balanced_swap_count: 3,
            balanced_confidence_threshold: 0.55,
            risky_score_noise: 0.4,
            risky_swap_min_frac: 0.5,
            risky_swap_max_frac: 1.0,
            risky_reversal_prob: 0.25,
            risky_uniform_pick_prob: 0.3,
            risky_avoid_picks_prob: 0.25,
            risky_keep_longshot_prob: 0.5,
        }
    }
}

/// Everything the allocator knows about one match: risk-adjusted
/// probabilities, the best mispricing the value scan found, and whatever an
/// external intelligence provider volunteered.
#[derive(Debug, Clone)]
pub struct MatchAssessment {
    pub match_id: String,
    pub probs: Prob3,
    pub best_edge: Option<(Outcome, f64)>,
    pub signal: Option<IntelSignal>,
}

/// How much a match benefits from multi-outcome coverage. Uncertain matches
/// burn singles; mispriced matches reward wider cover.
pub fn strategic_score(assessment: &MatchAssessment) -> f64 {
    let uncertainty = assessment.probs.entropy_bits() / 3.0_f64.log2();
    let value = assessment
        .best_edge
        .map_or(0.0, |(_, edge)| (edge / EDGE_SCALE).clamp(0.0, 1.0));
    UNCERTAINTY_WEIGHT * uncertainty + VALUE_WEIGHT * value
}

/// Assign a coverage class and concrete covered outcomes to every match.
///
/// Matches are ranked by strategic score, the ranking is perturbed according
/// to the risk profile, and classes are dealt in one pass: the top `halves`
/// ranks take Half, the next `fulls` take Full, the rest play as Singles.
/// The assignment is one-shot; nothing is revisited once dealt.
pub fn allocate(
    matches: &[MatchAssessment],
    config: &SystemConfig,
    profile: RiskProfile,
    tuning: &AllocatorTuning,
    rng: &mut impl Rng,
) -> Result<Vec<MatchPlan>, EngineError> {
    config.validate(matches.len())?;

    let order = rank(matches, profile, tuning, rng);

    let mut class_by_match = vec![CoverageClass::Single; matches.len()];
    for (position, &match_idx) in order.iter().enumerate() {
        class_by_match[match_idx] = if position < config.halves {
            CoverageClass::Half
        } else if position < config.halves + config.fulls {
            CoverageClass::Full
        } else {
            CoverageClass::Single
        };
    }

    let plans = matches
        .iter()
        .zip(&class_by_match)
        .map(|(assessment, &class)| {
            let covered = match class {
                CoverageClass::Full => Outcome::ALL.to_vec(),
                CoverageClass::Half => select_half(assessment, profile, tuning, rng),
                CoverageClass::Single => vec![select_single(assessment, profile, tuning, rng)],
            };
            debug!(
                match_id = %assessment.match_id,
                class = class.as_str(),
                covered = covered.len(),
                "coverage assigned"
            );
            MatchPlan {
                match_id: assessment.match_id.clone(),
                class,
                covered,
                probs: assessment.probs,
            }
        })
        .collect();

    Ok(plans)
}

/// Match indices ordered by descending strategic score, then perturbed per
/// profile. Ties break on slate position so safe allocations stay fully
/// deterministic.
fn rank(
    matches: &[MatchAssessment],
    profile: RiskProfile,
    tuning: &AllocatorTuning,
    rng: &mut impl Rng,
) -> Vec<usize> {
    let mut scored: Vec<(usize, f64)> = matches
        .iter()
        .enumerate()
        .map(|(idx, m)| (idx, strategic_score(m)))
        .collect();

    if profile == RiskProfile::Risky && tuning.risky_score_noise > 0.0 {
        let noise = tuning.risky_score_noise;
        for (_, score) in &mut scored {
            *score *= 1.0 + rng.gen_range(-noise..=noise);
        }
    }

    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    let mut order: Vec<usize> = scored.into_iter().map(|(idx, _)| idx).collect();

    match profile {
        RiskProfile::Safe => {}
        RiskProfile::Balanced => {
            if rng.gen_bool(tuning.balanced_shuffle_prob.clamp(0.0, 1.0)) {
                // Swaps stay inside the middle half of the board, where the
                // half/full boundary actually moves; the clear leaders and
                // clear singles keep their seats.
                let lo = order.len() / 4;
                let hi = order.len() - order.len() / 4;
                if hi.saturating_sub(lo) >= 2 {
                    for _ in 0..tuning.balanced_swap_count {
                        let a = rng.gen_range(lo..hi);
                        let b = rng.gen_range(lo..hi);
                        order.swap(a, b);
                    }
                }
            }
        }
        RiskProfile::Risky => {
            if order.len() >= 2 {
                let span = rng.gen_range(
                    tuning.risky_swap_min_frac.clamp(0.0, 1.0)
                        ..=tuning.risky_swap_max_frac.clamp(0.0, 1.0),
                );
                let swaps = (order.len() as f64 * span).round() as usize;
                for _ in 0..swaps {
                    let a = rng.gen_range(0..order.len());
                    let b = rng.gen_range(0..order.len());
                    order.swap(a, b);
                }
            }
            if rng.gen_bool(tuning.risky_reversal_prob.clamp(0.0, 1.0)) {
                order.reverse();
            }
        }
    }

    order
}

/// Both outcomes other than `excluded`, in coupon order.
fn pair_without(excluded: Outcome) -> Vec<Outcome> {
    Outcome::ALL.iter().copied().filter(|o| *o != excluded).collect()
}

fn pair_of(first: Outcome, second: Outcome) -> Vec<Outcome> {
    Outcome::ALL
        .iter()
        .copied()
        .filter(|o| *o == first || *o == second)
        .collect()
}

fn select_half(
    assessment: &MatchAssessment,
    profile: RiskProfile,
    tuning: &AllocatorTuning,
    rng: &mut impl Rng,
) -> Vec<Outcome> {
    let probs = assessment.probs;
    let safest = pair_without(probs.least_likely());

    match profile {
        RiskProfile::Safe => safest,
        RiskProfile::Risky => {
            if rng.gen_bool(tuning.risky_keep_longshot_prob.clamp(0.0, 1.0)) {
                // Banker plus longshot: keep the favorite but ride the
                // outcome the market dismisses.
                pair_of(probs.most_likely(), probs.least_likely())
            } else {
                // Contrarian pair: fade the favorite outright.
                pair_without(probs.most_likely())
            }
        }
        RiskProfile::Balanced => {
            let confidence = pick_confidence(assessment);
            if rng.gen_bool(confidence.clamp(0.0, 1.0)) {
                safest
            } else {
                pair_without(probs.most_likely())
            }
        }
    }
}

fn select_single(
    assessment: &MatchAssessment,
    profile: RiskProfile,
    tuning: &AllocatorTuning,
    rng: &mut impl Rng,
) -> Outcome {
    let safe_pick = safe_pick(assessment);
    let value_pick = assessment
        .best_edge
        .map(|(outcome, _)| outcome)
        .unwrap_or(safe_pick);
    let contrarian_pick = assessment
        .signal
        .map(|s| s.contrarian)
        .unwrap_or_else(|| assessment.probs.least_likely());

    match profile {
        RiskProfile::Safe => safe_pick,
        RiskProfile::Balanced => {
            if pick_confidence(assessment) >= tuning.balanced_confidence_threshold {
                safe_pick
            } else {
                value_pick
            }
        }
        RiskProfile::Risky => {
            if rng.gen_bool(tuning.risky_uniform_pick_prob.clamp(0.0, 1.0)) {
                return Outcome::ALL[rng.gen_range(0..Outcome::ALL.len())];
            }
            if rng.gen_bool(tuning.risky_avoid_picks_prob.clamp(0.0, 1.0)) {
                let suggested = [safe_pick, value_pick, contrarian_pick];
                let leftovers: Vec<Outcome> = Outcome::ALL
                    .iter()
                    .copied()
                    .filter(|o| !suggested.contains(o))
                    .collect();
                if !leftovers.is_empty() {
                    return leftovers[rng.gen_range(0..leftovers.len())];
                }
                // All three outcomes were suggested; the longshot is the
                // closest thing left to an act of defiance.
                return assessment.probs.least_likely();
            }
            // Weighted lottery over the three candidate picks, with
            // multiplicative noise so repeated risky runs drift.
            let candidates = [
                (value_pick, RISKY_VALUE_WEIGHT),
                (contrarian_pick, RISKY_CONTRARIAN_WEIGHT),
                (safe_pick, RISKY_SAFE_WEIGHT),
            ];
            let mut best = candidates[0].0;
            let mut best_weight = f64::MIN;
            for (pick, base) in candidates {
                let weight = base * rng.gen_range(0.5..1.5);
                if weight > best_weight {
                    best_weight = weight;
                    best = pick;
                }
            }
            best
        }
    }
}

/// Most probable outcome, unless an external signal is more certain than the
/// model's favorite.
fn safe_pick(assessment: &MatchAssessment) -> Outcome {
    let favorite = assessment.probs.most_likely();
    match assessment.signal {
        Some(signal) if signal.clamped_confidence() > assessment.probs.get(favorite) => {
            signal.recommended
        }
        _ => favorite,
    }
}

/// Confidence backing the safe pick: the provider's word when a signal
/// exists, else the favorite's own probability.
fn pick_confidence(assessment: &MatchAssessment) -> f64 {
    assessment
        .signal
        .map(|s| s.clamped_confidence())
        .unwrap_or_else(|| assessment.probs.get(assessment.probs.most_likely()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn assessment(id: &str, home: f64, draw: f64, away: f64) -> MatchAssessment {
        MatchAssessment {
            match_id: id.to_string(),
            probs: Prob3 { home, draw, away },
            best_edge: None,
            signal: None,
        }
    }

    fn slate() -> Vec<MatchAssessment> {
        (0..13)
            .map(|i| {
                // Spread from near-certain favorites to coin flips.
                let home = 0.34 + 0.04 * i as f64;
                let draw = (1.0 - home) * 0.45;
                let away = 1.0 - home - draw;
                assessment(&format!("m{i}"), home, draw, away)
            })
            .collect()
    }

    #[test]
    fn uncertainty_dominates_without_edges() {
        let tight = assessment("tight", 0.34, 0.33, 0.33);
        let lopsided = assessment("lop", 0.85, 0.10, 0.05);
        assert!(strategic_score(&tight) > strategic_score(&lopsided));
    }

    #[test]
    fn positive_edge_raises_the_score() {
        let mut flat = assessment("flat", 0.4, 0.3, 0.3);
        let base = strategic_score(&flat);
        flat.best_edge = Some((Outcome::Home, 0.2));
        assert!(strategic_score(&flat) > base);
    }

    #[test]
    fn class_counts_follow_the_config() {
        let matches = slate();
        let config = SystemConfig::new(5, 1, 7);
        let mut rng = StdRng::seed_from_u64(1);
        let plans = allocate(
            &matches,
            &config,
            RiskProfile::Balanced,
            &AllocatorTuning::default(),
            &mut rng,
        )
        .unwrap();

        let halves = plans.iter().filter(|p| p.class == CoverageClass::Half).count();
        let fulls = plans.iter().filter(|p| p.class == CoverageClass::Full).count();
        let singles = plans.iter().filter(|p| p.class == CoverageClass::Single).count();
        assert_eq!((halves, fulls, singles), (5, 1, 7));

        for plan in &plans {
            assert_eq!(plan.covered.len(), plan.class.cardinality());
        }
    }

    #[test]
    fn safe_allocation_ignores_the_rng_seed() {
        let matches = slate();
        let config = SystemConfig::new(4, 2, 7);
        let tuning = AllocatorTuning::default();
        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7_000_000);
        let a = allocate(&matches, &config, RiskProfile::Safe, &tuning, &mut rng_a).unwrap();
        let b = allocate(&matches, &config, RiskProfile::Safe, &tuning, &mut rng_b).unwrap();
        for (pa, pb) in a.iter().zip(&b) {
            assert_eq!(pa.class, pb.class);
            assert_eq!(pa.covered, pb.covered);
        }
    }

    #[test]
    fn safe_half_drops_the_longshot_and_single_takes_the_favorite() {
        let matches = vec![
            assessment("m0", 0.36, 0.34, 0.30),
            assessment("m1", 0.60, 0.25, 0.15),
        ];
        let config = SystemConfig::new(1, 0, 1);
        let mut rng = StdRng::seed_from_u64(3);
        let plans = allocate(
            &matches,
            &config,
            RiskProfile::Safe,
            &AllocatorTuning::default(),
            &mut rng,
        )
        .unwrap();

        // The tight match ranks first and takes the half.
        assert_eq!(plans[0].class, CoverageClass::Half);
        assert_eq!(plans[0].covered, vec![Outcome::Home, Outcome::Draw]);
        assert_eq!(plans[1].class, CoverageClass::Single);
        assert_eq!(plans[1].covered, vec![Outcome::Home]);
    }

    #[test]
    fn strong_signal_overrides_the_model_favorite_for_safe_singles() {
        let mut m = assessment("m0", 0.40, 0.32, 0.28);
        m.signal = Some(IntelSignal {
            recommended: Outcome::Away,
            confidence: 0.9,
            contrarian: Outcome::Home,
        });
        assert_eq!(safe_pick(&m), Outcome::Away);

        m.signal = Some(IntelSignal {
            recommended: Outcome::Away,
            confidence: 0.2,
            contrarian: Outcome::Home,
        });
        assert_eq!(safe_pick(&m), Outcome::Home);
    }

    #[test]
    fn risky_allocation_varies_with_the_seed() {
        let matches = slate();
        let config = SystemConfig::new(5, 1, 7);
        let tuning = AllocatorTuning::default();

        let mut distinct = false;
        let mut rng_a = StdRng::seed_from_u64(11);
        let a = allocate(&matches, &config, RiskProfile::Risky, &tuning, &mut rng_a).unwrap();
        for seed in 12..22 {
            let mut rng_b = StdRng::seed_from_u64(seed);
            let b = allocate(&matches, &config, RiskProfile::Risky, &tuning, &mut rng_b).unwrap();
            if a.iter()
                .zip(&b)
                .any(|(pa, pb)| pa.class != pb.class || pa.covered != pb.covered)
            {
                distinct = true;
                break;
            }
        }
        assert!(distinct, "ten risky reseeds should not all agree");
    }

    #[test]
    fn count_mismatch_is_rejected_before_any_work() {
        let matches = slate();
        let config = SystemConfig::new(5, 1, 6);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(allocate(
            &matches,
            &config,
            RiskProfile::Safe,
            &AllocatorTuning::default(),
            &mut rng,
        )
        .is_err());
    }
}
