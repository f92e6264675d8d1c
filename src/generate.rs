use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::coverage::{self, AllocatorTuning, MatchAssessment};
use crate::error::{EngineError, validate_slate_size};
use crate::expand::{self, DEFAULT_ROW_CEILING};
use crate::payout::PayoutTable;
use crate::probs::{MatchOdds, normalize_odds};
use crate::risk::{self, RiskProfile};
use crate::signals::IntelSignal;
use crate::system::{GeneratedSystem, SLATE_SIZE, SystemConfig};
use crate::value;

/// Everything one generation run needs, supplied up front. The request owns
/// its inputs; the engine keeps no state between runs.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub matches: Vec<MatchOdds>,
    pub profile: RiskProfile,
    pub config: SystemConfig,
    /// External intelligence, keyed by match id. Absent entries are normal.
    pub signals: HashMap<String, IntelSignal>,
    pub tuning: AllocatorTuning,
    pub payouts: PayoutTable,
    pub row_ceiling: u64,
    /// Materialize the full row set, or report the count alone.
    pub include_rows: bool,
    pub seed: u64,
}

impl GenerateRequest {
    pub fn new(
        matches: Vec<MatchOdds>,
        profile: RiskProfile,
        config: SystemConfig,
        seed: u64,
    ) -> Self {
        Self {
            matches,
            profile,
            config,
            signals: HashMap::new(),
            tuning: AllocatorTuning::default(),
            payouts: PayoutTable::default(),
            row_ceiling: DEFAULT_ROW_CEILING,
            include_rows: true,
            seed,
        }
    }
}

/// Run the full pipeline: validate, de-vig, risk-adjust, value-scan,
/// allocate coverage, expand, and price the result.
///
/// Every validation failure fires before any probability work starts, so a
/// rejected request produces nothing at all.
pub fn generate_system(request: &GenerateRequest) -> Result<GeneratedSystem, EngineError> {
    validate_slate_size(request.matches.len(), SLATE_SIZE)?;
    request.config.validate(SLATE_SIZE)?;

    let total_rows = request.config.total_rows();
    if total_rows > request.row_ceiling {
        return Err(EngineError::SystemTooLarge {
            rows: total_rows,
            ceiling: request.row_ceiling,
        });
    }

    let mut seen_ids: HashSet<&str> = HashSet::with_capacity(request.matches.len());
    for odds in &request.matches {
        odds.validate()?;
        if !seen_ids.insert(odds.match_id.as_str()) {
            return Err(EngineError::DuplicateMatchId(odds.match_id.clone()));
        }
    }

    let mut assessments = Vec::with_capacity(request.matches.len());
    for odds in &request.matches {
        let normalized = normalize_odds(odds)?;
        // The value scan reads the de-vigged probabilities; the risk skew
        // only shapes coverage decisions downstream.
        let best_edge = value::best_positive_edge(&normalized.probs, odds);
        let adjusted = risk::adjust(normalized.probs, request.profile);
        assessments.push(MatchAssessment {
            match_id: odds.match_id.clone(),
            probs: adjusted,
            best_edge,
            signal: request.signals.get(&odds.match_id).copied(),
        });
    }

    let mut rng = StdRng::seed_from_u64(request.seed);
    let plans = coverage::allocate(
        &assessments,
        &request.config,
        request.profile,
        &request.tuning,
        &mut rng,
    )?;

    // Every covered outcome appears in an equal share of rows, so the
    // system-average expectation is the sum of per-match covered means; no
    // need to walk the rows to price a count-only response.
    let expected_correct: f64 = plans.iter().map(|p| p.mean_covered_prob()).sum();
    let expected_payout = request.payouts.payout(expected_correct);

    let rows = if request.include_rows {
        Some(expand::expand(&plans, request.row_ceiling)?)
    } else {
        None
    };

    let id = system_id(request);
    info!(
        system_id = %id,
        profile = request.profile.as_str(),
        total_rows,
        expected_correct,
        "system generated"
    );

    Ok(GeneratedSystem {
        id,
        profile: request.profile,
        config: request.config,
        plans,
        total_rows,
        cost: request.config.cost(),
        expected_correct,
        expected_payout,
        rows,
    })
}

/// Timestamp plus a short digest of the inputs. Unique per generation without
/// any global counter.
fn system_id(request: &GenerateRequest) -> String {
    let mut hasher = DefaultHasher::new();
    for odds in &request.matches {
        odds.match_id.hash(&mut hasher);
    }
    request.profile.as_str().hash(&mut hasher);
    request.config.halves.hash(&mut hasher);
    request.config.fulls.hash(&mut hasher);
    request.config.singles.hash(&mut hasher);
    request.seed.hash(&mut hasher);

    format!(
        "sys-{}-{:08x}",
        Utc::now().format("%Y%m%dT%H%M%S"),
        hasher.finish() as u32
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_slate::demo_slate;

    #[test]
    fn wrong_slate_size_is_rejected() {
        let mut slate = demo_slate(1);
        slate.pop();
        let request = GenerateRequest::new(
            slate,
            RiskProfile::Balanced,
            SystemConfig::default(),
            1,
        );
        assert!(matches!(
            generate_system(&request),
            Err(EngineError::SlateSize { got: 12, .. })
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut slate = demo_slate(1);
        slate[5].match_id = slate[4].match_id.clone();
        let request = GenerateRequest::new(
            slate,
            RiskProfile::Balanced,
            SystemConfig::default(),
            1,
        );
        assert!(matches!(
            generate_system(&request),
            Err(EngineError::DuplicateMatchId(_))
        ));
    }

    #[test]
    fn oversized_configs_fail_before_expansion() {
        // 3^13 rows, far past any ceiling anyone would configure.
        let request = GenerateRequest::new(
            demo_slate(1),
            RiskProfile::Balanced,
            SystemConfig::new(0, 13, 0),
            1,
        );
        assert!(matches!(
            generate_system(&request),
            Err(EngineError::SystemTooLarge { .. })
        ));
    }

    #[test]
    fn count_only_responses_skip_the_rows() {
        let mut request = GenerateRequest::new(
            demo_slate(3),
            RiskProfile::Safe,
            SystemConfig::default(),
            3,
        );
        request.include_rows = false;
        let system = generate_system(&request).unwrap();
        assert!(system.rows.is_none());
        assert_eq!(system.total_rows, 96);
        assert_eq!(system.cost, 96.0);
    }
}
