use crate::error::EngineError;
use crate::probs::Outcome;
use crate::system::{GeneratedRow, MatchPlan};

/// Default cap on materialized rows. The largest shape anyone actually plays
/// sits well under a thousand rows; anything past this ceiling is a
/// misconfigured request, not a bigger bet.
pub const DEFAULT_ROW_CEILING: u64 = 4_096;

/// Number of rows a completed coverage plan expands to: the product of the
/// per-match covered-set sizes, which equals 2^halves x 3^fulls.
pub fn row_count(plans: &[MatchPlan]) -> u64 {
    plans.iter().map(|p| p.covered.len() as u64).product()
}

/// Lazy cross-product of the covered outcome sets, in original slate order.
///
/// Works like an odometer over mixed radices: each match position holds an
/// index into its covered set, and the rightmost position ticks fastest. Rows
/// are therefore pairwise distinct by construction and peak memory stays one
/// row regardless of how large the system is.
pub struct RowIter<'a> {
    plans: &'a [MatchPlan],
    cursor: Vec<usize>,
    exhausted: bool,
}

impl<'a> RowIter<'a> {
    fn new(plans: &'a [MatchPlan]) -> Self {
        Self {
            plans,
            cursor: vec![0; plans.len()],
            exhausted: plans.is_empty() || plans.iter().any(|p| p.covered.is_empty()),
        }
    }
}

impl Iterator for RowIter<'_> {
    type Item = GeneratedRow;

    fn next(&mut self) -> Option<GeneratedRow> {
        if self.exhausted {
            return None;
        }

        let mut picks: Vec<Outcome> = Vec::with_capacity(self.plans.len());
        let mut expected_correct = 0.0;
        for (plan, idx) in self.plans.iter().zip(&self.cursor) {
            let pick = plan.covered[*idx];
            expected_correct += plan.probs.get(pick);
            picks.push(pick);
        }

        // Advance the odometer; carrying past the first position means the
        // cross-product is complete.
        self.exhausted = true;
        for pos in (0..self.cursor.len()).rev() {
            self.cursor[pos] += 1;
            if self.cursor[pos] < self.plans[pos].covered.len() {
                self.exhausted = false;
                break;
            }
            self.cursor[pos] = 0;
        }

        Some(GeneratedRow {
            picks,
            expected_correct,
        })
    }
}

/// Stream the rows of a plan without materializing them.
pub fn rows(plans: &[MatchPlan]) -> RowIter<'_> {
    RowIter::new(plans)
}

/// Materialize every row of a plan, refusing up front if the count would
/// exceed the operator ceiling.
pub fn expand(plans: &[MatchPlan], ceiling: u64) -> Result<Vec<GeneratedRow>, EngineError> {
    let count = row_count(plans);
    if count > ceiling {
        return Err(EngineError::SystemTooLarge {
            rows: count,
            ceiling,
        });
    }
    Ok(rows(plans).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probs::Prob3;
    use crate::system::CoverageClass;

    fn plan(id: &str, covered: Vec<Outcome>) -> MatchPlan {
        let class = match covered.len() {
            1 => CoverageClass::Single,
            2 => CoverageClass::Half,
            _ => CoverageClass::Full,
        };
        MatchPlan {
            match_id: id.to_string(),
            class,
            covered,
            probs: Prob3 {
                home: 0.5,
                draw: 0.3,
                away: 0.2,
            },
        }
    }

    #[test]
    fn single_half_full_cross_product() {
        let plans = vec![
            plan("m1", vec![Outcome::Home]),
            plan("m2", vec![Outcome::Home, Outcome::Draw]),
            plan("m3", vec![Outcome::Home, Outcome::Draw, Outcome::Away]),
        ];
        let all: Vec<GeneratedRow> = rows(&plans).collect();
        assert_eq!(all.len(), 6);
        assert_eq!(row_count(&plans), 6);
        // First row takes the first covered outcome everywhere.
        assert_eq!(all[0].picks, vec![Outcome::Home, Outcome::Home, Outcome::Home]);
        // Last row takes the last covered outcome everywhere.
        assert_eq!(all[5].picks, vec![Outcome::Home, Outcome::Draw, Outcome::Away]);
    }

    #[test]
    fn expected_correct_sums_pick_probabilities() {
        let plans = vec![plan("m1", vec![Outcome::Home, Outcome::Away])];
        let all: Vec<GeneratedRow> = rows(&plans).collect();
        assert!((all[0].expected_correct - 0.5).abs() < 1e-12);
        assert!((all[1].expected_correct - 0.2).abs() < 1e-12);
    }

    #[test]
    fn ceiling_rejects_oversized_plans() {
        let plans: Vec<MatchPlan> = (0..4)
            .map(|i| plan(&format!("m{i}"), Outcome::ALL.to_vec()))
            .collect();
        // 3^4 = 81 rows against a ceiling of 80.
        let err = expand(&plans, 80).unwrap_err();
        assert!(matches!(
            err,
            EngineError::SystemTooLarge { rows: 81, ceiling: 80 }
        ));
        assert_eq!(expand(&plans, 81).unwrap().len(), 81);
    }

    #[test]
    fn empty_plan_list_yields_no_rows() {
        assert_eq!(rows(&[]).count(), 0);
        assert_eq!(expand(&[], 10).unwrap().len(), 0);
    }
}
