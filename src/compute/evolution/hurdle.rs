//! Adaptive hurdle deciding which candidates earn a full evaluation.

use crate::schema::Algorithm;

use super::operators::Evaluator;

/// Percentile of distinct early fitnesses used as the next hurdle.
const HURDLE_PERCENTILE: f64 = 0.75;

/// Outcome of evaluating one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// Fitness stored on the slot.
    pub fitness: f64,
    /// Early-tier fitness, when computed.
    pub early_fitness: Option<f64>,
}

impl Evaluation {
    /// Full evaluation only.
    pub fn full(evaluator: &mut dyn Evaluator, algorithm: &Algorithm) -> Self {
        Self {
            fitness: evaluator.evaluate(algorithm),
            early_fitness: None,
        }
    }
}

/// Holds the current hurdle. Zero means unset.
#[derive(Debug, Clone, Default)]
pub struct HurdleController {
    hurdle: f64,
}

impl HurdleController {
    /// Unset hurdle; every candidate gets the full evaluation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current threshold.
    pub fn value(&self) -> f64 {
        self.hurdle
    }

    /// True once a non-zero threshold is in force.
    pub fn is_set(&self) -> bool {
        self.hurdle != 0.0
    }

    /// Evaluate with gating: full evaluation only when the early fitness
    /// clears the hurdle. Falls back to full-only while the hurdle is unset.
    pub fn evaluate(&self, evaluator: &mut dyn Evaluator, algorithm: &Algorithm) -> Evaluation {
        if !self.is_set() {
            return Evaluation::full(evaluator, algorithm);
        }
        let early = evaluator.early_evaluate(algorithm);
        let fitness = if early > self.hurdle {
            evaluator.evaluate(algorithm)
        } else {
            early
        };
        Evaluation {
            fitness,
            early_fitness: Some(early),
        }
    }

    /// Replace the hurdle from this generation's early fitnesses.
    ///
    /// Leaves the hurdle unchanged when no finite values were observed.
    pub fn recompute<I>(&mut self, early_fitnesses: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        if let Some(hurdle) = percentile_threshold(early_fitnesses) {
            self.hurdle = hurdle;
        }
        self.hurdle
    }
}

/// Value at index `floor(0.75 * count)` of the sorted distinct finite values.
pub fn percentile_threshold<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut distinct: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    distinct.sort_by(|a, b| a.total_cmp(b));
    distinct.dedup();
    if distinct.is_empty() {
        return None;
    }
    let index = (HURDLE_PERCENTILE * distinct.len() as f64).floor() as usize;
    Some(distinct[index.min(distinct.len() - 1)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Early fitness is fixed; full evaluation returns 10x it.
    struct TieredEvaluator {
        early: f64,
        full_calls: u64,
        early_calls: u64,
    }

    impl Evaluator for TieredEvaluator {
        fn evaluate(&mut self, _algorithm: &Algorithm) -> f64 {
            self.full_calls += 1;
            self.early * 10.0
        }

        fn early_evaluate(&mut self, _algorithm: &Algorithm) -> f64 {
            self.early_calls += 1;
            self.early
        }

        fn num_train_steps_completed(&self) -> u64 {
            self.full_calls + self.early_calls
        }
    }

    #[test]
    fn test_percentile_example() {
        assert_eq!(percentile_threshold([1.0, 1.0, 2.0, 3.0, 4.0]), Some(4.0));
        assert_eq!(percentile_threshold([5.0]), Some(5.0));
        assert_eq!(percentile_threshold([3.0, 1.0]), Some(3.0));
    }

    #[test]
    fn test_empty_or_non_finite_leaves_hurdle() {
        let mut controller = HurdleController::new();
        controller.recompute([2.0, 1.0]);
        assert_eq!(controller.value(), 2.0);
        controller.recompute([]);
        assert_eq!(controller.value(), 2.0);
        controller.recompute([f64::NAN, f64::INFINITY]);
        assert_eq!(controller.value(), 2.0);
    }

    #[test]
    fn test_percentile_ignores_nan() {
        assert_eq!(
            percentile_threshold([f64::NAN, 1.0, 2.0, 3.0, 4.0, f64::NAN]),
            Some(4.0)
        );
    }

    #[test]
    fn test_unset_hurdle_uses_full_only() {
        let controller = HurdleController::new();
        let mut evaluator = TieredEvaluator {
            early: 0.5,
            full_calls: 0,
            early_calls: 0,
        };
        let result = controller.evaluate(&mut evaluator, &Algorithm::default());
        assert_eq!(result.fitness, 5.0);
        assert_eq!(result.early_fitness, None);
        assert_eq!((evaluator.full_calls, evaluator.early_calls), (1, 0));
    }

    #[test]
    fn test_gating() {
        let mut controller = HurdleController::new();
        controller.recompute([0.5]);

        let mut below = TieredEvaluator {
            early: 0.5,
            full_calls: 0,
            early_calls: 0,
        };
        let result = controller.evaluate(&mut below, &Algorithm::default());
        assert_eq!(result.fitness, 0.5);
        assert_eq!(result.early_fitness, Some(0.5));
        assert_eq!(below.full_calls, 0);

        let mut above = TieredEvaluator {
            early: 0.6,
            full_calls: 0,
            early_calls: 0,
        };
        let result = controller.evaluate(&mut above, &Algorithm::default());
        assert_eq!(result.fitness, 6.0);
        assert_eq!(result.early_fitness, Some(0.6));
        assert_eq!(above.num_train_steps_completed(), 2);
    }

    proptest! {
        #[test]
        fn prop_hurdle_is_an_observed_value(values in prop::collection::vec(-100i32..100, 1..50)) {
            let values: Vec<f64> = values.into_iter().map(f64::from).collect();
            let hurdle = percentile_threshold(values.iter().copied()).unwrap();
            prop_assert!(values.contains(&hurdle));
            let mut distinct = values.clone();
            distinct.sort_by(|a, b| a.total_cmp(b));
            distinct.dedup();
            let below = distinct.iter().filter(|&&v| v < hurdle).count();
            prop_assert_eq!(below, (0.75 * distinct.len() as f64).floor() as usize);
        }
    }
}
