//! Pure grade computation.
//!
//! Both functions are total and keep no state, so calling them again with
//! the same inputs always gives the same answer. Callers must feed them raw
//! inputs, never a previously derived average.

use serde::{Deserialize, Serialize};

use crate::policy::{CalculationMethod, GradingPolicy, RecoveryRule, RecoveryType};

/// Denominator used when both component weights are zero.
const FALLBACK_WEIGHT_TOTAL: f64 = 100.0;

/// Period average of the two component scores.
///
/// Returns `None` while either component is ungraded.
pub fn average(
    component1: Option<f64>,
    component2: Option<f64>,
    policy: &GradingPolicy,
) -> Option<f64> {
    let (c1, c2) = (component1?, component2?);
    let avg = match policy.calculation_method {
        CalculationMethod::Arithmetic => (c1 + c2) / 2.0,
        CalculationMethod::Weighted => {
            let exam = policy.weights.exam;
            let activities = policy.weights.activities;
            let mut total = exam + activities;
            if total == 0.0 {
                total = FALLBACK_WEIGHT_TOTAL;
            }
            (c1 * exam + c2 * activities) / total
        }
    };
    Some(avg)
}

/// Final grade after applying the recovery rule.
///
/// The average passes through untouched when there is no average, when the
/// policy has no recovery, or when no recovery score was entered.
pub fn final_grade(
    average: Option<f64>,
    recovery: Option<f64>,
    policy: &GradingPolicy,
) -> Option<f64> {
    let avg = average?;
    if policy.recovery_type == RecoveryType::None {
        return Some(avg);
    }
    let Some(rec) = recovery else {
        return Some(avg);
    };
    let graded = match policy.recovery_rule {
        RecoveryRule::Average => (avg + rec) / 2.0,
        RecoveryRule::Max => avg.max(rec),
        RecoveryRule::Replace => rec,
    };
    Some(graded)
}

/// `true` iff the grade that counts reaches the passing threshold.
pub fn is_passing(average: Option<f64>, final_grade: Option<f64>, policy: &GradingPolicy) -> bool {
    match final_grade.or(average) {
        Some(grade) => grade >= policy.min_passing_grade,
        None => false,
    }
}

/// Everything derived from one row's raw inputs.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Outcome {
    pub average: Option<f64>,
    pub final_grade: Option<f64>,
    pub passing: bool,
}

impl Outcome {
    /// Derive from raw inputs in one go.
    pub fn derive(
        component1: Option<f64>,
        component2: Option<f64>,
        recovery: Option<f64>,
        policy: &GradingPolicy,
    ) -> Self {
        let average = average(component1, component2, policy);
        let final_grade = final_grade(average, recovery, policy);
        Self {
            average,
            final_grade,
            passing: is_passing(average, final_grade, policy),
        }
    }
}
