//! JSON shapes of the persistence API.
//!
//! Entity payloads mostly deserialize straight into the core model types.
//! The viewer and the grading configuration go through lenient wire structs
//! first, since their server representation is looser than the model.

use serde::{Deserialize, Serialize};

use gradebook_core::error::GradebookError;
use gradebook_core::model::{Role, Viewer};
use gradebook_core::policy::{
    CalculationMethod, GradingPolicy, GradingSystem, RecoveryRule, RecoveryType, Weights,
};

/// A single-object or list envelope: `{"data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Data<T> {
    pub data: T,
}

/// Pagination block of a list response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u32,
}

/// One page of a paginated list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl<T> Page<T> {
    /// Whether another page follows this one. Responses without a
    /// pagination block are a single page.
    pub fn has_next(&self) -> bool {
        self.pagination
            .is_some_and(|p| p.total_pages > 0 && p.page < p.total_pages)
    }
}

/// Error body returned by the server on failures.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// The signed-in user as `/me` reports it: a bare object, not enveloped.
/// `role` and `student_id` are null for users without a school profile.
#[derive(Debug, Clone, Deserialize)]
pub struct WireViewer {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub student_id: Option<i64>,
}

impl TryFrom<WireViewer> for Viewer {
    type Error = GradebookError;

    fn try_from(wire: WireViewer) -> Result<Self, Self::Error> {
        let role = wire.role.unwrap_or_default().parse::<Role>()?;
        Ok(Viewer {
            id: wire.id,
            name: wire.username,
            role,
            student_id: wire.student_id,
        })
    }
}

/// Weight percentages; any key may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireWeights {
    #[serde(default)]
    pub exam: Option<f64>,
    #[serde(default)]
    pub activities: Option<f64>,
    #[serde(default)]
    pub participation: Option<f64>,
}

/// The school's grading configuration as stored server-side.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireGradingConfig {
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub calculation_method: Option<String>,
    #[serde(default)]
    pub weights: Option<WireWeights>,
    /// A decimal string such as `"6.00"`, or a number.
    #[serde(default)]
    pub min_passing_grade: Option<serde_json::Value>,
    #[serde(default)]
    pub recovery_type: Option<String>,
    #[serde(default)]
    pub recovery_rule: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_threshold(value: &serde_json::Value) -> Result<f64, GradebookError> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| GradebookError::InvalidChoice {
            field: "min_passing_grade",
            value: value.to_string(),
        })
}

impl TryFrom<WireGradingConfig> for GradingPolicy {
    type Error = GradebookError;

    /// Missing fields take their defaults. An empty or unrecognised recovery
    /// rule means `replace`. Unknown systems, methods and recovery types are
    /// rejected.
    fn try_from(wire: WireGradingConfig) -> Result<Self, Self::Error> {
        let defaults = GradingPolicy::default();

        let system = match non_blank(&wire.system) {
            Some(s) => s.parse::<GradingSystem>()?,
            None => defaults.system,
        };
        let calculation_method = match non_blank(&wire.calculation_method) {
            Some(s) => s.parse::<CalculationMethod>()?,
            None => defaults.calculation_method,
        };
        let recovery_type = match non_blank(&wire.recovery_type) {
            Some(s) => s.parse::<RecoveryType>()?,
            None => defaults.recovery_type,
        };
        let recovery_rule = non_blank(&wire.recovery_rule)
            .and_then(|s| s.parse::<RecoveryRule>().ok())
            .unwrap_or(defaults.recovery_rule);
        let min_passing_grade = match &wire.min_passing_grade {
            Some(serde_json::Value::Null) | None => defaults.min_passing_grade,
            Some(value) => parse_threshold(value)?,
        };

        let w = wire.weights.unwrap_or_default();
        let weights = Weights {
            exam: w.exam.unwrap_or(defaults.weights.exam),
            activities: w.activities.unwrap_or(defaults.weights.activities),
            participation: w.participation.unwrap_or(defaults.weights.participation),
        };

        Ok(GradingPolicy {
            system,
            calculation_method,
            weights,
            min_passing_grade,
            recovery_type,
            recovery_rule,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_policy(json: serde_json::Value) -> Result<GradingPolicy, GradebookError> {
        let wire: WireGradingConfig = serde_json::from_value(json).unwrap();
        GradingPolicy::try_from(wire)
    }

    #[test]
    fn server_config_with_string_threshold() {
        let policy = parse_policy(serde_json::json!({
            "school_id": 1,
            "system": "trimestral",
            "calculation_method": "weighted",
            "min_passing_grade": "5.50",
            "weights": {"exam": 60, "activities": 40},
            "recovery_rule": "max",
            "updated_at": "2026-02-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(policy.system, GradingSystem::Trimestral);
        assert_eq!(policy.calculation_method, CalculationMethod::Weighted);
        assert_eq!(policy.min_passing_grade, 5.5);
        assert_eq!(policy.weights.exam, 60.0);
        assert_eq!(policy.weights.activities, 40.0);
        assert_eq!(policy.weights.participation, 0.0);
        assert_eq!(policy.recovery_type, RecoveryType::Grade);
        assert_eq!(policy.recovery_rule, RecoveryRule::Max);
    }

    #[test]
    fn empty_config_is_the_default_policy() {
        let policy = parse_policy(serde_json::json!({})).unwrap();
        assert_eq!(policy, GradingPolicy::default());
    }

    #[test]
    fn blank_or_unknown_recovery_rule_means_replace() {
        for rule in ["", "  ", "lowest"] {
            let policy = parse_policy(serde_json::json!({ "recovery_rule": rule })).unwrap();
            assert_eq!(policy.recovery_rule, RecoveryRule::Replace, "rule {rule:?}");
        }
    }

    #[test]
    fn partial_weights_fill_in_defaults() {
        let policy = parse_policy(serde_json::json!({ "weights": {"exam": 70} })).unwrap();
        assert_eq!(policy.weights.exam, 70.0);
        assert_eq!(policy.weights.activities, 50.0);
    }

    #[test]
    fn numeric_threshold_is_accepted() {
        let policy = parse_policy(serde_json::json!({ "min_passing_grade": 7 })).unwrap();
        assert_eq!(policy.min_passing_grade, 7.0);
    }

    #[test]
    fn unknown_system_is_rejected() {
        let err = parse_policy(serde_json::json!({ "system": "semestral" })).unwrap_err();
        assert_eq!(
            err,
            GradebookError::InvalidChoice {
                field: "system",
                value: "semestral".into()
            }
        );
    }

    #[test]
    fn garbage_threshold_is_rejected() {
        let err = parse_policy(serde_json::json!({ "min_passing_grade": "six" })).unwrap_err();
        assert!(matches!(
            err,
            GradebookError::InvalidChoice {
                field: "min_passing_grade",
                ..
            }
        ));
    }

    #[test]
    fn viewer_roles_map_onto_gates() {
        let wire: WireViewer = serde_json::from_value(serde_json::json!({
            "id": 3, "username": "clara", "email": "clara@escola.br",
            "role": "coordinator", "student_id": null,
            "school": {"id": 1, "name": "Escola Modelo"}
        }))
        .unwrap();
        let viewer = Viewer::try_from(wire).unwrap();
        assert_eq!(viewer.name, "clara");
        assert_eq!(viewer.role, Role::Admin);
        assert_eq!(viewer.student_id, None);

        let wire: WireViewer = serde_json::from_value(serde_json::json!({
            "id": 4, "username": "caixa", "role": "finance"
        }))
        .unwrap();
        assert!(matches!(
            Viewer::try_from(wire),
            Err(GradebookError::UnknownRole(r)) if r == "finance"
        ));
    }

    #[test]
    fn viewer_without_profile_has_no_role() {
        let wire: WireViewer = serde_json::from_value(serde_json::json!({
            "id": 9, "username": "root", "email": "", "role": null,
            "student_id": null, "school": null
        }))
        .unwrap();
        assert!(matches!(
            Viewer::try_from(wire),
            Err(GradebookError::UnknownRole(r)) if r.is_empty()
        ));
    }

    #[test]
    fn page_without_pagination_is_single() {
        let page: Page<i64> = serde_json::from_value(serde_json::json!({ "data": [1, 2] })).unwrap();
        assert!(!page.has_next());

        let page: Page<i64> = serde_json::from_value(serde_json::json!({
            "data": [1],
            "pagination": {"page": 1, "page_size": 1, "total": 2, "total_pages": 2}
        }))
        .unwrap();
        assert!(page.has_next());
    }
}
