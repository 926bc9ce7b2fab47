//! Core data model types for the gradebook.
//!
//! School entities as the persistence API returns them, plus the grade row
//! the engine works on.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::compute::Outcome;
use crate::error::GradebookError;
use crate::policy::GradingPolicy;
use crate::score::{ScoreEntry, ScoreField};

/// A classroom (turma).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classroom {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub year: Option<i32>,
}

/// A student enrolled in a classroom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl Student {
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        name.trim().to_string()
    }
}

/// A (teacher, classroom, subject) assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Allocation {
    pub id: i64,
    pub classroom_id: i64,
    pub teacher_id: i64,
    pub subject: String,
}

/// A student's enrollment in a classroom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub classroom_id: i64,
    #[serde(default)]
    pub status: String,
}

/// What a viewer may see and do in the grades screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Teacher => write!(f, "teacher"),
            Role::Student => write!(f, "student"),
        }
    }
}

impl FromStr for Role {
    type Err = GradebookError;

    /// Parses the staff roles used by the school API. Directors and
    /// coordinators manage grades like administrators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" | "director" | "coordinator" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            other => Err(GradebookError::UnknownRole(other.to_string())),
        }
    }
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewer {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub role: Role,
    /// Linked student record, for student viewers.
    #[serde(default)]
    pub student_id: Option<i64>,
}

/// A grade record as persisted by the server.
///
/// `average` and `final_grade` are what the server last computed; the
/// engine never reads them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub id: i64,
    pub student_id: i64,
    pub classroom_id: i64,
    pub subject: String,
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub grade1: Option<f64>,
    #[serde(default)]
    pub grade2: Option<f64>,
    #[serde(default)]
    pub recovery_grade: Option<f64>,
    #[serde(default)]
    pub average: Option<f64>,
    #[serde(default)]
    pub final_grade: Option<f64>,
}

impl GradeRecord {
    /// Parsed period number, if the record carries one.
    pub fn term_number(&self) -> Option<u8> {
        self.term.trim().parse::<u8>().ok().filter(|t| *t > 0)
    }
}

/// Natural key of a grade row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GradeKey {
    pub student_id: i64,
    pub classroom_id: i64,
    pub subject: String,
    pub term: u8,
}

/// Placeholder identifier for a row the server has never seen.
///
/// Always rendered with a `draft-` prefix so it can never be mistaken for
/// a numeric server id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DraftId(String);

impl DraftId {
    pub fn for_student(student_id: i64) -> Self {
        Self(format!("draft-{student_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a row is backed by a server record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOrigin {
    Persisted { server_id: i64 },
    Draft { draft_id: DraftId },
}

/// One student's grades for the selected (classroom, subject, term).
///
/// Raw inputs change only through [`GradeRow::set_score`]; the derived
/// outcome is recomputed from them on every change and cannot be set.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeRow {
    origin: RowOrigin,
    key: GradeKey,
    student_name: String,
    component1: Option<f64>,
    component2: Option<f64>,
    recovery: Option<f64>,
    outcome: Outcome,
}

impl GradeRow {
    /// A row for a student with no grade record yet.
    pub fn draft(key: GradeKey, student_name: impl Into<String>) -> Self {
        Self {
            origin: RowOrigin::Draft {
                draft_id: DraftId::for_student(key.student_id),
            },
            key,
            student_name: student_name.into(),
            component1: None,
            component2: None,
            recovery: None,
            outcome: Outcome::default(),
        }
    }

    /// A row backed by a persisted record, derived under `policy`.
    pub fn persisted(
        server_id: i64,
        key: GradeKey,
        student_name: impl Into<String>,
        component1: Option<f64>,
        component2: Option<f64>,
        recovery: Option<f64>,
        policy: &GradingPolicy,
    ) -> Self {
        let mut row = Self {
            origin: RowOrigin::Persisted { server_id },
            key,
            student_name: student_name.into(),
            component1,
            component2,
            recovery,
            outcome: Outcome::default(),
        };
        row.recompute(policy);
        row
    }

    pub fn origin(&self) -> &RowOrigin {
        &self.origin
    }

    pub fn key(&self) -> &GradeKey {
        &self.key
    }

    pub fn student_id(&self) -> i64 {
        self.key.student_id
    }

    pub fn student_name(&self) -> &str {
        &self.student_name
    }

    pub fn server_id(&self) -> Option<i64> {
        match &self.origin {
            RowOrigin::Persisted { server_id } => Some(*server_id),
            RowOrigin::Draft { .. } => None,
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self.origin, RowOrigin::Draft { .. })
    }

    /// Identifier for display and UI keys: the server id, or the draft id.
    pub fn display_id(&self) -> String {
        match &self.origin {
            RowOrigin::Persisted { server_id } => server_id.to_string(),
            RowOrigin::Draft { draft_id } => draft_id.to_string(),
        }
    }

    pub fn component1(&self) -> Option<f64> {
        self.component1
    }

    pub fn component2(&self) -> Option<f64> {
        self.component2
    }

    pub fn recovery(&self) -> Option<f64> {
        self.recovery
    }

    pub fn score(&self, field: ScoreField) -> Option<f64> {
        match field {
            ScoreField::Component1 => self.component1,
            ScoreField::Component2 => self.component2,
            ScoreField::Recovery => self.recovery,
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn average(&self) -> Option<f64> {
        self.outcome.average
    }

    pub fn final_grade(&self) -> Option<f64> {
        self.outcome.final_grade
    }

    pub fn is_passing(&self) -> bool {
        self.outcome.passing
    }

    /// Apply one edit and re-derive.
    pub fn set_score(&mut self, field: ScoreField, entry: ScoreEntry, policy: &GradingPolicy) {
        let slot = match field {
            ScoreField::Component1 => &mut self.component1,
            ScoreField::Component2 => &mut self.component2,
            ScoreField::Recovery => &mut self.recovery,
        };
        *slot = entry.apply(*slot);
        self.recompute(policy);
    }

    /// Re-derive the outcome from raw inputs only.
    pub fn recompute(&mut self, policy: &GradingPolicy) {
        self.outcome = Outcome::derive(self.component1, self.component2, self.recovery, policy);
    }

    /// Record that the server now holds this row under `server_id`.
    pub fn mark_persisted(&mut self, server_id: i64) {
        self.origin = RowOrigin::Persisted { server_id };
    }

    /// Upsert payload carrying only raw inputs and the natural key.
    pub fn to_upsert(&self, date: NaiveDate) -> UpsertGrade {
        UpsertGrade {
            student_id: self.key.student_id,
            classroom_id: self.key.classroom_id,
            subject: self.key.subject.clone(),
            grade1: self.component1,
            grade2: self.component2,
            recovery_grade: self.recovery,
            term: self.key.term.to_string(),
            date,
        }
    }
}

/// Query filter for fetching grade records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradeFilter {
    pub classroom_id: Option<i64>,
    pub subject: Option<String>,
    pub term: Option<u8>,
    pub student_id: Option<i64>,
}

/// Body of a grade upsert, keyed by (student, classroom, subject, term).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertGrade {
    pub student_id: i64,
    pub classroom_id: i64,
    pub subject: String,
    pub grade1: Option<f64>,
    pub grade2: Option<f64>,
    pub recovery_grade: Option<f64>,
    pub term: String,
    pub date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{RecoveryRule, RecoveryType};

    fn key(student_id: i64) -> GradeKey {
        GradeKey {
            student_id,
            classroom_id: 1,
            subject: "Matemática".into(),
            term: 2,
        }
    }

    #[test]
    fn role_parse_maps_management_roles_to_admin() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("Director".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("coordinator".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("teacher".parse::<Role>().unwrap(), Role::Teacher);
        assert_eq!("student".parse::<Role>().unwrap(), Role::Student);
        assert_eq!(
            "finance".parse::<Role>(),
            Err(GradebookError::UnknownRole("finance".into()))
        );
    }

    #[test]
    fn draft_ids_are_not_numeric() {
        let row = GradeRow::draft(key(42), "Ana");
        assert_eq!(row.display_id(), "draft-42");
        assert!(row.display_id().parse::<i64>().is_err());
        assert_eq!(row.server_id(), None);
        assert_eq!(row.average(), None);
        assert!(!row.is_passing());
    }

    #[test]
    fn set_score_rederives_from_raw_inputs() {
        let policy = GradingPolicy {
            recovery_type: RecoveryType::Grade,
            recovery_rule: RecoveryRule::Max,
            ..Default::default()
        };
        let mut row = GradeRow::draft(key(1), "Ana");
        row.set_score(ScoreField::Component1, ScoreEntry::Value(4.0), &policy);
        assert_eq!(row.average(), None);
        row.set_score(ScoreField::Component2, ScoreEntry::Value(6.0), &policy);
        assert_eq!(row.average(), Some(5.0));
        assert!(!row.is_passing());
        row.set_score(ScoreField::Recovery, ScoreEntry::Value(8.0), &policy);
        assert_eq!(row.final_grade(), Some(8.0));
        assert!(row.is_passing());
        row.set_score(ScoreField::Component2, ScoreEntry::Unset, &policy);
        assert_eq!(row.average(), None);
        assert_eq!(row.final_grade(), None);
    }

    #[test]
    fn upsert_carries_only_raw_inputs() {
        let policy = GradingPolicy::default();
        let row = GradeRow::persisted(9, key(3), "Bruno", Some(6.0), Some(8.0), None, &policy);
        let date = NaiveDate::from_ymd_opt(2026, 5, 4).unwrap();
        let body = serde_json::to_value(row.to_upsert(date)).unwrap();
        assert_eq!(body["student_id"], 3);
        assert_eq!(body["grade1"], 6.0);
        assert_eq!(body["recovery_grade"], serde_json::Value::Null);
        assert_eq!(body["term"], "2");
        assert_eq!(body["date"], "2026-05-04");
        assert!(body.get("average").is_none());
        assert!(body.get("final_grade").is_none());
        assert!(body.get("id").is_none());
    }

    #[test]
    fn record_term_number() {
        let mut rec: GradeRecord = serde_json::from_value(serde_json::json!({
            "id": 1, "student_id": 2, "classroom_id": 3, "subject": "Artes", "term": "3"
        }))
        .unwrap();
        assert_eq!(rec.term_number(), Some(3));
        rec.term = String::new();
        assert_eq!(rec.term_number(), None);
        rec.term = "0".into();
        assert_eq!(rec.term_number(), None);
    }

    #[test]
    fn student_display_name_trims() {
        let s = Student {
            id: 1,
            first_name: "Carla".into(),
            last_name: String::new(),
        };
        assert_eq!(s.display_name(), "Carla");
    }
}
