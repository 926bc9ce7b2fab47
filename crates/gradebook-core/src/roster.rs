//! Roster reconciliation.
//!
//! Merges a classroom's enrolled students with whatever grade records the
//! server holds for a (classroom, subject, term), producing exactly one row
//! per enrolled student in enrollment order. Reconciliation never fails;
//! missing data shrinks the roster instead.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{GradeKey, GradeRecord, GradeRow, Student, UpsertGrade};
use crate::policy::GradingPolicy;
use crate::score::{ScoreEntry, ScoreField};

/// The (classroom, subject, term) a roster is built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RosterScope {
    pub classroom_id: i64,
    pub subject: String,
    pub term: u8,
}

impl RosterScope {
    fn key_for(&self, student_id: i64) -> GradeKey {
        GradeKey {
            student_id,
            classroom_id: self.classroom_id,
            subject: self.subject.clone(),
            term: self.term,
        }
    }

    /// Whether a record belongs to this scope. A record without a term is
    /// placed by its date under `policy`; one with neither is dropped.
    fn matches(&self, record: &GradeRecord, policy: &GradingPolicy) -> bool {
        let term = record
            .term_number()
            .or_else(|| record.date.map(|d| policy.term_for_date(d)));
        record.classroom_id == self.classroom_id
            && record.subject == self.subject
            && term == Some(self.term)
    }
}

/// How much of the classroom's enrollment the viewer was given.
#[derive(Debug, Clone, Copy)]
pub enum EnrollmentView<'a> {
    /// The full student list, in roster order.
    Full(&'a [Student]),
    /// Only the viewer's own student record is visible.
    SelfOnly { student_id: i64, name: &'a str },
    /// Nothing could be loaded.
    Unavailable,
}

/// Ordered grade rows, one per enrolled student.
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    scope: RosterScope,
    rows: Vec<GradeRow>,
}

impl Roster {
    pub fn empty(scope: RosterScope) -> Self {
        Self {
            scope,
            rows: Vec::new(),
        }
    }

    pub fn scope(&self) -> &RosterScope {
        &self.scope
    }

    pub fn rows(&self) -> &[GradeRow] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &GradeRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, student_id: i64) -> Option<&GradeRow> {
        self.rows.iter().find(|r| r.student_id() == student_id)
    }

    /// Edit one score of one student's row. Returns `false` if the student
    /// is not on the roster.
    pub fn edit(
        &mut self,
        student_id: i64,
        field: ScoreField,
        entry: ScoreEntry,
        policy: &GradingPolicy,
    ) -> bool {
        match self.rows.iter_mut().find(|r| r.student_id() == student_id) {
            Some(row) => {
                row.set_score(field, entry, policy);
                true
            }
            None => false,
        }
    }

    /// Re-derive every row from its raw inputs.
    pub fn recompute(&mut self, policy: &GradingPolicy) {
        for row in &mut self.rows {
            row.recompute(policy);
        }
    }

    /// Mark the row matching `key` as persisted under `server_id`.
    pub fn mark_persisted(&mut self, key: &GradeKey, server_id: i64) -> bool {
        match self.rows.iter_mut().find(|r| r.key() == key) {
            Some(row) => {
                row.mark_persisted(server_id);
                true
            }
            None => false,
        }
    }

    /// Upsert payloads for every row.
    pub fn to_upserts(&self, date: NaiveDate) -> Vec<UpsertGrade> {
        self.rows.iter().map(|r| r.to_upsert(date)).collect()
    }
}

/// Build the roster for `scope`.
pub fn reconcile(
    scope: RosterScope,
    enrollment: EnrollmentView<'_>,
    records: &[GradeRecord],
    policy: &GradingPolicy,
) -> Roster {
    let mut by_student: HashMap<i64, &GradeRecord> = HashMap::new();
    for record in records.iter().filter(|r| scope.matches(r, policy)) {
        if by_student.contains_key(&record.student_id) {
            tracing::debug!(
                student_id = record.student_id,
                record_id = record.id,
                "duplicate grade record for student, keeping the first"
            );
            continue;
        }
        by_student.insert(record.student_id, record);
    }

    let to_row = |student_id: i64, name: &str, record: Option<&GradeRecord>| match record {
        Some(rec) => GradeRow::persisted(
            rec.id,
            scope.key_for(student_id),
            name,
            rec.grade1,
            rec.grade2,
            rec.recovery_grade,
            policy,
        ),
        None => GradeRow::draft(scope.key_for(student_id), name),
    };

    let rows = match enrollment {
        EnrollmentView::Full(students) => {
            let mut seen = HashSet::new();
            students
                .iter()
                .filter(|s| seen.insert(s.id))
                .map(|s| to_row(s.id, &s.display_name(), by_student.get(&s.id).copied()))
                .collect()
        }
        EnrollmentView::SelfOnly { student_id, name } => by_student
            .get(&student_id)
            .copied()
            .map(|rec| vec![to_row(student_id, name, Some(rec))])
            .unwrap_or_default(),
        EnrollmentView::Unavailable => Vec::new(),
    };

    Roster { scope, rows }
}
