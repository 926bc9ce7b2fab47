//! In-memory persistence API for testing sessions without a server.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use gradebook_core::compute::Outcome;
use gradebook_core::model::{
    Allocation, Classroom, Enrollment, GradeFilter, GradeRecord, Student, UpsertGrade, Viewer,
};
use gradebook_core::policy::GradingPolicy;
use gradebook_core::traits::GradebookApi;

use crate::error::ApiError;

/// A fake school server.
///
/// Behaves like the real API closely enough for session tests: grade
/// queries match subjects by substring, upserts replace by natural key, and
/// list endpoints honor the same filters. Failures can be injected per
/// endpoint and grade responses for a classroom can be held back until
/// released.
pub struct MockApi {
    viewer: Viewer,
    classrooms: Vec<Classroom>,
    students: HashMap<i64, Vec<Student>>,
    allocations: HashMap<i64, Vec<Allocation>>,
    enrollments: Vec<Enrollment>,
    policy: Option<GradingPolicy>,
    grades: Mutex<Vec<GradeRecord>>,
    next_id: AtomicI64,

    fail_policy: AtomicBool,
    fail_students: AtomicBool,
    fail_grades: AtomicBool,
    fail_upserts_for: Mutex<HashSet<i64>>,
    paused_grades: Mutex<HashMap<i64, Arc<Notify>>>,

    student_calls: AtomicU32,
    allocation_calls: AtomicU32,
    grade_calls: AtomicU32,
    upsert_calls: AtomicU32,
    last_filter: Mutex<Option<GradeFilter>>,
}

impl MockApi {
    pub fn new(viewer: Viewer) -> Self {
        Self {
            viewer,
            classrooms: Vec::new(),
            students: HashMap::new(),
            allocations: HashMap::new(),
            enrollments: Vec::new(),
            policy: None,
            grades: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1000),
            fail_policy: AtomicBool::new(false),
            fail_students: AtomicBool::new(false),
            fail_grades: AtomicBool::new(false),
            fail_upserts_for: Mutex::new(HashSet::new()),
            paused_grades: Mutex::new(HashMap::new()),
            student_calls: AtomicU32::new(0),
            allocation_calls: AtomicU32::new(0),
            grade_calls: AtomicU32::new(0),
            upsert_calls: AtomicU32::new(0),
            last_filter: Mutex::new(None),
        }
    }

    /// Add a classroom with its students (in roster order) and allocations.
    pub fn with_classroom(
        mut self,
        classroom: Classroom,
        students: Vec<Student>,
        allocations: Vec<Allocation>,
    ) -> Self {
        self.students.insert(classroom.id, students);
        self.allocations.insert(classroom.id, allocations);
        self.classrooms.push(classroom);
        self
    }

    pub fn with_policy(mut self, policy: GradingPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_enrollment(mut self, enrollment: Enrollment) -> Self {
        self.enrollments.push(enrollment);
        self
    }

    pub fn with_grades(self, records: Vec<GradeRecord>) -> Self {
        if let Some(max) = records.iter().map(|r| r.id).max() {
            self.next_id.fetch_max(max + 1, Ordering::Relaxed);
        }
        *self.grades.lock().unwrap() = records;
        self
    }

    pub fn fail_policy(&self, fail: bool) {
        self.fail_policy.store(fail, Ordering::Relaxed);
    }

    pub fn fail_students(&self, fail: bool) {
        self.fail_students.store(fail, Ordering::Relaxed);
    }

    pub fn fail_grades(&self, fail: bool) {
        self.fail_grades.store(fail, Ordering::Relaxed);
    }

    /// Make upserts for these students fail.
    pub fn fail_upserts_for(&self, student_ids: &[i64]) {
        self.fail_upserts_for
            .lock()
            .unwrap()
            .extend(student_ids.iter().copied());
    }

    /// Hold grade responses for a classroom until the returned handle is
    /// notified.
    pub fn pause_grades(&self, classroom_id: i64) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.paused_grades
            .lock()
            .unwrap()
            .insert(classroom_id, Arc::clone(&notify));
        notify
    }

    pub fn student_calls(&self) -> u32 {
        self.student_calls.load(Ordering::Relaxed)
    }

    pub fn allocation_calls(&self) -> u32 {
        self.allocation_calls.load(Ordering::Relaxed)
    }

    pub fn grade_calls(&self) -> u32 {
        self.grade_calls.load(Ordering::Relaxed)
    }

    pub fn upsert_calls(&self) -> u32 {
        self.upsert_calls.load(Ordering::Relaxed)
    }

    /// The filter of the most recent grade query.
    pub fn last_filter(&self) -> Option<GradeFilter> {
        self.last_filter.lock().unwrap().clone()
    }

    /// Snapshot of every stored grade record.
    pub fn stored_grades(&self) -> Vec<GradeRecord> {
        self.grades.lock().unwrap().clone()
    }

    fn matches(filter: &GradeFilter, record: &GradeRecord) -> bool {
        filter.classroom_id.map_or(true, |id| record.classroom_id == id)
            && filter.student_id.map_or(true, |id| record.student_id == id)
            && filter.term.map_or(true, |t| record.term == t.to_string())
            && filter.subject.as_ref().map_or(true, |s| {
                record.subject.to_lowercase().contains(&s.to_lowercase())
            })
    }
}

#[async_trait]
impl GradebookApi for MockApi {
    async fn current_viewer(&self) -> anyhow::Result<Viewer> {
        Ok(self.viewer.clone())
    }

    async fn classrooms(&self) -> anyhow::Result<Vec<Classroom>> {
        Ok(self.classrooms.clone())
    }

    async fn classroom_students(&self, classroom_id: i64) -> anyhow::Result<Vec<Student>> {
        self.student_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_students.load(Ordering::Relaxed) {
            return Err(ApiError::Network("connection reset".into()).into());
        }
        self.students
            .get(&classroom_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("/classrooms/{classroom_id}/students")).into())
    }

    async fn classroom_allocations(&self, classroom_id: i64) -> anyhow::Result<Vec<Allocation>> {
        self.allocation_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .allocations
            .get(&classroom_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn student_enrollments(&self, student_id: i64) -> anyhow::Result<Vec<Enrollment>> {
        Ok(self
            .enrollments
            .iter()
            .filter(|e| e.student_id == student_id && e.status == "active")
            .cloned()
            .collect())
    }

    async fn grading_policy(&self) -> anyhow::Result<Option<GradingPolicy>> {
        if self.fail_policy.load(Ordering::Relaxed) {
            return Err(ApiError::Status {
                status: 500,
                message: "internal error".into(),
            }
            .into());
        }
        Ok(self.policy)
    }

    async fn grades(&self, filter: &GradeFilter) -> anyhow::Result<Vec<GradeRecord>> {
        self.grade_calls.fetch_add(1, Ordering::Relaxed);
        *self.last_filter.lock().unwrap() = Some(filter.clone());

        let paused = filter
            .classroom_id
            .and_then(|id| self.paused_grades.lock().unwrap().get(&id).cloned());
        if let Some(notify) = paused {
            notify.notified().await;
        }

        if self.fail_grades.load(Ordering::Relaxed) {
            return Err(ApiError::Timeout(30).into());
        }
        Ok(self
            .grades
            .lock()
            .unwrap()
            .iter()
            .filter(|r| Self::matches(filter, r))
            .cloned()
            .collect())
    }

    async fn upsert_grade(&self, grade: &UpsertGrade) -> anyhow::Result<GradeRecord> {
        self.upsert_calls.fetch_add(1, Ordering::Relaxed);
        if self
            .fail_upserts_for
            .lock()
            .unwrap()
            .contains(&grade.student_id)
        {
            return Err(ApiError::Status {
                status: 400,
                message: "grade1 must be a number".into(),
            }
            .into());
        }

        let policy = self.policy.unwrap_or_default();
        let outcome = Outcome::derive(grade.grade1, grade.grade2, grade.recovery_grade, &policy);

        let mut grades = self.grades.lock().unwrap();
        let existing = grades.iter().position(|r| {
            r.student_id == grade.student_id
                && r.classroom_id == grade.classroom_id
                && r.subject == grade.subject
                && r.term == grade.term
        });
        let index = match existing {
            Some(index) => index,
            None => {
                grades.push(GradeRecord {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed),
                    student_id: grade.student_id,
                    classroom_id: grade.classroom_id,
                    subject: grade.subject.clone(),
                    term: grade.term.clone(),
                    date: None,
                    grade1: None,
                    grade2: None,
                    recovery_grade: None,
                    average: None,
                    final_grade: None,
                });
                grades.len() - 1
            }
        };
        let record = &mut grades[index];
        record.date = Some(grade.date);
        record.grade1 = grade.grade1;
        record.grade2 = grade.grade2;
        record.recovery_grade = grade.recovery_grade;
        record.average = outcome.average;
        record.final_grade = outcome.final_grade;
        Ok(record.clone())
    }
}
