//! The persistence API seam.
//!
//! The gradebook never owns data; it reads and upserts through this trait,
//! implemented over REST by `gradebook-api` and in memory for tests.

use async_trait::async_trait;

use crate::model::{
    Allocation, Classroom, Enrollment, GradeFilter, GradeRecord, Student, UpsertGrade, Viewer,
};
use crate::policy::GradingPolicy;

/// Remote system of record for school data.
#[async_trait]
pub trait GradebookApi: Send + Sync {
    /// The signed-in user.
    async fn current_viewer(&self) -> anyhow::Result<Viewer>;

    /// All classrooms of the viewer's school.
    async fn classrooms(&self) -> anyhow::Result<Vec<Classroom>>;

    /// Students enrolled in a classroom, in roster order.
    async fn classroom_students(&self, classroom_id: i64) -> anyhow::Result<Vec<Student>>;

    /// Teacher allocations of a classroom.
    async fn classroom_allocations(&self, classroom_id: i64) -> anyhow::Result<Vec<Allocation>>;

    /// Active enrollments of a student.
    async fn student_enrollments(&self, student_id: i64) -> anyhow::Result<Vec<Enrollment>>;

    /// The school's grading policy, or `None` if none is configured.
    async fn grading_policy(&self) -> anyhow::Result<Option<GradingPolicy>>;

    /// Grade records matching a filter.
    async fn grades(&self, filter: &GradeFilter) -> anyhow::Result<Vec<GradeRecord>>;

    /// Create or replace the record with the same natural key.
    async fn upsert_grade(&self, grade: &UpsertGrade) -> anyhow::Result<GradeRecord>;
}
