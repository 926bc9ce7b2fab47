//! Async orchestration between the store and the persistence API.
//!
//! The store stays synchronous; this module owns the suspension points.
//! Load failures are logged and leave the store as it was. Saves fan out one
//! upsert per row and report failures only as a count.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures::future::join_all;
use tracing::instrument;

use crate::error::GradebookError;
use crate::model::{Allocation, Classroom, GradeFilter, GradeKey, Role, Viewer};
use crate::store::{Action, GradebookStore, LoadRequest, LoadStatus, RosterData, Transition};
use crate::traits::GradebookApi;
use crate::visibility::VisibilityGate;

/// Summary of a completed save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: usize,
    /// Drafts that now have a server id.
    pub promoted: usize,
}

/// A viewer's gradebook screen bound to a persistence API.
pub struct GradebookSession<A: ?Sized + GradebookApi> {
    api: Arc<A>,
    store: GradebookStore,
}

impl<A: ?Sized + GradebookApi> GradebookSession<A> {
    pub fn new(api: Arc<A>, today: NaiveDate) -> Self {
        Self {
            api,
            store: GradebookStore::new(today),
        }
    }

    pub fn store(&self) -> &GradebookStore {
        &self.store
    }

    pub fn dispatch(&mut self, action: Action) -> Transition {
        self.store.dispatch(action)
    }

    /// Load viewer, policy, classrooms and allocations, and install the gate.
    #[instrument(skip(self))]
    pub async fn bootstrap(&mut self) -> Result<()> {
        let viewer = self
            .api
            .current_viewer()
            .await
            .context("failed to load current viewer")?;

        self.refresh_policy().await;

        let classrooms = self
            .api
            .classrooms()
            .await
            .context("failed to load classrooms")?;

        let enrolled = match (viewer.role, viewer.student_id) {
            (Role::Student, Some(student_id)) => self.enrolled_classrooms(student_id).await,
            _ => Vec::new(),
        };

        let allocations = self.allocations_for(&viewer, &classrooms, &enrolled).await;

        tracing::info!(
            role = %viewer.role,
            classrooms = classrooms.len(),
            allocations = allocations.len(),
            "gradebook access loaded"
        );
        self.store.dispatch(Action::AccessLoaded(VisibilityGate::new(
            viewer,
            classrooms,
            allocations,
            enrolled,
        )));
        Ok(())
    }

    /// Fetch the policy and install it; absence or failure falls back to the
    /// default policy.
    pub async fn refresh_policy(&mut self) -> Transition {
        let policy = match self.api.grading_policy().await {
            Ok(Some(policy)) => policy,
            Ok(None) => {
                tracing::info!("no grading policy configured, using defaults");
                Default::default()
            }
            Err(e) => {
                tracing::warn!("failed to load grading policy, using defaults: {e:#}");
                Default::default()
            }
        };
        self.store.dispatch(Action::PolicyLoaded(policy))
    }

    async fn enrolled_classrooms(&self, student_id: i64) -> Vec<i64> {
        match self.api.student_enrollments(student_id).await {
            Ok(enrollments) => enrollments
                .into_iter()
                .filter(|e| e.status.is_empty() || e.status == "active")
                .map(|e| e.classroom_id)
                .collect(),
            Err(e) => {
                tracing::warn!(student_id, "failed to load enrollments: {e:#}");
                Vec::new()
            }
        }
    }

    /// Allocations of every classroom the viewer could possibly select,
    /// fetched concurrently. A classroom whose allocations fail to load is
    /// skipped.
    async fn allocations_for(
        &self,
        viewer: &Viewer,
        classrooms: &[Classroom],
        enrolled: &[i64],
    ) -> Vec<Allocation> {
        let ids: Vec<i64> = classrooms
            .iter()
            .map(|c| c.id)
            .filter(|id| viewer.role != Role::Student || enrolled.contains(id))
            .collect();

        let results = join_all(
            ids.iter()
                .map(|&id| async move { (id, self.api.classroom_allocations(id).await) }),
        )
        .await;

        let mut allocations = Vec::new();
        for (classroom_id, result) in results {
            match result {
                Ok(list) => allocations.extend(list),
                Err(e) => {
                    tracing::warn!(classroom_id, "failed to load allocations: {e:#}");
                }
            }
        }
        allocations
    }

    /// Load the roster for the current selection.
    ///
    /// On failure the previous roster stays in place and the error is
    /// returned after being logged.
    #[instrument(skip(self))]
    pub async fn load_roster(&mut self) -> Result<LoadStatus> {
        let request = self
            .store
            .begin_load()
            .ok_or(GradebookError::IncompleteSelection)?;

        match fetch_roster(self.api.as_ref(), &request).await {
            Ok(data) => {
                let status = self.store.apply_load(&request, data);
                if status == LoadStatus::Applied {
                    tracing::info!(
                        classroom_id = request.scope.classroom_id,
                        subject = %request.scope.subject,
                        term = request.scope.term,
                        "roster loaded"
                    );
                }
                Ok(status)
            }
            Err(e) => {
                tracing::warn!("roster load failed: {e:#}");
                Err(e)
            }
        }
    }

    /// Upsert every row of the current roster.
    ///
    /// All upserts run concurrently and are awaited together. Rows that
    /// succeed stay saved even if others fail; local edits are never
    /// reverted.
    #[instrument(skip(self))]
    pub async fn save(&mut self, date: NaiveDate) -> Result<SaveReport> {
        let batch = self.store.prepare_save(date)?;
        let total = batch.upserts.len();

        let results = join_all(batch.upserts.iter().map(|u| self.api.upsert_grade(u))).await;

        let mut saved = 0usize;
        let mut promoted = 0usize;
        for (upsert, result) in batch.upserts.iter().zip(results) {
            match result {
                Ok(record) => {
                    saved += 1;
                    let Ok(term) = upsert.term.parse::<u8>() else {
                        continue;
                    };
                    let key = GradeKey {
                        student_id: upsert.student_id,
                        classroom_id: upsert.classroom_id,
                        subject: upsert.subject.clone(),
                        term,
                    };
                    let was_draft = self
                        .store
                        .roster()
                        .and_then(|r| r.get(upsert.student_id))
                        .is_some_and(|row| row.is_draft());
                    if self.store.mark_saved(&key, record.id) && was_draft {
                        promoted += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(student_id = upsert.student_id, "grade upsert failed: {e:#}");
                }
            }
        }

        let failed = total - saved;
        if failed > 0 {
            return Err(GradebookError::SaveFailed { failed, total }.into());
        }
        tracing::info!(saved, promoted, "grades saved");
        Ok(SaveReport { saved, promoted })
    }
}

/// Fetch everything one roster load needs. Students and grades are fetched
/// concurrently.
pub async fn fetch_roster<A: ?Sized + GradebookApi>(
    api: &A,
    request: &LoadRequest,
) -> Result<RosterData> {
    let scope = &request.scope;
    let filter = GradeFilter {
        classroom_id: Some(scope.classroom_id),
        subject: Some(scope.subject.clone()),
        term: Some(scope.term),
        student_id: request.student_id,
    };

    let students = async {
        if request.fetch_students {
            api.classroom_students(scope.classroom_id)
                .await
                .map(Some)
                .context("failed to load classroom students")
        } else {
            Ok(None)
        }
    };
    let records = async {
        api.grades(&filter)
            .await
            .context("failed to load grade records")
    };

    let (students, records) = futures::try_join!(students, records)?;
    Ok(RosterData { students, records })
}
