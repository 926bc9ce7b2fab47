//! The gradebook store: one owner for policy, selection, gate and roster.
//!
//! Every mutation goes through [`GradebookStore::dispatch`] or the load/save
//! hooks. Derived grades are only ever produced by the pure functions in
//! [`crate::compute`], from raw inputs.
//!
//! Roster loads are tagged with a [`LoadToken`]. Taking a new token makes
//! every older one stale, so a slow response for a superseded selection is
//! dropped instead of overwriting the current roster.

use chrono::NaiveDate;

use crate::error::GradebookError;
use crate::model::{GradeKey, GradeRecord, Role, Student, UpsertGrade, Viewer};
use crate::policy::GradingPolicy;
use crate::roster::{reconcile, EnrollmentView, Roster, RosterScope};
use crate::score::{ScoreEntry, ScoreField};
use crate::visibility::{Access, Selection, VisibilityGate};

/// Generation number of a roster load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadToken(u64);

/// What the session must fetch for one roster load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub token: LoadToken,
    pub scope: RosterScope,
    /// Restrict the grade fetch to this student (student viewers).
    pub student_id: Option<i64>,
    /// Whether the classroom's student list should be fetched at all.
    pub fetch_students: bool,
}

/// Data returned for a [`LoadRequest`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterData {
    /// `None` when the enrollment list was not available to this viewer.
    pub students: Option<Vec<Student>>,
    pub records: Vec<GradeRecord>,
}

/// Result of handing a response to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Applied,
    /// A newer load was started after this one; the response was dropped.
    Stale,
}

/// Everything needed to save the current roster.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveBatch {
    pub scope: RosterScope,
    pub upserts: Vec<UpsertGrade>,
}

/// User and loader intents.
#[derive(Debug, Clone)]
pub enum Action {
    PolicyLoaded(GradingPolicy),
    AccessLoaded(VisibilityGate),
    SelectClassroom(i64),
    SelectSubject(String),
    SelectTerm(u8),
    EditScore {
        student_id: i64,
        field: ScoreField,
        entry: ScoreEntry,
    },
}

/// What a dispatched action changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transition {
    /// The selection moved; the roster was discarded and must be reloaded.
    pub selection_changed: bool,
    /// A score edit was accepted.
    pub edited: bool,
}

/// A row flattened for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub id: String,
    pub student_id: i64,
    pub student_name: String,
    pub component1: Option<f64>,
    pub component2: Option<f64>,
    pub recovery: Option<f64>,
    pub average: Option<f64>,
    pub final_grade: Option<f64>,
    pub passing: bool,
    pub access: Access,
}

#[derive(Debug, Clone)]
pub struct GradebookStore {
    policy: GradingPolicy,
    gate: Option<VisibilityGate>,
    selection: Selection,
    today: NaiveDate,
    /// The term was picked explicitly and no longer follows `today`.
    term_pinned: bool,
    roster: Option<Roster>,
    generation: u64,
}

impl GradebookStore {
    /// Fresh store under the default policy, with the term that `today`
    /// falls in preselected. Until a term is selected explicitly, loading a
    /// policy re-derives the term from `today` under that policy.
    pub fn new(today: NaiveDate) -> Self {
        let policy = GradingPolicy::default();
        Self {
            selection: Selection::new(policy.term_for_date(today)),
            today,
            term_pinned: false,
            policy,
            gate: None,
            roster: None,
            generation: 0,
        }
    }

    pub fn policy(&self) -> &GradingPolicy {
        &self.policy
    }

    pub fn gate(&self) -> Option<&VisibilityGate> {
        self.gate.as_ref()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn roster(&self) -> Option<&Roster> {
        self.roster.as_ref()
    }

    pub fn can_save(&self) -> bool {
        self.gate.as_ref().is_some_and(|g| g.can_save())
    }

    pub fn dispatch(&mut self, action: Action) -> Transition {
        match action {
            Action::PolicyLoaded(policy) => {
                self.policy = policy;
                let mut proposed = self.selection.clone();
                if !self.term_pinned {
                    proposed.term = self.policy.term_for_date(self.today);
                }
                let changed = self.revalidate(proposed);
                if !changed {
                    if let Some(roster) = &mut self.roster {
                        roster.recompute(&self.policy);
                    }
                }
                Transition {
                    selection_changed: changed,
                    edited: false,
                }
            }
            Action::AccessLoaded(gate) => {
                self.gate = Some(gate);
                self.select(self.selection.clone())
            }
            Action::SelectClassroom(classroom_id) => {
                let mut proposed = self.selection.clone();
                if proposed.classroom_id != Some(classroom_id) {
                    proposed.classroom_id = Some(classroom_id);
                    proposed.subject = None;
                }
                self.select(proposed)
            }
            Action::SelectSubject(subject) => {
                let mut proposed = self.selection.clone();
                proposed.subject = Some(subject);
                self.select(proposed)
            }
            Action::SelectTerm(term) => {
                self.term_pinned = true;
                let mut proposed = self.selection.clone();
                proposed.term = term;
                self.select(proposed)
            }
            Action::EditScore {
                student_id,
                field,
                entry,
            } => Transition {
                selection_changed: false,
                edited: self.edit(student_id, field, entry),
            },
        }
    }

    fn select(&mut self, proposed: Selection) -> Transition {
        Transition {
            selection_changed: self.revalidate(proposed),
            edited: false,
        }
    }

    /// Install `proposed` after passing it through the gate and the policy's
    /// term range. Returns `true` (and drops the roster) if the selection
    /// differs from the current one.
    fn revalidate(&mut self, proposed: Selection) -> bool {
        let mut next = match &self.gate {
            Some(gate) => gate.reconcile_selection(&proposed),
            None => Selection::new(proposed.term),
        };
        next.term = self.policy.clamp_term(next.term);

        if next == self.selection {
            return false;
        }
        tracing::debug!(?next, "selection changed");
        self.selection = next;
        self.roster = None;
        true
    }

    fn edit(&mut self, student_id: i64, field: ScoreField, entry: ScoreEntry) -> bool {
        if !self.gate.as_ref().is_some_and(|g| g.can_edit()) {
            tracing::debug!(student_id, "edit ignored for read-only viewer");
            return false;
        }
        match &mut self.roster {
            Some(roster) => roster.edit(student_id, field, entry, &self.policy),
            None => false,
        }
    }

    /// Start a roster load for the current selection.
    ///
    /// Returns `None` until a gate is installed and both classroom and
    /// subject are selected.
    pub fn begin_load(&mut self) -> Option<LoadRequest> {
        let gate = self.gate.as_ref()?;
        let scope = self.selection.scope()?;
        let viewer = gate.viewer();
        let student_view = viewer.role == Role::Student;
        self.generation += 1;
        Some(LoadRequest {
            token: LoadToken(self.generation),
            scope,
            student_id: if student_view { viewer.student_id } else { None },
            fetch_students: !student_view,
        })
    }

    /// Whether `token` belongs to the most recent load.
    pub fn is_current(&self, token: LoadToken) -> bool {
        token.0 == self.generation
    }

    /// Reconcile a load response into the roster, unless it is stale.
    pub fn apply_load(&mut self, request: &LoadRequest, data: RosterData) -> LoadStatus {
        let superseded = !self.is_current(request.token)
            || self.selection.scope().as_ref() != Some(&request.scope);
        if superseded {
            tracing::debug!(
                token = request.token.0,
                latest = self.generation,
                "dropping stale roster response"
            );
            return LoadStatus::Stale;
        }

        let own: Option<&Viewer> = self
            .gate
            .as_ref()
            .map(|g| g.viewer())
            .filter(|v| v.role == Role::Student);

        let view = match (&data.students, own) {
            (Some(students), _) => EnrollmentView::Full(students),
            (None, Some(Viewer {
                student_id: Some(student_id),
                name,
                ..
            })) => EnrollmentView::SelfOnly {
                student_id: *student_id,
                name,
            },
            (None, _) => EnrollmentView::Unavailable,
        };

        let roster = reconcile(request.scope.clone(), view, &data.records, &self.policy);
        tracing::debug!(rows = roster.len(), "roster reconciled");
        self.roster = Some(roster);
        LoadStatus::Applied
    }

    /// Build the upsert batch for the current roster.
    pub fn prepare_save(&self, date: NaiveDate) -> Result<SaveBatch, GradebookError> {
        if !self.can_save() {
            return Err(GradebookError::SaveNotPermitted);
        }
        let roster = self.roster.as_ref().ok_or(GradebookError::IncompleteSelection)?;
        Ok(SaveBatch {
            scope: roster.scope().clone(),
            upserts: roster.to_upserts(date),
        })
    }

    /// Record a successful upsert. Ignored if the roster has since changed scope.
    pub fn mark_saved(&mut self, key: &GradeKey, server_id: i64) -> bool {
        match &mut self.roster {
            Some(roster) => roster.mark_persisted(key, server_id),
            None => false,
        }
    }

    /// The rows this viewer may see, flattened for rendering.
    pub fn visible_rows(&self) -> Vec<RowView> {
        let (Some(gate), Some(roster)) = (&self.gate, &self.roster) else {
            return Vec::new();
        };
        gate.visible_rows(roster)
            .into_iter()
            .map(|row| RowView {
                id: row.display_id(),
                student_id: row.student_id(),
                student_name: row.student_name().to_string(),
                component1: row.component1(),
                component2: row.component2(),
                recovery: row.recovery(),
                average: row.average(),
                final_grade: row.final_grade(),
                passing: row.is_passing(),
                access: gate.access(row),
            })
            .collect()
    }
}
