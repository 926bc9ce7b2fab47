//! Per-role visibility and edit rules for the grades screen.
//!
//! The gate decides which classrooms and subjects a viewer may select, which
//! rows they see, whether rows are editable, and whether saving is offered.
//! It also repairs a selection that has fallen outside the selectable set.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{Allocation, Classroom, GradeRow, Role, Viewer};
use crate::roster::{Roster, RosterScope};

/// The viewer's current choice of classroom, subject and term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub classroom_id: Option<i64>,
    pub subject: Option<String>,
    pub term: u8,
}

impl Selection {
    pub fn new(term: u8) -> Self {
        Self {
            classroom_id: None,
            subject: None,
            term,
        }
    }

    /// The roster scope, once both classroom and subject are chosen.
    pub fn scope(&self) -> Option<RosterScope> {
        Some(RosterScope {
            classroom_id: self.classroom_id?,
            subject: self.subject.clone()?,
            term: self.term,
        })
    }
}

/// Whether a row's fields accept input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Editable,
    ReadOnly,
}

/// Visibility rules for one viewer.
#[derive(Debug, Clone)]
pub struct VisibilityGate {
    viewer: Viewer,
    classrooms: Vec<Classroom>,
    allocations: Vec<Allocation>,
    enrolled: HashSet<i64>,
}

impl VisibilityGate {
    /// `allocations` may hold every teacher's allocations; teachers are
    /// filtered down to their own here. `enrolled_classrooms` only matters
    /// for students.
    pub fn new(
        viewer: Viewer,
        classrooms: Vec<Classroom>,
        allocations: Vec<Allocation>,
        enrolled_classrooms: Vec<i64>,
    ) -> Self {
        let allocations = match viewer.role {
            Role::Teacher => allocations
                .into_iter()
                .filter(|a| a.teacher_id == viewer.id)
                .collect(),
            Role::Admin | Role::Student => allocations,
        };
        Self {
            viewer,
            classrooms,
            allocations,
            enrolled: enrolled_classrooms.into_iter().collect(),
        }
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn role(&self) -> Role {
        self.viewer.role
    }

    /// Classrooms the viewer may pick, in server order.
    pub fn selectable_classrooms(&self) -> Vec<&Classroom> {
        self.classrooms
            .iter()
            .filter(|c| self.classroom_visible(c.id))
            .collect()
    }

    fn classroom_visible(&self, classroom_id: i64) -> bool {
        match self.viewer.role {
            Role::Admin => true,
            Role::Teacher => self
                .allocations
                .iter()
                .any(|a| a.classroom_id == classroom_id),
            Role::Student => self.enrolled.contains(&classroom_id),
        }
    }

    /// Subjects the viewer may pick for a classroom, sorted and deduplicated.
    pub fn selectable_subjects(&self, classroom_id: i64) -> Vec<String> {
        if !self.classroom_visible(classroom_id) {
            return Vec::new();
        }
        self.allocations
            .iter()
            .filter(|a| a.classroom_id == classroom_id)
            .map(|a| a.subject.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn can_edit(&self) -> bool {
        matches!(self.viewer.role, Role::Admin | Role::Teacher)
    }

    pub fn can_save(&self) -> bool {
        self.can_edit()
    }

    pub fn access(&self, _row: &GradeRow) -> Access {
        if self.can_edit() {
            Access::Editable
        } else {
            Access::ReadOnly
        }
    }

    /// Rows the viewer is allowed to see. Students only ever see their own.
    pub fn visible_rows<'r>(&self, roster: &'r Roster) -> Vec<&'r GradeRow> {
        match self.viewer.role {
            Role::Admin | Role::Teacher => roster.iter().collect(),
            Role::Student => roster
                .iter()
                .filter(|r| Some(r.student_id()) == self.viewer.student_id)
                .collect(),
        }
    }

    /// Whether a selection points only at selectable values.
    pub fn accepts(&self, selection: &Selection) -> bool {
        let Some(classroom_id) = selection.classroom_id else {
            return selection.subject.is_none();
        };
        if !self.classroom_visible(classroom_id) {
            return false;
        }
        match &selection.subject {
            Some(subject) => self
                .selectable_subjects(classroom_id)
                .iter()
                .any(|s| s == subject),
            None => true,
        }
    }

    /// Repair `current` so it never points at an unselectable value.
    ///
    /// An invalid (or missing) classroom becomes the first selectable one, or
    /// none. An invalid (or missing) subject becomes the first selectable
    /// subject of the resulting classroom, or none. Valid values are kept.
    pub fn reconcile_selection(&self, current: &Selection) -> Selection {
        let classrooms = self.selectable_classrooms();
        let classroom_id = match current.classroom_id {
            Some(id) if classrooms.iter().any(|c| c.id == id) => Some(id),
            _ => classrooms.first().map(|c| c.id),
        };

        let subject = classroom_id.and_then(|id| {
            let subjects = self.selectable_subjects(id);
            match &current.subject {
                Some(s) if subjects.contains(s) => Some(s.clone()),
                _ => subjects.into_iter().next(),
            }
        });

        Selection {
            classroom_id,
            subject,
            term: current.term,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GradeRecord, Student};
    use crate::policy::GradingPolicy;
    use crate::roster::{reconcile, EnrollmentView};

    const CLASS_A: i64 = 1;
    const CLASS_B: i64 = 2;

    fn classrooms() -> Vec<Classroom> {
        vec![
            Classroom {
                id: CLASS_A,
                name: "6º Ano A".into(),
                grade: "6".into(),
                year: Some(2026),
            },
            Classroom {
                id: CLASS_B,
                name: "7º Ano B".into(),
                grade: "7".into(),
                year: Some(2026),
            },
        ]
    }

    fn alloc(id: i64, classroom_id: i64, teacher_id: i64, subject: &str) -> Allocation {
        Allocation {
            id,
            classroom_id,
            teacher_id,
            subject: subject.into(),
        }
    }

    fn all_allocations() -> Vec<Allocation> {
        vec![
            alloc(1, CLASS_A, 50, "Math"),
            alloc(2, CLASS_A, 51, "Português"),
            alloc(3, CLASS_B, 51, "Português"),
            alloc(4, CLASS_B, 52, "Ciências"),
        ]
    }

    fn viewer(id: i64, role: Role, student_id: Option<i64>) -> Viewer {
        Viewer {
            id,
            name: "someone".into(),
            role,
            student_id,
        }
    }

    fn teacher_gate() -> VisibilityGate {
        VisibilityGate::new(
            viewer(50, Role::Teacher, None),
            classrooms(),
            all_allocations(),
            vec![],
        )
    }

    #[test]
    fn admin_sees_everything() {
        let gate = VisibilityGate::new(
            viewer(1, Role::Admin, None),
            classrooms(),
            all_allocations(),
            vec![],
        );
        assert_eq!(gate.selectable_classrooms().len(), 2);
        assert_eq!(
            gate.selectable_subjects(CLASS_A),
            vec!["Math".to_string(), "Português".to_string()]
        );
        assert!(gate.can_edit());
        assert!(gate.can_save());
    }

    #[test]
    fn teacher_is_restricted_to_own_allocations() {
        let gate = teacher_gate();
        let ids: Vec<i64> = gate.selectable_classrooms().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![CLASS_A]);
        assert_eq!(gate.selectable_subjects(CLASS_A), vec!["Math".to_string()]);
        assert!(gate.selectable_subjects(CLASS_B).is_empty());
        assert!(gate.can_save());
    }

    #[test]
    fn stale_selection_is_pulled_back_to_an_allowed_value() {
        let gate = teacher_gate();
        let stale = Selection {
            classroom_id: Some(CLASS_B),
            subject: Some("Português".into()),
            term: 2,
        };
        assert!(!gate.accepts(&stale));
        let fixed = gate.reconcile_selection(&stale);
        assert_eq!(fixed.classroom_id, Some(CLASS_A));
        assert_eq!(fixed.subject.as_deref(), Some("Math"));
        assert_eq!(fixed.term, 2);
        assert!(gate.accepts(&fixed));
    }

    #[test]
    fn foreign_subject_in_own_classroom_is_replaced() {
        let gate = teacher_gate();
        let fixed = gate.reconcile_selection(&Selection {
            classroom_id: Some(CLASS_A),
            subject: Some("Português".into()),
            term: 1,
        });
        assert_eq!(fixed.classroom_id, Some(CLASS_A));
        assert_eq!(fixed.subject.as_deref(), Some("Math"));
    }

    #[test]
    fn valid_selection_is_left_alone() {
        let gate = VisibilityGate::new(
            viewer(1, Role::Admin, None),
            classrooms(),
            all_allocations(),
            vec![],
        );
        let sel = Selection {
            classroom_id: Some(CLASS_B),
            subject: Some("Português".into()),
            term: 3,
        };
        assert_eq!(gate.reconcile_selection(&sel), sel);
    }

    #[test]
    fn empty_allowed_set_clears_the_selection() {
        let gate = VisibilityGate::new(
            viewer(77, Role::Teacher, None),
            classrooms(),
            all_allocations(),
            vec![],
        );
        let fixed = gate.reconcile_selection(&Selection {
            classroom_id: Some(CLASS_A),
            subject: Some("Math".into()),
            term: 1,
        });
        assert_eq!(fixed.classroom_id, None);
        assert_eq!(fixed.subject, None);
        assert!(gate.accepts(&fixed));
    }

    #[test]
    fn student_is_read_only_and_sees_only_own_row() {
        let gate = VisibilityGate::new(
            viewer(9, Role::Student, Some(2)),
            classrooms(),
            all_allocations(),
            vec![CLASS_B],
        );
        let ids: Vec<i64> = gate.selectable_classrooms().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![CLASS_B]);
        assert!(!gate.can_edit());
        assert!(!gate.can_save());

        let students = vec![
            Student {
                id: 1,
                first_name: "Ana".into(),
                last_name: String::new(),
            },
            Student {
                id: 2,
                first_name: "Bia".into(),
                last_name: String::new(),
            },
        ];
        let roster = reconcile(
            RosterScope {
                classroom_id: CLASS_B,
                subject: "Português".into(),
                term: 1,
            },
            EnrollmentView::Full(&students),
            &Vec::<GradeRecord>::new(),
            &GradingPolicy::default(),
        );
        let visible = gate.visible_rows(&roster);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].student_id(), 2);
        assert_eq!(gate.access(visible[0]), Access::ReadOnly);
    }

    #[test]
    fn selection_scope_requires_classroom_and_subject() {
        let mut sel = Selection::new(2);
        assert!(sel.scope().is_none());
        sel.classroom_id = Some(CLASS_A);
        assert!(sel.scope().is_none());
        sel.subject = Some("Math".into());
        let scope = sel.scope().unwrap();
        assert_eq!(scope.term, 2);
    }
}
