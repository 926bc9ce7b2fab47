//! Gradebook error types.
//!
//! Nothing in the grade computation itself can fail; these errors describe
//! rejected configuration, denied actions and failed saves.

use thiserror::Error;

/// Errors raised by the gradebook engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GradebookError {
    /// The persistence API reported a role the gradebook has no gate for.
    #[error("unknown viewer role: {0}")]
    UnknownRole(String),

    /// A policy field carried a value outside its allowed set.
    #[error("invalid value for {field}: {value}")]
    InvalidChoice { field: &'static str, value: String },

    /// The viewer is not allowed to save grades.
    #[error("saving grades is not permitted for this viewer")]
    SaveNotPermitted,

    /// A roster load or save was requested without a classroom and subject.
    #[error("classroom and subject must be selected")]
    IncompleteSelection,

    /// Some upserts of a batch save failed. Rows that succeeded stay saved.
    #[error("failed to save {failed} of {total} grade rows")]
    SaveFailed { failed: usize, total: usize },
}

