//! gradebook-core — Grading policy, grade computation and roster reconciliation.
//!
//! This crate holds everything about the grades screen that does not touch
//! the network: the pure grade computer, the roster reconciler that merges
//! enrollment with persisted records, the per-role visibility gate, and the
//! store that owns selection and rows. [`session`] drives the store against
//! any [`traits::GradebookApi`] implementation.

pub mod compute;
pub mod error;
pub mod model;
pub mod policy;
pub mod roster;
pub mod score;
pub mod session;
pub mod store;
pub mod traits;
pub mod visibility;
