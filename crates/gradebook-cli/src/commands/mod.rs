//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};

use gradebook_api::RestApi;
use gradebook_core::session::GradebookSession;
use gradebook_core::store::Action;

pub mod grade;
pub mod init;
pub mod policy;
pub mod roster;

/// The (classroom, subject, term) asked for on the command line.
pub struct Target {
    pub classroom: Option<i64>,
    pub subject: Option<String>,
    pub term: Option<u8>,
}

/// Build a session against the configured API.
pub fn connect(config_path: Option<&Path>) -> Result<GradebookSession<RestApi>> {
    let config = gradebook_api::load_config_from(config_path)?;
    let api = Arc::new(RestApi::new(&config.api));
    Ok(GradebookSession::new(api, chrono::Local::now().date_naive()))
}

/// Bootstrap the session and move the selection to `target`.
///
/// Values the viewer may not select are reported as errors instead of being
/// silently replaced.
pub async fn open(session: &mut GradebookSession<RestApi>, target: Target) -> Result<()> {
    session.bootstrap().await?;

    if let Some(classroom_id) = target.classroom {
        session.dispatch(Action::SelectClassroom(classroom_id));
        if session.store().selection().classroom_id != Some(classroom_id) {
            bail!("classroom {classroom_id} is not available to this account");
        }
    }
    if let Some(subject) = target.subject {
        session.dispatch(Action::SelectSubject(subject.clone()));
        if session.store().selection().subject.as_deref() != Some(subject.as_str()) {
            bail!("subject {subject:?} is not available in this classroom");
        }
    }
    if let Some(term) = target.term {
        session.dispatch(Action::SelectTerm(term));
        let applied = session.store().selection().term;
        if applied != term {
            tracing::warn!(requested = term, applied, "term out of range for the grading system");
        }
    }

    if session.store().selection().scope().is_none() {
        bail!("no classroom and subject available to this account");
    }
    Ok(())
}
