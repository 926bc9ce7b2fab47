//! The `gradebook grade` command.

use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::NaiveDate;

use gradebook_core::score::{parse_score_input, ScoreEntry, ScoreField};
use gradebook_core::store::Action;

use super::Target;

/// Score arguments as typed; parsed with the same rules as interactive input.
pub struct ScoreArgs {
    pub c1: Option<String>,
    pub c2: Option<String>,
    pub recovery: Option<String>,
}

impl ScoreArgs {
    fn edits(&self) -> Vec<(ScoreField, &str)> {
        [
            (ScoreField::Component1, &self.c1),
            (ScoreField::Component2, &self.c2),
            (ScoreField::Recovery, &self.recovery),
        ]
        .into_iter()
        .filter_map(|(field, text)| text.as_deref().map(|t| (field, t)))
        .collect()
    }
}

pub async fn execute(
    target: Target,
    student_id: i64,
    scores: ScoreArgs,
    date: Option<NaiveDate>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let edits = scores.edits();
    if edits.is_empty() {
        bail!("nothing to change: pass at least one of --c1, --c2, --recovery");
    }

    let mut session = super::connect(config_path.as_deref())?;
    super::open(&mut session, target).await?;
    if !session.store().can_save() {
        bail!("this account cannot edit grades");
    }
    session.load_roster().await?;

    if session
        .store()
        .roster()
        .and_then(|r| r.get(student_id))
        .is_none()
    {
        bail!("student {student_id} is not on this roster");
    }

    for (field, text) in edits {
        let entry = parse_score_input(text);
        if entry == ScoreEntry::Unreadable {
            eprintln!("Ignoring unreadable score {text:?} for {field:?}");
            continue;
        }
        session.dispatch(Action::EditScore {
            student_id,
            field,
            entry,
        });
    }

    let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
    let report = session.save(date).await?;
    println!(
        "Saved {} rows ({} new) for {date}",
        report.saved, report.promoted
    );

    let row: Vec<_> = session
        .store()
        .visible_rows()
        .into_iter()
        .filter(|r| r.student_id == student_id)
        .collect();
    super::roster::print_heading(&session);
    println!("{}", super::roster::render(&row, session.store().policy()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_given_scores_become_edits() {
        let args = ScoreArgs {
            c1: Some("7,5".into()),
            c2: None,
            recovery: Some(String::new()),
        };
        let edits = args.edits();
        assert_eq!(edits.len(), 2);
        assert_eq!(edits[0], (ScoreField::Component1, "7,5"));
        assert_eq!(edits[1], (ScoreField::Recovery, ""));
    }
}
