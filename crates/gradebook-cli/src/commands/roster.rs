//! The `gradebook roster` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use gradebook_api::RestApi;
use gradebook_core::policy::{GradingPolicy, RecoveryType};
use gradebook_core::score::{format_derived, format_input};
use gradebook_core::session::GradebookSession;
use gradebook_core::store::RowView;
use gradebook_core::visibility::Access;

use super::Target;

pub async fn execute(target: Target, format: String, config_path: Option<PathBuf>) -> Result<()> {
    let mut session = super::connect(config_path.as_deref())?;
    super::open(&mut session, target).await?;
    session.load_roster().await?;

    let rows = session.store().visible_rows();
    match format.as_str() {
        "json" => {
            let json: Vec<serde_json::Value> = rows.iter().map(row_json).collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => {
            print_heading(&session);
            if rows.is_empty() {
                println!("No students to show.");
            } else {
                println!("{}", render(&rows, session.store().policy()));
            }
        }
    }
    Ok(())
}

pub(crate) fn print_heading(session: &GradebookSession<RestApi>) {
    let store = session.store();
    let selection = store.selection();
    let classroom = store
        .gate()
        .and_then(|g| {
            g.selectable_classrooms()
                .into_iter()
                .find(|c| Some(c.id) == selection.classroom_id)
                .map(|c| c.name.clone())
        })
        .unwrap_or_default();
    let mut heading = format!(
        "{} · {} · term {} of {}",
        classroom,
        selection.subject.as_deref().unwrap_or_default(),
        selection.term,
        store.policy().period_count()
    );
    if !store.can_save() {
        heading.push_str(" (read-only)");
    }
    println!("{heading}");
}

/// The roster as a table. The recovery column is shown only when the
/// policy has recovery.
pub(crate) fn render(rows: &[RowView], policy: &GradingPolicy) -> Table {
    let with_recovery = policy.recovery_type != RecoveryType::None;

    let mut header = vec!["ID", "Student", "Score 1", "Score 2"];
    if with_recovery {
        header.push("Recovery");
    }
    header.extend(["Average", "Final", "Result"]);

    let mut table = Table::new();
    table.set_header(header);

    for row in rows {
        let mut cells = vec![
            Cell::new(&row.id),
            Cell::new(&row.student_name),
            Cell::new(format_input(row.component1)),
            Cell::new(format_input(row.component2)),
        ];
        if with_recovery {
            cells.push(Cell::new(format_input(row.recovery)));
        }
        cells.push(Cell::new(format_derived(row.average)));
        cells.push(Cell::new(format_derived(row.final_grade)));
        cells.push(Cell::new(if row.passing { "pass" } else { "fail" }));
        table.add_row(cells);
    }
    table
}

fn row_json(row: &RowView) -> serde_json::Value {
    serde_json::json!({
        "id": row.id,
        "student_id": row.student_id,
        "student_name": row.student_name,
        "score1": row.component1,
        "score2": row.component2,
        "recovery": row.recovery,
        "average": row.average,
        "final_grade": row.final_grade,
        "passing": row.passing,
        "editable": row.access == Access::Editable,
    })
}
