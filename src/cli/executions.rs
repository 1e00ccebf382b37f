use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::session;
use crate::error::Result;
use crate::execution::{ExecutionStatus, ExecutionTracker};
use crate::fmt::duration;

pub fn list(user: Option<&str>, limit: usize) -> Result<()> {
    let s = session(user)?;
    let rows = ExecutionTracker::new(&s.conn).history(&s.user, limit)?;
    if rows.is_empty() {
        println!("No executions yet. Run a template with `docket run <id>`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Template", "Status", "Started", "Duration", "Rows", "File size"]);
    for e in &rows {
        let status = match e.status {
            ExecutionStatus::Completed => e.status.as_str().green().to_string(),
            ExecutionStatus::Failed => e.status.as_str().red().to_string(),
            ExecutionStatus::Cancelled => e.status.as_str().yellow().to_string(),
            ExecutionStatus::Pending => e.status.as_str().to_string(),
        };
        table.add_row(vec![
            Cell::new(e.id),
            Cell::new(&e.template_name),
            Cell::new(status),
            Cell::new(e.started_at.format("%d/%m/%Y %H:%M")),
            Cell::new(duration(e.duration_ms)),
            Cell::new(e.row_count.map(|n| n.to_string()).unwrap_or_default()),
            Cell::new(e.formatted_size()),
        ]);
    }
    println!("Executions\n{table}");

    for e in rows.iter().filter(|e| e.status == ExecutionStatus::Failed) {
        if let Some(msg) = &e.error_message {
            println!("  #{}: {}", e.id, msg.red());
        }
    }
    Ok(())
}

pub fn cancel(user: Option<&str>, id: i64) -> Result<()> {
    let s = session(user)?;
    let execution = ExecutionTracker::new(&s.conn).cancel_owned(id, &s.user)?;
    println!("Cancelled execution #{} ({}).", execution.id, execution.template_name);
    Ok(())
}
