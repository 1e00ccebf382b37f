use chrono::Local;
use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::session;
use crate::engine::{ReportEngine, ReportResult, StatValue};
use crate::error::Result;
use crate::execution::{run_report, ExecutionTracker};
use crate::filters::{merge_params, parse_pairs};
use crate::fmt::duration;
use crate::presets::apply_filter;
use crate::store::SqliteStore;
use crate::templates::template_for_run;

pub fn run(user: Option<&str>, template_id: i64, params: &[String], filter: Option<i64>, limit: usize) -> Result<()> {
    let s = session(user)?;
    let template = template_for_run(&s.conn, template_id, &s.user)?;

    let mut request = parse_pairs(params)?;
    if let Some(filter_id) = filter {
        request = merge_params(&apply_filter(&s.conn, filter_id, &s.user, template.category)?, &request);
    }

    let store = SqliteStore::new(&s.conn);
    let engine = ReportEngine::new(&store).with_timeout(s.settings.generation_timeout());
    let tracker = ExecutionTracker::new(&s.conn);
    let (execution, result) = run_report(&tracker, &engine, &template, &request, &s.user, Local::now().date_naive())?;

    println!(
        "{} execution #{} of '{}': {} rows in {}",
        "Completed".green().bold(),
        execution.id,
        template.name,
        result.row_count(),
        duration(execution.duration_ms)
    );
    println!();
    print_rows(&result, limit);
    println!();
    print_statistics(&result);
    println!();
    println!("Export it with `docket export {}`", execution.id);
    Ok(())
}

fn print_rows(result: &ReportResult, limit: usize) {
    if result.rowset.is_empty() {
        println!("No matching records.");
        return;
    }
    let table = result.rowset.to_table(Some(limit));
    let mut out = Table::new();
    out.set_header(result.rowset.columns.iter().map(|c| c.label));
    for row in &table.rows {
        out.add_row(row);
    }
    println!("{out}");
    if result.row_count() > table.rows.len() {
        println!("... {} more rows", result.row_count() - table.rows.len());
    }
}

fn print_statistics(result: &ReportResult) {
    let mut table = Table::new();
    table.set_header(vec!["Statistic", "Value"]);
    for (label, value) in result.statistics.entries() {
        let text = match value {
            StatValue::Money(v) if v < 0.0 => value.to_string().red().to_string(),
            _ => value.to_string(),
        };
        table.add_row(vec![Cell::new(label), Cell::new(text).set_alignment(CellAlignment::Right)]);
    }
    println!("{table}");
}
