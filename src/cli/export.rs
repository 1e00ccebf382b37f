use std::path::PathBuf;

use crate::cli::{session, ExportArgs};
use crate::engine::ReportEngine;
use crate::error::Result;
use crate::execution::{reproduce, ExecutionTracker};
use crate::export::{export, ExportFormat, ExportOptions, Orientation};
use crate::fmt::file_size;
use crate::settings::shellexpand_path;
use crate::store::SqliteStore;
use crate::templates::get_template;

pub fn run(user: Option<&str>, args: ExportArgs) -> Result<()> {
    let s = session(user)?;
    let tracker = ExecutionTracker::new(&s.conn);
    let mut execution = tracker.get(args.execution)?;
    let template = get_template(&s.conn, execution.template_id)?;

    let format = match args.format.as_deref() {
        Some(name) => ExportFormat::from_name(name)?,
        None => ExportFormat::from_output(template.output_format)?,
    };

    let store = SqliteStore::new(&s.conn);
    let engine = ReportEngine::new(&store).with_timeout(s.settings.generation_timeout());
    let result = reproduce(&engine, &template, &execution, &s.user)?;

    let options = ExportOptions {
        title: args.title,
        orientation: if args.landscape { Orientation::Landscape } else { Orientation::Portrait },
        include_header: !args.no_header,
        include_footer: !args.no_footer,
        include_charts: !args.no_charts,
        notes: args.notes.clone(),
        pdf_row_limit: s.settings.pdf_row_limit,
        column_width_cap: s.settings.column_width_cap,
    };
    let out = export(format, &execution, &result, &options)?;

    let path = match args.output {
        Some(p) => PathBuf::from(shellexpand_path(&p)),
        None => s.settings.exports_dir().join(&out.filename),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, &out.bytes)?;
    tracker.record_artifact(&mut execution, &path, out.bytes.len() as u64)?;
    if let Some(notes) = args.notes.as_deref() {
        tracker.set_notes(&mut execution, notes)?;
    }

    println!(
        "Wrote {} ({}, {})",
        path.display(),
        out.content_type,
        file_size(Some(out.bytes.len() as u64))
    );
    Ok(())
}
