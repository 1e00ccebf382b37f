//! Serialize one generated report to PDF, XLSX or CSV. Every format renders
//! the same column list and rows; PDF alone caps the row count.

mod csv_writer;
#[cfg(feature = "pdf")]
mod pdf;
#[cfg(feature = "xlsx")]
mod xlsx;

use crate::engine::ReportResult;
use crate::error::{DocketError, Result};
use crate::execution::ReportExecution;
use crate::models::text_enum;
use crate::templates::OutputFormat;

text_enum!(ExportFormat {
    Pdf => "pdf",
    Xlsx => "xlsx",
    Csv => "csv",
});

impl ExportFormat {
    /// Accepts the export names plus the template output names.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "xlsx" | "excel" | "spreadsheet" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(DocketError::UnknownFormat(other.to_string())),
        }
    }

    pub fn from_output(format: OutputFormat) -> Result<Self> {
        Self::from_name(format.as_str())
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ExportFormat::Csv => "text/csv",
        }
    }
}

text_enum!(Orientation {
    Portrait => "portrait",
    Landscape => "landscape",
});

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Replaces `Report: {template name}` as the PDF title.
    pub title: Option<String>,
    pub orientation: Orientation,
    /// Metadata preamble (CSV lines, PDF table).
    pub include_header: bool,
    /// PDF generated-at line and notes.
    pub include_footer: bool,
    /// PDF statistics summary.
    pub include_charts: bool,
    pub notes: Option<String>,
    pub pdf_row_limit: usize,
    pub column_width_cap: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            title: None,
            orientation: Orientation::Portrait,
            include_header: true,
            include_footer: true,
            include_charts: true,
            notes: None,
            pdf_row_limit: 100,
            column_width_cap: 50,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportedReport {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

/// Values shared by every format's preamble.
pub(crate) struct Metadata {
    pub template_name: String,
    pub executed_at: String,
    pub total_records: usize,
}

impl Metadata {
    pub fn title(&self, options: &ExportOptions) -> String {
        match options.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => format!("Report: {}", self.template_name),
        }
    }

    fn new(execution: &ReportExecution, result: &ReportResult) -> Self {
        Self {
            template_name: execution.template_name.clone(),
            executed_at: execution.started_at.format("%d/%m/%Y %H:%M").to_string(),
            total_records: result.row_count(),
        }
    }
}

pub fn filename(execution_id: i64, format: ExportFormat) -> String {
    format!("relatorio_{execution_id}.{}", format.extension())
}

pub fn export(
    format: ExportFormat,
    execution: &ReportExecution,
    result: &ReportResult,
    options: &ExportOptions,
) -> Result<ExportedReport> {
    let meta = Metadata::new(execution, result);
    let bytes = match format {
        ExportFormat::Csv => csv_writer::render(&meta, &result.rowset, options)?,
        #[cfg(feature = "xlsx")]
        ExportFormat::Xlsx => xlsx::render(&meta, &result.rowset, options)?,
        #[cfg(feature = "pdf")]
        ExportFormat::Pdf => {
            let rendered = pdf::render(&meta, result, options)?;
            if rendered.data_rows < meta.total_records {
                tracing::debug!(drawn = rendered.data_rows, total = meta.total_records, "pdf table truncated");
            }
            rendered.bytes
        }
        #[allow(unreachable_patterns)]
        other => return Err(DocketError::UnknownFormat(format!("{other} (not enabled in this build)"))),
    };
    tracing::info!(
        execution_id = execution.id,
        format = %format,
        rows = meta.total_records,
        bytes = bytes.len(),
        "report exported"
    );
    Ok(ExportedReport {
        bytes,
        content_type: format.content_type(),
        filename: filename(execution.id, format),
    })
}
