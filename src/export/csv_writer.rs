use csv::{Terminator, Writer, WriterBuilder};

use super::{ExportOptions, Metadata};
use crate::error::{DocketError, Result};
use crate::rowset::Rowset;

/// Preamble lines, a blank line, then the header and every record.
pub(crate) fn render(meta: &Metadata, rowset: &Rowset, options: &ExportOptions) -> Result<Vec<u8>> {
    let mut wtr = writer(Vec::new());

    if options.include_header {
        wtr.write_record([format!("Report: {}", meta.template_name)])?;
        wtr.write_record([format!("Executed at: {}", meta.executed_at)])?;
        wtr.write_record([format!("Total records: {}", meta.total_records)])?;
        // An empty record would be written as `""`; the separator line must be bare.
        let mut buf = finish(wtr)?;
        buf.push(b'\n');
        wtr = writer(buf);
    }

    let table = rowset.to_table(None);
    wtr.write_record(&table.header)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    finish(wtr)
}

fn writer(buf: Vec<u8>) -> Writer<Vec<u8>> {
    WriterBuilder::new()
        .flexible(true)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(buf)
}

fn finish(wtr: Writer<Vec<u8>>) -> Result<Vec<u8>> {
    wtr.into_inner().map_err(|e| DocketError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::{execution, result};

    fn render_text(n: usize, options: &ExportOptions) -> String {
        let res = result(n);
        let meta = Metadata::new(&execution(), &res);
        String::from_utf8(render(&meta, &res.rowset, options).unwrap()).unwrap()
    }

    #[test]
    fn test_preamble_blank_line_then_table() {
        let text = render_text(2, &ExportOptions::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Report: Open cases");
        assert_eq!(lines[1], "Executed at: 12/06/2025 14:30");
        assert_eq!(lines[2], "Total records: 2");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "case_status,case_value");
        assert_eq!(lines[5], "active,0.00");
        assert_eq!(lines[6], "closed,10.50");
        assert_eq!(lines.len(), 7);
        assert!(text.contains("Total records: 2\n\ncase_status,"), "separator is a bare newline: {text:?}");
    }

    #[test]
    fn test_empty_rowset_has_no_data_rows() {
        let text = render_text(0, &ExportOptions::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[2], "Total records: 0");
        assert_eq!(lines[3], "");
        assert_eq!(lines.len(), 5, "only the header follows the blank line: {text:?}");
    }

    #[test]
    fn test_without_preamble() {
        let options = ExportOptions { include_header: false, ..Default::default() };
        let text = render_text(1, &options);
        assert!(text.starts_with("case_status,case_value\n"));
    }

    #[test]
    fn test_values_with_commas_are_quoted() {
        let mut res = result(1);
        res.rowset.records[0].insert("case_status", crate::catalog::FieldValue::Text("a, b".into()));
        let meta = Metadata::new(&execution(), &res);
        let text = String::from_utf8(render(&meta, &res.rowset, &ExportOptions::default()).unwrap()).unwrap();
        assert!(text.contains("\"a, b\",0.00"));
    }
}
