use rust_xlsxwriter::{Color, Format, FormatPattern, Workbook};

use super::{ExportOptions, Metadata};
use crate::catalog::FieldValue;
use crate::error::Result;
use crate::rowset::Rowset;

pub(crate) const SHEET_NAME: &str = "Report";
/// Zero-based row of the column header; data follows directly below.
pub(crate) const HEADER_ROW: u32 = 6;
const HEADER_FILL: u32 = 0x366092;

/// Title in A1, metadata in A3:B5, then the table from row 7.
pub(crate) fn render(meta: &Metadata, rowset: &Rowset, options: &ExportOptions) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let title_format = Format::new().set_bold().set_font_size(14);
    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_pattern(FormatPattern::Solid);
    let money_format = Format::new().set_num_format("#,##0.00");

    sheet.write_string_with_format(0, 0, meta.title(options), &title_format)?;
    sheet.write_string(2, 0, "Template:")?;
    sheet.write_string(2, 1, &meta.template_name)?;
    sheet.write_string(3, 0, "Executed at:")?;
    sheet.write_string(3, 1, &meta.executed_at)?;
    sheet.write_string(4, 0, "Total records:")?;
    sheet.write_number(4, 1, meta.total_records as f64)?;

    // Widths follow the longest stringified cell per column, header included.
    let mut widths: Vec<usize> = rowset.columns.iter().map(|c| c.id.chars().count()).collect();

    for (col, column) in rowset.columns.iter().enumerate() {
        sheet.write_string_with_format(HEADER_ROW, col as u16, column.id, &header_format)?;
    }
    for (i, record) in rowset.records.iter().enumerate() {
        let row = HEADER_ROW + 1 + i as u32;
        for (col, column) in rowset.columns.iter().enumerate() {
            let Some(value) = record.get(column.id) else {
                continue;
            };
            let text = value.to_string();
            widths[col] = widths[col].max(text.chars().count());
            match value {
                FieldValue::Money(v) => {
                    sheet.write_number_with_format(row, col as u16, *v, &money_format)?;
                }
                FieldValue::Empty => {}
                _ => {
                    sheet.write_string(row, col as u16, &text)?;
                }
            }
        }
    }
    for (col, width) in widths.iter().enumerate() {
        let width = (width + 2).min(options.column_width_cap);
        sheet.set_column_width(col as u16, width as f64)?;
    }

    Ok(workbook.save_to_buffer()?)
}
