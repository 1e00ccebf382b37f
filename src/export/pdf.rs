use std::io::BufWriter;

use printpdf::*;

use super::{ExportOptions, Metadata, Orientation};
use crate::engine::ReportResult;
use crate::error::{DocketError, Result};

// A4 (mm)
const A4_SHORT: f32 = 210.0;
const A4_LONG: f32 = 297.0;
const MARGIN_TOP: f32 = 20.0;
const MARGIN_BOTTOM: f32 = 20.0;
const MARGIN_SIDE: f32 = 15.0;
const ROW_H: f32 = 5.0;
const FONT_SIZE: f32 = 8.0;
const META_SIZE: f32 = 10.0;
const TITLE_SIZE: f32 = 16.0;

fn approx_text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.18
}

/// Cut `text` so it fits in `width` mm at `size`, marking the cut.
fn fit(text: &str, width: f32, size: f32) -> String {
    if approx_text_width(text, size) <= width {
        return text.to_string();
    }
    let max_chars = ((width / (size * 0.18)) as usize).saturating_sub(3);
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
}

struct Col {
    width: f32,
    align: Align,
}

struct PdfWriter {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    current_page: PdfPageIndex,
    current_layer: PdfLayerIndex,
    page_w: f32,
    page_h: f32,
    y: f32,
}

impl PdfWriter {
    fn new(title: &str, orientation: Orientation) -> Result<Self> {
        let (page_w, page_h) = match orientation {
            Orientation::Portrait => (A4_SHORT, A4_LONG),
            Orientation::Landscape => (A4_LONG, A4_SHORT),
        };
        let (doc, page, layer) = PdfDocument::new(title, Mm(page_w), Mm(page_h), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| DocketError::Pdf(format!("{e:?}")))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| DocketError::Pdf(format!("{e:?}")))?;
        Ok(Self {
            doc,
            font,
            font_bold,
            current_page: page,
            current_layer: layer,
            page_w,
            page_h,
            y: MARGIN_TOP,
        })
    }

    fn content_width(&self) -> f32 {
        self.page_w - 2.0 * MARGIN_SIDE
    }

    fn pdf_y(&self) -> f32 {
        self.page_h - self.y
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(self.page_w), Mm(self.page_h), "Layer");
        self.current_page = page;
        self.current_layer = layer;
        self.y = MARGIN_TOP;
    }

    /// Returns true when a page break happened.
    fn ensure_space(&mut self, needed: f32) -> bool {
        if self.y + needed > self.page_h - MARGIN_BOTTOM {
            self.new_page();
            return true;
        }
        false
    }

    fn text(&self, s: &str, x: f32, size: f32, bold: bool) {
        let font = if bold { &self.font_bold } else { &self.font };
        let layer = self.doc.get_page(self.current_page).get_layer(self.current_layer);
        layer.use_text(s, size, Mm(x), Mm(self.pdf_y()), font);
    }

    fn hline(&self) {
        let layer = self.doc.get_page(self.current_page).get_layer(self.current_layer);
        layer.set_outline_thickness(0.5);
        let line = Line {
            points: vec![
                (Point::new(Mm(MARGIN_SIDE), Mm(self.pdf_y())), false),
                (Point::new(Mm(self.page_w - MARGIN_SIDE), Mm(self.pdf_y())), false),
            ],
            is_closed: false,
        };
        layer.add_line(line);
    }

    fn title(&mut self, title: &str) {
        self.text(title, MARGIN_SIDE, TITLE_SIZE, true);
        self.y += 9.0;
    }

    fn section_label(&mut self, label: &str) {
        self.ensure_space(ROW_H * 2.0);
        self.text(label, MARGIN_SIDE, META_SIZE, true);
        self.y += ROW_H;
    }

    fn row(&mut self, cols: &[Col], values: &[&str], size: f32, bold: bool) {
        let mut x = MARGIN_SIDE;
        for (col, value) in cols.iter().zip(values) {
            let value = fit(value, col.width - 1.0, size);
            match col.align {
                Align::Left => self.text(&value, x, size, bold),
                Align::Right => {
                    let tw = approx_text_width(&value, size);
                    self.text(&value, x + col.width - tw, size, bold);
                }
            }
            x += col.width;
        }
        self.y += ROW_H;
    }

    fn table_header(&mut self, cols: &[Col], headers: &[&str]) {
        self.ensure_space(ROW_H * 2.0);
        self.row(cols, headers, FONT_SIZE, true);
        self.y -= 3.5;
        self.hline();
        self.y += 3.5;
    }

    fn blank_row(&mut self) {
        self.y += ROW_H;
    }

    fn to_bytes(self) -> Result<Vec<u8>> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| DocketError::Pdf(format!("{e:?}")))?;
        buf.into_inner().map_err(|e| DocketError::Pdf(e.to_string()))
    }
}

pub(crate) struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub data_rows: usize,
}

/// Title, metadata table, optional statistics summary, then at most
/// `options.pdf_row_limit` data rows. Rows past the limit are dropped.
pub(crate) fn render(meta: &Metadata, result: &ReportResult, options: &ExportOptions) -> Result<RenderedPdf> {
    let title = meta.title(options);
    let mut pdf = PdfWriter::new(&title, options.orientation)?;
    pdf.title(&title);

    let half = pdf.content_width() / 2.0;
    let pair_cols = [Col { width: half, align: Align::Left }, Col { width: half, align: Align::Right }];

    if options.include_header {
        let total = meta.total_records.to_string();
        pdf.row(&pair_cols, &["Template", meta.template_name.as_str()], META_SIZE, false);
        pdf.row(&pair_cols, &["Executed at", meta.executed_at.as_str()], META_SIZE, false);
        pdf.row(&pair_cols, &["Total records", total.as_str()], META_SIZE, false);
        pdf.hline();
        pdf.blank_row();
    }

    if options.include_charts {
        pdf.section_label("Summary");
        for (label, value) in result.statistics.entries() {
            pdf.ensure_space(ROW_H);
            let value = value.to_string();
            pdf.row(&pair_cols, &[label, value.as_str()], FONT_SIZE, false);
        }
        pdf.blank_row();
    }

    let table = result.rowset.to_table(Some(options.pdf_row_limit));
    let data_rows = table.rows.len();
    if !table.header.is_empty() {
        let width = pdf.content_width() / table.header.len() as f32;
        let cols: Vec<Col> = table.header.iter().map(|_| Col { width, align: Align::Left }).collect();
        let header: Vec<&str> = table.header.iter().map(String::as_str).collect();
        pdf.table_header(&cols, &header);
        for row in &table.rows {
            if pdf.ensure_space(ROW_H) {
                pdf.table_header(&cols, &header);
            }
            let values: Vec<&str> = row.iter().map(String::as_str).collect();
            pdf.row(&cols, &values, FONT_SIZE, false);
        }
    }

    if options.include_footer {
        pdf.blank_row();
        pdf.ensure_space(ROW_H * 3.0);
        let generated = chrono::Local::now().format("Generated at %d/%m/%Y %H:%M").to_string();
        pdf.text(&generated, MARGIN_SIDE, FONT_SIZE, false);
        pdf.y += ROW_H;
        if let Some(notes) = options.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            for line in notes.lines() {
                pdf.ensure_space(ROW_H);
                let line = fit(line, pdf.content_width(), FONT_SIZE);
                pdf.text(&line, MARGIN_SIDE, FONT_SIZE, false);
                pdf.y += ROW_H;
            }
        }
    }

    Ok(RenderedPdf { bytes: pdf.to_bytes()?, data_rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::{execution, result};

    #[test]
    fn test_pdf_caps_data_rows() {
        let res = result(150);
        let meta = Metadata::new(&execution(), &res);
        let out = render(&meta, &res, &ExportOptions::default()).unwrap();
        assert!(out.bytes.starts_with(b"%PDF"));
        assert_eq!(out.data_rows, 100);

        let small = result(40);
        let meta = Metadata::new(&execution(), &small);
        assert_eq!(render(&meta, &small, &ExportOptions::default()).unwrap().data_rows, 40);
    }

    #[test]
    fn test_landscape_with_all_sections_off() {
        let res = result(5);
        let meta = Metadata::new(&execution(), &res);
        let options = ExportOptions {
            orientation: Orientation::Landscape,
            include_header: false,
            include_footer: false,
            include_charts: false,
            pdf_row_limit: 2,
            ..Default::default()
        };
        let out = render(&meta, &res, &options).unwrap();
        assert!(out.bytes.starts_with(b"%PDF"));
        assert_eq!(out.data_rows, 2);
    }

    #[test]
    fn test_notes_and_custom_title() {
        let res = result(1);
        let meta = Metadata::new(&execution(), &res);
        let options = ExportOptions {
            title: Some("Board pack".into()),
            notes: Some("Prepared for the June review.\nFigures unaudited.".into()),
            ..Default::default()
        };
        assert_eq!(meta.title(&options), "Board pack");
        assert!(render(&meta, &res, &options).unwrap().bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_fit_truncates_long_text() {
        assert_eq!(fit("short", 50.0, FONT_SIZE), "short");
        let cut = fit(&"x".repeat(200), 20.0, FONT_SIZE);
        assert!(cut.ends_with("..."));
        assert!(cut.len() < 200);
    }
}
