// src/report/pdf.rs

use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Rgb,
};
use std::hash::{DefaultHasher, Hash, Hasher};

use time::OffsetDateTime;
use tracing::{debug, info};

use super::{
    build_layout, ReportBody, ReportError, ReportInput, ReportLayout, ReportRenderer, COLUMNS,
};
use crate::core::models::Severity;

// US Letter, half-inch side margins and one-inch top/bottom, as printed reports
// have always been laid out.
const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const MARGIN_X: f32 = 12.7;
const MARGIN_Y: f32 = 25.4;

const TITLE_SIZE: f32 = 24.0;
const SUBTITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 10.0;
const CELL_SIZE: f32 = 8.0;
const CELL_LINE_MM: f32 = 3.6;
const ROW_GAP_MM: f32 = 2.4;

fn brand_blue() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.451, 0.784, None))
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

fn severity_color(severity: Severity) -> Color {
    let (r, g, b) = match severity {
        Severity::High => (0.80, 0.10, 0.10),
        Severity::Medium => (0.90, 0.45, 0.0),
        Severity::Low => (0.75, 0.65, 0.0),
        Severity::Informational => (0.40, 0.40, 0.40),
    };
    Color::Rgb(Rgb::new(r, g, b, None))
}

/// Renders reports as US-Letter PDFs using the built-in Helvetica faces.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfReport;

impl PdfReport {
    pub fn new() -> Self {
        Self
    }
}

impl ReportRenderer for PdfReport {
    fn render(&self, input: &ReportInput<'_>) -> Result<Vec<u8>, ReportError> {
        let layout = build_layout(input);
        let bytes = PageWriter::new(input, &layout.title)?.write(&layout)?;
        info!(target_url = input.target, bytes = bytes.len(), "PDF report rendered.");
        Ok(bytes)
    }

    fn content_type(&self) -> &'static str {
        "application/pdf"
    }

    fn extension(&self) -> &'static str {
        "pdf"
    }
}

fn pdf_error(e: printpdf::Error) -> ReportError {
    ReportError::Pdf(format!("{e:?}"))
}

/// Stable 32-character document id for a report input.
///
/// # Arguments
/// * `input` - The report being rendered; target, findings, the partial flag
///   and the generation time all feed the id.
///
/// # Returns
/// Two 64-bit hashes as lowercase hex, so the same input always carries the
/// same id and a rescan at another time gets a new one.
fn document_id(input: &ReportInput<'_>) -> String {
    let digest = |salt: u8| {
        let mut hasher = DefaultHasher::new();
        salt.hash(&mut hasher);
        input.target.hash(&mut hasher);
        input.partial.hash(&mut hasher);
        input.generated_at.timestamp().hash(&mut hasher);
        for finding in input.findings {
            finding.name.hash(&mut hasher);
            finding.severity.to_string().hash(&mut hasher);
            finding.description.hash(&mut hasher);
            finding.url.hash(&mut hasher);
            finding.param.hash(&mut hasher);
        }
        hasher.finish()
    };
    format!("{:016x}{:016x}", digest(0), digest(1))
}

/// The document dates carry the report's own generation time, not the moment
/// the bytes were produced.
fn document_date(input: &ReportInput<'_>) -> Result<OffsetDateTime, ReportError> {
    OffsetDateTime::from_unix_timestamp(input.generated_at.timestamp())
        .map_err(|e| ReportError::Pdf(format!("generation time out of range: {e}")))
}

/// Cursor over a growing document; starts a new page when the next block
/// would cross the bottom margin.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PageWriter {
    fn new(input: &ReportInput<'_>, title: &str) -> Result<Self, ReportError> {
        let date = document_date(input)?;
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let doc = doc
            .with_document_id(document_id(input))
            .with_creation_date(date)
            .with_mod_date(date)
            .with_metadata_date(date);
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self { doc, layer, regular, bold, y: PAGE_HEIGHT - MARGIN_Y, pages: 1 })
    }

    fn write(mut self, layout: &ReportLayout) -> Result<Vec<u8>, ReportError> {
        self.heading(layout);

        match &layout.body {
            ReportBody::NoFindings(notice) => {
                self.paragraph(notice, BODY_SIZE, false, black());
            }
            ReportBody::Table(rows) => {
                self.table_header();
                for row in rows {
                    let height = row.line_count() as f32 * CELL_LINE_MM + ROW_GAP_MM;
                    if self.y - height < MARGIN_Y {
                        self.new_page();
                        self.table_header();
                    }
                    let mut x = MARGIN_X;
                    for (index, (column, lines)) in COLUMNS.iter().zip(&row.cells).enumerate() {
                        // The risk column is tinted by severity.
                        let color = if index == 1 { severity_color(row.severity) } else { black() };
                        self.layer.set_fill_color(color);
                        let mut line_y = self.y;
                        for line in lines {
                            self.layer.use_text(line.as_str(), CELL_SIZE, Mm(x), Mm(line_y), &self.regular);
                            line_y -= CELL_LINE_MM;
                        }
                        x += column.width_mm;
                    }
                    self.y -= height;
                }
            }
        }

        debug!(pages = self.pages, "Saving PDF document.");
        self.doc.save_to_bytes().map_err(pdf_error)
    }

    fn heading(&mut self, layout: &ReportLayout) {
        self.paragraph(&layout.title, TITLE_SIZE, true, brand_blue());
        self.paragraph(&layout.subtitle, SUBTITLE_SIZE, true, black());
        for line in &layout.details {
            self.paragraph(line, BODY_SIZE, false, black());
        }
        for notice in &layout.notices {
            self.paragraph(notice, BODY_SIZE, true, severity_color(Severity::Medium));
        }
        self.y -= 4.0;
    }

    fn paragraph(&mut self, text: &str, size: f32, bold: bool, color: Color) {
        // Points to millimetres, plus leading.
        let height = size * 0.3528 * 1.4;
        if self.y - height < MARGIN_Y {
            self.new_page();
        }
        self.y -= height;
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.set_fill_color(color);
        self.layer.use_text(text, size, Mm(MARGIN_X), Mm(self.y), font);
    }

    fn table_header(&mut self) {
        self.y -= CELL_LINE_MM;
        self.layer.set_fill_color(brand_blue());
        let mut x = MARGIN_X;
        for column in COLUMNS.iter() {
            self.layer.use_text(column.title, CELL_SIZE, Mm(x), Mm(self.y), &self.bold);
            x += column.width_mm;
        }
        self.y -= CELL_LINE_MM + ROW_GAP_MM;
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN_Y;
        self.pages += 1;
    }
}
