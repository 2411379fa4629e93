// src/report/mod.rs

//! Turns collected findings into a downloadable document.
//!
//! Rendering is split in two: [`build_layout`] decides *what* goes on the page
//! (ordering, truncation, wrapping, notices) and a [`ReportRenderer`] decides
//! *how* it is painted. Only the PDF renderer exists today.

pub mod pdf;
pub mod store;

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::core::models::{Finding, ScanOutcome, ScanSummary, Severity};

pub use self::pdf::PdfReport;
pub use self::store::{ReportStore, StoredReport};

pub const REPORT_TITLE: &str = "SecureNexus";
pub const REPORT_SUBTITLE: &str = "Web Vulnerability Scan Report";

/// Shown instead of an empty table.
pub const NO_FINDINGS_NOTICE: &str = "No alerts found.";
pub const PARTIAL_RESULTS_NOTICE: &str =
    "The scan reached its time limit before finishing; these results may be partial.";

/// Hard cap on any single free-text field before wrapping.
pub const MAX_FIELD_CHARS: usize = 600;
const ELLIPSIS: &str = "...";

/// Approximate advance of one Helvetica glyph at the 8pt table size.
pub const CHAR_WIDTH_MM: f32 = 1.45;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("PDF rendering failed: {0}")]
    Pdf(String),
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// A table column: its header, printed width and how many wrapped lines a
/// cell may take before it is cut.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub title: &'static str,
    pub width_mm: f32,
    pub max_lines: usize,
}

impl Column {
    pub fn chars(&self) -> usize {
        (self.width_mm / CHAR_WIDTH_MM).floor() as usize
    }
}

pub const COLUMNS: [Column; 5] = [
    Column { title: "Alert", width_mm: 36.0, max_lines: 4 },
    Column { title: "Risk", width_mm: 20.0, max_lines: 1 },
    Column { title: "Description", width_mm: 70.0, max_lines: 10 },
    Column { title: "URL", width_mm: 44.0, max_lines: 4 },
    Column { title: "Parameter", width_mm: 20.0, max_lines: 3 },
];

/// Everything a renderer needs for one report.
#[derive(Debug, Clone)]
pub struct ReportInput<'a> {
    pub target: &'a str,
    pub findings: &'a [Finding],
    /// Set when the scan stopped at a time ceiling.
    pub partial: bool,
    pub generated_at: DateTime<Local>,
}

impl<'a> ReportInput<'a> {
    pub fn new(target: &'a str, findings: &'a [Finding]) -> Self {
        Self { target, findings, partial: false, generated_at: Local::now() }
    }

    /// `None` for outcomes that carry no findings to report on.
    pub fn from_outcome(target: &'a str, outcome: &'a ScanOutcome) -> Option<Self> {
        outcome.findings().map(|findings| Self {
            partial: outcome.is_timed_out(),
            ..Self::new(target, findings)
        })
    }

    pub fn generated_at(mut self, at: DateTime<Local>) -> Self {
        self.generated_at = at;
        self
    }
}

/// Produces document bytes from a report input.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, input: &ReportInput<'_>) -> Result<Vec<u8>, ReportError>;

    fn content_type(&self) -> &'static str;

    fn extension(&self) -> &'static str;
}

// --- Layout ---

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRow {
    pub severity: Severity,
    /// Pre-wrapped lines, one entry per [`COLUMNS`] column.
    pub cells: Vec<Vec<String>>,
}

impl LayoutRow {
    pub fn line_count(&self) -> usize {
        self.cells.iter().map(Vec::len).max().unwrap_or(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportBody {
    NoFindings(String),
    Table(Vec<LayoutRow>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub title: String,
    pub subtitle: String,
    pub details: Vec<String>,
    pub notices: Vec<String>,
    pub body: ReportBody,
}

/// Builds the page content. Identical input yields an identical layout.
pub fn build_layout(input: &ReportInput<'_>) -> ReportLayout {
    let summary = ScanSummary::from_findings(input.findings);
    let details = vec![
        format!("Scanned URL: {}", truncate_chars(&sanitize(input.target), 120)),
        format!("Scan Time: {}", input.generated_at.format("%Y-%m-%d %H:%M:%S")),
        format!(
            "Findings: {} total (High {}, Medium {}, Low {}, Informational {})",
            summary.total(),
            summary.high,
            summary.medium,
            summary.low,
            summary.informational
        ),
    ];

    let mut notices = Vec::new();
    if input.partial {
        notices.push(PARTIAL_RESULTS_NOTICE.to_string());
    }

    let body = if input.findings.is_empty() {
        ReportBody::NoFindings(NO_FINDINGS_NOTICE.to_string())
    } else {
        let mut ordered: Vec<&Finding> = input.findings.iter().collect();
        // Stable, so engine order is kept within a severity.
        ordered.sort_by(|a, b| b.severity.cmp(&a.severity));
        ReportBody::Table(ordered.into_iter().map(layout_row).collect())
    };

    ReportLayout {
        title: REPORT_TITLE.to_string(),
        subtitle: REPORT_SUBTITLE.to_string(),
        details,
        notices,
        body,
    }
}

fn layout_row(finding: &Finding) -> LayoutRow {
    let severity = finding.severity.to_string();
    let values = [
        finding.name.as_str(),
        severity.as_str(),
        finding.description.as_str(),
        finding.url.as_str(),
        finding.param.as_str(),
    ];
    let cells = COLUMNS
        .iter()
        .zip(values)
        .map(|(column, value)| wrap_text(value, column.chars(), column.max_lines))
        .collect();
    LayoutRow { severity: finding.severity, cells }
}

// --- Text helpers ---

/// Reduces text to what the built-in PDF fonts can draw.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\n' | '\r' | '\t' => ' ',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '?',
        })
        .collect()
}

/// Cuts `text` to at most `max` characters, marking the cut with "...".
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(ELLIPSIS.len());
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str(ELLIPSIS);
    cut
}

/// Word-wraps `text` into lines of at most `width` characters, keeping at most
/// `max_lines` lines. Overlong words are split; dropped text is marked.
pub fn wrap_text(text: &str, width: usize, max_lines: usize) -> Vec<String> {
    let width = width.max(ELLIPSIS.len() + 1);
    let max_lines = max_lines.max(1);
    let text = truncate_chars(&sanitize(text), MAX_FIELD_CHARS);

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..width).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }
        if current.is_empty() {
            current = word;
        } else if current.len() + 1 + word.len() <= width {
            current.push(' ');
            current.push_str(&word);
        } else {
            lines.push(std::mem::replace(&mut current, word));
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            let room = width - ELLIPSIS.len();
            if last.len() > room {
                last.truncate(room);
            }
            last.push_str(ELLIPSIS);
        }
    }
    lines
}
