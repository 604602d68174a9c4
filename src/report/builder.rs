//! PDF rendering for report requests.
//!
//! Documents are built with `lopdf` in two passes: the page is rendered into a
//! temporary file next to the destination, then reloaded to stamp the `/Info`
//! metadata and atomically persisted over the final path. A failure at any
//! step drops the temporaries, so the destination either holds a complete
//! report or is left as it was.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use lopdf::content::{Content, Operation};
use log::warn;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tempfile::NamedTempFile;
use thiserror::Error;

use super::model::ReportRequest;

pub const DOCUMENT_TITLE: &str = "User Report";
pub const DOCUMENT_AUTHOR: &str = "PDF Report Server";
pub const DOCUMENT_SUBJECT: &str = "Generated PDF with user data";
const PAGE_TITLE: &str = "Generated Report";

// US Letter, in points.
const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 72.0;

const LOGO_WIDTH: f32 = 120.0;
const LOGO_HEIGHT: f32 = 60.0;

const TABLE_COL_WIDTHS: [f32; 2] = [100.0, 300.0];
const TABLE_ROW_HEIGHT: f32 = 18.0;
const TABLE_FONT_SIZE: f32 = 10.0;

const CHART_HEIGHT: f32 = 200.0;
const PLOT_X: f32 = 50.0;
const PLOT_Y: f32 = 50.0;
const PLOT_WIDTH: f32 = 300.0;
const PLOT_HEIGHT: f32 = 125.0;
const BAR_WIDTH: f32 = 20.0;
const MAX_TICKS: usize = 20;

/// Errors that can occur while producing a report file.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("output path '{}' has no parent directory", .0.display())]
    InvalidOutputPath(PathBuf),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to move report into place: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Renders a validated request to a file.
pub trait ReportBuilder {
    fn build(&self, request: &ReportRequest, output_path: &Path) -> Result<(), ReportError>;
}

/// Single-page report writer backed by `lopdf`.
#[derive(Debug, Clone, Default)]
pub struct PdfReportBuilder {
    logo_path: Option<PathBuf>,
}

impl PdfReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Embed the image at `path` when it exists at build time.
    pub fn with_logo(mut self, path: impl Into<PathBuf>) -> Self {
        self.logo_path = Some(path.into());
        self
    }

    fn logo(&self) -> Option<&Path> {
        self.logo_path.as_deref().filter(|p| p.is_file())
    }

    /// First pass: lay out the page.
    fn render(&self, request: &ReportRequest) -> Result<Document, ReportError> {
        if !is_single_byte_text(&request.name) {
            warn!(
                "Name {:?} has characters the report fonts cannot show; they are drawn as '?'",
                request.name
            );
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = doc.add_object(type1_font("Helvetica"));
        let bold_id = doc.add_object(type1_font("Helvetica-Bold"));

        let mut resources = dictionary! {
            "Font" => dictionary! {
                "F1" => regular_id,
                "F2" => bold_id,
            },
        };

        let mut page = PageWriter::new();
        let mut cursor = PAGE_HEIGHT - MARGIN;

        page.text("F2", 24.0, MARGIN, cursor - 24.0, PAGE_TITLE);
        cursor -= 24.0 + 12.0;

        if let Some(logo) = self.logo() {
            let image = lopdf::xobject::image(logo)?;
            let image_id = doc.add_object(image);
            resources.set("XObject", dictionary! { "Logo" => image_id });
            page.image("Logo", MARGIN, cursor - LOGO_HEIGHT, LOGO_WIDTH, LOGO_HEIGHT);
            cursor -= LOGO_HEIGHT + 12.0;
        }

        cursor = page.table(MARGIN, cursor, &table_rows(request));
        cursor -= 20.0;

        page.bar_chart(MARGIN, cursor - CHART_HEIGHT, request.score1, request.score2);

        let content_id = doc.add_object(Stream::new(dictionary! {}, page.finish().encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
        });

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        Ok(doc)
    }
}

impl ReportBuilder for PdfReportBuilder {
    fn build(&self, request: &ReportRequest, output_path: &Path) -> Result<(), ReportError> {
        let dir = output_path
            .parent()
            .map(|p| if p.as_os_str().is_empty() { Path::new(".") } else { p })
            .ok_or_else(|| ReportError::InvalidOutputPath(output_path.to_path_buf()))?;

        let mut draft = self.render(request)?;
        let mut rendered = temp_in(dir)?;
        draft.save_to(rendered.as_file_mut())?;
        rendered.as_file_mut().flush()?;

        // Second pass: reopen the rendered file and stamp metadata.
        let mut doc = Document::load(rendered.path())?;
        stamp_metadata(&mut doc);

        let mut finished = temp_in(dir)?;
        doc.save_to(finished.as_file_mut())?;
        finished.as_file_mut().sync_all()?;
        finished.persist(output_path)?;

        Ok(())
    }
}

fn temp_in(dir: &Path) -> Result<NamedTempFile, ReportError> {
    Ok(tempfile::Builder::new()
        .prefix(".report-")
        .suffix(".tmp")
        .tempfile_in(dir)?)
}

fn stamp_metadata(doc: &mut Document) {
    let created = format!("D:{}Z", Utc::now().format("%Y%m%d%H%M%S"));
    let info_id: ObjectId = doc.add_object(dictionary! {
        "Title" => text_object(DOCUMENT_TITLE),
        "Author" => text_object(DOCUMENT_AUTHOR),
        "Subject" => text_object(DOCUMENT_SUBJECT),
        "Producer" => text_object(concat!("pdf-report-server ", env!("CARGO_PKG_VERSION"))),
        "CreationDate" => text_object(&created),
    });
    doc.trailer.set("Info", info_id);
}

fn type1_font(base: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Whether every character of `text` survives [`text_object`] unchanged.
pub fn is_single_byte_text(text: &str) -> bool {
    text.chars().all(|c| u32::from(c) <= 0xFF)
}

/// Literal string in the single-byte encoding used by the standard fonts.
/// Characters above U+00FF become `?`.
fn text_object(text: &str) -> Object {
    let bytes = text
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect();
    Object::String(bytes, StringFormat::Literal)
}

/// Key/value rows shown in the report table.
pub fn table_rows(request: &ReportRequest) -> Vec<(&'static str, String)> {
    vec![
        ("Name", request.name.clone()),
        ("Age", request.age.to_string()),
        ("Score 1", format_score(request.score1)),
        ("Score 2", format_score(request.score2)),
        ("Total", format_score(request.total())),
        ("Average", format!("{:.2}", request.average())),
    ]
}

/// Scores keep one decimal when whole, e.g. `92.0`.
pub fn format_score(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Upper bound and tick step for the chart's value axis.
pub fn value_axis(score1: f64, score2: f64) -> (f64, f64) {
    let max = score1.max(score2) + 10.0;
    let step = (max.floor() / 5.0).floor().max(1.0);
    (max, step)
}

/// Accumulates content-stream operations for one page.
struct PageWriter {
    operations: Vec<Operation>,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.operations.push(Operation::new(operator, operands));
    }

    fn finish(self) -> Content {
        Content {
            operations: self.operations,
        }
    }

    fn text(&mut self, font: &str, size: f32, x: f32, y: f32, value: &str) {
        self.op("BT", vec![]);
        self.op("Tf", vec![Object::Name(font.as_bytes().to_vec()), size.into()]);
        self.op("Td", vec![x.into(), y.into()]);
        self.op("Tj", vec![text_object(value)]);
        self.op("ET", vec![]);
    }

    fn fill_gray(&mut self, level: f32) {
        self.op("g", vec![level.into()]);
    }

    fn stroke_gray(&mut self, level: f32) {
        self.op("G", vec![level.into()]);
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, paint: &str) {
        self.op("re", vec![x.into(), y.into(), w.into(), h.into()]);
        self.op(paint, vec![]);
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.op("m", vec![x1.into(), y1.into()]);
        self.op("l", vec![x2.into(), y2.into()]);
        self.op("S", vec![]);
    }

    fn image(&mut self, name: &str, x: f32, y: f32, w: f32, h: f32) {
        self.op("q", vec![]);
        self.op(
            "cm",
            vec![w.into(), 0.into(), 0.into(), h.into(), x.into(), y.into()],
        );
        self.op("Do", vec![Object::Name(name.as_bytes().to_vec())]);
        self.op("Q", vec![]);
    }

    /// Draw a gridded two-column table with its top-left corner at
    /// (`x`, `top`); returns the y coordinate of its bottom edge.
    fn table(&mut self, x: f32, top: f32, rows: &[(&str, String)]) -> f32 {
        let width: f32 = TABLE_COL_WIDTHS.iter().sum();
        self.op("w", vec![1.into()]);

        for (index, (label, value)) in rows.iter().enumerate() {
            let row_top = top - TABLE_ROW_HEIGHT * index as f32;
            let row_bottom = row_top - TABLE_ROW_HEIGHT;

            // Header row light grey, body rows white smoke.
            self.fill_gray(if index == 0 { 0.83 } else { 0.96 });
            self.rect(x, row_bottom, width, TABLE_ROW_HEIGHT, "f");

            self.stroke_gray(0.0);
            let mut cell_x = x;
            for col_width in TABLE_COL_WIDTHS {
                self.rect(cell_x, row_bottom, col_width, TABLE_ROW_HEIGHT, "S");
                cell_x += col_width;
            }

            self.fill_gray(0.0);
            let baseline = row_bottom + 5.0;
            self.text("F1", TABLE_FONT_SIZE, x + 6.0, baseline, label);
            self.text("F1", TABLE_FONT_SIZE, x + TABLE_COL_WIDTHS[0] + 6.0, baseline, value);
        }

        top - TABLE_ROW_HEIGHT * rows.len() as f32
    }

    /// Vertical bar chart of two scores inside a drawing whose lower-left
    /// corner is (`x`, `y`).
    fn bar_chart(&mut self, x: f32, y: f32, score1: f64, score2: f64) {
        let (max, step) = value_axis(score1, score2);
        let origin_x = x + PLOT_X;
        let origin_y = y + PLOT_Y;
        let scale = |v: f64| ((v / max) as f32 * PLOT_HEIGHT).max(0.0);

        self.stroke_gray(0.0);
        self.op("w", vec![1.into()]);
        self.rect(origin_x, origin_y, PLOT_WIDTH, PLOT_HEIGHT, "S");

        // Value axis ticks and labels.
        let mut tick = 0.0;
        for _ in 0..=MAX_TICKS {
            if tick > max {
                break;
            }
            let ty = origin_y + scale(tick);
            self.line(origin_x - 5.0, ty, origin_x, ty);
            self.fill_gray(0.0);
            self.text("F1", 8.0, x + 10.0, ty - 3.0, &format!("{}", tick));
            tick += step;
        }

        let category_width = PLOT_WIDTH / 2.0;
        for (index, (label, score)) in [("Score 1", score1), ("Score 2", score2)]
            .into_iter()
            .enumerate()
        {
            let bar_x = origin_x + category_width * index as f32 + (category_width - BAR_WIDTH) / 2.0;
            let bar_height = scale(score);

            self.op("rg", vec![0.2_f32.into(), 0.4_f32.into(), 0.8_f32.into()]);
            self.rect(bar_x, origin_y, BAR_WIDTH, bar_height, "B");

            self.fill_gray(0.0);
            self.text("F1", 9.0, bar_x - 8.0, origin_y - 14.0, label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ReportRequest {
        ReportRequest {
            name: "Alice Example".to_string(),
            age: 30,
            score1: 88.5,
            score2: 92.0,
            filename: None,
        }
    }

    #[test]
    fn test_table_rows() {
        let rows = table_rows(&request());
        let expected = [
            ("Name", "Alice Example"),
            ("Age", "30"),
            ("Score 1", "88.5"),
            ("Score 2", "92.0"),
            ("Total", "180.5"),
            ("Average", "90.25"),
        ];

        assert_eq!(rows.len(), 6);
        for ((label, value), (want_label, want_value)) in rows.iter().zip(expected) {
            assert_eq!(*label, want_label);
            assert_eq!(value, want_value);
        }
    }

    #[test]
    fn test_average_two_decimals() {
        let mut req = request();
        req.score1 = 1.0;
        req.score2 = 0.0;
        let rows = table_rows(&req);
        assert_eq!(rows[5].1, "0.50");
    }

    #[test]
    fn test_value_axis() {
        assert_eq!(value_axis(88.5, 92.0), (102.0, 20.0));
        assert_eq!(value_axis(0.0, 0.0), (10.0, 2.0));
        assert_eq!(value_axis(1e300, 0.0).1, (1e300_f64 / 5.0).floor());
    }

    #[test]
    fn test_text_object_replaces_wide_chars() {
        match text_object("Zoë 名") {
            Object::String(bytes, _) => assert_eq!(bytes, vec![b'Z', b'o', 0xEB, b' ', b'?']),
            other => panic!("unexpected object {:?}", other),
        }
    }

    #[test]
    fn test_single_byte_text_detection() {
        assert!(is_single_byte_text("Zoë Ñúñez"));
        assert!(!is_single_byte_text("名前"));
        assert!(!is_single_byte_text("Łukasz"));
    }

    // 2x2 RGB PNG.
    const LOGO_PNG: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x02, 0x08, 0x02, 0x00, 0x00, 0x00, 0xFD,
        0xD4, 0x9A, 0x73, 0x00, 0x00, 0x00, 0x10, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x30,
        0x4E, 0x3B, 0x03, 0x44, 0x0C, 0x10, 0x0A, 0x00, 0x24, 0xB6, 0x05, 0x95, 0x26, 0xBA, 0x45,
        0xE5, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    #[test]
    fn test_build_embeds_logo_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let logo = dir.path().join("logo.png");
        std::fs::write(&logo, LOGO_PNG).unwrap();
        let path = dir.path().join("with_logo.pdf");

        PdfReportBuilder::new()
            .with_logo(logo.clone())
            .build(&request(), &path)
            .unwrap();

        let doc = Document::load(&path).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        let resources = match page.get(b"Resources").unwrap() {
            Object::Dictionary(dict) => dict.clone(),
            Object::Reference(id) => doc.get_dictionary(*id).unwrap().clone(),
            other => panic!("unexpected resources {:?}", other),
        };
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let logo_id = xobjects.get(b"Logo").unwrap().as_reference().unwrap();
        let image = doc.get_object(logo_id).unwrap().as_stream().unwrap();
        assert_eq!(image.dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Image");

        let content = doc.get_and_decode_page_content(page_id).unwrap();
        assert!(content.operations.iter().any(|op| {
            op.operator == "Do"
                && matches!(op.operands.first(), Some(Object::Name(name)) if name.as_slice() == b"Logo")
        }));
    }

    #[test]
    fn test_build_writes_pdf_with_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alice_report.pdf");

        PdfReportBuilder::new()
            .with_logo(dir.path().join("missing-logo.png"))
            .build(&request(), &path)
            .unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));

        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.get_pages().len(), 1);

        let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = doc.get_dictionary(info_id).unwrap();
        match info.get(b"Title").unwrap() {
            Object::String(title, _) => assert_eq!(title.as_slice(), DOCUMENT_TITLE.as_bytes()),
            other => panic!("unexpected title {:?}", other),
        }

        // Only the final file remains; temporaries are cleaned up.
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_build_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("report.pdf");

        let result = PdfReportBuilder::new().build(&request(), &path);
        assert!(matches!(result, Err(ReportError::Io(_))));
        assert!(!path.exists());
    }
}
