//! Snapshot exporters for the Elimu QA console
//!
//! Every list screen offers "download what I'm looking at" in four
//! formats. The input is always a [`TableSnapshot`] holding the filtered
//! (or selected) rows a table view is currently showing, so the exporters
//! never talk to the backend and never see domain types.
//!
//! CSV is built by hand; XLSX, DOCX and PDF go through their generator
//! crates. An empty snapshot is not an error anywhere: it exports the
//! header row and nothing else.

use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};
use log::debug;
use printpdf::{BuiltinFont, Mm, PdfDocument, PdfLayerReference};
use rust_xlsxwriter::{Format, Workbook};
use std::io::Cursor;
use thiserror::Error;

pub use elimu_qa_table::TableSnapshot;

/// Result type
pub type Result<T> = std::result::Result<T, ExportError>;

/// Error type
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("DOCX error: {0}")]
    Docx(String),

    #[error("PDF error: {0}")]
    Pdf(String),
}

impl ExportError {
    /// Operator-facing message, suitable for a notification toast.
    pub fn user_message(&self) -> String {
        match self {
            ExportError::Xlsx(_) => {
                "The Excel export could not be generated. Please try again.".to_string()
            }
            ExportError::Docx(_) => {
                "The Word export could not be generated. Please try again.".to_string()
            }
            ExportError::Pdf(_) => {
                "The PDF export could not be generated. Please try again.".to_string()
            }
        }
    }
}

/// The download formats offered on the list screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Docx,
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Docx => "docx",
            ExportFormat::Pdf => "pdf",
        }
    }
}

/// Stamp the right extension onto a download name.
pub fn file_name(base: &str, format: ExportFormat) -> String {
    format!("{}.{}", base.trim(), format.extension())
}

fn csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn csv_row(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Serialize a snapshot as CSV. An empty snapshot yields only the
/// header line.
pub fn to_csv(snapshot: &TableSnapshot) -> String {
    let mut out = String::new();
    out.push_str(&csv_row(&snapshot.headers));
    out.push('\n');
    for row in &snapshot.rows {
        out.push_str(&csv_row(row));
        out.push('\n');
    }
    debug!("exported {} rows as CSV", snapshot.rows.len());
    out
}

/// Serialize a snapshot as a single-sheet XLSX workbook with a bold
/// header row.
pub fn to_xlsx(snapshot: &TableSnapshot) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let bold = Format::new().set_bold();

    for (col, header) in snapshot.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &bold)?;
    }
    for (row_index, row) in snapshot.rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            worksheet.write_string((row_index + 1) as u32, col as u16, cell)?;
        }
    }

    debug!("exported {} rows as XLSX", snapshot.rows.len());
    Ok(workbook.save_to_buffer()?)
}

fn docx_row(cells: &[String]) -> TableRow {
    TableRow::new(
        cells
            .iter()
            .map(|cell| {
                TableCell::new()
                    .add_paragraph(Paragraph::new().add_run(Run::new().add_text(cell.as_str())))
            })
            .collect(),
    )
}

/// Serialize a snapshot as a DOCX document: a title paragraph followed
/// by one table.
pub fn to_docx(snapshot: &TableSnapshot, title: &str) -> Result<Vec<u8>> {
    let mut rows = vec![docx_row(&snapshot.headers)];
    rows.extend(snapshot.rows.iter().map(|row| docx_row(row)));

    let mut cursor = Cursor::new(Vec::new());
    Docx::new()
        .add_paragraph(Paragraph::new().add_run(Run::new().add_text(title)))
        .add_table(Table::new(rows))
        .build()
        .pack(&mut cursor)
        .map_err(|e| ExportError::Docx(e.to_string()))?;
    debug!("exported {} rows as DOCX", snapshot.rows.len());
    Ok(cursor.into_inner())
}

/// Serialize a snapshot as a landscape-A4 PDF with a simple row grid,
/// breaking onto new pages as rows run out of space.
pub fn to_pdf(snapshot: &TableSnapshot, title: &str) -> Result<Vec<u8>> {
    const PAGE_W: f32 = 297.0;
    const PAGE_H: f32 = 210.0;
    const MARGIN_X: f32 = 12.0;
    const TOP_Y: f32 = 196.0;
    const BOTTOM_Y: f32 = 14.0;
    const ROW_STEP: f32 = 7.0;

    let (doc, page1, layer1) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "table");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;

    let columns = snapshot.headers.len().max(1);
    let col_width = (PAGE_W - 2.0 * MARGIN_X) / columns as f32;

    let draw_row = |layer: &PdfLayerReference,
                    y: f32,
                    size: f32,
                    font: &printpdf::IndirectFontRef,
                    cells: &[String]| {
        for (i, cell) in cells.iter().enumerate() {
            let x = MARGIN_X + i as f32 * col_width;
            layer.begin_text_section();
            layer.set_font(font, size);
            layer.set_text_cursor(Mm(x), Mm(y));
            layer.write_text(cell.as_str(), font);
            layer.end_text_section();
        }
    };

    let mut layer = doc.get_page(page1).get_layer(layer1);
    let mut y = TOP_Y;

    // Title, then the header row on every page.
    layer.begin_text_section();
    layer.set_font(&font_bold, 14.0);
    layer.set_text_cursor(Mm(MARGIN_X), Mm(y));
    layer.write_text(title, &font_bold);
    layer.end_text_section();
    y -= ROW_STEP * 1.5;
    draw_row(&layer, y, 10.0, &font_bold, &snapshot.headers);
    y -= ROW_STEP;

    for row in &snapshot.rows {
        if y < BOTTOM_Y {
            let (page, page_layer) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "table");
            layer = doc.get_page(page).get_layer(page_layer);
            y = TOP_Y;
            draw_row(&layer, y, 10.0, &font_bold, &snapshot.headers);
            y -= ROW_STEP;
        }
        draw_row(&layer, y, 9.0, &font, row);
        y -= ROW_STEP;
    }

    debug!("exported {} rows as PDF", snapshot.rows.len());
    doc.save_to_bytes().map_err(|e| ExportError::Pdf(e.to_string()))
}
