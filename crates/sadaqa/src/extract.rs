//! Text extraction for uploaded documents (PDF, plain text, Excel).
//!
//! The format is chosen from the declared MIME type first and the filename
//! extension second, since browsers and scripts often send
//! `application/octet-stream`. Workbooks are read with `calamine`, which
//! handles both `.xlsx` and legacy `.xls`; their cell grid is returned
//! alongside the text so family extraction can work on columns.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use sadaqa_core::models::{ExtractedText, Sheet};
use sadaqa_core::{Error, Result};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const MIME_XLS: &str = "application/vnd.ms-excel";

/// Extensions accepted at the ingestion boundary.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "txt", "xlsx", "xls"];

/// Separator between non-empty cells of a workbook row.
const CELL_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Pdf,
    Text,
    Spreadsheet,
}

impl FileFormat {
    fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            MIME_PDF => Some(FileFormat::Pdf),
            MIME_TEXT => Some(FileFormat::Text),
            MIME_XLSX | MIME_XLS => Some(FileFormat::Spreadsheet),
            _ => None,
        }
    }

    fn from_filename(filename: &str) -> Option<Self> {
        match file_extension(filename)?.as_str() {
            "pdf" => Some(FileFormat::Pdf),
            "txt" => Some(FileFormat::Text),
            "xlsx" | "xls" => Some(FileFormat::Spreadsheet),
            _ => None,
        }
    }

    /// MIME type first, extension second.
    pub fn detect(mime: &str, filename: &str) -> Result<Self> {
        Self::from_mime(mime)
            .or_else(|| Self::from_filename(filename))
            .ok_or_else(|| {
                let shown = if mime.trim().is_empty() { filename } else { mime };
                Error::UnsupportedFormat(shown.to_string())
            })
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileFormat::Pdf => "PDF",
            FileFormat::Text => "text",
            FileFormat::Spreadsheet => "Excel",
        }
    }
}

/// Lower-cased extension of `filename`, without the dot.
pub fn file_extension(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Extract plain text from `bytes`.
pub fn extract_text(bytes: &[u8], mime: &str, filename: &str) -> Result<ExtractedText> {
    let format = FileFormat::detect(mime, filename)?;
    tracing::debug!(filename, format = format.label(), bytes = bytes.len(), "extracting text");

    let (raw_text, workbook) = match format {
        FileFormat::Pdf => (extract_pdf(bytes)?, None),
        FileFormat::Text => (String::from_utf8_lossy(bytes).into_owned(), None),
        FileFormat::Spreadsheet => {
            let sheets = read_workbook(bytes)?;
            (workbook_text(&sheets)?, Some(sheets))
        }
    };

    Ok(ExtractedText {
        raw_text,
        source_filename: filename.to_string(),
        workbook,
    })
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| Error::Extraction {
        format: FileFormat::Pdf.label().to_string(),
        message: e.to_string(),
    })
}

fn spreadsheet_error(e: impl std::fmt::Display) -> Error {
    Error::Extraction {
        format: FileFormat::Spreadsheet.label().to_string(),
        message: e.to_string(),
    }
}

/// Every worksheet as a grid of trimmed cell strings.
pub fn read_workbook(bytes: &[u8]) -> Result<Vec<Sheet>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(spreadsheet_error)?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name).map_err(spreadsheet_error)?;
        let rows = range
            .rows()
            .map(|row| row.iter().map(|cell| cell_to_string(cell).trim().to_string()).collect())
            .collect();
        sheets.push(Sheet { name, rows });
    }
    Ok(sheets)
}

/// Convert a cell to text. Whole numbers lose their `.0`.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{:.0}", f)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => format!("{}", dt),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERR:{:?}", e),
    }
}

/// Render sheets as pipe-delimited rows, falling back to CSV when no row
/// has a non-empty cell.
fn workbook_text(sheets: &[Sheet]) -> Result<String> {
    let text = sheets
        .iter()
        .flat_map(|sheet| sheet.rows.iter())
        .map(|row| {
            row.iter()
                .filter(|c| !c.is_empty())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(CELL_SEPARATOR)
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if !text.trim().is_empty() {
        return Ok(text);
    }

    let mut parts = Vec::new();
    for sheet in sheets {
        let csv = sheet_to_csv(sheet)?;
        if !csv.is_empty() {
            parts.push(format!("Sheet: {}\n{}", sheet.name, csv));
        }
    }
    Ok(parts.join("\n\n"))
}

fn sheet_to_csv(sheet: &Sheet) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for row in &sheet.rows {
        writer.write_record(row).map_err(spreadsheet_error)?;
    }
    let bytes = writer.into_inner().map_err(spreadsheet_error)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
