//! Per-document analysis: classification, family extraction, and text
//! statistics, combined into one [`DocumentMetadata`].

use std::sync::LazyLock;

use regex::Regex;

use crate::classify::classify;
use crate::families;
use crate::models::{DocumentMetadata, DocumentType, ExtractedData, ExtractedText};

static PHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]{10,}").unwrap());
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.-]+@[\w.-]+\.\w+").unwrap());

/// Word, line, phone, and email statistics over `text`.
pub fn extracted_data(text: &str) -> ExtractedData {
    ExtractedData {
        word_count: text.split_whitespace().count(),
        line_count: text.split('\n').count(),
        has_phone_numbers: PHONE.is_match(text),
        has_emails: EMAIL.is_match(text),
    }
}

/// Analyze raw text. Free-text family extraction only runs for family lists.
pub fn analyze_document(text: &str, filename: &str) -> DocumentMetadata {
    let document_type = classify(text, filename);
    let extracted_families = match document_type {
        DocumentType::FamilyList => Some(families::extract_from_text(text)),
        _ => None,
    };

    DocumentMetadata {
        filename: filename.to_string(),
        document_type,
        extracted_families,
        extracted_data: extracted_data(text),
    }
}

/// Analyze extracted content, preferring workbook families over free-text ones.
///
/// When the document came with a cell grid and the tabular extractor found
/// at least one family, those families replace whatever the text pass found.
pub fn analyze_extracted(extracted: &ExtractedText) -> DocumentMetadata {
    let mut metadata = analyze_document(&extracted.raw_text, &extracted.source_filename);

    if let Some(sheets) = &extracted.workbook {
        let tabular = families::extract_from_workbook(sheets);
        if !tabular.is_empty() {
            tracing::debug!(
                filename = %extracted.source_filename,
                families = tabular.len(),
                "using families from workbook cells"
            );
            metadata.extracted_families = Some(tabular);
        }
    }

    metadata
}
