//! Core data models used throughout Sadaqa.
//!
//! These types represent the documents, family records, chunks, and vector
//! records that flow through the ingestion and retrieval pipeline. Types that
//! cross the wire serialize in camelCase to match the vector-store record
//! shape and the ingestion response.

use serde::{Deserialize, Serialize};

/// District used when a record carries none.
pub const UNSPECIFIED_DISTRICT: &str = "Unspecified";
/// Needs entry used when no need was detected.
pub const GENERAL_AID: &str = "General aid";
/// Needs entry for records recovered from a bare line with no context.
pub const INFORMATION_TO_COMPLETE: &str = "Information to complete";

/// A file as submitted for ingestion.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// A single worksheet as a grid of trimmed cell strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

/// Plain text extracted from an [`UploadedDocument`].
///
/// `workbook` is only set for spreadsheets, so the tabular extractor can
/// work on the cell grid instead of re-parsing text.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub raw_text: String,
    pub source_filename: String,
    pub workbook: Option<Vec<Sheet>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// A family in need, as recovered from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyRecord {
    pub name: String,
    pub district: String,
    pub members: u32,
    pub needs: Vec<String>,
    pub priority: Priority,
}

impl FamilyRecord {
    /// Build a record, applying the field defaults.
    ///
    /// Returns `None` when the trimmed name is shorter than two characters.
    pub fn new(
        name: &str,
        district: &str,
        members: u32,
        needs: Vec<String>,
        priority: Priority,
    ) -> Option<Self> {
        let name = name.trim();
        if name.chars().count() < 2 {
            return None;
        }
        let district = district.trim();
        let needs: Vec<String> = needs
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        Some(Self {
            name: name.to_string(),
            district: if district.is_empty() {
                UNSPECIFIED_DISTRICT.to_string()
            } else {
                district.to_string()
            },
            members,
            needs: if needs.is_empty() {
                vec![GENERAL_AID.to_string()]
            } else {
                needs
            },
            priority,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    FamilyList,
    Inventory,
    ZakatGuide,
    Other,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::FamilyList => "family_list",
            DocumentType::Inventory => "inventory",
            DocumentType::ZakatGuide => "zakat_guide",
            DocumentType::Other => "other",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cheap statistics computed over the whole extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedData {
    pub word_count: usize,
    pub line_count: usize,
    pub has_phone_numbers: bool,
    pub has_emails: bool,
}

/// Per-document analysis result, created once per ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub filename: String,
    pub document_type: DocumentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_families: Option<Vec<FamilyRecord>>,
    pub extracted_data: ExtractedData,
}

impl DocumentMetadata {
    pub fn family_count(&self) -> usize {
        self.extracted_families.as_ref().map_or(0, Vec::len)
    }
}

/// A window of normalized document text. `index` is its permanent position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub index: usize,
    pub text: String,
}

/// Metadata stored alongside each vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    pub filename: String,
    pub chunk_index: usize,
    pub text: String,
    /// ISO-8601 ingestion time.
    pub timestamp: String,
    pub document_type: DocumentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_families: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_phone_numbers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_emails: Option<bool>,
}

/// One record as written to the vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: RecordMetadata,
}

/// Build the record id: `<filename>-<chunk index>-<ingestion millis>`.
pub fn record_id(filename: &str, chunk_index: usize, timestamp_millis: i64) -> String {
    format!("{}-{}-{}", filename, chunk_index, timestamp_millis)
}

/// A nearest-neighbour hit returned by a vector store query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    /// Store similarity (cosine by convention). A relevance signal, not a probability.
    pub score: f32,
    /// Raw stored metadata. Kept as JSON since records written by other
    /// versions may carry extra or missing fields.
    pub metadata: serde_json::Value,
}

impl QueryMatch {
    pub fn filename(&self) -> Option<&str> {
        self.metadata.get("filename").and_then(|v| v.as_str())
    }

    pub fn chunk_index(&self) -> Option<u64> {
        self.metadata.get("chunkIndex").and_then(|v| v.as_u64())
    }

    pub fn text(&self) -> &str {
        self.metadata
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }
}

/// A retrieved passage as shown to the model and returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedPassage {
    pub source_label: String,
    pub similarity_score: f32,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_defaults_applied() {
        let f = FamilyRecord::new("  Ben Ali ", " ", 0, vec![" ".into()], Priority::Medium)
            .unwrap();
        assert_eq!(f.name, "Ben Ali");
        assert_eq!(f.district, UNSPECIFIED_DISTRICT);
        assert_eq!(f.needs, vec![GENERAL_AID.to_string()]);
    }

    #[test]
    fn short_names_rejected() {
        assert!(FamilyRecord::new(" A ", "x", 1, vec![], Priority::Low).is_none());
    }

    #[test]
    fn record_metadata_serializes_camel_case_and_skips_absent() {
        let meta = RecordMetadata {
            filename: "f.txt".into(),
            chunk_index: 3,
            text: "hello".into(),
            timestamp: "2026-03-01T00:00:00Z".into(),
            document_type: DocumentType::ZakatGuide,
            has_families: None,
            family_count: None,
            word_count: Some(1),
            has_phone_numbers: Some(false),
            has_emails: Some(false),
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["chunkIndex"], 3);
        assert_eq!(json["documentType"], "zakat_guide");
        assert!(json.get("hasFamilies").is_none());
    }

    #[test]
    fn record_id_embeds_chunk_index() {
        assert_eq!(record_id("liste.xlsx", 4, 1700), "liste.xlsx-4-1700");
    }
}
