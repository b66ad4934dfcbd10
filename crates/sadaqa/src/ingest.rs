//! Document ingestion.
//!
//! Upload → validate → extract → analyze → chunk → embed → upsert.
//!
//! Every failure is turned into an [`IngestOutcome`] with `success: false`
//! and a one-sentence error; nothing escapes as a panic or a raw provider
//! error. Embedding failures never fail an ingestion, they degrade to
//! simulated vectors inside [`Embedder`].

use serde::Serialize;

use sadaqa_core::analysis::analyze_extracted;
use sadaqa_core::chunk::chunk_text;
use sadaqa_core::embedding::{Embedder, TaskType};
use sadaqa_core::models::{
    record_id, DocumentMetadata, DocumentType, FamilyRecord, RecordMetadata, TextChunk,
    UploadedDocument, VectorRecord,
};
use sadaqa_core::store::{upsert_in_batches, VectorStore};
use sadaqa_core::{Error, Result};

use crate::app::App;
use crate::config::IngestConfig;
use crate::extract::{extract_text, file_extension, ALLOWED_EXTENSIONS};

/// Result of one ingestion, as returned to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_families: Option<Vec<FamilyRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
}

impl IngestOutcome {
    fn failure(error: &Error) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.user_message()),
            extracted_families: None,
            document_type: None,
        }
    }
}

/// What a successful ingestion produced.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub metadata: DocumentMetadata,
    pub chunks: usize,
    pub batches: usize,
    pub store: String,
}

impl IngestReport {
    pub fn message(&self) -> String {
        let mut message = format!(
            "Document \"{}\" indexed successfully. {} chunks created and stored in {}.",
            self.metadata.filename, self.chunks, self.store
        );
        let families = self.metadata.family_count();
        if families > 0 {
            message.push_str(&format!(" {} family(ies) detected.", families));
        }
        if self.metadata.document_type != DocumentType::Other {
            message.push_str(&format!(" Type: {}.", self.metadata.document_type));
        }
        message
    }

    fn into_outcome(self) -> IngestOutcome {
        let message = self.message();
        IngestOutcome {
            success: true,
            message: Some(message),
            error: None,
            extracted_families: self.metadata.extracted_families,
            document_type: Some(self.metadata.document_type),
        }
    }
}

/// Ingest `document` with the application's embedder and store.
pub async fn ingest(app: &App, document: UploadedDocument) -> IngestOutcome {
    let filename = document.filename.clone();
    let result = async {
        let store = app.store().await?;
        ingest_with(app.embedder(), store.as_ref(), &app.config().ingest, document).await
    }
    .await;

    match result {
        Ok(report) => {
            tracing::info!(
                filename = %filename,
                chunks = report.chunks,
                batches = report.batches,
                families = report.metadata.family_count(),
                document_type = %report.metadata.document_type,
                "document indexed"
            );
            report.into_outcome()
        }
        Err(e) => {
            tracing::error!(filename = %filename, error = %e, "ingestion failed");
            IngestOutcome::failure(&e)
        }
    }
}

/// The pipeline itself, independent of how its collaborators were built.
pub async fn ingest_with(
    embedder: &Embedder,
    store: &dyn VectorStore,
    config: &IngestConfig,
    document: UploadedDocument,
) -> Result<IngestReport> {
    validate_upload(&document, config)?;

    let extracted = extract_text(&document.bytes, &document.mime_type, &document.filename)?;
    let metadata = analyze_extracted(&extracted);
    tracing::debug!(
        filename = %document.filename,
        document_type = %metadata.document_type,
        families = metadata.family_count(),
        words = metadata.extracted_data.word_count,
        "document analyzed"
    );

    let chunks = chunk_text(&extracted.raw_text, config.chunk_size, config.chunk_overlap)?;
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder.embed_batch(&texts, TaskType::RetrievalDocument).await;

    let now = chrono::Utc::now();
    let records = build_records(&metadata, &chunks, vectors, now);
    let batches = upsert_in_batches(store, &records, config.upsert_batch_size).await?;

    Ok(IngestReport {
        metadata,
        chunks: chunks.len(),
        batches,
        store: store.name().to_string(),
    })
}

/// Size limit and extension allow-list, checked before any parsing.
pub fn validate_upload(document: &UploadedDocument, config: &IngestConfig) -> Result<()> {
    if document.filename.trim().is_empty() {
        return Err(Error::validation("file", "no file provided"));
    }
    if document.bytes.len() > config.max_file_bytes {
        return Err(Error::validation(
            "file",
            format!(
                "{} is {} bytes; the maximum size is {} bytes",
                document.filename,
                document.bytes.len(),
                config.max_file_bytes
            ),
        ));
    }
    match file_extension(&document.filename) {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(Error::UnsupportedFormat(document.filename.clone())),
    }
}

/// One record per chunk, all sharing the ingestion timestamp.
fn build_records(
    metadata: &DocumentMetadata,
    chunks: &[TextChunk],
    vectors: Vec<Vec<f32>>,
    now: chrono::DateTime<chrono::Utc>,
) -> Vec<VectorRecord> {
    let timestamp = now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    let millis = now.timestamp_millis();
    let family_count = metadata.family_count();
    let data = &metadata.extracted_data;

    chunks
        .iter()
        .zip(vectors)
        .map(|(chunk, values)| VectorRecord {
            id: record_id(&metadata.filename, chunk.index, millis),
            values,
            metadata: RecordMetadata {
                filename: metadata.filename.clone(),
                chunk_index: chunk.index,
                text: chunk.text.clone(),
                timestamp: timestamp.clone(),
                document_type: metadata.document_type,
                has_families: (family_count > 0).then_some(true),
                family_count: (family_count > 0).then_some(family_count),
                word_count: Some(data.word_count),
                has_phone_numbers: Some(data.has_phone_numbers),
                has_emails: Some(data.has_emails),
            },
        })
        .collect()
}
