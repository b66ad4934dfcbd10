//! End-to-end ingestion and chat through the library API, offline.

mod support;

use std::sync::Arc;

use futures::StreamExt;

use sadaqa::chat::{chat, ChatReply};
use sadaqa::config::IngestConfig;
use sadaqa::extract::MIME_XLSX;
use sadaqa::ingest::{ingest, ingest_with};
use sadaqa_core::embedding::simulated_embedding;
use sadaqa_core::models::{DocumentType, Priority, UploadedDocument};
use sadaqa_core::store::memory::InMemoryStore;
use sadaqa_core::store::VectorStore;

use support::{offline_app, xlsx_with_rows, RecordingGenerator};

fn family_workbook() -> Vec<u8> {
    xlsx_with_rows(
        "Maarif",
        &[
            &["Nom", "Quartier", "Membres", "Besoins", "Priorité"],
            &["Ben Ali", "Maarif", "5", "Nourriture, Médicaments", "Urgent"],
        ],
    )
}

#[tokio::test]
async fn spreadsheet_ingestion_end_to_end() {
    let store = Arc::new(InMemoryStore::new());
    let generator = Arc::new(RecordingGenerator::new("ok"));
    let app = offline_app(store.clone(), generator, &["gemini-2.5-pro"]);

    let outcome = ingest(
        &app,
        UploadedDocument {
            filename: "familles-ramadan.xlsx".into(),
            mime_type: MIME_XLSX.into(),
            bytes: family_workbook(),
        },
    )
    .await;

    assert!(outcome.success, "ingestion failed: {:?}", outcome.error);
    assert_eq!(outcome.document_type, Some(DocumentType::FamilyList));

    let families = outcome.extracted_families.unwrap();
    assert_eq!(families.len(), 1);
    assert_eq!(families[0].name, "Ben Ali");
    assert_eq!(families[0].district, "Maarif");
    assert_eq!(families[0].members, 5);
    assert_eq!(families[0].needs, vec!["Nourriture", "Médicaments"]);
    assert_eq!(families[0].priority, Priority::High);

    let message = outcome.message.unwrap();
    assert!(message.contains("1 chunks created and stored in memory"));
    assert!(message.contains("1 family(ies) detected"));
    assert!(message.contains("Type: family_list"));

    assert_eq!(store.len(), 1);
    assert_eq!(store.upsert_calls(), 1);

    let hits = store.query(&[0.0; 32], 5, None).await.unwrap();
    assert_eq!(hits[0].filename(), Some("familles-ramadan.xlsx"));
    assert_eq!(hits[0].metadata["hasFamilies"], true);
    assert_eq!(hits[0].metadata["familyCount"], 1);
    assert!(hits[0].text().contains("Ben Ali | Maarif | 5"));
}

#[tokio::test]
async fn upserts_in_batches_of_one_hundred() {
    let store = InMemoryStore::new();
    let embedder = offline_app(
        Arc::new(InMemoryStore::new()),
        Arc::new(RecordingGenerator::new("")),
        &["m"],
    )
    .embedder()
    .clone();
    let config = IngestConfig {
        chunk_size: 40,
        chunk_overlap: 0,
        ..IngestConfig::default()
    };
    let text = "Inventaire du stock de la mosquée: dattes, lait, farine, huile. ".repeat(80);

    let report = ingest_with(
        &embedder,
        &store,
        &config,
        UploadedDocument {
            filename: "stock.txt".into(),
            mime_type: "text/plain".into(),
            bytes: text.into_bytes(),
        },
    )
    .await
    .unwrap();

    assert!(report.chunks > 100);
    assert_eq!(report.metadata.document_type, DocumentType::Inventory);
    assert_eq!(store.len(), report.chunks);
    assert_eq!(store.upsert_calls(), report.chunks.div_ceil(100));
    assert_eq!(report.batches, store.upsert_calls());
}

#[tokio::test]
async fn stored_vectors_use_fallback_when_provider_disabled() {
    let store = Arc::new(InMemoryStore::new());
    let app = offline_app(store.clone(), Arc::new(RecordingGenerator::new("")), &["m"]);

    let outcome = ingest(
        &app,
        UploadedDocument {
            filename: "zakat.txt".into(),
            mime_type: String::new(),
            bytes: "Guide de la Zakat al-Fitr".as_bytes().to_vec(),
        },
    )
    .await;
    assert!(outcome.success);
    assert_eq!(outcome.document_type, Some(DocumentType::ZakatGuide));

    let expected = simulated_embedding("Guide de la Zakat al-Fitr", 32);
    let hits = store.query(&expected, 1, None).await.unwrap();
    assert!((hits[0].score - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn unsupported_upload_reports_accepted_formats() {
    let store = Arc::new(InMemoryStore::new());
    let app = offline_app(store.clone(), Arc::new(RecordingGenerator::new("")), &["m"]);

    let outcome = ingest(
        &app,
        UploadedDocument {
            filename: "photo.png".into(),
            mime_type: "image/png".into(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        },
    )
    .await;

    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("PDF, TXT, XLSX, XLS"));
    assert!(store.is_empty());
}

#[tokio::test]
async fn chat_without_context_suggests_ingesting() {
    let generator = Arc::new(RecordingGenerator::new("Bonjour, je peux aider."));
    let app = offline_app(
        Arc::new(InMemoryStore::new()),
        generator.clone(),
        &["gemini-2.5-pro"],
    );

    let reply = chat(&app, "Comment calculer la Zakat ?").await;
    let ChatReply::Stream {
        model,
        passages,
        stream,
    } = reply
    else {
        panic!("expected a stream");
    };
    assert_eq!(model, "gemini-2.5-pro");
    assert!(passages.is_empty());

    let text: String = stream.map(|f| f.unwrap()).collect::<Vec<_>>().await.concat();
    assert_eq!(text, "Bonjour, je peux aider.");

    let prompt = generator.last_prompt();
    assert!(prompt.contains("suggest that the user ingest relevant documents"));
    assert!(!prompt.contains("AVAILABLE CONTEXT"));
    assert!(prompt.contains("Comment calculer la Zakat ?"));
}

#[tokio::test]
async fn chat_uses_ingested_context() {
    let store = Arc::new(InMemoryStore::new());
    let generator = Arc::new(RecordingGenerator::new("Ben Ali, Maarif."));
    let app = offline_app(store.clone(), generator.clone(), &["gemini-2.5-flash"]);

    let outcome = ingest(
        &app,
        UploadedDocument {
            filename: "familles.xlsx".into(),
            mime_type: MIME_XLSX.into(),
            bytes: family_workbook(),
        },
    )
    .await;
    assert!(outcome.success);

    let ChatReply::Stream { passages, .. } = chat(&app, "Qui habite à Maarif ?").await else {
        panic!("expected a stream");
    };
    assert_eq!(passages.len(), 1);
    assert_eq!(passages[0].source_label, "familles.xlsx (Chunk 1)");

    let prompt = generator.last_prompt();
    assert!(prompt.contains("=== AVAILABLE CONTEXT (indexed documents) ==="));
    assert!(prompt.contains("[Source: familles.xlsx (Chunk 1), Score: "));
}

#[tokio::test]
async fn chat_total_failure_lists_attempted_models() {
    let models = ["gemini-2.5-pro", "gemini-2.0-flash", "gemini-1.5-pro"];
    let generator = Arc::new(RecordingGenerator::unavailable(&models));
    let app = offline_app(Arc::new(InMemoryStore::new()), generator.clone(), &models);

    let reply = chat(&app, "Bonjour").await;
    let ChatReply::Message(message) = reply else {
        panic!("expected a message");
    };
    assert!(message.contains("gemini-2.5-pro, gemini-2.0-flash, gemini-1.5-pro"));
    assert!(message.contains("API key"));
    assert_eq!(generator.attempted_models(), models);
}

#[tokio::test]
async fn chat_rejects_overlong_question_before_any_call() {
    let generator = Arc::new(RecordingGenerator::new(""));
    let app = offline_app(Arc::new(InMemoryStore::new()), generator.clone(), &["m"]);

    let reply = chat(&app, &"a".repeat(2001)).await;
    assert!(matches!(reply, ChatReply::Message(ref m) if m.contains("2000")));
    assert!(generator.attempted_models().is_empty());
}
