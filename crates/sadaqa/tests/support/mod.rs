//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;

use sadaqa::app::App;
use sadaqa::config::{Config, Secrets};
use sadaqa_core::generate::{GenerationError, TextGenerator, TextStream};
use sadaqa_core::store::memory::InMemoryStore;

/// Config that never touches the network: disabled embeddings, memory store.
pub fn offline_config() -> Config {
    let mut config = Config::default();
    config.embedding.provider = "disabled".into();
    config.embedding.dims = 32;
    config.store.backend = "memory".into();
    config
}

pub fn offline_app(
    store: Arc<InMemoryStore>,
    generator: Arc<dyn TextGenerator>,
    models: &[&str],
) -> App {
    let mut config = offline_config();
    config.chat.models = models.iter().map(|m| m.to_string()).collect();
    App::new(config, Secrets::default())
        .unwrap()
        .with_store(store)
        .with_generator(generator)
}

/// Records every prompt; streams `reply` word by word for models not in `missing`.
pub struct RecordingGenerator {
    pub missing: Vec<String>,
    pub reply: String,
    pub prompts: Mutex<Vec<(String, String)>>,
}

impl RecordingGenerator {
    pub fn new(reply: &str) -> Self {
        Self {
            missing: Vec::new(),
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable(models: &[&str]) -> Self {
        Self {
            missing: models.iter().map(|m| m.to_string()).collect(),
            ..Self::new("")
        }
    }

    pub fn last_prompt(&self) -> String {
        self.prompts
            .lock()
            .unwrap()
            .last()
            .map(|(_, p)| p.clone())
            .unwrap_or_default()
    }

    pub fn attempted_models(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .map(|(m, _)| m.clone())
            .collect()
    }
}

#[async_trait]
impl TextGenerator for RecordingGenerator {
    async fn stream(&self, model: &str, prompt: &str) -> Result<TextStream, GenerationError> {
        self.prompts
            .lock()
            .unwrap()
            .push((model.to_string(), prompt.to_string()));
        if self.missing.iter().any(|m| m == model) {
            return Err(GenerationError::from_message(
                model,
                format!("HTTP 404: models/{model} is not found for API version v1beta"),
            ));
        }
        let words: Vec<Result<String, GenerationError>> = self
            .reply
            .split_inclusive(' ')
            .map(|w| Ok(w.to_string()))
            .collect();
        Ok(futures::stream::iter(words).boxed())
    }
}

/// A single-sheet `.xlsx` built from string rows. Cells that parse as
/// integers are written as numbers, everything else as inline strings.
pub fn xlsx_with_rows(sheet_name: &str, rows: &[&[&str]]) -> Vec<u8> {
    let mut sheet = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"><sheetData>",
    );
    for (r, row) in rows.iter().enumerate() {
        sheet.push_str(&format!("<row r=\"{}\">", r + 1));
        for (c, value) in row.iter().enumerate() {
            let cell_ref = format!("{}{}", (b'A' + c as u8) as char, r + 1);
            if value.parse::<i64>().is_ok() {
                sheet.push_str(&format!("<c r=\"{}\"><v>{}</v></c>", cell_ref, value));
            } else {
                sheet.push_str(&format!(
                    "<c r=\"{}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                    cell_ref,
                    xml_escape(value)
                ));
            }
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");

    let files = [
        (
            "[Content_Types].xml",
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
             <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
             <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
             <Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
             <Override PartName=\"/xl/worksheets/sheet1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>\
             </Types>"
                .to_string(),
        ),
        (
            "_rels/.rels",
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
             <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>\
             </Relationships>"
                .to_string(),
        ),
        (
            "xl/workbook.xml",
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
                 <workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
                 xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
                 <sheets><sheet name=\"{}\" sheetId=\"1\" r:id=\"rId1\"/></sheets></workbook>",
                xml_escape(sheet_name)
            ),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
             <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet1.xml\"/>\
             </Relationships>"
                .to_string(),
        ),
        ("xl/worksheets/sheet1.xml", sheet),
    ];

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        for (name, content) in files {
            zip.start_file(name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
