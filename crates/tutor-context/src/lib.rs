//! Turns an uploaded file into a bounded block of text the tutor can put in
//! front of the model.
//!
//! CSV files are summarised (columns, row count, a few preview rows) rather
//! than pasted whole; PDFs go through `pdf-extract`; plain text is used as is.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};
use tutor_config::ContextSettings;
use tutor_core::{Result, TutorError};

mod tabular;

pub use tabular::CsvSummary;

const TRUNCATION_MARKER: &str = "\n[... truncated ...]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    Csv,
    Pdf,
    Text,
}

impl ContextKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(ContextKind::Csv),
            "pdf" => Ok(ContextKind::Pdf),
            "txt" | "md" | "text" => Ok(ContextKind::Text),
            _ => Err(TutorError::UnsupportedFile(format!(
                "{} (expected .csv, .pdf or .txt)",
                path.display()
            ))),
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContextKind::Csv => "CSV",
            ContextKind::Pdf => "PDF",
            ContextKind::Text => "text",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextDocument {
    pub name: String,
    pub kind: ContextKind,
    pub text: String,
    pub truncated: bool,
}

impl ContextDocument {
    /// The block appended to the system prompt.
    pub fn prompt_block(&self) -> String {
        format!(
            "The student uploaded a {} file named \"{}\". Use it as context when it is relevant to their question.\n---\n{}\n---",
            self.kind, self.name, self.text
        )
    }
}

/// Read a file from disk and build its context document.
pub fn load_context(path: impl AsRef<Path>, settings: &ContextSettings) -> Result<ContextDocument> {
    let path = path.as_ref();
    let kind = ContextKind::from_path(path)?;
    let bytes = std::fs::read(path).map_err(|e| TutorError::Context {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let document = parse_context(&name, kind, &bytes, settings)?;
    info!(
        "Loaded {} context '{}' ({} chars{})",
        document.kind,
        document.name,
        document.text.chars().count(),
        if document.truncated { ", truncated" } else { "" }
    );
    Ok(document)
}

/// Build a context document from already-read bytes.
pub fn parse_context(
    name: &str,
    kind: ContextKind,
    bytes: &[u8],
    settings: &ContextSettings,
) -> Result<ContextDocument> {
    let context_error = |message: String| TutorError::Context {
        path: name.to_string(),
        message,
    };

    let raw = match kind {
        ContextKind::Csv => {
            let content = String::from_utf8_lossy(bytes);
            let summary = CsvSummary::parse(&content, settings.csv_preview_rows)
                .map_err(|e| context_error(format!("Malformed CSV: {e}")))?
                .ok_or_else(|| context_error("CSV file is empty".to_string()))?;
            summary.render()
        }
        ContextKind::Pdf => {
            let text = pdf_extract::extract_text_from_mem(bytes)
                .map_err(|e| context_error(format!("PDF extraction failed: {e}")))?;
            if text.trim().is_empty() {
                return Err(context_error("PDF contains no extractable text".to_string()));
            }
            text
        }
        ContextKind::Text => String::from_utf8_lossy(bytes).into_owned(),
    };

    let raw = raw.trim();
    if raw.is_empty() {
        return Err(context_error("file is empty".to_string()));
    }

    let (text, truncated) = truncate_chars(raw, settings.max_chars);
    debug!("Context '{}' parsed as {}", name, kind);

    Ok(ContextDocument {
        name: name.to_string(),
        kind,
        text,
        truncated,
    })
}

fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (format!("{}{}", &text[..idx], TRUNCATION_MARKER), true),
        None => (text.to_string(), false),
    }
}
