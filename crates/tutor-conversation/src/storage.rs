use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tutor_core::{Result, TutorError};
use uuid::Uuid;

use crate::exchange::{TranscriptIndex, TranscriptSummary};
use crate::transcript::Transcript;

/// File-based transcript storage: one `{id}.json` per saved session plus an
/// `index.json` listing them.
pub struct TranscriptStorage {
    base_dir: PathBuf,
}

impl TranscriptStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        debug!("TranscriptStorage initialized: base_dir={:?}", base_dir);
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn ensure_base_dir(&self) -> Result<&Path> {
        fs::create_dir_all(&self.base_dir)?;
        Ok(&self.base_dir)
    }

    fn transcript_path(&self, id: &Uuid) -> PathBuf {
        self.base_dir.join(format!("{}.json", id))
    }

    fn index_path(&self) -> PathBuf {
        self.base_dir.join("index.json")
    }

    /// Save (or overwrite) a transcript and refresh the index.
    pub fn save(&self, transcript: &Transcript) -> Result<PathBuf> {
        self.ensure_base_dir()?;
        let path = self.transcript_path(&transcript.id());

        let json = serde_json::to_string_pretty(transcript)?;
        fs::write(&path, json)?;

        let mut index = self.read_index()?;
        index.upsert(transcript.summary());
        self.write_index(&index)?;

        info!("Saved transcript {} to {:?}", transcript.id(), path);
        Ok(path)
    }

    pub fn load(&self, id: &Uuid) -> Result<Transcript> {
        let path = self.transcript_path(id);
        if !path.exists() {
            return Err(TutorError::Storage(format!("No saved transcript with id {}", id)));
        }
        let json = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn list(&self) -> Result<Vec<TranscriptSummary>> {
        let mut transcripts = self.read_index()?.transcripts;
        transcripts.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(transcripts)
    }

    pub fn delete(&self, id: &Uuid) -> Result<()> {
        let path = self.transcript_path(id);
        if path.exists() {
            fs::remove_file(&path)?;
        }

        let mut index = self.read_index()?;
        index.remove(id);
        self.write_index(&index)?;

        info!("Deleted transcript {}", id);
        Ok(())
    }

    /// Write a standalone copy of a transcript. A `.md` target gets a
    /// readable Markdown rendering, anything else JSON.
    pub fn export(transcript: &Transcript, tutor_name: &str, output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let is_markdown = output_path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("md"));

        let content = if is_markdown {
            transcript.to_markdown(tutor_name)
        } else {
            let export = serde_json::json!({
                "tutor": tutor_name,
                "transcript": transcript,
                "exported_at": Utc::now(),
            });
            serde_json::to_string_pretty(&export)?
        };

        fs::write(output_path, content)?;
        info!("Exported transcript {} to {:?}", transcript.id(), output_path);
        Ok(())
    }

    fn read_index(&self) -> Result<TranscriptIndex> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(TranscriptIndex::default());
        }
        let json = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn write_index(&self, index: &TranscriptIndex) -> Result<()> {
        self.ensure_base_dir()?;
        let json = serde_json::to_string_pretty(index)?;
        fs::write(self.index_path(), json)?;
        Ok(())
    }
}
