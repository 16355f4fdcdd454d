use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tutor_core::TokenStatistics;
use uuid::Uuid;

/// One question and the reply shown for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
    pub answered_at: DateTime<Utc>,
    /// The answer is an apology standing in for a failed model call.
    #[serde(default)]
    pub failed: bool,
    /// The answer is the topic redirect; the question never reached the model.
    #[serde(default)]
    pub off_topic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenStatistics>,
}

impl Exchange {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            question: question.into(),
            answer: answer.into(),
            asked_at: now,
            answered_at: now,
            failed: false,
            off_topic: false,
            tokens: None,
        }
    }

    pub fn failed(question: impl Into<String>, apology: impl Into<String>) -> Self {
        Self {
            failed: true,
            ..Self::new(question, apology)
        }
    }

    pub fn off_topic(question: impl Into<String>, redirect: impl Into<String>) -> Self {
        Self {
            off_topic: true,
            ..Self::new(question, redirect)
        }
    }

    /// Whether this exchange belongs in the history sent to the model.
    pub fn reached_model(&self) -> bool {
        !self.failed && !self.off_topic
    }

    pub fn asked_at(mut self, asked_at: DateTime<Utc>) -> Self {
        self.asked_at = asked_at;
        self
    }

    pub fn with_tokens(mut self, tokens: Option<TokenStatistics>) -> Self {
        self.tokens = tokens;
        self
    }
}

/// Summary of a saved transcript for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSummary {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
    pub exchange_count: usize,
    pub first_question: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptIndex {
    pub transcripts: Vec<TranscriptSummary>,
    pub last_updated: DateTime<Utc>,
}

impl Default for TranscriptIndex {
    fn default() -> Self {
        Self {
            transcripts: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

impl TranscriptIndex {
    pub fn upsert(&mut self, summary: TranscriptSummary) {
        if let Some(existing) = self.transcripts.iter_mut().find(|t| t.id == summary.id) {
            *existing = summary;
        } else {
            self.transcripts.push(summary);
        }
        self.last_updated = Utc::now();
    }

    pub fn remove(&mut self, id: &Uuid) {
        self.transcripts.retain(|t| t.id != *id);
        self.last_updated = Utc::now();
    }
}
