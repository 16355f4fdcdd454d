use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use tutor_core::{AudioClip, Message, Role};
use uuid::Uuid;

use crate::exchange::{Exchange, TranscriptSummary};

/// In-memory record of one tutoring session. Exchanges are kept in the
/// order they happened; the greeting always opens the displayed chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    id: Uuid,
    greeting: String,
    started_at: DateTime<Utc>,
    exchanges: Vec<Exchange>,
    #[serde(skip)]
    latest_audio: Option<AudioClip>,
}

impl Transcript {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            greeting: greeting.into(),
            started_at: Utc::now(),
            exchanges: Vec::new(),
            latest_audio: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn last_exchange(&self) -> Option<&Exchange> {
        self.exchanges.last()
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Append an exchange. Cached audio belongs to the previous reply, so it
    /// is dropped.
    pub fn record(&mut self, exchange: Exchange) {
        self.latest_audio = None;
        self.exchanges.push(exchange);
        debug!("Transcript {} now has {} exchanges", self.id, self.exchanges.len());
    }

    /// Back to just the greeting. A fresh id keeps a saved copy of the
    /// previous conversation from being overwritten.
    pub fn reset(&mut self) {
        self.id = Uuid::new_v4();
        self.exchanges.clear();
        self.latest_audio = None;
        self.started_at = Utc::now();
    }

    /// The last `max_turns` answered exchanges as alternating user and
    /// assistant messages, oldest first. Failed and off-topic exchanges and
    /// the greeting never reach the model.
    pub fn history(&self, max_turns: usize) -> Vec<Message> {
        let successful: Vec<&Exchange> = self.exchanges.iter().filter(|e| e.reached_model()).collect();
        let start = successful.len().saturating_sub(max_turns);

        successful[start..]
            .iter()
            .flat_map(|e| {
                [
                    Message {
                        role: Role::User,
                        content: e.question.clone(),
                        timestamp: e.asked_at,
                    },
                    Message {
                        role: Role::Assistant,
                        content: e.answer.clone(),
                        timestamp: e.answered_at,
                    },
                ]
            })
            .collect()
    }

    /// Everything shown in the chat window: greeting, then every exchange.
    pub fn messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(1 + self.exchanges.len() * 2);
        messages.push(Message {
            role: Role::Assistant,
            content: self.greeting.clone(),
            timestamp: self.started_at,
        });
        for e in &self.exchanges {
            messages.push(Message {
                role: Role::User,
                content: e.question.clone(),
                timestamp: e.asked_at,
            });
            messages.push(Message {
                role: Role::Assistant,
                content: e.answer.clone(),
                timestamp: e.answered_at,
            });
        }
        messages
    }

    pub fn set_audio(&mut self, clip: AudioClip) {
        self.latest_audio = Some(clip);
    }

    pub fn latest_audio(&self) -> Option<&AudioClip> {
        self.latest_audio.as_ref()
    }

    pub fn summary(&self) -> TranscriptSummary {
        TranscriptSummary {
            id: self.id,
            started_at: self.started_at,
            saved_at: Utc::now(),
            exchange_count: self.exchanges.len(),
            first_question: self.exchanges.first().map(|e| e.question.clone()),
        }
    }

    /// Markdown rendering used for exports.
    pub fn to_markdown(&self, tutor_name: &str) -> String {
        let mut out = format!(
            "# {} session {}\n\nStarted {}\n\n**{}:** {}\n",
            tutor_name,
            self.id,
            self.started_at.format("%Y-%m-%d %H:%M UTC"),
            tutor_name,
            self.greeting
        );
        for e in &self.exchanges {
            out.push_str(&format!("\n**You:** {}\n\n**{}:** {}\n", e.question, tutor_name, e.answer));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transcript_shows_only_greeting() {
        let transcript = Transcript::new("Hello!");
        let messages = transcript.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].content, "Hello!");
        assert!(transcript.history(10).is_empty());
    }

    #[test]
    fn test_record_preserves_order() {
        let mut transcript = Transcript::new("Hello!");
        transcript.record(Exchange::new("q1", "a1"));
        transcript.record(Exchange::new("q2", "a2"));

        let contents: Vec<String> = transcript.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["Hello!", "q1", "a1", "q2", "a2"]);
    }

    #[test]
    fn test_history_window_and_failed_exchanges() {
        let mut transcript = Transcript::new("Hello!");
        transcript.record(Exchange::new("q1", "a1"));
        transcript.record(Exchange::failed("q2", "sorry"));
        transcript.record(Exchange::new("q3", "a3"));
        transcript.record(Exchange::off_topic("pizza?", "back to data"));
        transcript.record(Exchange::new("q4", "a4"));

        let history = transcript.history(2);
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["q3", "a3", "q4", "a4"]);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Assistant);

        // Skipped exchanges are still displayed
        assert_eq!(transcript.messages().len(), 11);
    }

    #[test]
    fn test_reset_returns_to_greeting() {
        let mut transcript = Transcript::new("Hello!");
        let id = transcript.id();
        transcript.record(Exchange::new("q1", "a1"));
        transcript.set_audio(AudioClip::new(vec![1, 2, 3], "wav"));

        transcript.reset();

        assert!(transcript.is_empty());
        assert!(transcript.latest_audio().is_none());
        assert_eq!(transcript.messages().len(), 1);
        assert_ne!(transcript.id(), id);
    }

    #[test]
    fn test_record_drops_stale_audio() {
        let mut transcript = Transcript::new("Hello!");
        transcript.record(Exchange::new("q1", "a1"));
        transcript.set_audio(AudioClip::new(vec![9], "wav"));
        assert!(transcript.latest_audio().is_some());

        transcript.record(Exchange::new("q2", "a2"));
        assert!(transcript.latest_audio().is_none());
    }

    #[test]
    fn test_markdown_export() {
        let mut transcript = Transcript::new("Hello!");
        transcript.record(Exchange::new("What is SQL?", "A query language."));
        let md = transcript.to_markdown("Tutor");
        assert!(md.contains("**Tutor:** Hello!"));
        assert!(md.contains("**You:** What is SQL?"));
        assert!(md.contains("**Tutor:** A query language."));
    }
}
