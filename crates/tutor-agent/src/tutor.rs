use chrono::Utc;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use tutor_config::TutorConfig;
use tutor_context::{load_context, ContextDocument};
use tutor_conversation::{Exchange, Transcript, TranscriptStorage};
use tutor_core::{LanguageModel, ModelRequest, Result, TokenStatistics, TutorError};
use tutor_metrics::{estimate_tokens, CostCalculator, MetricsCollector, MetricsSummary, TokenTracker};
use tutor_speech::Voice;

use crate::options::TutorOptions;
use crate::prompt::build_request;
use crate::snippets::snippet_for;
use crate::tips::random_tip;
use crate::topic::{TopicGate, OFF_TOPIC_REPLY};

/// Printed between a partial streamed reply and the apology that follows it.
pub const INTERRUPTED_MARKER: &str = "\n\n[reply interrupted]\n\n";

/// What the tutor said back to one question.
#[derive(Debug, Clone)]
pub struct Reply {
    pub question: String,
    pub text: String,
    /// The model call failed and `text` ends with an apology, after any
    /// partial reply that was already streamed.
    pub failed: bool,
    /// The topic gate answered without calling the model.
    pub off_topic: bool,
    pub usage: Option<TokenStatistics>,
    /// Where the spoken reply was written, when speech is on.
    pub audio_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct TutorStats {
    pub exchanges: usize,
    pub tokens: TokenStatistics,
    pub total_cost: f64,
    pub priced: bool,
    pub metrics: MetricsSummary,
}

pub struct Tutor {
    config: TutorConfig,
    model: Arc<dyn LanguageModel>,
    transcript: Transcript,
    options: TutorOptions,
    topic_gate: TopicGate,
    context: Option<ContextDocument>,
    voice: Option<Voice>,
    speak_replies: bool,
    token_tracker: TokenTracker,
    cost_calculator: CostCalculator,
    metrics: MetricsCollector,
}

impl Tutor {
    pub fn new(config: TutorConfig, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            transcript: Transcript::new(config.tutor.greeting.clone()),
            options: TutorOptions::from(&config.tutor),
            topic_gate: TopicGate::new(&config.tutor.extra_keywords),
            token_tracker: TokenTracker::new(),
            cost_calculator: CostCalculator::from_config(&config),
            metrics: MetricsCollector::new(),
            context: None,
            voice: None,
            speak_replies: false,
            model,
            config,
        }
    }

    /// Build the configured provider client and, when enabled, the voice.
    pub async fn from_config(config: TutorConfig) -> Result<Self> {
        let model = tutor_client::build_model(&config.model).await?;
        let voice = Voice::from_settings(&config.speech, config.paths.audio_dir());

        let mut tutor = Self::new(config, model);
        if let Some(voice) = voice {
            tutor = tutor.with_voice(voice);
        }
        Ok(tutor)
    }

    /// Attach a voice; replies are spoken from now on.
    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.voice = Some(voice);
        self.speak_replies = true;
        self
    }

    pub fn config(&self) -> &TutorConfig {
        &self.config
    }

    pub fn model(&self) -> &dyn LanguageModel {
        self.model.as_ref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn options(&self) -> &TutorOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut TutorOptions {
        &mut self.options
    }

    pub fn context(&self) -> Option<&ContextDocument> {
        self.context.as_ref()
    }

    /// Turn spoken replies on or off. Returns whether speech is now on,
    /// which is never the case without a voice.
    pub fn set_speak_replies(&mut self, on: bool) -> bool {
        self.speak_replies = on && self.voice.is_some();
        self.speak_replies
    }

    #[instrument(skip(self, question))]
    pub async fn ask(&mut self, question: &str) -> Result<Reply> {
        self.answer(question, None).await
    }

    /// Like [`Tutor::ask`], with the reply streamed into `on_chunk` as it
    /// arrives. Canned snippets and apologies are streamed too.
    #[instrument(skip(self, question, on_chunk))]
    pub async fn ask_stream(
        &mut self,
        question: &str,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<Reply> {
        self.answer(question, Some(on_chunk)).await
    }

    /// Transcribe a recorded question and answer it.
    pub async fn listen(&mut self, audio: &Path) -> Result<Reply> {
        let voice = self
            .voice
            .as_ref()
            .ok_or_else(|| TutorError::Speech("Speech is not enabled".to_string()))?;
        let question = voice.transcribe(audio).await?;
        info!("Heard question: {}", question);
        self.ask(&question).await
    }

    async fn answer(
        &mut self,
        question: &str,
        mut on_chunk: Option<&mut (dyn for<'a> FnMut(&'a str) + Send)>,
    ) -> Result<Reply> {
        let question = question.trim();
        if question.is_empty() {
            return Err(TutorError::InvalidInput("Question is empty".to_string()));
        }
        let asked_at = Utc::now();

        if self.options.topic_filter && !self.topic_gate.is_on_topic(question) {
            self.metrics.record_off_topic();
            if let Some(emit) = on_chunk.as_deref_mut() {
                emit(OFF_TOPIC_REPLY);
            }
            self.transcript
                .record(Exchange::off_topic(question, OFF_TOPIC_REPLY).asked_at(asked_at));
            return Ok(self
                .finish(Reply {
                    question: question.to_string(),
                    text: OFF_TOPIC_REPLY.to_string(),
                    failed: false,
                    off_topic: true,
                    usage: None,
                    audio_path: None,
                })
                .await);
        }

        let request = build_request(
            &self.config,
            &self.options,
            self.context.as_ref(),
            self.transcript.history(self.config.tutor.max_history_turns),
            question,
        );
        let estimated_input = estimate_request_tokens(&request, self.model.model_id());

        // Text already shown to the student when a stream breaks off.
        let mut shown = String::new();
        let started = Instant::now();
        let result = match on_chunk.as_deref_mut() {
            Some(emit) => {
                let mut forward = |chunk: &str| {
                    shown.push_str(chunk);
                    emit(chunk);
                };
                self.model.generate_stream(request, &mut forward).await
            }
            None => self.model.generate(request).await,
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.metrics.record_request(elapsed_ms, result.is_ok());

        let reply = match result {
            Ok(model_reply) => {
                let mut text = model_reply.text;
                if self.options.code_examples {
                    if let Some(snippet) = snippet_for(question) {
                        if let Some(emit) = on_chunk.as_deref_mut() {
                            emit(snippet);
                        }
                        text.push_str(snippet);
                    }
                }

                let usage = model_reply.usage.unwrap_or_else(|| {
                    TokenStatistics::new(
                        estimated_input,
                        estimate_tokens(&text, self.model.model_id()),
                    )
                });
                self.track_usage(&usage);
                debug!("Model answered in {} ms", elapsed_ms);

                self.transcript.record(
                    Exchange::new(question, text.clone())
                        .asked_at(asked_at)
                        .with_tokens(Some(usage)),
                );
                Reply {
                    question: question.to_string(),
                    text,
                    failed: false,
                    off_topic: false,
                    usage: Some(usage),
                    audio_path: None,
                }
            }
            Err(e) => {
                warn!("Model call failed: {}", e);
                let mut apology = apology_for(&e);
                if !shown.is_empty() {
                    apology.insert_str(0, INTERRUPTED_MARKER);
                }
                if let Some(emit) = on_chunk.as_deref_mut() {
                    emit(&apology);
                }
                let text = format!("{shown}{apology}");
                self.transcript
                    .record(Exchange::failed(question, text.clone()).asked_at(asked_at));
                Reply {
                    question: question.to_string(),
                    text,
                    failed: true,
                    off_topic: false,
                    usage: None,
                    audio_path: None,
                }
            }
        };

        Ok(self.finish(reply).await)
    }

    /// Speak the reply when speech is on. Speech problems never hide the
    /// text reply.
    async fn finish(&mut self, mut reply: Reply) -> Reply {
        if !self.speak_replies {
            return reply;
        }
        let Some(voice) = self.voice.as_ref() else {
            return reply;
        };

        match voice.speak(&reply.text).await {
            Ok(clip) => {
                reply.audio_path = Some(voice.latest_audio_path());
                self.transcript.set_audio(clip);
            }
            Err(e) => warn!("Could not speak reply: {}", e),
        }
        reply
    }

    fn track_usage(&self, usage: &TokenStatistics) {
        let model_id = self.model.model_id();
        self.token_tracker.add_usage(usage, model_id);
        let cost = self.cost_calculator.calculate(usage, model_id);
        debug!(
            "Tokens in/out {}/{}, cost {:.6} {}",
            usage.input_tokens, usage.output_tokens, cost.total_cost, cost.currency
        );
    }

    /// Play the cached audio of the latest reply again.
    pub async fn replay_audio(&self) -> Result<PathBuf> {
        let voice = self
            .voice
            .as_ref()
            .ok_or_else(|| TutorError::Speech("Speech is not enabled".to_string()))?;
        let clip = self
            .transcript
            .latest_audio()
            .ok_or_else(|| TutorError::Speech("No reply audio to replay yet".to_string()))?;
        voice.replay(clip).await
    }

    /// Back to the greeting. Options and uploaded context are kept.
    pub fn reset(&mut self) {
        info!("Resetting conversation {}", self.transcript.id());
        self.transcript.reset();
    }

    pub fn tip<R: Rng + ?Sized>(&self, rng: &mut R) -> &'static str {
        random_tip(rng)
    }

    /// Load a CSV, PDF or text file as context for the following questions.
    /// Replaces any earlier upload.
    pub fn attach_context(&mut self, path: impl AsRef<Path>) -> Result<&ContextDocument> {
        let document = load_context(path, &self.config.context)?;
        Ok(self.context.insert(document))
    }

    pub fn clear_context(&mut self) -> Option<ContextDocument> {
        self.context.take()
    }

    pub fn stats(&self) -> TutorStats {
        TutorStats {
            exchanges: self.transcript.len(),
            tokens: self.token_tracker.get_stats(),
            total_cost: self.cost_calculator.get_total_cost(),
            priced: self.cost_calculator.has_pricing(self.model.model_id()),
            metrics: self.metrics.get_summary(),
        }
    }

    pub fn save(&self, storage: &TranscriptStorage) -> Result<PathBuf> {
        storage.save(&self.transcript)
    }

    pub fn export(&self, path: impl AsRef<Path>) -> Result<()> {
        TranscriptStorage::export(&self.transcript, &self.config.tutor.name, path.as_ref())
    }
}

fn estimate_request_tokens(request: &ModelRequest, model_id: &str) -> usize {
    let system = request
        .system
        .as_deref()
        .map(|s| estimate_tokens(s, model_id))
        .unwrap_or(0);
    system
        + request
            .messages
            .iter()
            .map(|m| estimate_tokens(&m.content, model_id))
            .sum::<usize>()
}

fn apology_for(error: &TutorError) -> String {
    let detail = match error {
        TutorError::Provider { message, .. } => message.as_str(),
        _ => "unexpected error",
    };
    format!(
        "Sorry, I couldn't get an answer from the model just now ({detail}). \
         Please try asking again in a moment."
    )
}
