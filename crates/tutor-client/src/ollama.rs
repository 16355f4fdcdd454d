//! Local model served through Ollama's `/api/chat` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tutor_config::ModelSettings;
use tutor_core::{
    LanguageModel, ModelReply, ModelRequest, Result, Role, TokenStatistics, TutorError,
};

use crate::{build_http_client, check_status, request_error};

const PROVIDER: &str = "ollama";
const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

pub struct OllamaClient {
    client: reqwest::Client,
    model_id: String,
    endpoint: String,
}

impl OllamaClient {
    pub fn new(settings: &ModelSettings) -> Result<Self> {
        Ok(Self {
            client: build_http_client(settings)?,
            model_id: settings.model_id.clone(),
            endpoint: settings
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
    prompt_eval_count: Option<usize>,
    eval_count: Option<usize>,
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(&self, request: ModelRequest) -> Result<ModelReply> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.extend(request.messages.iter().map(|m| ChatMessage {
            role: role_name(m.role).to_string(),
            content: m.content.clone(),
        }));

        let body = ChatRequest {
            model: &self.model_id,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let url = format!("{}/api/chat", self.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(PROVIDER, "Request failed", e))?;

        let parsed: ChatResponse = check_status(PROVIDER, response)
            .await?
            .json()
            .await
            .map_err(|e| request_error(PROVIDER, "Invalid response", e))?;

        let text = parsed.message.map(|m| m.content).unwrap_or_default();
        if text.trim().is_empty() {
            return Err(TutorError::provider(PROVIDER, "Model returned an empty reply"));
        }

        let usage = match (parsed.prompt_eval_count, parsed.eval_count) {
            (None, None) => None,
            (input, output) => Some(TokenStatistics::new(
                input.unwrap_or(0),
                output.unwrap_or(0),
            )),
        };

        Ok(ModelReply {
            text,
            usage,
            model: self.model_id.clone(),
        })
    }
}
