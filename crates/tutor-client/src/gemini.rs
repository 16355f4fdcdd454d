//! Gemini `generateContent` REST provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use tutor_config::ModelSettings;
use tutor_core::{
    LanguageModel, ModelReply, ModelRequest, Result, Role, TokenStatistics, TutorError,
};

use crate::{build_http_client, check_status, request_error};

const PROVIDER: &str = "gemini";
const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model_id: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(settings: &ModelSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| TutorError::Config("The gemini provider requires model.api_key".into()))?;

        Ok(Self {
            client: build_http_client(settings)?,
            api_key,
            model_id: settings.model_id.clone(),
            endpoint: settings
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model_id
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

fn text_content(role: Option<&str>, text: &str) -> Content {
    Content {
        role: role.map(str::to_string),
        parts: vec![Part {
            text: Some(text.to_string()),
        }],
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(&self, request: ModelRequest) -> Result<ModelReply> {
        let contents = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                let role = if m.role == Role::Assistant { "model" } else { "user" };
                text_content(Some(role), &m.content)
            })
            .collect();

        let body = GenerateContentRequest {
            contents,
            system_instruction: request.system.as_deref().map(|s| text_content(None, s)),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(self.url())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(PROVIDER, "Request failed", e))?;

        let parsed: GenerateContentResponse = check_status(PROVIDER, response)
            .await?
            .json()
            .await
            .map_err(|e| request_error(PROVIDER, "Invalid response", e))?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| TutorError::provider(PROVIDER, "Response contained no candidates"))?;

        debug!("Gemini finish reason: {:?}", candidate.finish_reason);

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(TutorError::provider(PROVIDER, "Model returned an empty reply"));
        }

        let usage = parsed
            .usage_metadata
            .map(|u| TokenStatistics::new(u.prompt_token_count, u.candidates_token_count));

        Ok(ModelReply {
            text,
            usage,
            model: self.model_id.clone(),
        })
    }
}
