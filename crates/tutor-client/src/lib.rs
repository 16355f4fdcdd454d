use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tutor_config::{ModelSettings, Provider};
use tutor_core::{LanguageModel, Result, TutorError};

mod bedrock;
mod gemini;
mod ollama;
mod streaming;

pub use bedrock::BedrockClient;
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use streaming::NewlineFilter;

/// Build the configured provider client.
pub async fn build_model(settings: &ModelSettings) -> Result<Arc<dyn LanguageModel>> {
    info!(
        "Using {} model {}",
        settings.provider.as_str(),
        settings.model_id
    );

    let model: Arc<dyn LanguageModel> = match settings.provider {
        Provider::Bedrock => Arc::new(BedrockClient::new(settings).await?),
        Provider::Gemini => Arc::new(GeminiClient::new(settings)?),
        Provider::Ollama => Arc::new(OllamaClient::new(settings)?),
    };
    Ok(model)
}

pub(crate) fn build_http_client(settings: &ModelSettings) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()
        .map_err(|e| {
            TutorError::provider(
                settings.provider.as_str(),
                format!("Failed to build HTTP client: {e}"),
            )
        })
}

/// Provider error from a reqwest failure. The URL is dropped so nothing
/// carried in it ends up in a reply, a transcript or the log.
pub(crate) fn request_error(provider: &str, context: &str, error: reqwest::Error) -> TutorError {
    TutorError::provider(provider, format!("{context}: {}", error.without_url()))
}

/// Turn a non-success HTTP response into a provider error carrying the body.
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TutorError::provider(
        provider,
        format!("HTTP {}: {}", status.as_u16(), body.trim()),
    ))
}
