use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_bedrockruntime as bedrock;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, InferenceConfiguration, Message as BedrockMessage,
    SystemContentBlock,
};
use tracing::{debug, info};
use tutor_config::ModelSettings;
use tutor_core::{
    LanguageModel, Message, ModelReply, ModelRequest, Result, Role, TokenStatistics, TutorError,
};

use crate::streaming::process_stream;

const PROVIDER: &str = "bedrock";

pub struct BedrockClient {
    client: bedrock::Client,
    model_id: String,
}

impl BedrockClient {
    pub async fn new(settings: &ModelSettings) -> Result<Self> {
        let region_name = settings
            .region
            .clone()
            .unwrap_or_else(|| "us-east-1".to_string());

        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region_name.clone()));

        if let Some(profile) = &settings.profile {
            info!("Using AWS profile: {}", profile);
            config_loader = config_loader.profile_name(profile);
        }

        let aws_config = config_loader.load().await;
        debug!("AWS config loaded for region: {}", region_name);

        let client = bedrock::Client::new(&aws_config);

        Ok(Self {
            client,
            model_id: settings.model_id.clone(),
        })
    }

    /// Converse requires the conversation to start with a user turn, so any
    /// leading assistant turns are dropped. System messages travel in the
    /// system block instead.
    pub fn build_messages(messages: &[Message]) -> Result<Vec<BedrockMessage>> {
        messages
            .iter()
            .filter(|m| m.role != Role::System)
            .skip_while(|m| m.role == Role::Assistant)
            .map(|m| {
                let role = match m.role {
                    Role::Assistant => ConversationRole::Assistant,
                    _ => ConversationRole::User,
                };
                BedrockMessage::builder()
                    .role(role)
                    .content(ContentBlock::Text(m.content.clone()))
                    .build()
                    .map_err(|e| TutorError::provider(PROVIDER, e))
            })
            .collect()
    }

    fn inference_config(request: &ModelRequest) -> Result<InferenceConfiguration> {
        let max_tokens = i32::try_from(request.max_tokens).map_err(|_| {
            TutorError::Config(format!(
                "max_tokens {} is larger than Bedrock accepts",
                request.max_tokens
            ))
        })?;

        Ok(InferenceConfiguration::builder()
            .max_tokens(max_tokens)
            .temperature(request.temperature)
            .build())
    }
}

#[async_trait]
impl LanguageModel for BedrockClient {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(&self, request: ModelRequest) -> Result<ModelReply> {
        let mut converse_request = self
            .client
            .converse()
            .model_id(&self.model_id)
            .set_messages(Some(Self::build_messages(&request.messages)?))
            .inference_config(Self::inference_config(&request)?);

        if let Some(system_prompt) = request.system {
            converse_request = converse_request.system(SystemContentBlock::Text(system_prompt));
        }

        let response = converse_request
            .send()
            .await
            .map_err(|e| TutorError::provider(PROVIDER, format!("Bedrock API error: {e}")))?;

        let message = response
            .output()
            .and_then(|output| output.as_message().ok())
            .ok_or_else(|| TutorError::provider(PROVIDER, "No message in response"))?;

        let text = message
            .content()
            .iter()
            .filter_map(|block| block.as_text().ok())
            .cloned()
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(TutorError::provider(PROVIDER, "Model returned an empty reply"));
        }

        let usage = response.usage().map(|u| {
            TokenStatistics::new(u.input_tokens().max(0) as usize, u.output_tokens().max(0) as usize)
        });

        Ok(ModelReply {
            text,
            usage,
            model: self.model_id.clone(),
        })
    }

    async fn generate_stream(
        &self,
        request: ModelRequest,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<ModelReply> {
        let mut converse_request = self
            .client
            .converse_stream()
            .model_id(&self.model_id)
            .set_messages(Some(Self::build_messages(&request.messages)?))
            .inference_config(Self::inference_config(&request)?);

        if let Some(system_prompt) = request.system {
            converse_request = converse_request.system(SystemContentBlock::Text(system_prompt));
        }

        let stream_output = converse_request
            .send()
            .await
            .map_err(|e| TutorError::provider(PROVIDER, format!("Bedrock streaming error: {e}")))?;

        let stream = async_stream::stream! {
            let mut event_stream = stream_output.stream;
            loop {
                match event_stream.recv().await {
                    Ok(Some(output)) => yield Ok(output),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        };

        let (text, usage) = process_stream(stream, on_chunk).await?;
        if text.trim().is_empty() {
            return Err(TutorError::provider(PROVIDER, "Model returned an empty reply"));
        }

        Ok(ModelReply {
            text,
            usage,
            model: self.model_id.clone(),
        })
    }
}
