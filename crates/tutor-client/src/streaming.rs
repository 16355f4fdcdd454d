use aws_sdk_bedrockruntime::types::ConverseStreamOutput;
use tracing::{debug, warn};
use tutor_core::{Result, TokenStatistics, TutorError};

/// Collapses runs of blank lines in streamed text so a chatty model cannot
/// scroll the terminal away. State carries across chunk boundaries.
#[derive(Debug, Default)]
pub struct NewlineFilter {
    consecutive_newlines: usize,
}

impl NewlineFilter {
    // Allow at most 2 consecutive newlines
    const MAX_NEWLINES: usize = 2;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(&mut self, text: &str) -> String {
        let mut filtered = String::with_capacity(text.len());
        for ch in text.chars() {
            if ch == '\n' {
                self.consecutive_newlines += 1;
                if self.consecutive_newlines <= Self::MAX_NEWLINES {
                    filtered.push(ch);
                }
            } else {
                self.consecutive_newlines = 0;
                filtered.push(ch);
            }
        }
        filtered
    }
}

/// Drain a ConverseStream event stream, forwarding filtered text deltas to
/// `on_chunk`. Returns the unfiltered text and the reported token usage.
pub(crate) async fn process_stream<E>(
    stream: impl tokio_stream::Stream<Item = std::result::Result<ConverseStreamOutput, E>>,
    on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
) -> Result<(String, Option<TokenStatistics>)>
where
    E: std::fmt::Display,
{
    use tokio_stream::StreamExt;
    tokio::pin!(stream);

    let mut accumulated_text = String::new();
    let mut usage = None;
    let mut newline_filter = NewlineFilter::new();

    while let Some(event) = stream.next().await {
        match event {
            Ok(ConverseStreamOutput::ContentBlockDelta(delta)) => {
                if let Some(text) = delta.delta().and_then(|d| d.as_text().ok()) {
                    let filtered = newline_filter.filter(text);
                    if !filtered.is_empty() {
                        on_chunk(&filtered);
                    }
                    accumulated_text.push_str(text);
                }
            }
            Ok(ConverseStreamOutput::MessageStop(stop)) => {
                debug!("Streaming completed with stop reason: {:?}", stop.stop_reason());
                // Metadata arrives after MessageStop, keep reading.
            }
            Ok(ConverseStreamOutput::Metadata(metadata)) => {
                if let Some(u) = metadata.usage() {
                    debug!(
                        "Token usage - Input: {}, Output: {}",
                        u.input_tokens(),
                        u.output_tokens()
                    );
                    usage = Some(TokenStatistics::new(
                        u.input_tokens().max(0) as usize,
                        u.output_tokens().max(0) as usize,
                    ));
                }
                break;
            }
            Ok(other) => {
                debug!("Ignoring stream event: {:?}", other);
            }
            Err(e) => {
                warn!("Stream error: {}", e);
                return Err(TutorError::provider("bedrock", format!("Stream error: {e}")));
            }
        }
    }

    Ok((accumulated_text, usage))
}
