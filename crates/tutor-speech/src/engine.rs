use async_trait::async_trait;
use std::path::Path;
use tracing::debug;
use tutor_core::{Result, TutorError};

use crate::command::{run_command, DEFAULT_TIMEOUT_SECS};

/// Text to audio bytes.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Audio file to text.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<String>;
}

/// Synthesizer backed by a local engine such as `espeak --stdout` or
/// `piper`. A `{text}` argument receives the text; without one the text is
/// written to the engine's stdin. Audio is read from stdout.
pub struct CommandSynthesizer {
    argv: Vec<String>,
    timeout_secs: u64,
}

impl CommandSynthesizer {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds;
        self
    }

    fn takes_text_argument(&self) -> bool {
        self.argv.iter().skip(1).any(|a| a.contains("{text}"))
    }
}

#[async_trait]
impl Synthesizer for CommandSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let audio = if self.takes_text_argument() {
            run_command(&self.argv, &[("{text}", text)], None, self.timeout_secs).await?
        } else {
            run_command(&self.argv, &[], Some(text.as_bytes()), self.timeout_secs).await?
        };

        if audio.is_empty() {
            return Err(TutorError::Speech("Synthesizer produced no audio".to_string()));
        }
        debug!("Synthesized {} bytes of audio", audio.len());
        Ok(audio)
    }
}

/// Recognizer backed by a local engine such as `whisper-cli`; the command
/// must contain a `{file}` argument and print the transcript on stdout.
pub struct CommandRecognizer {
    argv: Vec<String>,
    timeout_secs: u64,
}

impl CommandRecognizer {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            timeout_secs: DEFAULT_TIMEOUT_SECS * 5,
        }
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds;
        self
    }
}

#[async_trait]
impl Recognizer for CommandRecognizer {
    async fn transcribe(&self, audio: &Path) -> Result<String> {
        if !audio.exists() {
            return Err(TutorError::Speech(format!(
                "Audio file not found: {}",
                audio.display()
            )));
        }

        let file = audio.to_string_lossy();
        let stdout = run_command(&self.argv, &[("{file}", &*file)], None, self.timeout_secs).await?;
        let text = String::from_utf8_lossy(&stdout).trim().to_string();

        if text.is_empty() {
            return Err(TutorError::Speech("No speech recognized".to_string()));
        }
        Ok(text)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_synthesizer_uses_stdin_without_placeholder() {
        let synth = CommandSynthesizer::new(vec!["cat".into()]);
        let audio = synth.synthesize("mean and median").await.unwrap();
        assert_eq!(audio, b"mean and median");
    }

    #[tokio::test]
    async fn test_synthesizer_text_placeholder() {
        let synth = CommandSynthesizer::new(vec!["printf".into(), "%s".into(), "{text}".into()]);
        let audio = synth.synthesize("variance").await.unwrap();
        assert_eq!(audio, b"variance");
    }

    #[tokio::test]
    async fn test_synthesizer_empty_output_is_error() {
        let synth = CommandSynthesizer::new(vec!["true".into()]);
        assert!(synth.synthesize("anything").await.is_err());
    }

    #[tokio::test]
    async fn test_recognizer_reads_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("question.wav");
        std::fs::write(&audio, "what is a confusion matrix\n").unwrap();

        let recognizer = CommandRecognizer::new(vec!["cat".into(), "{file}".into()]);
        let text = recognizer.transcribe(&audio).await.unwrap();
        assert_eq!(text, "what is a confusion matrix");
    }

    #[tokio::test]
    async fn test_recognizer_missing_file() {
        let recognizer = CommandRecognizer::new(vec!["cat".into(), "{file}".into()]);
        let err = recognizer.transcribe(Path::new("/no/such/audio.wav")).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
