use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tutor_config::SpeechSettings;
use tutor_core::{AudioClip, Result, TutorError};

use crate::command::{run_command, DEFAULT_TIMEOUT_SECS};
use crate::engine::{CommandRecognizer, CommandSynthesizer, Recognizer, Synthesizer};
use crate::sanitize::sanitize_for_speech;

/// Speech front end of the tutor: reads replies aloud and turns recorded
/// questions into text.
pub struct Voice {
    synthesizer: Arc<dyn Synthesizer>,
    recognizer: Option<Arc<dyn Recognizer>>,
    play_command: Vec<String>,
    audio_dir: PathBuf,
    extension: String,
}

impl Voice {
    pub fn new(
        synthesizer: Arc<dyn Synthesizer>,
        audio_dir: impl Into<PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            synthesizer,
            recognizer: None,
            play_command: Vec::new(),
            audio_dir: audio_dir.into(),
            extension: extension.into(),
        }
    }

    /// `None` when speech is disabled in the configuration.
    pub fn from_settings(settings: &SpeechSettings, audio_dir: impl Into<PathBuf>) -> Option<Self> {
        if !settings.enabled {
            return None;
        }

        let synthesizer = Arc::new(CommandSynthesizer::new(settings.synthesize_command.clone()));
        let mut voice = Self::new(synthesizer, audio_dir, settings.audio_extension.clone())
            .with_player(settings.play_command.clone());

        if !settings.recognize_command.is_empty() {
            voice = voice.with_recognizer(Arc::new(CommandRecognizer::new(
                settings.recognize_command.clone(),
            )));
        }
        Some(voice)
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn Recognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn with_player(mut self, play_command: Vec<String>) -> Self {
        self.play_command = play_command;
        self
    }

    /// Where the most recent reply's audio is written.
    pub fn latest_audio_path(&self) -> PathBuf {
        self.audio_dir.join(format!("latest_reply.{}", self.extension))
    }

    /// Sanitize, synthesize, save and play a reply. A player failure is
    /// logged and the saved clip is still returned for replay.
    pub async fn speak(&self, reply: &str) -> Result<AudioClip> {
        let spoken = sanitize_for_speech(reply);
        if spoken.is_empty() {
            return Err(TutorError::Speech("Reply has nothing to read aloud".to_string()));
        }

        let bytes = self.synthesizer.synthesize(&spoken).await?;
        let clip = AudioClip::new(bytes, self.extension.clone());
        let path = self.save_clip(&clip)?;
        if let Err(e) = self.play_file(&path).await {
            warn!("Could not play reply audio: {}", e);
        }
        Ok(clip)
    }

    /// Play a cached clip again without calling the synthesizer.
    pub async fn replay(&self, clip: &AudioClip) -> Result<PathBuf> {
        let path = self.save_clip(clip)?;
        self.play_file(&path).await?;
        Ok(path)
    }

    pub async fn transcribe(&self, audio: &Path) -> Result<String> {
        let recognizer = self
            .recognizer
            .as_ref()
            .ok_or_else(|| TutorError::Speech("No speech recognizer configured".to_string()))?;
        let text = recognizer.transcribe(audio).await?;
        info!("Recognized question from {}", audio.display());
        Ok(text)
    }

    fn save_clip(&self, clip: &AudioClip) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.audio_dir)?;
        let path = self.audio_dir.join(format!("latest_reply.{}", clip.extension));
        std::fs::write(&path, &clip.bytes)?;
        debug!("Wrote {} bytes of audio to {:?}", clip.bytes.len(), path);
        Ok(path)
    }

    async fn play_file(&self, path: &Path) -> Result<()> {
        if self.play_command.is_empty() {
            return Ok(());
        }
        let file = path.to_string_lossy();
        run_command(&self.play_command, &[("{file}", &*file)], None, DEFAULT_TIMEOUT_SECS * 5)
            .await?;
        Ok(())
    }
}
