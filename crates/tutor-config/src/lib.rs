use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;
use tutor_core::{Result, TutorError};

pub mod env_substitution;

pub use env_substitution::substitute_env_vars;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorConfig {
    pub tutor: TutorSettings,
    pub model: ModelSettings,
    #[serde(default)]
    pub speech: SpeechSettings,
    #[serde(default)]
    pub context: ContextSettings,
    #[serde(default)]
    pub pricing: HashMap<String, ModelPricing>,
    #[serde(default)]
    pub paths: PathSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorSettings {
    pub name: String,
    #[serde(default = "default_greeting")]
    pub greeting: String,
    #[serde(default = "default_true")]
    pub detailed_explanations: bool,
    #[serde(default = "default_true")]
    pub code_examples: bool,
    #[serde(default = "default_true")]
    pub topic_filter: bool,
    #[serde(default)]
    pub extra_keywords: Vec<String>,
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Bedrock,
    Gemini,
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Bedrock => "bedrock",
            Provider::Gemini => "gemini",
            Provider::Ollama => "ollama",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    pub provider: Provider,
    pub model_id: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// External speech engines. Commands are argv vectors; `{text}` and
/// `{file}` arguments are replaced at call time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub synthesize_command: Vec<String>,
    #[serde(default = "default_audio_extension")]
    pub audio_extension: String,
    #[serde(default)]
    pub play_command: Vec<String>,
    #[serde(default)]
    pub recognize_command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSettings {
    #[serde(default = "default_max_context_chars")]
    pub max_chars: usize,
    #[serde(default = "default_csv_preview_rows")]
    pub csv_preview_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    #[serde(default = "default_home_dir")]
    pub home_dir: PathBuf,
}

impl PathSettings {
    pub fn transcripts_dir(&self) -> PathBuf {
        self.home_dir.join("transcripts")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.home_dir.join("audio")
    }
}

impl TutorConfig {
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| TutorError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut raw: serde_yaml::Value = serde_yaml::from_str(yaml)
            .map_err(|e| TutorError::Config(format!("Failed to parse YAML: {}", e)))?;

        substitute_env_vars(&mut raw)?;

        let mut config: TutorConfig = serde_yaml::from_value(raw)
            .map_err(|e| TutorError::Config(format!("Invalid configuration: {}", e)))?;

        config.expand_env_vars();
        config.validate()?;

        debug!(
            "Loaded configuration for '{}' using {} / {}",
            config.tutor.name,
            config.model.provider.as_str(),
            config.model.model_id
        );
        Ok(config)
    }

    fn expand_env_vars(&mut self) {
        if let Ok(home_dir) = env::var("HOME_DIR") {
            self.paths.home_dir = PathBuf::from(home_dir);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tutor.name.trim().is_empty() {
            return Err(TutorError::Config("Tutor name cannot be empty".into()));
        }
        if self.tutor.max_history_turns == 0 {
            return Err(TutorError::Config(
                "max_history_turns must be at least 1".into(),
            ));
        }
        if self.model.model_id.trim().is_empty() {
            return Err(TutorError::Config("Model id cannot be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(TutorError::Config(
                "Temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.model.max_tokens == 0 {
            return Err(TutorError::Config("max_tokens must be positive".into()));
        }
        if self.model.max_tokens > MAX_TOKENS_LIMIT {
            return Err(TutorError::Config(format!(
                "max_tokens must be at most {MAX_TOKENS_LIMIT}"
            )));
        }
        if self.model.provider == Provider::Gemini
            && self
                .model
                .api_key
                .as_deref()
                .map_or(true, |k| k.trim().is_empty())
        {
            return Err(TutorError::Config(
                "The gemini provider requires model.api_key".into(),
            ));
        }
        if self.speech.enabled && self.speech.synthesize_command.is_empty() {
            return Err(TutorError::Config(
                "speech.enabled requires speech.synthesize_command".into(),
            ));
        }
        Ok(())
    }

    pub fn default_config_path() -> PathBuf {
        default_home_dir().join("tutor.yaml")
    }
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            tutor: TutorSettings::default(),
            model: ModelSettings::default(),
            speech: SpeechSettings::default(),
            context: ContextSettings::default(),
            pricing: HashMap::new(),
            paths: PathSettings::default(),
        }
    }
}

impl Default for TutorSettings {
    fn default() -> Self {
        Self {
            name: "Data Science Tutor".to_string(),
            greeting: default_greeting(),
            detailed_explanations: true,
            code_examples: true,
            topic_filter: true,
            extra_keywords: Vec::new(),
            max_history_turns: default_max_history_turns(),
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: Provider::Ollama,
            model_id: "llama3.2:1b".to_string(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            region: None,
            profile: None,
            api_key: None,
            endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            synthesize_command: Vec::new(),
            audio_extension: default_audio_extension(),
            play_command: Vec::new(),
            recognize_command: Vec::new(),
        }
    }
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            max_chars: default_max_context_chars(),
            csv_preview_rows: default_csv_preview_rows(),
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            home_dir: default_home_dir(),
        }
    }
}

fn default_greeting() -> String {
    "Hey there! I'm your Data Science Tutor. Ask me anything about data, statistics, \
     machine learning or Python and let's dig in together!"
        .to_string()
}

fn default_true() -> bool { true }
fn default_max_history_turns() -> usize { 10 }
fn default_temperature() -> f32 { 0.7 }
fn default_max_tokens() -> usize { 1024 }
fn default_timeout_secs() -> u64 { 60 }
fn default_audio_extension() -> String { "wav".to_string() }
fn default_max_context_chars() -> usize { 8_000 }
fn default_csv_preview_rows() -> usize { 5 }
fn default_currency() -> String { "USD".to_string() }

// Largest value every provider accepts (Bedrock takes an i32).
const MAX_TOKENS_LIMIT: usize = i32::MAX as usize;

fn default_home_dir() -> PathBuf {
    if let Ok(home_dir) = env::var("HOME_DIR") {
        return PathBuf::from(home_dir);
    }
    dirs::home_dir()
        .map(|p| p.join(".ds-tutor"))
        .unwrap_or_else(|| PathBuf::from("./.ds-tutor"))
}
