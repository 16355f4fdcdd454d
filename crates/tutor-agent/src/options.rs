use tutor_config::TutorSettings;

/// Runtime toggles that shape each answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TutorOptions {
    pub detailed_explanations: bool,
    pub code_examples: bool,
    pub topic_filter: bool,
}

impl Default for TutorOptions {
    fn default() -> Self {
        Self {
            detailed_explanations: true,
            code_examples: true,
            topic_filter: true,
        }
    }
}

impl From<&TutorSettings> for TutorOptions {
    fn from(settings: &TutorSettings) -> Self {
        Self {
            detailed_explanations: settings.detailed_explanations,
            code_examples: settings.code_examples,
            topic_filter: settings.topic_filter,
        }
    }
}
