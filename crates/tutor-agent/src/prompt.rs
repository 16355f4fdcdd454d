use tutor_config::TutorConfig;
use tutor_context::ContextDocument;
use tutor_core::{Message, ModelRequest};

use crate::options::TutorOptions;

/// Persona plus the instructions for the current toggles and, when a file
/// was uploaded, its content.
pub fn system_prompt(
    tutor_name: &str,
    options: &TutorOptions,
    context: Option<&ContextDocument>,
) -> String {
    let mut prompt = format!(
        "You are {tutor_name}, an upbeat and patient data science tutor. \
         You help students with statistics, machine learning, data wrangling and \
         visualization in Python. Be accurate and encouraging, and finish with a short \
         question that keeps the student exploring."
    );

    prompt.push_str("\n\n");
    if options.detailed_explanations {
        prompt.push_str(
            "Give detailed explanations. Break each idea down step by step, as if \
             chatting over a coffee, and define any jargon you use.",
        );
    } else {
        prompt.push_str("Keep explanations brief and to the point.");
    }

    prompt.push_str("\n\n");
    if options.code_examples {
        prompt.push_str(
            "When code helps, include a short Python example in a fenced ```python block.",
        );
    } else {
        prompt.push_str("Do not include code unless the student explicitly asks for it.");
    }

    if let Some(document) = context {
        prompt.push_str("\n\n");
        prompt.push_str(&document.prompt_block());
    }

    prompt
}

/// Assemble the model call: system prompt, the history window, then the
/// new question.
pub fn build_request(
    config: &TutorConfig,
    options: &TutorOptions,
    context: Option<&ContextDocument>,
    history: Vec<Message>,
    question: &str,
) -> ModelRequest {
    let mut messages = history;
    messages.push(Message::user(question));

    ModelRequest {
        system: Some(system_prompt(&config.tutor.name, options, context)),
        messages,
        temperature: config.model.temperature,
        max_tokens: config.model.max_tokens,
    }
}
