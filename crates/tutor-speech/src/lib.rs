mod command;
pub mod engine;
pub mod sanitize;
pub mod voice;

pub use engine::{CommandRecognizer, CommandSynthesizer, Recognizer, Synthesizer};
pub use sanitize::sanitize_for_speech;
pub use voice::Voice;
