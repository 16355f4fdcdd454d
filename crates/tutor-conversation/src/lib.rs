pub mod exchange;
pub mod storage;
pub mod transcript;

pub use exchange::{Exchange, TranscriptIndex, TranscriptSummary};
pub use storage::TranscriptStorage;
pub use transcript::Transcript;
