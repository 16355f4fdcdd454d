pub mod options;
pub mod prompt;
pub mod snippets;
pub mod tips;
pub mod topic;
mod tutor;

pub use options::TutorOptions;
pub use tips::{random_tip, TIPS};
pub use topic::{TopicGate, DATA_SCIENCE_KEYWORDS, OFF_TOPIC_REPLY};
pub use tutor::{Reply, Tutor, TutorStats, INTERRUPTED_MARKER};
