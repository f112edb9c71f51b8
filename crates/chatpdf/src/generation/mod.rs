//! Prompt construction for question condensing and answering

mod prompt;

pub use prompt::PromptBuilder;
