//! Provider abstractions for embeddings and LLM completion
//!
//! The agent only talks to these traits, so the hosted OpenAI backend can be
//! swapped for any other implementation.

pub mod embedding;
pub mod llm;
pub mod openai;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use openai::{OpenAiClient, OpenAiEmbedder, OpenAiLlm, OpenAiProvider};
