//! Conversational retrieval chain
//!
//! With prior history, the follow-up question is first condensed into a
//! standalone question by the LLM. The (possibly rewritten) question is then
//! embedded, the most similar chunks are retrieved, and the LLM answers from
//! that context.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::error::Result;
use crate::generation::PromptBuilder;
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::types::ChatTurn;

use super::index::{SearchResult, VectorIndex};

/// Embeds queries and searches a shared index
#[derive(Clone)]
pub struct Retriever {
    index: Arc<RwLock<VectorIndex>>,
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        index: Arc<RwLock<VectorIndex>>,
        embedder: Arc<dyn EmbeddingProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            top_k,
        }
    }

    /// Retrieve the chunks most relevant to `query`
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedder.embed(query).await?;
        let results = self.index.read().search(&query_embedding, self.top_k)?;

        tracing::debug!(
            "Retrieved {} chunks (best similarity: {:?})",
            results.len(),
            results.first().map(|r| r.similarity)
        );

        Ok(results)
    }
}

/// Output of one chain call
#[derive(Debug, Clone)]
pub struct ChainOutput {
    /// Raw answer text from the LLM
    pub answer: String,
    /// Question used for retrieval and answering
    pub generated_question: String,
    /// Chunks the answer was conditioned on
    pub source_chunks: Vec<SearchResult>,
}

/// Question condensing, retrieval and answering over one index
pub struct ConversationalRetrievalChain {
    llm: Arc<dyn LlmProvider>,
    retriever: Retriever,
}

impl ConversationalRetrievalChain {
    /// Bind a chain to a language model and a retriever
    pub fn from_llm(llm: Arc<dyn LlmProvider>, retriever: Retriever) -> Self {
        Self { llm, retriever }
    }

    /// Answer `question` in the context of `history`
    pub async fn call(&self, question: &str, history: &[ChatTurn]) -> Result<ChainOutput> {
        let generated_question = if history.is_empty() {
            question.to_string()
        } else {
            let prompt = PromptBuilder::build_condense_prompt(history, question);
            let rewritten = self.llm.complete(&prompt).await?;
            tracing::debug!("Condensed follow-up question: {}", rewritten.trim());
            rewritten
        };

        let source_chunks = self.retriever.retrieve(&generated_question).await?;
        let context = PromptBuilder::build_context(&source_chunks);
        let prompt = PromptBuilder::build_qa_prompt(&generated_question, &context);

        tracing::info!(
            "Generating answer with {} ({} chunks, {} prior turns)",
            self.llm.model(),
            source_chunks.len(),
            history.len()
        );
        let answer = self.llm.complete(&prompt).await?;

        Ok(ChainOutput {
            answer,
            generated_question,
            source_chunks,
        })
    }
}
