//! Prompt templates for conversational retrieval

use crate::retrieval::SearchResult;
use crate::types::ChatTurn;

/// Prompt builder for the retrieval chain
pub struct PromptBuilder;

impl PromptBuilder {
    /// Render chat history as alternating Human/Assistant lines
    pub fn format_history(history: &[ChatTurn]) -> String {
        let mut buffer = String::new();
        for turn in history {
            buffer.push_str(&format!(
                "\nHuman: {}\nAssistant: {}",
                turn.question, turn.answer
            ));
        }
        buffer
    }

    /// Build context from search results
    pub fn build_context(results: &[SearchResult]) -> String {
        results
            .iter()
            .map(|r| r.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Prompt that rewrites a follow-up question into a standalone one
    pub fn build_condense_prompt(history: &[ChatTurn], question: &str) -> String {
        format!(
            r#"Given the following conversation and a follow up question, rephrase the follow up question to be a standalone question, in its original language.

Chat History:
{chat_history}
Follow Up Input: {question}
Standalone question:"#,
            chat_history = Self::format_history(history),
            question = question
        )
    }

    /// Prompt that answers a question from retrieved context
    pub fn build_qa_prompt(question: &str, context: &str) -> String {
        format!(
            r#"Use the following pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, don't try to make up an answer.

{context}

Question: {question}
Helpful Answer:"#,
            context = context,
            question = question
        )
    }
}
