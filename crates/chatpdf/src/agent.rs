//! Conversational agent over uploaded documents
//!
//! The agent is EMPTY until the first document is loaded. Loading builds the
//! knowledge base: the vector index, a retrieval chain bound to it, and an
//! empty chat history. Further documents extend the index only. `forget`
//! drops the whole knowledge base.

use parking_lot::RwLock;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ChatPdfConfig;
use crate::error::{Error, Result};
use crate::ingestion::{DocumentLoader, PdfLoader, RecursiveCharacterSplitter};
use crate::providers::{EmbeddingProvider, LlmProvider, OpenAiProvider};
use crate::retrieval::{ConversationalRetrievalChain, Retriever, VectorIndex};
use crate::types::{ChatTurn, Chunk, LoadedDocument};

/// Reply to questions asked before any document is loaded
pub const NO_DOCUMENT_MESSAGE: &str = "Please add a PDF Document.";

/// Whether the agent has a knowledge base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    Empty,
    Loaded,
}

/// Index, chain and history; they exist together or not at all
struct KnowledgeBase {
    index: Arc<RwLock<VectorIndex>>,
    chain: ConversationalRetrievalChain,
    history: Vec<ChatTurn>,
    documents: Vec<LoadedDocument>,
}

/// Document question-answering agent
pub struct Agent {
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    loader: Arc<dyn DocumentLoader>,
    splitter: RecursiveCharacterSplitter,
    top_k: usize,
    knowledge: Option<KnowledgeBase>,
}

impl Agent {
    /// Create an agent from its collaborators
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        loader: Arc<dyn DocumentLoader>,
        splitter: RecursiveCharacterSplitter,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            llm,
            loader,
            splitter,
            top_k,
            knowledge: None,
        }
    }

    /// Create an agent backed by OpenAI with the given credential
    pub fn with_api_key(config: &ChatPdfConfig, api_key: &str) -> Result<Self> {
        let (embedder, llm) = OpenAiProvider::new(&config.llm, api_key)?.split();
        let splitter = RecursiveCharacterSplitter::from_config(&config.chunking)?;

        Ok(Self::new(
            Arc::new(embedder),
            Arc::new(llm),
            Arc::new(PdfLoader::new()),
            splitter,
            config.retrieval.top_k,
        ))
    }

    /// Answer a question about the loaded documents
    ///
    /// Returns [`NO_DOCUMENT_MESSAGE`] when nothing is loaded. Otherwise the
    /// trimmed answer is recorded in the chat history and returned.
    pub async fn ask(&mut self, question: &str) -> Result<String> {
        let Some(knowledge) = self.knowledge.as_mut() else {
            return Ok(NO_DOCUMENT_MESSAGE.to_string());
        };

        let output = knowledge.chain.call(question, &knowledge.history).await?;
        let answer = output.answer.trim().to_string();

        knowledge.history.push(ChatTurn::new(question, answer.clone()));
        Ok(answer)
    }

    /// Load a PDF into the knowledge base, creating it on first use
    ///
    /// Loading, splitting and embedding all finish before any state changes, so
    /// a failed load leaves the agent as it was.
    pub async fn doc_load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.doc_load_named(path, &filename).await
    }

    /// Load a PDF staged at `path`, recording `filename` as its provenance
    pub async fn doc_load_named(&mut self, path: impl AsRef<Path>, filename: &str) -> Result<()> {
        let path = path.as_ref();
        tracing::info!("Loading {} from {} with {} loader", filename, path.display(), self.loader.name());

        let mut loaded = self.loader.load(path).await?;
        for page in &mut loaded.pages {
            page.source.filename = filename.to_string();
        }
        let chunks = self.splitter.split_pages(&loaded.pages);
        let chunks = self.embed_chunks(chunks).await?;

        let document = LoadedDocument {
            id: Uuid::new_v4(),
            path: path.to_path_buf(),
            filename: filename.to_string(),
            content_hash: loaded.content_hash.clone(),
            total_pages: loaded.total_pages(),
            total_chunks: chunks.len() as u32,
            ingested_at: chrono::Utc::now(),
        };

        match self.knowledge.as_mut() {
            None => {
                let index = Arc::new(RwLock::new(VectorIndex::from_chunks(chunks)?));
                let retriever =
                    Retriever::new(Arc::clone(&index), Arc::clone(&self.embedder), self.top_k);
                let chain = ConversationalRetrievalChain::from_llm(Arc::clone(&self.llm), retriever);

                self.knowledge = Some(KnowledgeBase {
                    index,
                    chain,
                    history: Vec::new(),
                    documents: Vec::new(),
                });
            }
            Some(knowledge) => knowledge.index.write().add_chunks(chunks)?,
        }

        tracing::info!(
            "Loaded {} ({} pages, {} chunks)",
            filename,
            document.total_pages,
            document.total_chunks
        );

        if let Some(knowledge) = self.knowledge.as_mut() {
            knowledge.documents.push(document);
        }
        Ok(())
    }

    /// Drop the knowledge base and chat history
    pub fn forget(&mut self) {
        if self.knowledge.take().is_some() {
            tracing::info!("Knowledge base cleared");
        }
    }

    async fn embed_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
        if chunks.is_empty() {
            return Ok(chunks);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "{} returned {} embeddings for {} chunks",
                self.embedder.name(),
                embeddings.len(),
                chunks.len()
            )));
        }

        Ok(chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| chunk.with_embedding(embedding))
            .collect())
    }

    pub fn state(&self) -> AgentState {
        if self.knowledge.is_some() {
            AgentState::Loaded
        } else {
            AgentState::Empty
        }
    }

    /// Chat history, absent while EMPTY
    pub fn history(&self) -> Option<&[ChatTurn]> {
        self.knowledge.as_ref().map(|k| k.history.as_slice())
    }

    /// Number of indexed chunks
    pub fn chunk_count(&self) -> usize {
        self.knowledge
            .as_ref()
            .map(|k| k.index.read().len())
            .unwrap_or(0)
    }

    /// Documents in the knowledge base, in load order
    pub fn documents(&self) -> &[LoadedDocument] {
        self.knowledge
            .as_ref()
            .map(|k| k.documents.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_agent, write_doc, ScriptedLlm, TextLoader};
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_ask_without_document_returns_sentinel() {
        let (mut agent, fakes) = test_agent();

        let answer = agent.ask("What is the total?").await.unwrap();

        assert_eq!(answer, NO_DOCUMENT_MESSAGE);
        assert_eq!(agent.state(), AgentState::Empty);
        assert!(agent.history().is_none());
        assert!(fakes.llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_load_then_ask_records_turn() {
        let dir = tempfile::tempdir().unwrap();
        let report = write_doc(&dir, "report.pdf", "The total is 42 dollars.");
        let (mut agent, _) = test_agent();

        agent.doc_load(&report).await.unwrap();
        assert_eq!(agent.state(), AgentState::Loaded);
        assert_eq!(agent.history().map(|h| h.len()), Some(0));

        let answer = agent.ask("What is the total?").await.unwrap();

        assert_ne!(answer, NO_DOCUMENT_MESSAGE);
        assert_eq!(answer, ScriptedLlm::ANSWER.trim());
        let history = agent.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].question, "What is the total?");
        assert_eq!(history[0].answer, answer);
    }

    #[tokio::test]
    async fn test_second_load_extends_index_without_touching_history() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_doc(&dir, "a.pdf", "alpha page one\x0calpha page two");
        let second = write_doc(&dir, "b.pdf", "beta only page");
        let (mut agent, _) = test_agent();

        agent.doc_load(&first).await.unwrap();
        agent.ask("What is alpha?").await.unwrap();
        agent.doc_load(&second).await.unwrap();

        assert_eq!(agent.chunk_count(), 3);
        assert_eq!(agent.history().map(|h| h.len()), Some(1));
        assert_eq!(agent.documents().len(), 2);
        assert_eq!(agent.documents()[0].total_pages, 2);
    }

    #[tokio::test]
    async fn test_two_loads_share_one_index() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_doc(&dir, "a.pdf", "alpha");
        let second = write_doc(&dir, "b.pdf", "beta");
        let (mut agent, _) = test_agent();

        agent.doc_load(&first).await.unwrap();
        agent.doc_load(&second).await.unwrap();

        let knowledge = agent.knowledge.as_ref().unwrap();
        let sources: Vec<PathBuf> = knowledge
            .index
            .read()
            .chunks()
            .map(|c| c.source.path.clone())
            .collect();
        assert_eq!(sources, vec![first, second]);
        assert!(knowledge.history.is_empty());
    }

    #[tokio::test]
    async fn test_named_load_records_display_name() {
        let dir = tempfile::tempdir().unwrap();
        let staged = write_doc(&dir, "chatpdf-x1y2z3.pdf", "alpha page\x0cbeta page");
        let (mut agent, _) = test_agent();

        agent.doc_load_named(&staged, "Quarterly Report.pdf").await.unwrap();

        let document = &agent.documents()[0];
        assert_eq!(document.filename, "Quarterly Report.pdf");
        assert_eq!(document.path, staged);

        let knowledge = agent.knowledge.as_ref().unwrap();
        let sources: Vec<(String, u32, u32)> = knowledge
            .index
            .read()
            .chunks()
            .map(|c| (c.source.filename.clone(), c.source.page, c.source.total_pages))
            .collect();
        assert_eq!(
            sources,
            vec![
                ("Quarterly Report.pdf".to_string(), 0, 2),
                ("Quarterly Report.pdf".to_string(), 1, 2),
            ]
        );
    }

    #[tokio::test]
    async fn test_forget_returns_to_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let report = write_doc(&dir, "report.pdf", "The total is 42.");
        let (mut agent, _) = test_agent();

        agent.doc_load(&report).await.unwrap();
        agent.ask("What is the total?").await.unwrap();
        agent.forget();

        assert_eq!(agent.state(), AgentState::Empty);
        assert_eq!(agent.chunk_count(), 0);
        assert!(agent.documents().is_empty());
        assert_eq!(agent.ask("What is the total?").await.unwrap(), NO_DOCUMENT_MESSAGE);

        agent.doc_load(&report).await.unwrap();
        assert_eq!(agent.chunk_count(), 1);
        assert_eq!(agent.history().map(|h| h.len()), Some(0));
    }

    #[tokio::test]
    async fn test_forget_on_fresh_agent_is_noop() {
        let (mut agent, _) = test_agent();
        agent.forget();
        agent.forget();
        assert_eq!(agent.state(), AgentState::Empty);
    }

    #[tokio::test]
    async fn test_failed_load_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_doc(&dir, "good.pdf", "The total is 42.");
        let corrupt = write_doc(&dir, "bad.pdf", &format!("{} garbage", TextLoader::CORRUPT_MARKER));
        let (mut agent, fakes) = test_agent();

        assert!(matches!(agent.doc_load(&corrupt).await, Err(Error::FileParse { .. })));
        assert_eq!(agent.state(), AgentState::Empty);

        agent.doc_load(&good).await.unwrap();
        agent.ask("What is the total?").await.unwrap();

        fakes.embedder.set_failing(true);
        assert!(matches!(agent.doc_load(&good).await, Err(Error::Embedding(_))));
        fakes.embedder.set_failing(false);

        assert_eq!(agent.chunk_count(), 1);
        assert_eq!(agent.documents().len(), 1);
        assert_eq!(agent.history().map(|h| h.len()), Some(1));
    }

    #[tokio::test]
    async fn test_failed_ask_keeps_history() {
        let dir = tempfile::tempdir().unwrap();
        let report = write_doc(&dir, "report.pdf", "The total is 42.");
        let (mut agent, fakes) = test_agent();
        agent.doc_load(&report).await.unwrap();

        fakes.llm.set_failing(true);
        assert!(matches!(agent.ask("What is the total?").await, Err(Error::Llm(_))));
        assert_eq!(agent.history().map(|h| h.len()), Some(0));
    }

    #[tokio::test]
    async fn test_blank_document_still_creates_knowledge_base() {
        let dir = tempfile::tempdir().unwrap();
        let blank = write_doc(&dir, "scan.pdf", "   ");
        let (mut agent, _) = test_agent();

        agent.doc_load(&blank).await.unwrap();

        assert_eq!(agent.state(), AgentState::Loaded);
        assert_eq!(agent.chunk_count(), 0);
        assert_eq!(agent.ask("Anything?").await.unwrap(), ScriptedLlm::ANSWER.trim());
    }
}
