//! Deterministic providers and loaders for tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::agent::Agent;
use crate::error::{Error, Result};
use crate::ingestion::{hash_bytes, DocumentLoader, LoadedPages, RecursiveCharacterSplitter};
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::types::{ChunkSource, Page};

const EMBEDDING_DIM: usize = 256;

/// Bag-of-words embedder using the hashing trick
#[derive(Default)]
pub struct HashEmbedder {
    fail: AtomicBool,
    stall: AtomicBool,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Make every call hang until cancelled
    pub fn set_stalled(&self, stall: bool) {
        self.stall.store(stall, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::embedding("connection refused"));
        }

        let mut vector = vec![0.0f32; EMBEDDING_DIM];
        for token in text
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            vector[(hasher.finish() as usize) % EMBEDDING_DIM] += 1.0;
        }
        Ok(vector)
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// LLM that records prompts and answers with fixed text
#[derive(Default)]
pub struct ScriptedLlm {
    prompts: Mutex<Vec<String>>,
    fail: AtomicBool,
    stall: AtomicBool,
}

impl ScriptedLlm {
    /// Reply to condense prompts
    pub const CONDENSED: &'static str = "What was the revenue last year?";
    /// Reply to answer prompts, before trimming
    pub const ANSWER: &'static str = "  The total is 42.\n";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let llm = Self::default();
        llm.set_failing(true);
        llm
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Make every call hang until cancelled
    pub fn set_stalled(&self, stall: bool) {
        self.stall.store(stall, Ordering::SeqCst);
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::llm("Completion failed: HTTP 429 - quota exceeded"));
        }

        if prompt.ends_with("Standalone question:") {
            Ok(Self::CONDENSED.to_string())
        } else {
            Ok(Self::ANSWER.to_string())
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}

/// Loads UTF-8 text files, one page per form-feed separated section
///
/// Files whose text starts with `%CORRUPT` fail to parse.
#[derive(Default)]
pub struct TextLoader {
    loaded: Mutex<Vec<PathBuf>>,
}

impl TextLoader {
    pub const CORRUPT_MARKER: &'static str = "%CORRUPT";

    pub fn new() -> Self {
        Self::default()
    }

    /// Paths passed to `load`, in call order
    pub fn loaded_paths(&self) -> Vec<PathBuf> {
        self.loaded.lock().clone()
    }
}

#[async_trait]
impl DocumentLoader for TextLoader {
    async fn load(&self, path: &Path) -> Result<LoadedPages> {
        self.loaded.lock().push(path.to_path_buf());

        let data = tokio::fs::read(path).await?;
        let name = path.display().to_string();
        let text = String::from_utf8(data.clone()).map_err(|e| Error::file_parse(&name, e.to_string()))?;
        if text.starts_with(Self::CORRUPT_MARKER) {
            return Err(Error::file_parse(name, "invalid cross-reference table"));
        }

        let sections: Vec<&str> = text.split('\x0c').collect();
        let total = sections.len() as u32;
        let pages = sections
            .into_iter()
            .enumerate()
            .map(|(i, content)| Page {
                content: content.to_string(),
                source: ChunkSource::new(path, i as u32, total),
            })
            .collect();

        Ok(LoadedPages {
            pages,
            content_hash: hash_bytes(&data),
        })
    }

    fn name(&self) -> &str {
        "text"
    }
}

/// Handles on the fakes wired into a test agent
pub struct Fakes {
    pub embedder: Arc<HashEmbedder>,
    pub llm: Arc<ScriptedLlm>,
    pub loader: Arc<TextLoader>,
}

/// Agent over fake providers and the text loader
pub fn test_agent() -> (Agent, Fakes) {
    let fakes = Fakes {
        embedder: Arc::new(HashEmbedder::new()),
        llm: Arc::new(ScriptedLlm::new()),
        loader: Arc::new(TextLoader::new()),
    };

    let agent = Agent::new(
        fakes.embedder.clone(),
        fakes.llm.clone(),
        fakes.loader.clone(),
        RecursiveCharacterSplitter::default(),
        4,
    );

    (agent, fakes)
}

/// Write a document into `dir` and return its path
pub fn write_doc(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("write test document");
    path
}
