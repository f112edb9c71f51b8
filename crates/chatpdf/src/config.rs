//! Configuration for the chat service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Environment variable and secrets key holding the OpenAI credential
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatPdfConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// OpenAI configuration
    pub llm: LlmConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Secrets file holding the API key
    pub secrets_path: SecretsPath,
}

impl ChatPdfConfig {
    /// Load configuration from a TOML file. Missing sections fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve the API key: the environment wins over the secrets file.
    ///
    /// Returns `None` when neither source holds a non-empty key.
    pub fn resolve_api_key(&self) -> Option<String> {
        let from_env = std::env::var(API_KEY_VAR).ok();
        let from_file = || read_secret(&self.secrets_path.0, API_KEY_VAR);
        from_env
            .filter(|k| !k.trim().is_empty())
            .or_else(from_file)
            .filter(|k| !k.trim().is_empty())
    }
}

/// Read one string entry from a TOML secrets file
fn read_secret(path: &Path, key: &str) -> Option<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return None,
    };

    match content.parse::<toml::Table>() {
        Ok(table) => table.get(key).and_then(|v| v.as_str()).map(str::to_string),
        Err(e) => {
            tracing::warn!("Ignoring malformed secrets file {}: {}", path.display(), e);
            None
        }
    }
}

/// Path to the secrets TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretsPath(pub PathBuf);

impl Default for SecretsPath {
    fn default() -> Self {
        Self(PathBuf::from(".chatpdf").join("secrets.toml"))
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// OpenAI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Completion model name
    pub completion_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens per completion
    pub max_tokens: u32,
    /// Texts per embedding request
    pub embed_batch_size: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            embed_model: "text-embedding-ada-002".to_string(),
            completion_model: "gpt-3.5-turbo-instruct".to_string(),
            temperature: 0.0,
            max_tokens: 256,
            embed_batch_size: 1000,
            timeout_secs: 120,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
    /// Separators tried in order, coarsest first
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                " ".to_string(),
                String::new(),
            ],
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks handed to the answer prompt
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}
