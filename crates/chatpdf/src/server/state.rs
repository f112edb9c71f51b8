//! Application state for the chat server

use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::agent::Agent;
use crate::config::ChatPdfConfig;
use crate::error::{Error, Result};
use crate::session::{BusyFlags, SessionContext};

/// Builds an agent for a credential
pub type AgentFactory = Arc<dyn Fn(&str) -> Result<Agent> + Send + Sync>;

/// A registered session
///
/// The context mutex is held for the whole of an event, so one session
/// processes its events one at a time.
#[derive(Clone)]
pub struct SessionHandle {
    context: Arc<Mutex<SessionContext>>,
    busy: Arc<RwLock<BusyFlags>>,
}

impl SessionHandle {
    pub fn context(&self) -> &Arc<Mutex<SessionContext>> {
        &self.context
    }

    /// Busy flags, readable without waiting for the running event
    pub fn busy(&self) -> BusyFlags {
        self.busy.read().clone()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: ChatPdfConfig,
    /// Credential handed to every new session
    api_key: Option<String>,
    /// Agent construction
    agent_factory: AgentFactory,
    /// Live sessions
    sessions: DashMap<Uuid, SessionHandle>,
}

impl AppState {
    /// Create state whose sessions use OpenAI-backed agents
    pub fn new(config: ChatPdfConfig, api_key: Option<String>) -> Self {
        let agent_config = config.clone();
        let factory: AgentFactory = Arc::new(move |key: &str| Agent::with_api_key(&agent_config, key));
        Self::with_agent_factory(config, api_key, factory)
    }

    /// Create state with a custom agent factory
    pub fn with_agent_factory(
        config: ChatPdfConfig,
        api_key: Option<String>,
        agent_factory: AgentFactory,
    ) -> Self {
        if api_key.is_none() {
            tracing::warn!("No OpenAI API key configured; uploads and questions are disabled");
        }

        Self {
            inner: Arc::new(AppStateInner {
                config,
                api_key,
                agent_factory,
                sessions: DashMap::new(),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &ChatPdfConfig {
        &self.inner.config
    }

    /// Whether sessions get a credential
    pub fn is_key_set(&self) -> bool {
        self.inner
            .api_key
            .as_deref()
            .map_or(false, |k| !k.trim().is_empty())
    }

    /// Start a new session
    pub fn create_session(&self) -> Result<(Uuid, SessionHandle)> {
        let factory = Arc::clone(&self.inner.agent_factory);
        let context = SessionContext::new(self.inner.api_key.clone(), |key| factory(key))?;
        let id = context.id();

        let handle = SessionHandle {
            busy: context.busy_handle(),
            context: Arc::new(Mutex::new(context)),
        };
        self.inner.sessions.insert(id, handle.clone());

        tracing::info!("Session {} created ({} active)", id, self.inner.sessions.len());
        Ok((id, handle))
    }

    /// Look up a session
    pub fn session(&self, id: &Uuid) -> Result<SessionHandle> {
        self.inner
            .sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(Error::SessionNotFound(*id))
    }

    /// End a session
    pub fn remove_session(&self, id: &Uuid) -> Result<()> {
        self.inner
            .sessions
            .remove(id)
            .map(|_| tracing::info!("Session {} ended", id))
            .ok_or(Error::SessionNotFound(*id))
    }

    /// Number of live sessions
    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }
}
