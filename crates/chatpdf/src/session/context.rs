//! Per-session state behind the chat UI

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::agent::{Agent, AgentState};
use crate::error::Result;
use crate::types::DisplayMessage;

/// Long-running work in progress, shown as spinners
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BusyFlags {
    /// Filename currently being ingested
    pub ingesting: Option<String>,
    /// A question is being answered
    pub answering: bool,
}

/// One rendered line of the message log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMessage {
    /// Position in the log, used by the UI to diff lines
    pub key: usize,
    pub text: String,
    pub is_user: bool,
}

/// Outcome of one upload batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Files loaded into the knowledge base, in upload order
    pub loaded: Vec<String>,
    /// Files that failed, with the reason
    pub failed: Vec<IngestFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestFailure {
    pub filename: String,
    pub error: String,
}

/// What the UI should show after an event
#[derive(Debug, Clone, Serialize)]
pub struct Render {
    pub session_id: Uuid,
    /// Message log, oldest first
    pub messages: Vec<RenderedMessage>,
    /// Upload and question controls are usable
    pub controls_enabled: bool,
    /// Pending text in the question box
    pub user_input: String,
    pub busy: BusyFlags,
    /// Absent when no agent exists
    pub agent_state: Option<AgentState>,
    /// Present after an upload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingest_report: Option<IngestReport>,
}

/// Everything one chat session owns
pub struct SessionContext {
    pub(super) id: Uuid,
    pub(super) messages: Vec<DisplayMessage>,
    pub(super) agent: Option<Agent>,
    pub(super) api_key: Option<String>,
    pub(super) user_input: String,
    pub(super) busy: Arc<RwLock<BusyFlags>>,
}

impl SessionContext {
    /// Create a session. The agent is built only when a non-empty key is given.
    pub fn new<F>(api_key: Option<String>, build_agent: F) -> Result<Self>
    where
        F: FnOnce(&str) -> Result<Agent>,
    {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        let agent = match api_key.as_deref() {
            Some(key) => Some(build_agent(key)?),
            None => None,
        };

        Ok(Self {
            id: Uuid::new_v4(),
            messages: Vec::new(),
            agent,
            api_key,
            user_input: String::new(),
            busy: Arc::new(RwLock::new(BusyFlags::default())),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether a credential is configured; gates both controls
    pub fn is_key_set(&self) -> bool {
        self.api_key.as_deref().map_or(false, |k| !k.is_empty())
    }

    pub fn messages(&self) -> &[DisplayMessage] {
        &self.messages
    }

    pub fn user_input(&self) -> &str {
        &self.user_input
    }

    pub fn agent(&self) -> Option<&Agent> {
        self.agent.as_ref()
    }

    /// Shared handle on the busy flags, readable while an event is running
    pub fn busy_handle(&self) -> Arc<RwLock<BusyFlags>> {
        Arc::clone(&self.busy)
    }

    /// Snapshot the UI-visible state
    pub fn render(&self) -> Render {
        Render {
            session_id: self.id,
            messages: self
                .messages
                .iter()
                .enumerate()
                .map(|(key, m)| RenderedMessage {
                    key,
                    text: m.text.clone(),
                    is_user: m.is_user,
                })
                .collect(),
            controls_enabled: self.is_key_set() && self.agent.is_some(),
            user_input: self.user_input.clone(),
            busy: self.busy.read().clone(),
            agent_state: self.agent.as_ref().map(Agent::state),
            ingest_report: None,
        }
    }
}
