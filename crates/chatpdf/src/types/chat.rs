//! Chat history and display types

use serde::{Deserialize, Serialize};

/// One question/answer exchange held in the agent's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
    pub asked_at: chrono::DateTime<chrono::Utc>,
}

impl ChatTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            asked_at: chrono::Utc::now(),
        }
    }
}

/// A line of the message log shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMessage {
    pub text: String,
    /// `true` for the user's question, `false` for the agent's reply
    pub is_user: bool,
}

impl DisplayMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: true,
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: false,
        }
    }
}
