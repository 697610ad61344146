//! Session types: report shape, terminal statuses, and meeple naming.

mod navigation;
mod runner;

pub use navigation::NavigationMonitor;
pub use runner::{run_session, Behavior, SessionConfig};

use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use crate::persona::ActionKind;
use crate::sequence::StepResult;

/// Sequential human-readable session names, process-wide
static MEEPLE_COUNTER: AtomicU32 = AtomicU32::new(1);

pub fn next_meeple_name() -> String {
    format!("Meeple-{}", MEEPLE_COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// Reset the naming counter (tests only; reports look nicer starting at 1)
pub fn reset_meeple_counter() {
    MEEPLE_COUNTER.store(1, Ordering::SeqCst);
}

/// Terminal state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Completed,
    TimedOut,
    CircuitBroken,
    Crashed,
}

/// Per-session result handed back to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    /// Unique id correlating this session's log lines and analytics hits
    pub session_id: String,
    pub user_name: String,
    pub status: SessionStatus,
    /// Persona id when the session was persona-driven
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    /// Sequence name when the session was script-driven
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,
    /// The planned action sequence (persona sessions)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_sequence: Option<Vec<ActionKind>>,
    /// Per-step outcomes (scripted sessions)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_results: Option<Vec<StepResult>>,
    /// Actions attempted before the session reached a terminal state
    pub actions_completed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub timed_out: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub crashed: bool,
}

impl SessionReport {
    pub fn new(user_name: String) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            user_name,
            status: SessionStatus::Crashed,
            persona: None,
            sequence: None,
            action_sequence: None,
            action_results: None,
            actions_completed: 0,
            error: None,
            timed_out: false,
            crashed: false,
        }
    }

    /// Report for a session that panicked or was rejected before producing
    /// anything useful
    pub fn crashed(user_name: String, error: String) -> Self {
        Self {
            status: SessionStatus::Crashed,
            error: Some(error),
            crashed: true,
            ..Self::new(user_name)
        }
    }
}
