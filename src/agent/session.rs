//! Sessions
//!
//! One bounded window of agent activity. Sessions collect the skill attempts,
//! observations, errors and screenshots made while they are open, and are
//! appended to a bounded persisted history when they close.

use crate::error::{AgentError, Result};
use crate::skills::types::{
    MAX_OBSERVATIONS_PER_SESSION, MAX_SCREENSHOTS_PER_SESSION, MAX_SESSION_HISTORY,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};

/// One bounded unit of interactive work
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Initial URL the session opened on
    pub url: String,
    pub skills_attempted: Vec<String>,
    pub skills_learned: Vec<String>,
    pub skills_improved: Vec<String>,
    /// Screenshot references, FIFO-capped
    pub screenshots: Vec<String>,
    /// Free-text observation log, FIFO-capped
    pub observations: Vec<String>,
    pub data_extracted: serde_json::Map<String, Value>,
    pub errors: Vec<String>,
    pub next_steps: Vec<String>,
    /// Autonomy level when the session opened
    pub autonomy_level: u8,
    /// Derived once, at session end
    pub success_rate: f64,
}

impl Session {
    pub fn new(id: String, url: String, autonomy_level: u8, start_time: DateTime<Utc>) -> Self {
        Self {
            id,
            start_time,
            end_time: None,
            url,
            skills_attempted: Vec::new(),
            skills_learned: Vec::new(),
            skills_improved: Vec::new(),
            screenshots: Vec::new(),
            observations: Vec::new(),
            data_extracted: serde_json::Map::new(),
            errors: Vec::new(),
            next_steps: Vec::new(),
            autonomy_level,
            success_rate: 0.0,
        }
    }

    /// Record a screenshot reference, evicting the oldest past the cap.
    pub fn add_screenshot(&mut self, path: String) {
        self.screenshots.push(path);
        if self.screenshots.len() > MAX_SCREENSHOTS_PER_SESSION {
            self.screenshots.remove(0);
        }
    }

    /// Record an observation, evicting the oldest past the cap.
    pub fn observe(&mut self, message: String) {
        self.observations.push(message);
        if self.observations.len() > MAX_OBSERVATIONS_PER_SESSION {
            self.observations.remove(0);
        }
    }

    /// Stamp the end time and derive the success rate:
    /// `(learned + improved) / max(attempted, 1)`.
    pub fn finalize(&mut self, end_time: DateTime<Utc>) {
        self.end_time = Some(end_time);
        let successful = self.skills_learned.len() + self.skills_improved.len();
        self.success_rate = successful as f64 / self.skills_attempted.len().max(1) as f64;
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

/// Bounded persisted history of sessions.
///
/// In-progress snapshots and finalized sessions both go through [`upsert`],
/// so an auto-save tick updates the session's entry in place instead of
/// appending a duplicate per tick.
///
/// [`upsert`]: SessionHistory::upsert
pub struct SessionHistory {
    path: PathBuf,
    sessions: Vec<Session>,
}

impl SessionHistory {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            sessions: Vec::new(),
        }
    }

    /// Load the persisted history; missing or corrupt files start empty.
    pub async fn load(&mut self) -> usize {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(_) => {
                info!(path = %self.path.display(), "no session history, starting empty");
                return 0;
            }
        };

        match serde_json::from_str::<Vec<Session>>(&data) {
            Ok(sessions) => {
                self.sessions = sessions;
                info!(count = self.sessions.len(), "session history loaded");
                self.sessions.len()
            }
            Err(e) => {
                warn!(path = %self.path.display(), "corrupt session history ({e}), starting empty");
                self.sessions.clear();
                0
            }
        }
    }

    /// Insert or replace the session's entry, enforcing the history cap
    /// (oldest dropped first), then persist.
    pub async fn upsert(&mut self, session: &Session) -> Result<()> {
        match self.sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session.clone(),
            None => self.sessions.push(session.clone()),
        }

        if self.sessions.len() > MAX_SESSION_HISTORY {
            let excess = self.sessions.len() - MAX_SESSION_HISTORY;
            self.sessions.drain(..excess);
        }

        self.save().await
    }

    /// Write the history snapshot.
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }

        let data = serde_json::to_string_pretty(&self.sessions)
            .map_err(|e| AgentError::Persistence(format!("serialize sessions: {e}")))?;

        tokio::fs::write(&self.path, data)
            .await
            .map_err(|e| AgentError::Persistence(format!("write {}: {e}", self.path.display())))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter()
    }
}
