//! Configuration management

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Agent display name
    pub name: String,

    /// Directory for skill/session snapshots
    pub data_dir: PathBuf,

    /// Directory for screenshot files
    pub screenshots_dir: PathBuf,

    /// URL opened when a session starts without an explicit one (optional)
    pub start_url: Option<String>,

    /// Enable the periodic auto-save task
    pub auto_save: bool,

    /// Interval between auto-save ticks
    pub save_interval: Duration,

    /// Confidence needed before a skill counts as learned
    pub learning_threshold: f64,

    /// Per-request timeout for the HTTP capability
    pub capability_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skillpilot");

        Self {
            name: "skillpilot".to_string(),
            screenshots_dir: data_dir.join("screenshots"),
            data_dir,
            start_url: None,
            auto_save: true,
            save_interval: Duration::from_secs(30),
            learning_threshold: 0.7,
            capability_timeout: Duration::from_secs(30),
        }
    }
}

impl AgentConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let data_dir = std::env::var("SKILLPILOT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let screenshots_dir = std::env::var("SKILLPILOT_SCREENSHOTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("screenshots"));

        let start_url = std::env::var("SKILLPILOT_START_URL").ok();

        let auto_save = std::env::var("SKILLPILOT_AUTO_SAVE")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let save_interval = std::env::var("SKILLPILOT_SAVE_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.save_interval);

        let learning_threshold = std::env::var("SKILLPILOT_LEARNING_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|t| (0.0..=1.0).contains(t))
            .unwrap_or(defaults.learning_threshold);

        let capability_timeout = std::env::var("SKILLPILOT_CAPABILITY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.capability_timeout);

        Ok(Self {
            name: std::env::var("SKILLPILOT_AGENT_NAME").unwrap_or_else(|_| defaults.name),
            data_dir,
            screenshots_dir,
            start_url,
            auto_save,
            save_interval,
            learning_threshold,
            capability_timeout,
        })
    }

    /// Skill snapshot file path
    pub fn skills_file(&self) -> PathBuf {
        self.data_dir.join("skills.json")
    }

    /// Session history file path
    pub fn sessions_file(&self) -> PathBuf {
        self.data_dir.join("sessions.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert!(config.auto_save);
        assert_eq!(config.learning_threshold, 0.7);
        assert_eq!(config.save_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_snapshot_paths() {
        let config = AgentConfig {
            data_dir: PathBuf::from("/tmp/sp"),
            ..AgentConfig::default()
        };
        assert_eq!(config.skills_file(), PathBuf::from("/tmp/sp/skills.json"));
        assert_eq!(config.sessions_file(), PathBuf::from("/tmp/sp/sessions.json"));
    }
}
