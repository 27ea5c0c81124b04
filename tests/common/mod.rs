//! Shared test fixtures: a scripted capability provider and agent config
//! helpers backed by temp dirs.

use async_trait::async_trait;
use serde_json::json;
use skillpilot::{AgentConfig, CapabilityProvider, CapabilityValue};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

/// Capability double with scriptable failures and a call log.
#[derive(Default)]
pub struct MockCapability {
    fail_selectors: HashSet<String>,
    fail_navigate: bool,
    fail_screenshots: bool,
    calls: Mutex<Vec<String>>,
}

impl MockCapability {
    pub fn ok() -> Self {
        Self::default()
    }

    /// Selector-based calls against `selector` will fail.
    pub fn failing_on(mut self, selector: &str) -> Self {
        self.fail_selectors.insert(selector.to_string());
        self
    }

    pub fn failing_navigation(mut self) -> Self {
        self.fail_navigate = true;
        self
    }

    pub fn failing_screenshots(mut self) -> Self {
        self.fail_screenshots = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn selector_call(&self, op: &str, selector: &str) -> anyhow::Result<CapabilityValue> {
        self.record(format!("{op} {selector}"));
        if self.fail_selectors.contains(selector) {
            anyhow::bail!("scripted failure for '{selector}'");
        }
        Ok(CapabilityValue::Ack)
    }
}

#[async_trait]
impl CapabilityProvider for MockCapability {
    async fn navigate(&self, url: &str) -> anyhow::Result<CapabilityValue> {
        self.record(format!("navigate {url}"));
        if self.fail_navigate {
            anyhow::bail!("scripted navigation failure");
        }
        Ok(CapabilityValue::Extracted(json!({ "url": url })))
    }

    async fn click(&self, selector: &str) -> anyhow::Result<CapabilityValue> {
        self.selector_call("click", selector)
    }

    async fn type_text(&self, selector: &str, _text: &str) -> anyhow::Result<CapabilityValue> {
        self.selector_call("type", selector)
    }

    async fn fill(&self, selector: &str, _value: &str) -> anyhow::Result<CapabilityValue> {
        self.selector_call("fill", selector)
    }

    async fn select(&self, selector: &str, _value: &str) -> anyhow::Result<CapabilityValue> {
        self.selector_call("select", selector)
    }

    async fn hover(&self, selector: &str) -> anyhow::Result<CapabilityValue> {
        self.selector_call("hover", selector)
    }

    async fn wait_for(
        &self,
        selector: &str,
        _timeout: Duration,
    ) -> anyhow::Result<CapabilityValue> {
        self.selector_call("wait_for", selector)
    }

    async fn extract_title(&self) -> anyhow::Result<CapabilityValue> {
        self.record("extract_title".to_string());
        Ok(CapabilityValue::Extracted(json!({ "title": "Mock Page" })))
    }

    async fn extract_url(&self) -> anyhow::Result<CapabilityValue> {
        self.record("extract_url".to_string());
        Ok(CapabilityValue::Extracted(json!({ "url": "https://mock.test/" })))
    }

    async fn extract_text(&self, selector: &str) -> anyhow::Result<CapabilityValue> {
        self.record(format!("extract_text {selector}"));
        if self.fail_selectors.contains(selector) {
            anyhow::bail!("scripted failure for '{selector}'");
        }
        Ok(CapabilityValue::Extracted(json!({ "text": "mock text" })))
    }

    async fn screenshot(&self, path: &Path) -> anyhow::Result<CapabilityValue> {
        self.record(format!("screenshot {}", path.display()));
        if self.fail_screenshots {
            anyhow::bail!("scripted screenshot failure");
        }
        Ok(CapabilityValue::Screenshot(PathBuf::from(path)))
    }
}

/// Agent config pointed at a temp dir, auto-save off.
pub fn test_config(dir: &TempDir) -> AgentConfig {
    AgentConfig {
        name: "test-agent".to_string(),
        data_dir: dir.path().join("data"),
        screenshots_dir: dir.path().join("screenshots"),
        start_url: None,
        auto_save: false,
        save_interval: Duration::from_secs(3600),
        learning_threshold: 0.7,
        capability_timeout: Duration::from_secs(5),
    }
}
