//! Browser capability boundary
//!
//! The agent core does not drive a browser itself. It calls an injected
//! [`CapabilityProvider`] for every primitive (navigate, click, extract, ...)
//! and only cares whether the call succeeded and what payload came back.
//! Production wires in the HTTP-based provider from [`crate::browser`];
//! tests wire in a scripted double.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Payload returned by a successful capability call.
#[derive(Debug, Clone)]
pub enum CapabilityValue {
    /// Simple acknowledgement (click, type, fill, select, hover, wait)
    Ack,
    /// Extracted page data keyed by field name (title, url, text)
    Extracted(Value),
    /// Path of a written screenshot file
    Screenshot(PathBuf),
}

impl CapabilityValue {
    /// Extracted data as a JSON object, if this value carries one.
    pub fn as_object(&self) -> Option<&serde_json::Map<String, Value>> {
        match self {
            Self::Extracted(Value::Object(map)) => Some(map),
            _ => None,
        }
    }
}

/// The external browser-automation boundary.
///
/// Each call either succeeds with a [`CapabilityValue`] or fails. Failures
/// carry whatever context the provider has; the executor decides whether a
/// failure aborts the skill (non-optional action) or is merely recorded.
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    /// Navigate the page to `url`.
    async fn navigate(&self, url: &str) -> anyhow::Result<CapabilityValue>;

    /// Click the element matching `selector`.
    async fn click(&self, selector: &str) -> anyhow::Result<CapabilityValue>;

    /// Type `text` into the element matching `selector`.
    async fn type_text(&self, selector: &str, text: &str) -> anyhow::Result<CapabilityValue>;

    /// Clear the element matching `selector`, then enter `value`.
    async fn fill(&self, selector: &str, value: &str) -> anyhow::Result<CapabilityValue>;

    /// Choose `value` in the select element matching `selector`.
    async fn select(&self, selector: &str, value: &str) -> anyhow::Result<CapabilityValue>;

    /// Hover over the element matching `selector`.
    async fn hover(&self, selector: &str) -> anyhow::Result<CapabilityValue>;

    /// Wait until `selector` is present, bounded by `timeout`.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> anyhow::Result<CapabilityValue>;

    /// Current page title.
    async fn extract_title(&self) -> anyhow::Result<CapabilityValue>;

    /// Current page URL.
    async fn extract_url(&self) -> anyhow::Result<CapabilityValue>;

    /// Text content of the element matching `selector`.
    async fn extract_text(&self, selector: &str) -> anyhow::Result<CapabilityValue>;

    /// Capture the current page to `path`.
    async fn screenshot(&self, path: &Path) -> anyhow::Result<CapabilityValue>;
}
