//! HTTP-based browser capability
//!
//! Degraded [`CapabilityProvider`] used when no real browser automation is
//! wired in: pages are fetched over plain HTTP and parsed with regex
//! helpers. Interaction primitives (click, type, fill, select, hover) check
//! that the target selector plausibly exists in the fetched document and
//! acknowledge; screenshots persist an HTML snapshot instead of pixels.
//!
//! Good enough to exercise the full skill/session loop end to end; a
//! Chrome-backed provider can replace it without touching the core.

use crate::capability::{CapabilityProvider, CapabilityValue};
use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap());
static STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Configuration for the HTTP capability
#[derive(Debug, Clone)]
pub struct HttpCapabilityConfig {
    /// Per-request timeout
    pub timeout: Duration,
    /// Directory screenshots are written into
    pub screenshots_dir: PathBuf,
    /// User agent string
    pub user_agent: String,
    /// Poll interval for `wait_for`
    pub poll_interval: Duration,
}

impl Default for HttpCapabilityConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            screenshots_dir: PathBuf::from("./screenshots"),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Last fetched document
#[derive(Debug, Default, Clone)]
struct PageState {
    url: String,
    html: String,
}

/// reqwest-backed capability provider
pub struct HttpCapability {
    config: HttpCapabilityConfig,
    client: reqwest::Client,
    page: RwLock<PageState>,
}

impl HttpCapability {
    /// Create a provider with the given config
    pub fn new(config: HttpCapabilityConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            config,
            client,
            page: RwLock::new(PageState::default()),
        })
    }

    /// Current page, failing when nothing has been navigated to yet
    async fn current_page(&self) -> Result<PageState> {
        let page = self.page.read().await;
        if page.url.is_empty() {
            anyhow::bail!("no page loaded; navigate first");
        }
        Ok(page.clone())
    }

    /// Require `selector` to plausibly match the current document
    async fn require_selector(&self, selector: &str, verb: &str) -> Result<()> {
        let page = self.current_page().await?;
        if selector_present(&page.html, selector) {
            Ok(())
        } else {
            anyhow::bail!("cannot {}: no element matching '{}' on {}", verb, selector, page.url)
        }
    }
}

#[async_trait]
impl CapabilityProvider for HttpCapability {
    async fn navigate(&self, url: &str) -> Result<CapabilityValue> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to fetch {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP error {} for {}", response.status(), url);
        }

        let final_url = response.url().to_string();
        let html = response.text().await?;
        debug!(url = %final_url, bytes = html.len(), "page fetched");

        let mut page = self.page.write().await;
        page.url = final_url.clone();
        page.html = html;

        Ok(CapabilityValue::Extracted(json!({ "url": final_url })))
    }

    async fn click(&self, selector: &str) -> Result<CapabilityValue> {
        self.require_selector(selector, "click").await?;
        Ok(CapabilityValue::Ack)
    }

    async fn type_text(&self, selector: &str, _text: &str) -> Result<CapabilityValue> {
        self.require_selector(selector, "type into").await?;
        Ok(CapabilityValue::Ack)
    }

    async fn fill(&self, selector: &str, _value: &str) -> Result<CapabilityValue> {
        self.require_selector(selector, "fill").await?;
        Ok(CapabilityValue::Ack)
    }

    async fn select(&self, selector: &str, _value: &str) -> Result<CapabilityValue> {
        self.require_selector(selector, "select in").await?;
        Ok(CapabilityValue::Ack)
    }

    async fn hover(&self, selector: &str) -> Result<CapabilityValue> {
        self.require_selector(selector, "hover over").await?;
        Ok(CapabilityValue::Ack)
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<CapabilityValue> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if let Ok(page) = self.current_page().await {
                if selector_present(&page.html, selector) {
                    return Ok(CapabilityValue::Ack);
                }
            }
            if tokio::time::Instant::now() >= deadline {
                anyhow::bail!("timed out after {:?} waiting for '{}'", timeout, selector);
            }
            tokio::time::sleep(self.config.poll_interval.min(timeout)).await;
        }
    }

    async fn extract_title(&self) -> Result<CapabilityValue> {
        let page = self.current_page().await?;
        let title = extract_title(&page.html)
            .ok_or_else(|| anyhow::anyhow!("page {} has no <title>", page.url))?;
        Ok(CapabilityValue::Extracted(json!({ "title": title })))
    }

    async fn extract_url(&self) -> Result<CapabilityValue> {
        let page = self.current_page().await?;
        Ok(CapabilityValue::Extracted(json!({ "url": page.url })))
    }

    async fn extract_text(&self, selector: &str) -> Result<CapabilityValue> {
        let page = self.current_page().await?;
        if !selector_present(&page.html, selector) {
            anyhow::bail!("no element matching '{}' on {}", selector, page.url);
        }
        // Without a DOM we extract the whole body text; a Chrome-backed
        // provider narrows this to the selector's subtree.
        let text = extract_body_text(&page.html);
        Ok(CapabilityValue::Extracted(json!({ "text": text })))
    }

    async fn screenshot(&self, path: &Path) -> Result<CapabilityValue> {
        let page = self.current_page().await?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        tokio::fs::write(path, page.html.as_bytes())
            .await
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;

        info!(path = %path.display(), "page snapshot written");
        Ok(CapabilityValue::Screenshot(path.to_path_buf()))
    }
}

/// Best-effort check that a CSS selector could match the document.
///
/// Handles comma-separated alternatives and the leading simple part of each
/// (`tag`, `#id`, `.class`, `tag[attr...]`). Anything it cannot interpret is
/// assumed present rather than failing skills on parser gaps.
fn selector_present(html: &str, selector: &str) -> bool {
    selector.split(',').map(str::trim).any(|alt| {
        if alt.is_empty() {
            return false;
        }
        if let Some(id) = alt.strip_prefix('#') {
            let id = simple_token(id);
            return html.contains(&format!("id=\"{id}\"")) || html.contains(&format!("id='{id}'"));
        }
        if let Some(class) = alt.strip_prefix('.') {
            return html.contains(simple_token(class).as_str());
        }
        let tag = simple_token(alt);
        if tag.is_empty() {
            return true;
        }
        html.contains(&format!("<{tag}"))
    })
}

/// Leading identifier portion of a simple selector part
fn simple_token(part: &str) -> String {
    part.chars()
        .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// Extract title from HTML
fn extract_title(html: &str) -> Option<String> {
    let start = html.find("<title>")?;
    let end = html[start..].find("</title>")?;
    let title = &html[start + 7..start + end];
    Some(html_entities_decode(title.trim()))
}

/// Extract body text (simplified)
fn extract_body_text(html: &str) -> String {
    let text = SCRIPT_RE.replace_all(html, "");
    let text = STYLE_RE.replace_all(&text, "");
    let text = TAG_RE.replace_all(&text, " ");
    let text = html_entities_decode(&text);
    WS_RE.replace_all(&text, " ").trim().to_string()
}

/// Simple HTML entity decoder
fn html_entities_decode(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}
