//! Skill Executor
//!
//! Runs one skill's action sequence against the capability provider and
//! folds the outcome back into the skill's statistics. Attempts are counted
//! before any action runs, so a crash mid-execution still shows up in the
//! numbers. Capability failures never escape as errors: they become a
//! `success: false` result with the trigger recorded in the observations.

use super::store::SkillStore;
use super::types::*;
use crate::capability::{CapabilityProvider, CapabilityValue};
use crate::clock::{screenshot_stem, SharedClock};
use crate::error::{AgentError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Execution-time context passed by the caller (session URL, credentials
/// style inputs live in skill metadata, not here).
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Fallback URL for `navigate` actions that do not carry their own
    pub url: Option<String>,
}

/// Executes skills one at a time against an injected capability provider.
pub struct SkillExecutor {
    capability: Arc<dyn CapabilityProvider>,
    clock: SharedClock,
    screenshots_dir: PathBuf,
    learning_threshold: f64,
}

impl SkillExecutor {
    pub fn new(
        capability: Arc<dyn CapabilityProvider>,
        clock: SharedClock,
        screenshots_dir: PathBuf,
        learning_threshold: f64,
    ) -> Self {
        Self {
            capability,
            clock,
            screenshots_dir,
            learning_threshold,
        }
    }

    /// Run the skill's actions strictly in order.
    ///
    /// An unknown id is a [`AgentError::NotFound`]; everything that goes
    /// wrong past that point lands in the result instead. The skill's
    /// post-execution state is persisted regardless of outcome.
    pub async fn execute(
        &self,
        store: &mut SkillStore,
        skill_id: &str,
        context: Option<&ExecutionContext>,
    ) -> Result<ExecutionResult> {
        let started = tokio::time::Instant::now();

        // Attempt accounting happens before the first action.
        let (actions, name) = {
            let now = self.clock.now();
            let skill = store
                .get_mut(skill_id)
                .ok_or_else(|| AgentError::NotFound(format!("skill {skill_id}")))?;
            skill.attempts += 1;
            skill.last_attempt = now;
            (skill.actions.clone(), skill.name.clone())
        };

        info!(skill = %name, actions = actions.len(), "executing skill");

        let mut result = ExecutionResult {
            skill_id: skill_id.to_string(),
            success: false,
            time_elapsed_ms: 0,
            actions: Vec::new(),
            data_extracted: serde_json::Map::new(),
            screenshot: None,
            observations: Vec::new(),
            confidence: 0.0,
        };

        if let Some(path) = self.take_screenshot(&format!("{skill_id}-start")).await {
            result.observations.push(format!("Initial screenshot: {path}"));
        }

        let mut aborted = false;
        for action in &actions {
            let (outcome, value) = self.run_action(action, context).await;
            debug!(
                action = action.kind.name(),
                success = outcome.success,
                "action finished"
            );

            if let Some(map) = value.as_ref().and_then(CapabilityValue::as_object) {
                // Later keys overwrite earlier ones with the same name.
                for (k, v) in map {
                    result.data_extracted.insert(k.clone(), v.clone());
                }
            }

            let failed = !outcome.success;
            let error = outcome.error.clone();
            result.actions.push(outcome);

            if failed {
                if action.optional {
                    result.observations.push(format!(
                        "Optional action '{}' failed: {}",
                        action.description,
                        error.unwrap_or_default()
                    ));
                } else {
                    result.observations.push(format!(
                        "Required action '{}' failed: {}",
                        action.description,
                        error.unwrap_or_default()
                    ));
                    aborted = true;
                    break;
                }
            }
        }

        if !aborted {
            if let Some(path) = self.take_screenshot(&format!("{skill_id}-end")).await {
                result.observations.push(format!("Final screenshot: {path}"));
                result.screenshot = Some(path);
            }
            result.success = true;
        }

        result.time_elapsed_ms = started.elapsed().as_millis() as u64;

        // Fold the run back into the skill.
        let patch = {
            let now = self.clock.now();
            let skill = store
                .get_mut(skill_id)
                .ok_or_else(|| AgentError::NotFound(format!("skill {skill_id}")))?;

            if result.success {
                skill.success_count += 1;
                skill.last_success = Some(now);

                result.confidence = confidence(
                    skill.success_rate(),
                    action_success_rate(&result.actions),
                    result.time_elapsed_ms,
                );

                if result.confidence >= self.learning_threshold && !skill.learned {
                    skill.learned = true;
                    result
                        .observations
                        .push(format!("Skill '{name}' learned"));
                    info!(skill = %name, confidence = result.confidence, "skill learned");
                }

                skill.confidence = skill.confidence.max(result.confidence);
                skill.evidence.push(
                    result
                        .screenshot
                        .clone()
                        .unwrap_or_else(|| "execution-success".to_string()),
                );
            }

            SkillPatch {
                learned: Some(skill.learned),
                confidence: Some(skill.confidence),
                evidence: Some(skill.evidence.clone()),
                metadata: None,
            }
        };

        // Persist post-execution state; a write failure is reported in the
        // observations but does not fail the run.
        if let Err(e) = store.update(skill_id, patch).await {
            warn!(skill = %name, "failed to persist skill state: {e}");
            result.observations.push(format!("Persistence failed: {e}"));
        }

        info!(
            skill = %name,
            success = result.success,
            elapsed_ms = result.time_elapsed_ms,
            "skill finished"
        );
        Ok(result)
    }

    /// Dispatch one action to the capability provider.
    async fn run_action(
        &self,
        action: &Action,
        context: Option<&ExecutionContext>,
    ) -> (ActionOutcome, Option<CapabilityValue>) {
        let label = format!("{}: {}", action.kind.name(), action.description);

        let call = match &action.kind {
            ActionKind::Navigate { url } => {
                let target = url
                    .clone()
                    .or_else(|| context.and_then(|c| c.url.clone()));
                match target {
                    Some(url) => self.capability.navigate(&url).await,
                    None => Err(anyhow::anyhow!("navigate action has no url")),
                }
            }
            ActionKind::Click { selector } => self.capability.click(selector).await,
            ActionKind::Type { selector, text } => {
                self.capability
                    .type_text(selector, text.as_deref().unwrap_or(""))
                    .await
            }
            ActionKind::Fill { selector, text } => {
                self.capability
                    .fill(selector, text.as_deref().unwrap_or(""))
                    .await
            }
            ActionKind::Select { selector, text } => {
                self.capability
                    .select(selector, text.as_deref().unwrap_or(""))
                    .await
            }
            ActionKind::Hover { selector } => self.capability.hover(selector).await,
            ActionKind::Wait { selector, timeout } => match selector {
                Some(selector) => {
                    let bound =
                        Duration::from_millis(timeout.unwrap_or(DEFAULT_SKILL_TIMEOUT_MS));
                    self.capability.wait_for(selector, bound).await
                }
                None => {
                    // Plain sleep; no selector check.
                    tokio::time::sleep(Duration::from_millis(
                        timeout.unwrap_or(DEFAULT_WAIT_MS),
                    ))
                    .await;
                    Ok(CapabilityValue::Ack)
                }
            },
            ActionKind::Extract { field, selector } => match field.as_deref() {
                Some("title") => self.capability.extract_title().await,
                Some("url") => self.capability.extract_url().await,
                _ => match selector {
                    Some(selector) => self.capability.extract_text(selector).await,
                    None => Err(AgentError::UnsupportedAction(
                        "extract action needs a field or selector".to_string(),
                    )
                    .into()),
                },
            },
            ActionKind::Screenshot { filename } => {
                let stem = filename
                    .clone()
                    .unwrap_or_else(|| screenshot_stem(self.clock.as_ref()));
                let path = self.screenshots_dir.join(format!("{stem}.html"));
                self.capability.screenshot(&path).await
            }
        };

        match call {
            Ok(value) => (
                ActionOutcome {
                    action: label,
                    success: true,
                    error: None,
                },
                Some(value),
            ),
            Err(e) => {
                // Domain errors keep their own message; raw provider
                // failures are reported through the Capability variant.
                let message = match e.downcast_ref::<AgentError>() {
                    Some(err) => err.to_string(),
                    None => AgentError::Capability(e.to_string()).to_string(),
                };
                (
                    ActionOutcome {
                        action: label,
                        success: false,
                        error: Some(message),
                    },
                    None,
                )
            }
        }
    }

    /// Best-effort screenshot; failures are logged, never propagated.
    pub(crate) async fn take_screenshot(&self, stem: &str) -> Option<String> {
        let path = self.screenshots_dir.join(format!("{stem}.html"));
        match self.capability.screenshot(&path).await {
            Ok(CapabilityValue::Screenshot(path)) => Some(path.display().to_string()),
            Ok(_) => Some(path.display().to_string()),
            Err(e) => {
                debug!("screenshot '{stem}' failed: {e}");
                None
            }
        }
    }
}

/// Share of executed actions that succeeded. An empty run counts as fully
/// successful (vacuous truth), so zero-action skills can still be scored.
pub fn action_success_rate(outcomes: &[ActionOutcome]) -> f64 {
    if outcomes.is_empty() {
        1.0
    } else {
        outcomes.iter().filter(|o| o.success).count() as f64 / outcomes.len() as f64
    }
}

/// Confidence for one successful run, clamped to [0, 1]:
/// `0.6 * historical + 0.3 * this_run + 0.1 fast-run bonus`.
pub fn confidence(historical_rate: f64, action_rate: f64, elapsed_ms: u64) -> f64 {
    let bonus = if elapsed_ms < DEFAULT_SKILL_TIMEOUT_MS { 0.1 } else { 0.0 };
    (0.6 * historical_rate + 0.3 * action_rate + bonus).clamp(0.0, 1.0)
}
