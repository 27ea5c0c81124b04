//! Agent
//!
//! Owns the skill store, the executor, at most one open session, and the
//! agent-wide autonomy level. Sessions wrap skill executions; autonomy grows
//! monotonically with the share of learned skills; an auto-save task
//! persists everything on a fixed interval until `stop()` cancels it.

pub mod session;

pub use session::{Session, SessionHistory};

use crate::capability::{CapabilityProvider, CapabilityValue};
use crate::clock::{session_id, SharedClock, SystemClock};
use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::skills::executor::{ExecutionContext, SkillExecutor};
use crate::skills::metrics::LearningMetrics;
use crate::skills::store::SkillStore;
use crate::skills::types::ExecutionResult;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Events the agent broadcasts to interested listeners
#[derive(Debug, Clone)]
pub enum AgentEvent {
    SessionStarted { session_id: String },
    SessionCompleted { session_id: String, success_rate: f64 },
    SkillLearned { skill_id: String },
    AutonomyLevelUp { level: u8 },
}

/// Compact status snapshot for callers
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub name: String,
    pub autonomy_level: u8,
    pub current_session: Option<String>,
    pub total_skills: usize,
    pub learned_skills: usize,
    pub success_rate: f64,
}

/// The owning context: one skill store, at most one open session, one
/// monotone autonomy level. Not a process-wide singleton — construct as
/// many independent agents as you need.
pub struct Agent {
    config: AgentConfig,
    clock: SharedClock,
    capability: Arc<dyn CapabilityProvider>,
    executor: SkillExecutor,
    store: Arc<RwLock<SkillStore>>,
    session: Arc<RwLock<Option<Session>>>,
    history: Arc<RwLock<SessionHistory>>,
    autonomy: AtomicU8,
    events: broadcast::Sender<AgentEvent>,
    shutdown: watch::Sender<bool>,
    autosave: Mutex<Option<JoinHandle<()>>>,
}

impl Agent {
    /// Create an agent with the system clock.
    pub fn new(config: AgentConfig, capability: Arc<dyn CapabilityProvider>) -> Self {
        Self::with_clock(config, capability, Arc::new(SystemClock))
    }

    /// Create an agent with an injected clock (deterministic ids in tests).
    pub fn with_clock(
        config: AgentConfig,
        capability: Arc<dyn CapabilityProvider>,
        clock: SharedClock,
    ) -> Self {
        let store = SkillStore::new(config.skills_file(), clock.clone());
        let history = SessionHistory::new(config.sessions_file());
        let executor = SkillExecutor::new(
            capability.clone(),
            clock.clone(),
            config.screenshots_dir.clone(),
            config.learning_threshold,
        );
        let (events, _) = broadcast::channel(64);
        let (shutdown, _) = watch::channel(false);

        Self {
            config,
            clock,
            capability,
            executor,
            store: Arc::new(RwLock::new(store)),
            session: Arc::new(RwLock::new(None)),
            history: Arc::new(RwLock::new(history)),
            autonomy: AtomicU8::new(0),
            events,
            shutdown,
            autosave: Mutex::new(None),
        }
    }

    /// Load snapshots, seed the default catalog and derive the starting
    /// autonomy level.
    pub async fn initialize(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.config.data_dir).await.ok();
        tokio::fs::create_dir_all(&self.config.screenshots_dir)
            .await
            .ok();

        {
            let mut store = self.store.write().await;
            store.load().await;
            let seeded = store.seed_defaults().await?;
            if seeded > 0 {
                info!(seeded, "default skills seeded");
            }
        }
        self.history.write().await.load().await;
        self.refresh_autonomy().await;

        info!(
            agent = %self.config.name,
            autonomy = self.autonomy_level(),
            skills = self.store.read().await.len(),
            "agent initialized"
        );
        Ok(())
    }

    /// Subscribe to agent events.
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.events.subscribe()
    }

    /// Open a session, implicitly closing any session already open. When a
    /// URL is given, an initial navigation is attempted; its failure is a
    /// session error, not a fatal one.
    pub async fn start_session(&self, url: Option<&str>) -> Result<Session> {
        if self.session.read().await.is_some() {
            self.end_session().await?;
        }

        let initial_url = url
            .map(str::to_string)
            .or_else(|| self.config.start_url.clone())
            .unwrap_or_else(|| "about:blank".to_string());

        let mut session = Session::new(
            session_id(self.clock.as_ref()),
            initial_url,
            self.autonomy_level(),
            self.clock.now(),
        );
        info!(session = %session.id, url = %session.url, "session started");

        if let Some(url) = url {
            match self.capability.navigate(url).await {
                Ok(_) => session.observe(format!("Navigated to {url}")),
                Err(e) => {
                    warn!(session = %session.id, "initial navigation failed: {e}");
                    session.errors.push(format!("Navigation failed: {e}"));
                }
            }
        }

        let _ = self.events.send(AgentEvent::SessionStarted {
            session_id: session.id.clone(),
        });

        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    /// Execute a skill by id or name, recording the outcome on the current
    /// session when one is open. `Validation` and `NotFound` surface raw;
    /// capability failures come back as a `success: false` result.
    pub async fn execute_skill(
        &self,
        id_or_name: &str,
        context: Option<&ExecutionContext>,
    ) -> Result<ExecutionResult> {
        let (skill_id, was_learned) = {
            let store = self.store.read().await;
            let skill = store
                .get(id_or_name)
                .or_else(|| store.get_by_name(id_or_name))
                .ok_or_else(|| AgentError::NotFound(format!("skill {id_or_name}")))?;
            (skill.id.clone(), skill.learned)
        };

        let result = {
            let mut store = self.store.write().await;
            self.executor.execute(&mut store, &skill_id, context).await?
        };

        let newly_learned = {
            let store = self.store.read().await;
            store.get(&skill_id).map(|s| s.learned).unwrap_or(false) && !was_learned
        };

        if let Some(session) = self.session.write().await.as_mut() {
            session.skills_attempted.push(skill_id.clone());
            if result.success {
                if newly_learned {
                    session.skills_learned.push(skill_id.clone());
                } else if was_learned {
                    session.skills_improved.push(skill_id.clone());
                }
            } else {
                session
                    .errors
                    .push(format!("Skill '{skill_id}' failed"));
            }
            for (k, v) in &result.data_extracted {
                session.data_extracted.insert(k.clone(), v.clone());
            }
            for obs in &result.observations {
                session.observe(obs.clone());
            }
            if let Some(shot) = &result.screenshot {
                session.add_screenshot(shot.clone());
            }
        }

        if newly_learned {
            let _ = self.events.send(AgentEvent::SkillLearned {
                skill_id: skill_id.clone(),
            });
            self.refresh_autonomy().await;
        }

        Ok(result)
    }

    /// Close the current session. Returns `Ok(None)` when no session is
    /// open — asking an idle agent to end a session is not an error.
    pub async fn end_session(&self) -> Result<Option<Session>> {
        let mut slot = self.session.write().await;
        let Some(mut session) = slot.take() else {
            return Ok(None);
        };
        drop(slot);

        // Final screenshot, best-effort.
        if let Some(path) = self.session_screenshot(&session.id, "end").await {
            session.add_screenshot(path);
        }

        session.finalize(self.clock.now());
        info!(
            session = %session.id,
            attempted = session.skills_attempted.len(),
            learned = session.skills_learned.len(),
            success_rate = session.success_rate,
            "session completed"
        );

        if let Err(e) = self.history.write().await.upsert(&session).await {
            warn!(session = %session.id, "failed to persist session: {e}");
        }

        let _ = self.events.send(AgentEvent::SessionCompleted {
            session_id: session.id.clone(),
            success_rate: session.success_rate,
        });

        Ok(Some(session))
    }

    /// Capture a session-scoped screenshot; failures are logged only.
    async fn session_screenshot(&self, session_id: &str, suffix: &str) -> Option<String> {
        let path = self
            .config
            .screenshots_dir
            .join(format!("{session_id}-{suffix}.html"));
        match self.capability.screenshot(&path).await {
            Ok(CapabilityValue::Screenshot(p)) => Some(p.display().to_string()),
            Ok(_) => Some(path.display().to_string()),
            Err(e) => {
                debug!(session = %session_id, "session screenshot failed: {e}");
                None
            }
        }
    }

    /// Recompute the autonomy level from the learned-skill share. Applied
    /// only when it grows; adding unlearned skills never lowers it.
    pub async fn refresh_autonomy(&self) {
        let (learned, total) = {
            let store = self.store.read().await;
            (store.learned().len(), store.len())
        };
        let new_level = autonomy_level(learned, total);

        let current = self.autonomy.load(Ordering::SeqCst);
        if new_level > current {
            self.autonomy.store(new_level, Ordering::SeqCst);
            info!(from = current, to = new_level, "autonomy level up");
            let _ = self
                .events
                .send(AgentEvent::AutonomyLevelUp { level: new_level });
        }
    }

    pub fn autonomy_level(&self) -> u8 {
        self.autonomy.load(Ordering::SeqCst)
    }

    /// Current session, if one is open.
    pub async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Aggregate learning metrics.
    pub async fn metrics(&self) -> LearningMetrics {
        LearningMetrics::compute(&*self.store.read().await)
    }

    /// Compact status for callers.
    pub async fn status(&self) -> AgentStatus {
        let metrics = self.metrics().await;
        AgentStatus {
            name: self.config.name.clone(),
            autonomy_level: self.autonomy_level(),
            current_session: self.session.read().await.as_ref().map(|s| s.id.clone()),
            total_skills: metrics.total_skills,
            learned_skills: metrics.learned_skills,
            success_rate: metrics.success_rate,
        }
    }

    /// The skill store handle, for registration and listing.
    pub fn store(&self) -> Arc<RwLock<SkillStore>> {
        self.store.clone()
    }

    /// Spawn the periodic auto-save task. It persists the skill store and,
    /// when a session is open, its in-progress snapshot, until `stop()`
    /// shuts it down. Spawning twice replaces the previous task.
    pub async fn spawn_autosave(&self) {
        if !self.config.auto_save {
            return;
        }

        let store = self.store.clone();
        let session = self.session.clone();
        let history = self.history.clone();
        let mut shutdown = self.shutdown.subscribe();
        let period = self.config.save_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await; // immediate first tick

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = store.read().await.save().await {
                            warn!("auto-save of skills failed: {e}");
                        }
                        if let Some(current) = session.read().await.clone() {
                            if let Err(e) = history.write().await.upsert(&current).await {
                                warn!("auto-save of session failed: {e}");
                            }
                        }
                        debug!("auto-save tick completed");
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            debug!("auto-save task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        if let Some(previous) = self.autosave.lock().await.replace(handle) {
            previous.abort();
        }
    }

    /// Close any open session, run one final save, and cancel the auto-save
    /// task. Terminal for this agent instance.
    pub async fn stop(&self) -> Result<()> {
        info!(agent = %self.config.name, "stopping agent");

        self.end_session().await?;

        if let Err(e) = self.store.read().await.save().await {
            warn!("final skill save failed: {e}");
        }

        let _ = self.shutdown.send(true);
        if let Some(handle) = self.autosave.lock().await.take() {
            let _ = handle.await;
        }

        info!(agent = %self.config.name, "agent stopped");
        Ok(())
    }
}

/// Agent-wide autonomy score from the proportion of learned skills.
pub fn autonomy_level(learned: usize, total: usize) -> u8 {
    let ratio = learned as f64 / total.max(1) as f64;
    (100.0 * ratio).round().min(100.0) as u8
}
