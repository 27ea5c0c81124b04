//! Skillpilot
//!
//! A control loop that teaches an autonomous agent browser-UI tasks by
//! executing named skills (ordered sequences of primitive browser actions),
//! scoring how well each run went, and promoting skills from attempted to
//! learned once confidence crosses a threshold.
//!
//! # Architecture
//!
//! ```text
//! caller ──► Agent ──► SkillExecutor ──► CapabilityProvider
//!              │             │                (browser boundary)
//!              ├── SkillStore (JSON snapshot + seed catalog)
//!              ├── Session / SessionHistory (bounded, persisted)
//!              ├── autonomy tracker (0–100, monotone)
//!              └── auto-save task (cancellable)
//! ```
//!
//! "Learning" here is statistical confidence accumulation over repeated
//! deterministic action sequences, not perception: each successful run
//! recomputes `0.6·historical + 0.3·this_run + fast-run bonus`, and the
//! stored per-skill confidence keeps the maximum seen.
//!
//! The browser itself sits behind the [`capability::CapabilityProvider`]
//! trait; [`browser::HttpCapability`] is the built-in degraded provider,
//! and tests inject scripted doubles.

pub mod agent;
pub mod browser;
pub mod capability;
pub mod clock;
pub mod config;
pub mod error;
pub mod skills;

pub use agent::{Agent, AgentEvent, AgentStatus, Session, SessionHistory};
pub use browser::{HttpCapability, HttpCapabilityConfig};
pub use capability::{CapabilityProvider, CapabilityValue};
pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use config::AgentConfig;
pub use error::AgentError;
pub use skills::{
    Action, ActionKind, ActionOutcome, ExecutionContext, ExecutionResult, LearningMetrics, Skill,
    SkillCategory, SkillDifficulty, SkillExecutor, SkillPatch, SkillSpec, SkillStore,
};
