//! Skill System
//!
//! Named, parametrized skills: ordered sequences of browser actions with
//! accumulated success statistics. Execution runs against an injected
//! capability provider; confidence accumulates over repeated runs and a
//! skill flips to learned once it crosses the threshold.
//!
//! ```text
//! Request → SkillStore → SkillExecutor → CapabilityProvider
//!               │              │
//!          JSON snapshot   confidence model
//!               │              │
//!          seed catalog    learned flag (one-way)
//! ```

pub mod executor;
pub mod metrics;
pub mod store;
pub mod types;

pub use executor::{action_success_rate, confidence, ExecutionContext, SkillExecutor};
pub use metrics::LearningMetrics;
pub use store::SkillStore;
pub use types::{
    Action, ActionKind, ActionOutcome, ExecutionResult, Skill, SkillCategory, SkillDifficulty,
    SkillPatch, SkillSpec,
};
