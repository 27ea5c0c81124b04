//! Skill Type Definitions
//!
//! Core data structures for the skill system. The snapshot format keeps the
//! camelCase field names and RFC 3339 timestamps of the JSON files this
//! agent exchanges with its tooling; unknown fields round-trip untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Default bound for selector waits and the fast-run confidence bonus (ms)
pub const DEFAULT_SKILL_TIMEOUT_MS: u64 = 30_000;
/// Default sleep for a `wait` action without a selector (ms)
pub const DEFAULT_WAIT_MS: u64 = 1_000;
/// Confidence a skill must reach (once) to count as learned
pub const LEARNING_THRESHOLD: f64 = 0.7;
/// Screenshot references kept per session, oldest dropped first
pub const MAX_SCREENSHOTS_PER_SESSION: usize = 50;
/// Observations kept per session, oldest dropped first
pub const MAX_OBSERVATIONS_PER_SESSION: usize = 100;
/// Finalized sessions kept in the persisted history
pub const MAX_SESSION_HISTORY: usize = 50;

/// Skill categories, ordered by a fixed priority table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillCategory {
    Navigation,
    Tasks,
    Filters,
    Data,
    Interface,
    Automation,
}

impl SkillCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Tasks => "tasks",
            Self::Filters => "filters",
            Self::Data => "data",
            Self::Interface => "interface",
            Self::Automation => "automation",
        }
    }

    /// Fixed priority table; listings sort ascending on it
    pub fn priority(&self) -> u8 {
        match self {
            Self::Navigation => 10,
            Self::Interface => 8,
            Self::Tasks => 6,
            Self::Data => 4,
            Self::Filters => 3,
            Self::Automation => 2,
        }
    }
}

/// Skill difficulty tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillDifficulty {
    Basic,
    Intermediate,
    Advanced,
}

impl SkillDifficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    /// Lower weight sorts first when picking what to learn next
    pub fn weight(&self) -> u8 {
        match self {
            Self::Basic => 1,
            Self::Intermediate => 2,
            Self::Advanced => 3,
        }
    }
}

/// One step of a skill: the primitive plus a description and optional flag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    #[serde(flatten)]
    pub kind: ActionKind,
    /// Human-readable description, used in observations
    pub description: String,
    /// Optional actions may fail without aborting the skill
    #[serde(default)]
    pub optional: bool,
}

impl Action {
    pub fn new(kind: ActionKind, description: &str) -> Self {
        Self {
            kind,
            description: description.to_string(),
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// The nine browser primitives a skill step can dispatch to.
///
/// A closed sum type: every kind carries exactly the fields it needs, so a
/// `click` without a selector cannot be represented, let alone executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActionKind {
    /// Navigate to `url`, or to the execution context URL when absent
    Navigate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    /// Click the element matching `selector`
    Click { selector: String },
    /// Type text into the element matching `selector`
    Type {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    /// Clear then set the element matching `selector`
    Fill {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    /// Choose a value in the select matching `selector`
    Select {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    /// Hover over the element matching `selector`
    Hover { selector: String },
    /// Wait for `selector` (bounded by `timeout`), or plain sleep without one
    Wait {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    /// Extract `title`, `url`, or the text of `selector`
    Extract {
        #[serde(
            rename = "extractField",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        field: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
    },
    /// Capture the page, `filename` defaults to a clock-derived stem
    Screenshot {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "navigate",
            Self::Click { .. } => "click",
            Self::Type { .. } => "type",
            Self::Fill { .. } => "fill",
            Self::Select { .. } => "select",
            Self::Hover { .. } => "hover",
            Self::Wait { .. } => "wait",
            Self::Extract { .. } => "extract",
            Self::Screenshot { .. } => "screenshot",
        }
    }
}

/// A named, reusable unit of work with accumulated success statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    /// Stable id, derived deterministically from the name
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: SkillCategory,
    pub difficulty: SkillDifficulty,
    /// Ordered action sequence
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Set once confidence reaches the threshold; never reset automatically
    pub learned: bool,
    pub attempts: u32,
    pub success_count: u32,
    /// Max confidence seen so far, in [0, 1]
    pub confidence: f64,
    /// Opaque references (screenshot paths, sentinels) backing the statistics
    #[serde(default)]
    pub evidence: Vec<String>,
    /// CSS selectors picked up along the way
    #[serde(default)]
    pub selectors: Vec<String>,
    pub last_attempt: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_success: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// Fields this build does not know about survive a load/save round trip
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Skill {
    /// Historical success rate; zero attempts count as zero
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            f64::from(self.success_count) / f64::from(self.attempts)
        }
    }
}

/// Spec for creating a skill; statistics are initialized by the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillSpec {
    pub name: String,
    pub description: String,
    pub category: SkillCategory,
    #[serde(default = "default_difficulty")]
    pub difficulty: SkillDifficulty,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub selectors: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

fn default_difficulty() -> SkillDifficulty {
    SkillDifficulty::Basic
}

impl SkillSpec {
    pub fn new(name: &str, description: &str, category: SkillCategory) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            category,
            difficulty: SkillDifficulty::Basic,
            actions: Vec::new(),
            selectors: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_difficulty(mut self, difficulty: SkillDifficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }

    /// Validate the spec against the skill schema
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("skill name must not be empty".to_string());
        }
        if self.description.trim().is_empty() {
            return Err("skill description must not be empty".to_string());
        }
        for action in &self.actions {
            if action.description.trim().is_empty() {
                return Err(format!(
                    "{} action is missing a description",
                    action.kind.name()
                ));
            }
            if let Some(selector) = action_selector(&action.kind) {
                if selector.trim().is_empty() {
                    return Err(format!(
                        "{} action has an empty selector",
                        action.kind.name()
                    ));
                }
            }
        }
        Ok(())
    }
}

fn action_selector(kind: &ActionKind) -> Option<&str> {
    match kind {
        ActionKind::Click { selector }
        | ActionKind::Type { selector, .. }
        | ActionKind::Fill { selector, .. }
        | ActionKind::Select { selector, .. }
        | ActionKind::Hover { selector } => Some(selector),
        _ => None,
    }
}

/// Allowed fields for a skill update
#[derive(Debug, Clone, Default)]
pub struct SkillPatch {
    pub learned: Option<bool>,
    pub confidence: Option<f64>,
    pub evidence: Option<Vec<String>>,
    pub metadata: Option<HashMap<String, Value>>,
}

/// Outcome of one dispatched action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Action kind name plus description for the log
    pub action: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Ephemeral result of one skill run; feeds skill and session mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub skill_id: String,
    pub success: bool,
    pub time_elapsed_ms: u64,
    pub actions: Vec<ActionOutcome>,
    pub data_extracted: serde_json::Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    pub observations: Vec<String>,
    pub confidence: f64,
}

/// Deterministic skill id: lowercased, accents folded, everything else
/// collapsed to single dashes.
pub fn skill_id(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = true; // suppress a leading dash
    for c in name.chars().map(fold_accent) {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Fold common Latin accents to ASCII; anything else passes through
fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => 'n',
        other => other,
    }
}
