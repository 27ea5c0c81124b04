//! Learning Metrics
//!
//! Aggregate view over the skill store: totals, confidence averages and the
//! most recent learned skills. Purely derived, never persisted.

use super::store::SkillStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Snapshot of the agent's learning progress
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningMetrics {
    pub total_skills: usize,
    pub learned_skills: usize,
    pub average_confidence: f64,
    pub total_attempts: u64,
    /// Mean per-skill historical success rate
    pub success_rate: f64,
    pub skills_by_category: HashMap<String, usize>,
    pub skills_by_difficulty: HashMap<String, usize>,
    pub recent_improvements: Vec<Improvement>,
}

/// One recently learned skill
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Improvement {
    pub skill_id: String,
    pub improvement: String,
    pub timestamp: DateTime<Utc>,
}

/// Recently learned skills reported in the metrics
const RECENT_IMPROVEMENT_LIMIT: usize = 5;

impl LearningMetrics {
    /// Compute metrics over the current store contents.
    pub fn compute(store: &SkillStore) -> Self {
        let total = store.len();
        let mut learned = 0;
        let mut confidence_sum = 0.0;
        let mut attempts: u64 = 0;
        let mut rate_sum = 0.0;
        let mut by_category: HashMap<String, usize> = HashMap::new();
        let mut by_difficulty: HashMap<String, usize> = HashMap::new();
        let mut improvements: Vec<Improvement> = Vec::new();

        for skill in store.iter() {
            if skill.learned {
                learned += 1;
            }
            confidence_sum += skill.confidence;
            attempts += u64::from(skill.attempts);
            rate_sum += skill.success_rate();
            *by_category.entry(skill.category.as_str().to_string()).or_default() += 1;
            *by_difficulty
                .entry(skill.difficulty.as_str().to_string())
                .or_default() += 1;

            if skill.learned {
                if let Some(ts) = skill.last_success {
                    improvements.push(Improvement {
                        skill_id: skill.id.clone(),
                        improvement: format!("Skill '{}' learned", skill.name),
                        timestamp: ts,
                    });
                }
            }
        }

        improvements.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        improvements.truncate(RECENT_IMPROVEMENT_LIMIT);

        let denom = total.max(1) as f64;
        Self {
            total_skills: total,
            learned_skills: learned,
            average_confidence: confidence_sum / denom,
            total_attempts: attempts,
            success_rate: rate_sum / denom,
            skills_by_category: by_category,
            skills_by_difficulty: by_difficulty,
            recent_improvements: improvements,
        }
    }
}
