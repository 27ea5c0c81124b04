//! Skill Store
//!
//! Durable id→skill mapping persisted as a JSON snapshot, plus the built-in
//! seed catalog. A missing or corrupt snapshot degrades to an empty store;
//! write failures surface but never roll back in-memory state.

use super::types::*;
use crate::clock::SharedClock;
use crate::error::{AgentError, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

/// Skill registry with JSON snapshot persistence.
///
/// No cross-process locking: two agents pointed at the same snapshot file
/// race on save, last writer wins.
pub struct SkillStore {
    path: PathBuf,
    skills: HashMap<String, Skill>,
    clock: SharedClock,
}

impl SkillStore {
    pub fn new(path: PathBuf, clock: SharedClock) -> Self {
        Self {
            path,
            skills: HashMap::new(),
            clock,
        }
    }

    /// Load the persisted snapshot. Missing or unreadable files are not
    /// fatal; the store simply starts empty.
    pub async fn load(&mut self) -> usize {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) => {
                info!(path = %self.path.display(), "no skill snapshot ({e}), starting empty");
                self.skills.clear();
                return 0;
            }
        };

        match serde_json::from_str::<Vec<Skill>>(&data) {
            Ok(skills) => {
                self.skills.clear();
                for skill in skills {
                    self.skills.insert(skill.id.clone(), skill);
                }
                info!(count = self.skills.len(), "skills loaded from snapshot");
                self.skills.len()
            }
            Err(e) => {
                warn!(path = %self.path.display(), "corrupt skill snapshot ({e}), starting empty");
                self.skills.clear();
                0
            }
        }
    }

    /// Serialize every skill to the snapshot file.
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }

        let skills: Vec<&Skill> = self.skills.values().collect();
        let data = serde_json::to_string_pretty(&skills)
            .map_err(|e| AgentError::Persistence(format!("serialize skills: {e}")))?;

        tokio::fs::write(&self.path, data)
            .await
            .map_err(|e| AgentError::Persistence(format!("write {}: {e}", self.path.display())))?;

        Ok(())
    }

    /// Populate the built-in catalog. Idempotent: skills whose name already
    /// exists are left alone, so re-seeding never duplicates.
    pub async fn seed_defaults(&mut self) -> Result<usize> {
        let mut created = 0;
        for spec in default_catalog() {
            if !self.has_skill(&spec.name) {
                self.create(spec).await?;
                created += 1;
            }
        }
        Ok(created)
    }

    /// Validate a spec and register it as a fresh skill.
    pub async fn create(&mut self, spec: SkillSpec) -> Result<Skill> {
        spec.validate().map_err(AgentError::Validation)?;

        let id = skill_id(&spec.name);
        if id.is_empty() {
            return Err(AgentError::Validation(format!(
                "name '{}' produces an empty id",
                spec.name
            )));
        }
        if self.skills.contains_key(&id) {
            return Err(AgentError::Validation(format!(
                "skill '{id}' already exists"
            )));
        }

        let skill = Skill {
            id: id.clone(),
            name: spec.name,
            description: spec.description,
            category: spec.category,
            difficulty: spec.difficulty,
            actions: spec.actions,
            learned: false,
            attempts: 0,
            success_count: 0,
            confidence: 0.0,
            evidence: Vec::new(),
            selectors: spec.selectors,
            last_attempt: self.clock.now(),
            last_success: None,
            metadata: spec.metadata,
            extra: HashMap::new(),
        };

        self.skills.insert(id.clone(), skill.clone());
        self.save().await?;

        info!(
            skill = %skill.name,
            category = skill.category.as_str(),
            difficulty = skill.difficulty.as_str(),
            "skill created"
        );
        Ok(skill)
    }

    /// Merge the allowed fields into an existing skill and persist.
    pub async fn update(&mut self, id: &str, patch: SkillPatch) -> Result<()> {
        let now = self.clock.now();
        let skill = self
            .skills
            .get_mut(id)
            .ok_or_else(|| AgentError::NotFound(format!("skill {id}")))?;

        if let Some(learned) = patch.learned {
            skill.learned = learned;
        }
        if let Some(confidence) = patch.confidence {
            skill.confidence = confidence.clamp(0.0, 1.0);
        }
        if let Some(evidence) = patch.evidence {
            skill.evidence = evidence;
        }
        if let Some(metadata) = patch.metadata {
            skill.metadata.extend(metadata);
        }
        skill.last_attempt = now;

        self.save().await
    }

    pub fn get(&self, id: &str) -> Option<&Skill> {
        self.skills.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Skill> {
        self.skills.get_mut(id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Skill> {
        self.skills.values().find(|s| s.name == name)
    }

    pub fn has_skill(&self, name: &str) -> bool {
        self.get_by_name(name).is_some()
    }

    /// All skills, optionally filtered, ordered by the category priority
    /// table (ascending; ties unspecified).
    pub fn list(
        &self,
        category: Option<SkillCategory>,
        difficulty: Option<SkillDifficulty>,
    ) -> Vec<&Skill> {
        let mut skills: Vec<&Skill> = self
            .skills
            .values()
            .filter(|s| category.map_or(true, |c| s.category == c))
            .filter(|s| difficulty.map_or(true, |d| s.difficulty == d))
            .collect();
        skills.sort_by_key(|s| s.category.priority());
        skills
    }

    pub fn learned(&self) -> Vec<&Skill> {
        self.skills.values().filter(|s| s.learned).collect()
    }

    /// Unlearned skills, easiest first.
    pub fn unlearned(&self) -> Vec<&Skill> {
        let mut skills: Vec<&Skill> = self.skills.values().filter(|s| !s.learned).collect();
        skills.sort_by_key(|s| s.difficulty.weight());
        skills
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Skill> {
        self.skills.values()
    }
}

/// The built-in skill catalog, keyed by name for the idempotence check.
fn default_catalog() -> Vec<SkillSpec> {
    use ActionKind::*;

    vec![
        // Navigation
        SkillSpec::new(
            "Open Login Page",
            "Navigate to the login page and verify its elements",
            SkillCategory::Navigation,
        )
        .with_actions(vec![
            Action::new(Navigate { url: None }, "Navigate to the start URL"),
            Action::new(
                Screenshot {
                    filename: Some("login-page".to_string()),
                },
                "Capture the login page",
            ),
            Action::new(
                Wait {
                    selector: Some("input[type=\"email\"], input[name=\"email\"]".to_string()),
                    timeout: Some(5000),
                },
                "Wait for the email field",
            ),
        ]),
        SkillSpec::new(
            "Perform Login",
            "Sign in with the configured credentials",
            SkillCategory::Navigation,
        )
        .with_difficulty(SkillDifficulty::Intermediate)
        .with_actions(vec![
            Action::new(
                Fill {
                    selector: "input#email".to_string(),
                    text: None,
                },
                "Fill the email field",
            ),
            Action::new(
                Fill {
                    selector: "input[type=\"password\"], input[name=\"password\"]".to_string(),
                    text: None,
                },
                "Fill the password field",
            ),
            Action::new(
                Click {
                    selector: "button[type=\"submit\"], input[type=\"submit\"], .login-btn"
                        .to_string(),
                },
                "Click the submit button",
            ),
            Action::new(
                Wait {
                    selector: None,
                    timeout: Some(3000),
                },
                "Wait for the redirect",
            ),
            Action::new(
                Screenshot {
                    filename: Some("after-login".to_string()),
                },
                "Capture the page after login",
            ),
        ]),
        // Interface
        SkillSpec::new(
            "Explore Dashboard",
            "Identify the main dashboard elements",
            SkillCategory::Interface,
        )
        .with_actions(vec![
            Action::new(
                Extract {
                    field: Some("title".to_string()),
                    selector: None,
                },
                "Read the page title",
            ),
            Action::new(
                Extract {
                    field: Some("url".to_string()),
                    selector: None,
                },
                "Read the current URL",
            ),
            Action::new(
                Screenshot {
                    filename: Some("dashboard".to_string()),
                },
                "Capture the dashboard",
            ),
        ]),
        SkillSpec::new(
            "Map Main Menu",
            "Locate and map the navigation menu entries",
            SkillCategory::Interface,
        )
        .with_difficulty(SkillDifficulty::Intermediate)
        .with_actions(vec![
            Action::new(
                Extract {
                    field: Some("text".to_string()),
                    selector: Some("nav, .menu, .sidebar".to_string()),
                },
                "Extract the menu text",
            ),
            Action::new(
                Hover {
                    selector: "nav a, .menu a".to_string(),
                },
                "Hover over the menu entries",
            ),
            Action::new(
                Screenshot {
                    filename: Some("menu-hover".to_string()),
                },
                "Capture the hovered menu",
            ),
        ]),
        // Tasks
        SkillSpec::new(
            "Open Task List",
            "Navigate to the task list section",
            SkillCategory::Tasks,
        )
        .with_actions(vec![
            Action::new(
                Click {
                    selector: "a[href*=\"task\"], .tasks-link".to_string(),
                },
                "Click the tasks link",
            ),
            Action::new(
                Wait {
                    selector: None,
                    timeout: Some(2000),
                },
                "Wait for the list to load",
            ),
            Action::new(
                Screenshot {
                    filename: Some("tasks-list".to_string()),
                },
                "Capture the task list",
            ),
        ]),
        SkillSpec::new(
            "Create Task",
            "Full flow for creating a new task",
            SkillCategory::Tasks,
        )
        .with_difficulty(SkillDifficulty::Advanced)
        .with_actions(vec![
            Action::new(
                Click {
                    selector: ".new-task, .add-task, button[title*=\"New\"]".to_string(),
                },
                "Click the new-task button",
            ),
            Action::new(
                Wait {
                    selector: Some("input[name*=\"title\"]".to_string()),
                    timeout: Some(3000),
                },
                "Wait for the task form",
            ),
            Action::new(
                Fill {
                    selector: "input[name*=\"title\"]".to_string(),
                    text: Some("Test task".to_string()),
                },
                "Fill the task title",
            ),
            Action::new(
                Fill {
                    selector: "textarea[name*=\"description\"], textarea[name*=\"desc\"]"
                        .to_string(),
                    text: Some("Automatically created".to_string()),
                },
                "Fill the task description",
            ),
            Action::new(
                Screenshot {
                    filename: Some("new-task-form".to_string()),
                },
                "Capture the filled form",
            ),
        ]),
        // Data
        SkillSpec::new(
            "Extract Table Data",
            "Capture tabular information from the page",
            SkillCategory::Data,
        )
        .with_difficulty(SkillDifficulty::Intermediate)
        .with_actions(vec![
            Action::new(
                Extract {
                    field: Some("text".to_string()),
                    selector: Some("table".to_string()),
                },
                "Extract the table text",
            ),
            Action::new(
                Extract {
                    field: Some("text".to_string()),
                    selector: Some("table th".to_string()),
                },
                "Extract the table headers",
            ),
            Action::new(
                Screenshot {
                    filename: Some("data-table".to_string()),
                },
                "Capture the table",
            ),
        ]),
        // Filters
        SkillSpec::new(
            "Apply Filters",
            "Use the filter controls to refine results",
            SkillCategory::Filters,
        )
        .with_difficulty(SkillDifficulty::Intermediate)
        .with_actions(vec![
            Action::new(
                Click {
                    selector: ".filter, [data-filter]".to_string(),
                },
                "Open the filter panel",
            ),
            Action::new(
                Select {
                    selector: "select[name*=\"status\"]".to_string(),
                    text: Some("Active".to_string()),
                },
                "Select the status filter",
            ),
            Action::new(
                Click {
                    selector: ".apply-filter".to_string(),
                },
                "Apply the filters",
            ),
            Action::new(
                Wait {
                    selector: None,
                    timeout: Some(2000),
                },
                "Wait for the filtered results",
            ),
            Action::new(
                Screenshot {
                    filename: Some("filtered-results".to_string()),
                },
                "Capture the filtered results",
            ),
        ]),
    ]
}
