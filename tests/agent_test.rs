//! Agent session lifecycle and learning-loop integration tests.

mod common;

use common::{test_config, MockCapability};
use skillpilot::{
    Action, ActionKind, Agent, AgentEvent, ExecutionContext, FixedClock, SkillCategory, SkillPatch,
    SkillSpec,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

async fn agent_with(capability: MockCapability, dir: &TempDir) -> Agent {
    let agent = Agent::new(test_config(dir), Arc::new(capability));
    agent.initialize().await.unwrap();
    agent
}

#[tokio::test]
async fn test_end_session_on_idle_agent_is_none() {
    let dir = TempDir::new().unwrap();
    let agent = agent_with(MockCapability::ok(), &dir).await;

    // Scenario: ending a session that was never started is a no-op signal,
    // not an error.
    assert!(agent.end_session().await.unwrap().is_none());
}

#[tokio::test]
async fn test_session_without_url_does_not_navigate() {
    let dir = TempDir::new().unwrap();
    let capability = Arc::new(MockCapability::ok());
    let agent = Agent::new(test_config(&dir), capability.clone());
    agent.initialize().await.unwrap();

    let session = agent.start_session(None).await.unwrap();
    assert_eq!(session.url, "about:blank");
    assert!(session.errors.is_empty());
    assert!(!capability.calls().iter().any(|c| c.starts_with("navigate")));
}

#[tokio::test]
async fn test_failed_initial_navigation_is_session_error_not_fatal() {
    let dir = TempDir::new().unwrap();
    let agent = agent_with(MockCapability::ok().failing_navigation(), &dir).await;

    let session = agent.start_session(Some("https://example.test/")).await.unwrap();
    assert_eq!(session.errors.len(), 1);
    assert!(session.errors[0].contains("Navigation failed"));
    assert!(agent.current_session().await.is_some());
}

#[tokio::test]
async fn test_zero_action_skill_learns_on_first_clean_run() {
    let dir = TempDir::new().unwrap();
    let agent = agent_with(MockCapability::ok(), &dir).await;

    {
        let store = agent.store();
        let mut store = store.write().await;
        store
            .create(SkillSpec::new("Noop", "Does nothing", SkillCategory::Automation))
            .await
            .unwrap();
    }

    agent.start_session(None).await.unwrap();
    let result = agent.execute_skill("noop", None).await.unwrap();

    // Empty action list counts as a fully successful run: 0.6 + 0.3 + 0.1.
    assert!(result.success);
    assert!((result.confidence - 1.0).abs() < 1e-9);

    let store = agent.store();
    let store = store.read().await;
    let skill = store.get("noop").unwrap();
    assert!(skill.learned);
    assert_eq!(skill.attempts, 1);
    assert_eq!(skill.success_count, 1);
    assert_eq!(skill.evidence.len(), 1);
}

#[tokio::test]
async fn test_failed_required_action_counts_attempt_only() {
    let dir = TempDir::new().unwrap();
    let agent = agent_with(MockCapability::ok().failing_on("#missing"), &dir).await;

    {
        let store = agent.store();
        let mut store = store.write().await;
        store
            .create(
                SkillSpec::new("Click Missing", "Clicks a missing element", SkillCategory::Tasks)
                    .with_actions(vec![Action::new(
                        ActionKind::Click {
                            selector: "#missing".to_string(),
                        },
                        "Click the missing element",
                    )]),
            )
            .await
            .unwrap();
    }

    let result = agent.execute_skill("click-missing", None).await.unwrap();
    assert!(!result.success);
    assert!(result
        .observations
        .iter()
        .any(|o| o.contains("Required action")));
    // Provider failures are reported as capability failures.
    assert!(result.actions[0]
        .error
        .as_deref()
        .unwrap()
        .contains("capability call failed"));

    let store = agent.store();
    let store = store.read().await;
    let skill = store.get("click-missing").unwrap();
    assert_eq!(skill.attempts, 1);
    assert_eq!(skill.success_count, 0);
    assert!(!skill.learned);
}

#[tokio::test]
async fn test_optional_action_failure_does_not_abort() {
    let dir = TempDir::new().unwrap();
    let agent = agent_with(MockCapability::ok().failing_on(".banner"), &dir).await;

    {
        let store = agent.store();
        let mut store = store.write().await;
        store
            .create(
                SkillSpec::new("Dismiss Banner", "Best-effort banner dismiss", SkillCategory::Interface)
                    .with_actions(vec![
                        Action::new(
                            ActionKind::Click {
                                selector: ".banner".to_string(),
                            },
                            "Dismiss the banner",
                        )
                        .optional(),
                        Action::new(
                            ActionKind::Extract {
                                field: Some("title".to_string()),
                                selector: None,
                            },
                            "Read the title",
                        ),
                    ]),
            )
            .await
            .unwrap();
    }

    let result = agent.execute_skill("dismiss-banner", None).await.unwrap();
    assert!(result.success);
    assert_eq!(result.actions.len(), 2);
    assert!(!result.actions[0].success);
    assert!(result.actions[1].success);
    assert_eq!(result.data_extracted["title"], "Mock Page");
}

#[tokio::test]
async fn test_learned_survives_later_failures() {
    let dir = TempDir::new().unwrap();
    let agent = agent_with(MockCapability::ok(), &dir).await;

    // A navigate action with no URL of its own: it succeeds only when the
    // caller supplies one through the execution context.
    {
        let store = agent.store();
        let mut store = store.write().await;
        store
            .create(
                SkillSpec::new("Fragile", "Learns then breaks", SkillCategory::Data)
                    .with_actions(vec![Action::new(
                        ActionKind::Navigate { url: None },
                        "Go to the working page",
                    )]),
            )
            .await
            .unwrap();
    }

    let context = ExecutionContext {
        url: Some("https://ok.test/".to_string()),
    };
    let first = agent.execute_skill("fragile", Some(&context)).await.unwrap();
    assert!(first.success);

    // Second run without a context URL fails, but the learned flag and the
    // max-seen confidence stay put.
    let second = agent.execute_skill("fragile", None).await.unwrap();
    assert!(!second.success);

    let store = agent.store();
    let store = store.read().await;
    let skill = store.get("fragile").unwrap();
    assert!(skill.learned);
    assert_eq!(skill.attempts, 2);
    assert_eq!(skill.success_count, 1);
    assert!((skill.confidence - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_success_count_never_exceeds_attempts() {
    let dir = TempDir::new().unwrap();
    let agent = agent_with(MockCapability::ok().failing_on("#flaky"), &dir).await;

    {
        let store = agent.store();
        let mut store = store.write().await;
        store
            .create(
                SkillSpec::new("Flaky", "Fails every run", SkillCategory::Tasks).with_actions(
                    vec![Action::new(
                        ActionKind::Click {
                            selector: "#flaky".to_string(),
                        },
                        "Click the flaky element",
                    )],
                ),
            )
            .await
            .unwrap();
        store
            .create(SkillSpec::new("Steady", "Always works", SkillCategory::Tasks))
            .await
            .unwrap();
    }

    for _ in 0..3 {
        agent.execute_skill("flaky", None).await.unwrap();
        agent.execute_skill("steady", None).await.unwrap();
    }

    let store = agent.store();
    let store = store.read().await;
    for skill in [store.get("flaky").unwrap(), store.get("steady").unwrap()] {
        assert!(skill.success_count <= skill.attempts);
    }
    assert_eq!(store.get("flaky").unwrap().success_count, 0);
    assert_eq!(store.get("steady").unwrap().success_count, 3);
}

#[tokio::test]
async fn test_unknown_skill_surfaces_not_found() {
    let dir = TempDir::new().unwrap();
    let agent = agent_with(MockCapability::ok(), &dir).await;

    let err = agent.execute_skill("no-such-skill", None).await.unwrap_err();
    assert!(matches!(err, skillpilot::AgentError::NotFound(_)));
}

#[tokio::test]
async fn test_execute_by_name_resolves_to_id() {
    let dir = TempDir::new().unwrap();
    let agent = agent_with(MockCapability::ok(), &dir).await;

    {
        let store = agent.store();
        let mut store = store.write().await;
        store
            .create(SkillSpec::new("By Name", "Runs by display name", SkillCategory::Tasks))
            .await
            .unwrap();
    }

    let result = agent.execute_skill("By Name", None).await.unwrap();
    assert_eq!(result.skill_id, "by-name");
    assert!(result.success);
}

#[tokio::test]
async fn test_session_records_outcomes_and_finalizes() {
    let dir = TempDir::new().unwrap();
    let agent = agent_with(MockCapability::ok().failing_on("#broken"), &dir).await;

    {
        let store = agent.store();
        let mut store = store.write().await;
        store
            .create(SkillSpec::new("Winner", "Succeeds", SkillCategory::Tasks))
            .await
            .unwrap();
        store
            .create(
                SkillSpec::new("Loser", "Fails", SkillCategory::Tasks).with_actions(vec![
                    Action::new(
                        ActionKind::Click {
                            selector: "#broken".to_string(),
                        },
                        "Click the broken element",
                    ),
                ]),
            )
            .await
            .unwrap();
    }

    agent.start_session(None).await.unwrap();
    agent.execute_skill("winner", None).await.unwrap();
    agent.execute_skill("loser", None).await.unwrap();

    let session = agent.end_session().await.unwrap().unwrap();
    assert_eq!(session.skills_attempted, vec!["winner", "loser"]);
    assert_eq!(session.skills_learned, vec!["winner"]);
    assert_eq!(session.errors.len(), 1);
    // 1 learned / 2 attempted.
    assert_eq!(session.success_rate, 0.5);
    assert!(agent.current_session().await.is_none());
}

#[tokio::test]
async fn test_starting_second_session_ends_the_first() {
    let dir = TempDir::new().unwrap();
    let agent = agent_with(MockCapability::ok(), &dir).await;

    let first = agent.start_session(None).await.unwrap();
    let second = agent.start_session(None).await.unwrap();
    assert_ne!(first.id, second.id);

    // The first session was finalized and persisted before the second opened.
    let current = agent.current_session().await.unwrap();
    assert_eq!(current.id, second.id);
}

#[tokio::test]
async fn test_autonomy_level_scenario() {
    let dir = TempDir::new().unwrap();
    let agent = agent_with(MockCapability::ok(), &dir).await;

    {
        let store = agent.store();
        let mut store = store.write().await;
        for i in 0..10 {
            store
                .create(SkillSpec::new(
                    &format!("Skill {i}"),
                    "counting skill",
                    SkillCategory::Automation,
                ))
                .await
                .unwrap();
        }
        for i in 0..7 {
            store
                .update(
                    &format!("skill-{i}"),
                    SkillPatch {
                        learned: Some(true),
                        ..SkillPatch::default()
                    },
                )
                .await
                .unwrap();
        }
    }

    // Defaults were seeded too; compute over the full store.
    let metrics = agent.metrics().await;
    agent.refresh_autonomy().await;
    let expected =
        (100.0 * metrics.learned_skills as f64 / metrics.total_skills as f64).round() as u8;
    assert_eq!(agent.autonomy_level(), expected);

    // Adding unlearned skills never lowers the level.
    {
        let store = agent.store();
        let mut store = store.write().await;
        store
            .create(SkillSpec::new("Drag", "unlearned", SkillCategory::Automation))
            .await
            .unwrap();
    }
    agent.refresh_autonomy().await;
    assert_eq!(agent.autonomy_level(), expected);
}

#[tokio::test]
async fn test_skill_learned_event_and_autonomy_bump() {
    let dir = TempDir::new().unwrap();
    let agent = agent_with(MockCapability::ok(), &dir).await;
    let mut events = agent.subscribe();

    {
        let store = agent.store();
        let mut store = store.write().await;
        store
            .create(SkillSpec::new("Eventful", "Emits on learn", SkillCategory::Tasks))
            .await
            .unwrap();
    }

    let before = agent.autonomy_level();
    agent.execute_skill("eventful", None).await.unwrap();
    assert!(agent.autonomy_level() > before);

    let mut saw_learned = false;
    while let Ok(event) = events.try_recv() {
        if let AgentEvent::SkillLearned { skill_id } = event {
            if skill_id == "eventful" {
                saw_learned = true;
            }
        }
    }
    assert!(saw_learned);
}

#[tokio::test]
async fn test_deterministic_session_ids_with_fixed_clock() {
    use chrono::TimeZone;

    let dir = TempDir::new().unwrap();
    let clock = FixedClock(chrono::Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap());
    let agent = Agent::with_clock(
        test_config(&dir),
        Arc::new(MockCapability::ok()),
        Arc::new(clock),
    );
    agent.initialize().await.unwrap();

    let session = agent.start_session(None).await.unwrap();
    assert!(session.id.starts_with("session-1748779200000-"));
    assert_eq!(
        session.start_time,
        chrono::Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn test_screenshot_failure_is_best_effort() {
    let dir = TempDir::new().unwrap();
    let agent = agent_with(MockCapability::ok().failing_screenshots(), &dir).await;

    {
        let store = agent.store();
        let mut store = store.write().await;
        store
            .create(SkillSpec::new("Shotless", "Runs without screenshots", SkillCategory::Tasks))
            .await
            .unwrap();
    }

    let result = agent.execute_skill("shotless", None).await.unwrap();
    assert!(result.success);
    assert!(result.screenshot.is_none());

    // The run still leaves evidence, just not a screenshot path.
    let store = agent.store();
    let store = store.read().await;
    assert_eq!(
        store.get("shotless").unwrap().evidence,
        vec!["execution-success"]
    );
}

#[tokio::test]
async fn test_autosave_persists_open_session_until_stopped() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.auto_save = true;
    config.save_interval = Duration::from_millis(50);

    let agent = Agent::new(config, Arc::new(MockCapability::ok()));
    agent.initialize().await.unwrap();
    agent.spawn_autosave().await;

    let session = agent.start_session(None).await.unwrap();

    // Knock out the snapshot written during initialization so only a later
    // tick can bring it back.
    let skills_file = dir.path().join("data").join("skills.json");
    let sessions_file = dir.path().join("data").join("sessions.json");
    tokio::fs::remove_file(&skills_file).await.ok();

    // The periodic task writes both snapshots while the session is still
    // open, without anyone calling end_session.
    let mut persisted = false;
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let session_saved = tokio::fs::read_to_string(&sessions_file)
            .await
            .map(|data| data.contains(&session.id))
            .unwrap_or(false);
        if session_saved && skills_file.exists() {
            persisted = true;
            break;
        }
    }
    assert!(persisted, "auto-save tick never rewrote the snapshots");

    // stop() shuts the task down rather than leaving it ticking.
    tokio::time::timeout(Duration::from_secs(5), agent.stop())
        .await
        .expect("auto-save task did not shut down")
        .unwrap();
    assert!(agent.current_session().await.is_none());
}

#[tokio::test]
async fn test_stop_ends_session_and_saves() {
    let dir = TempDir::new().unwrap();
    let agent = agent_with(MockCapability::ok(), &dir).await;
    agent.spawn_autosave().await;

    agent.start_session(None).await.unwrap();
    agent.stop().await.unwrap();

    assert!(agent.current_session().await.is_none());
    assert!(dir.path().join("data").join("skills.json").exists());
    assert!(dir.path().join("data").join("sessions.json").exists());
}
