//! Skillpilot - Entry Point
//!
//! Boots an agent, opens a session on the configured start URL, works
//! through the unlearned skills (easiest first), and shuts down cleanly on
//! Ctrl-C or when the pass completes.

use skillpilot::{Agent, AgentConfig, ExecutionContext, HttpCapability, HttpCapabilityConfig};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Skillpilot v{}", env!("CARGO_PKG_VERSION"));

    let config = AgentConfig::from_env()?;
    let capability = Arc::new(HttpCapability::new(HttpCapabilityConfig {
        timeout: config.capability_timeout,
        screenshots_dir: config.screenshots_dir.clone(),
        ..HttpCapabilityConfig::default()
    })?);

    let start_url = config.start_url.clone();
    let agent = Agent::new(config, capability);
    agent.initialize().await?;
    agent.spawn_autosave().await;

    agent.start_session(start_url.as_deref()).await?;

    let context = ExecutionContext { url: start_url };
    let pending: Vec<String> = {
        let store = agent.store();
        let store = store.read().await;
        store.unlearned().iter().map(|s| s.id.clone()).collect()
    };
    info!(pending = pending.len(), "working through unlearned skills");

    let run = async {
        for skill_id in pending {
            match agent.execute_skill(&skill_id, Some(&context)).await {
                Ok(result) => info!(
                    skill = %skill_id,
                    success = result.success,
                    confidence = result.confidence,
                    "skill attempt finished"
                ),
                Err(e) => warn!(skill = %skill_id, "skill attempt rejected: {e}"),
            }
        }
    };

    tokio::select! {
        _ = run => info!("learning pass complete"),
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    let status = agent.status().await;
    info!(
        autonomy = status.autonomy_level,
        learned = status.learned_skills,
        total = status.total_skills,
        "final status"
    );

    agent.stop().await?;
    Ok(())
}
