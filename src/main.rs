//! Heike CLI entry point

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use heike::adapters::model::CommandModelClient;
use heike::cli::{failure_line, render_skills, render_tools, success_line, Cli, Commands};
use heike::domain::models::RunContext;
use heike::domain::ports::{EphemeralSessionManager, ModelClient, NullMemoryManager};
use heike::infrastructure::config::ConfigLoader;
use heike::infrastructure::logging;
use heike::infrastructure::skills::SkillDiscovery;
use heike::runtime::{register_custom_tools, RuntimeRegistry, SandboxManager};
use heike::services::{
    CognitiveEngine, Coordinator, Decomposer, PolicyEngine, TaskManager, ToolBroker, ToolRegistry,
    ToolRunner,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load().context("Failed to load configuration")?,
    };
    let _logging_guard = logging::init(&config.logging)?;

    let workspace_dir = std::env::current_dir()?;
    let discovery = SkillDiscovery::new(SkillDiscovery::standard_roots(&workspace_dir, None));
    let skill_tools = discovery.discover();

    if matches!(cli.command, Commands::Skills) {
        println!("{}", render_skills(&skill_tools));
        return Ok(());
    }

    let runtimes = Arc::new(RuntimeRegistry::probe_all(&config.runtime).await);
    let sandboxes = Arc::new(SandboxManager::new(
        &config.sandbox,
        Duration::from_secs(config.runtime.script_timeout_secs),
    ));

    let mut registry = ToolRegistry::new();
    let registered = register_custom_tools(
        &mut registry,
        skill_tools,
        &runtimes,
        Some(&sandboxes),
        &cli.workspace,
    )?;
    tracing::info!(count = registered, "skill tools registered");
    let registry = Arc::new(registry);

    if matches!(cli.command, Commands::Tools) {
        println!("{}", render_tools(&registry.descriptors()));
        return Ok(());
    }

    let Commands::Run { goal } = cli.command else {
        unreachable!("remaining command is run");
    };

    let Some(model): Option<Arc<dyn ModelClient>> =
        CommandModelClient::from_config(&config.model).map(|c| Arc::new(c) as _)
    else {
        bail!("no model command configured; set model.command in .heike/config.yaml");
    };

    let policy = Arc::new(PolicyEngine::new(config.policy.clone())?);
    let runner = Arc::new(ToolRunner::new(registry.clone(), policy));
    let engine = Arc::new(CognitiveEngine::new(
        model.clone(),
        runner,
        Arc::new(NullMemoryManager),
        config.engine.clone(),
    ));
    let manager = TaskManager::new(
        engine.clone(),
        Decomposer::new(
            model,
            config.coordinator.complexity_word_threshold,
            config.engine.structured_retry_max,
        ),
        Coordinator::new(engine, config.coordinator.clone()),
        registry,
        ToolBroker::new(config.broker.max_tools),
        Arc::new(EphemeralSessionManager),
    );

    let ctx = RunContext::new(cli.session.clone());
    let ctx_for_signal = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctx_for_signal.cancel();
        }
    });

    match manager.handle(&ctx, &cli.session, &goal).await {
        Ok(reply) => {
            println!("{}", success_line("goal completed"));
            println!("{reply}");
            let _ = sandboxes.teardown(&cli.workspace).await;
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", failure_line(&err.to_string()));
            let _ = sandboxes.teardown(&cli.workspace).await;
            std::process::exit(1);
        }
    }
}
