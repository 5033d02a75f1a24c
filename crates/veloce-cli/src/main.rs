use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{debug, info};
use veloce_cli::config::{CliConfig, Command};
use veloce_cli::render::{render_checklist, resolve};
use veloce_db::Db;
use veloce_service::{
    BreakdownGenerator, ChecklistSession, HttpGenerator, HttpStore, LocalStore, OfflineGenerator,
    SubTaskStore,
};

fn build_store(config: &CliConfig) -> Result<Arc<dyn SubTaskStore>> {
    if let Some(url) = &config.remote_url {
        debug!("using remote store at {url}");
        let store = match &config.remote_key {
            Some(key) => HttpStore::with_api_key(url, key.clone()),
            None => HttpStore::new(url),
        };
        return Ok(Arc::new(store));
    }
    let db = match &config.db_path {
        Some(path) => Db::open(path),
        None => Db::open_default(),
    }
    .context("open database")?;
    Ok(Arc::new(LocalStore::new(db)))
}

fn build_generator(config: &CliConfig) -> Arc<dyn BreakdownGenerator> {
    match &config.ai_url {
        Some(url) => Arc::new(HttpGenerator::new(url, config.ai_key.clone())),
        None => Arc::new(OfflineGenerator),
    }
}

fn subtask_id(session: &ChecklistSession, key: &str) -> Result<String> {
    let list = session.snapshot();
    resolve(&list, key)
        .map(|s| s.id.clone())
        .ok_or_else(|| anyhow!("no sub-task matching `{key}` in {}", list.task_id()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = CliConfig::parse();
    let store = build_store(&config)?;
    let generator = build_generator(&config);
    let task_id = config.command.task_id();

    let session = ChecklistSession::load(task_id, store, generator, config.session_config())
        .await
        .context("load checklist")?;

    let changed = match &config.command {
        Command::Breakdown { title, context, .. } => {
            let count = session.generate(title, context.as_deref()).await;
            info!("generated {count} sub-tasks");
            true
        }
        Command::List { .. } => true,
        Command::Add { title, minutes, .. } => {
            session.add_with_estimate(title, *minutes).is_some()
        }
        Command::Cycle { subtask, .. } => {
            let id = subtask_id(&session, subtask)?;
            session.cycle(&id).is_some()
        }
        Command::Edit { subtask, title, .. } => {
            let id = subtask_id(&session, subtask)?;
            session.edit(&id, title)
        }
        Command::Move {
            subtask, direction, ..
        } => {
            let id = subtask_id(&session, subtask)?;
            session.move_subtask(&id, *direction)
        }
        Command::Delete { subtask, .. } => {
            let id = subtask_id(&session, subtask)?;
            session.delete(&id)
        }
    };

    if !changed {
        info!("nothing changed");
    }
    session.flush().await;
    print!("{}", render_checklist(&session.snapshot()));
    Ok(())
}
