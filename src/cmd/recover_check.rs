//! Runs startup reconciliation standalone and reports what it finds, without
//! serving traffic — useful for checking drift between the registry and the
//! physical database before deciding whether to bring a server up.

use crate::cmd::{async_runtime, ConfigArgs};
use crate::config;
use crate::driver::DbPool;
use crate::recovery;
use crate::registry::SchemaRegistry;

#[derive(clap::Args, Debug)]
pub struct Args {
    #[clap(flatten)]
    config: ConfigArgs,
}

pub fn run(args: Args) -> anyhow::Result<()> {
    let settings = config::load_settings(args.config.config_path.as_deref())?;
    let runtime = async_runtime()?;

    runtime.block_on(async move { check(&settings).await })
}

async fn check(settings: &config::Settings) -> anyhow::Result<()> {
    let db = DbPool::connect(&settings.database.url, settings.database.max_connections).await?;
    let registry = SchemaRegistry::new();

    recovery::reconcile(&db, &registry, &settings.recovery).await?;

    let collections = registry.list().await;
    tracing::info!(
        count = collections.len(),
        collections = ?collections,
        "recover-check: reconciliation complete"
    );

    Ok(())
}
