//! Prepares a fresh database for a `moonbase-core` instance: creates the
//! optional `moon_collections` sidecar table when `recovery.persist_metadata`
//! is configured.

use crate::cmd::{async_runtime, ConfigArgs};
use crate::config;
use crate::driver::DbPool;
use crate::metadata;

#[derive(clap::Args, Debug)]
pub struct Args {
    #[clap(flatten)]
    config: ConfigArgs,
}

pub fn run(args: Args) -> anyhow::Result<()> {
    let settings = config::load_settings(args.config.config_path.as_deref())?;
    let runtime = async_runtime()?;

    runtime.block_on(async move { setup_database(&settings).await })
}

async fn setup_database(settings: &config::Settings) -> anyhow::Result<()> {
    let db = DbPool::connect(&settings.database.url, settings.database.max_connections).await?;

    if settings.recovery.persist_metadata {
        let sql = metadata::create_table_sql(db.dialect());
        db.exec(&sql, &[]).await?;
        tracing::info!("created {} sidecar table", metadata::TABLE_NAME);
    } else {
        tracing::info!("recovery.persist_metadata is disabled, skipping sidecar table creation");
    }

    Ok(())
}
