use std::net::TcpListener;

use crate::cmd::{async_runtime, ConfigArgs};
use crate::config;
use crate::context::AppContext;
use crate::driver::DbPool;
use crate::recovery;
use crate::registry::SchemaRegistry;
use crate::startup;

#[derive(clap::Args, Debug)]
pub struct Args {
    #[clap(flatten)]
    config: ConfigArgs,
}

/// Boots the HTTP server: connects the pool, reconciles the registry
/// against whatever physical tables already exist, then serves until a
/// shutdown signal arrives.
pub fn run(args: Args) -> anyhow::Result<()> {
    config::load_settings(args.config.config_path.as_deref())?;
    let runtime = async_runtime()?;
    let listener = TcpListener::bind(config::settings().application.address())?;

    runtime.block_on(async move { serve(listener).await })
}

async fn serve(listener: TcpListener) -> anyhow::Result<()> {
    let settings = config::settings();
    let db = DbPool::connect(&settings.database.url, settings.database.max_connections).await?;
    let registry = SchemaRegistry::new();

    recovery::reconcile(&db, &registry, &settings.recovery).await?;

    let ctx = AppContext::new(db, registry);
    let server = startup::run(listener, ctx)?;

    server.await?;

    Ok(())
}
