//! CLI subcommands: one `ConfigArgs` shared by every
//! subcommand, and a single-threaded `tokio` runtime built on demand rather
//! than via `#[tokio::main]`, so subcommands stay plain synchronous `fn`s
//! that `clap` can dispatch to directly.

pub mod recover_check;
pub mod serve;
pub mod setup;

use std::path::PathBuf;

/// Shared by every subcommand: an optional path to a config file, layered on
/// top of built-in defaults and below environment variables
/// (`config::load_settings`).
#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// Path to a config file. If unset, `config/base.{yaml,toml,...}` and
    /// `config/{APP_ENV}.*` are loaded from the current directory instead.
    #[clap(long)]
    pub config_path: Option<PathBuf>,
}

pub fn async_runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}
