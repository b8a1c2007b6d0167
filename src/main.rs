use clap::Parser;
use moonbase_core::cmd::{recover_check, serve, setup};

#[derive(clap::Parser, Debug)]
#[clap(name = "moonbase-core", version)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Runs the HTTP server.
    Serve(serve::Args),
    /// Prepares a database for use (creates the sidecar table if configured).
    Setup(setup::Args),
    /// Reconciles the registry against the physical database and reports
    /// drift, without serving.
    RecoverCheck(recover_check::Args),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve::run(args),
        Command::Setup(args) => setup::run(args),
        Command::RecoverCheck(args) => recover_check::run(args),
    }
}
