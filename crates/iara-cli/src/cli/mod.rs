//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use iara_core::config::{self, Config};

mod commands;

#[derive(Parser)]
#[command(name = "iara")]
#[command(version)]
#[command(about = "IAra, a tutora de estudos do Projeto SeShat")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Open the tutoring chat (the default when no subcommand is given)
    Chat {
        /// Browse without an account; identity-bound actions are refused
        #[arg(long)]
        guest: bool,

        /// Compact entry: pick the subject from a menu instead of
        /// defaulting to the first one
        #[arg(long)]
        compact: bool,
    },

    /// Log in and store the access token
    Login {
        #[arg(value_name = "USERNAME")]
        username: String,
        #[arg(value_name = "PASSWORD")]
        password: String,
    },

    /// Create an account
    Register {
        #[arg(value_name = "EMAIL")]
        email: String,
        #[arg(value_name = "PASSWORD")]
        password: String,
    },

    /// Clear the stored access token
    Logout,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_tracing();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load().context("load config")?;

    match cli.command {
        None => commands::chat::run(&config, false, false).await,
        Some(Commands::Chat { guest, compact }) => {
            commands::chat::run(&config, guest, compact).await
        }
        Some(Commands::Login { username, password }) => {
            commands::auth::login(&config, &username, &password).await
        }
        Some(Commands::Register { email, password }) => {
            commands::auth::register(&config, &email, &password).await
        }
        Some(Commands::Logout) => commands::auth::logout(),
    }
}

/// Sends tracing output to `${IARA_HOME}/logs/iara.log`; stdout belongs
/// to the transcript. Returns the guard that flushes the writer on drop.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let logs_dir = config::paths::logs_dir();
    if std::fs::create_dir_all(&logs_dir).is_err() {
        return None;
    }

    let appender = tracing_appender::rolling::never(&logs_dir, "iara.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("iara=info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_target(false)
        .with_ansi(false)
        .with_filter(env_filter);

    let _ = tracing_subscriber::registry().with(file_layer).try_init();

    Some(guard)
}
