use std::time::Duration;

use clap::{Parser, Subcommand};

use mzutil::config::{ProviderConfig, Settings, StoreKind};

#[derive(Parser)]
#[command(name = "mzutil", version, about = "Command-line access to your Monzo accounts")]
struct Cli {
    /// Keep credentials in ~/.mzutil instead of the OS keychain
    #[arg(short = 'f', long, global = true, env = "MZUTIL_FILESTORE")]
    filestore: bool,

    /// Seconds to wait for the browser to complete login
    #[arg(long, global = true, env = "MZUTIL_OAUTH_TIMEOUT_SECS", default_value_t = 300)]
    oauth_timeout: u64,

    /// Print the login URL without opening a browser
    #[arg(long, global = true, env = "MZUTIL_NO_BROWSER")]
    no_browser: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in through the browser and store the token
    Login,
    /// Revoke the token and remove it from the store
    Logout,
    /// Show the balance of an account
    Balance {
        /// Account ID, as listed by `accounts`
        account_id: String,
    },
    /// List accounts
    Accounts,
    /// Show the identity behind the stored token
    Whoami,
    /// Save OAuth client credentials
    Setup,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("MZUTIL_LOG_LEVEL")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = run(cli).await;
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), mzutil::MzutilError> {
    let settings = Settings {
        store: if cli.filestore {
            StoreKind::File
        } else {
            StoreKind::Keychain
        },
        provider: ProviderConfig::from_env(),
        oauth_timeout: Duration::from_secs(cli.oauth_timeout),
        open_browser: !cli.no_browser,
    };
    tracing::debug!(store = ?settings.store, "Settings loaded");

    use mzutil::cli::commands;
    match cli.command {
        Commands::Login => commands::run_login(&settings).await,
        Commands::Logout => commands::run_logout(&settings).await,
        Commands::Balance { account_id } => commands::run_balance(&settings, &account_id).await,
        Commands::Accounts => commands::run_accounts(&settings).await,
        Commands::Whoami => commands::run_whoami(&settings).await,
        Commands::Setup => commands::run_setup(&settings),
    }
}
