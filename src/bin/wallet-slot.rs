use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wallet_slot_client::dto::ListParams;
use wallet_slot_client::{ApiClient, Config, RequestConfig};

#[derive(Parser)]
#[command(name = "wallet-slot")]
#[command(about = "Wallet Slot API client CLI", long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET any backend path and print the envelope
    Get {
        /// Path relative to the base URL, e.g. /users/me
        path: String,
    },
    /// List linked accounts
    Accounts,
    /// Show the balance of one account
    Balance { account_id: String },
    /// List the budget slots of one account
    Slots { account_id: String },
    /// Show the notification inbox
    Notifications {
        #[arg(short, long, default_value = "1")]
        page: u32,
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },
    /// Print this installation's device id
    DeviceId,
    /// Revoke the stored session
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_path(&cli.config)?;
    let client = ApiClient::open(config).await?;

    match cli.command {
        Commands::Get { path } => print(&client.get(&path, RequestConfig::default()).await?),
        Commands::Accounts => print(&client.accounts().list().await?),
        Commands::Balance { account_id } => print(&client.accounts().balance(&account_id).await?),
        Commands::Slots { account_id } => print(&client.slots().list(&account_id).await?),
        Commands::Notifications { page, limit } => {
            print(&client.notifications().list(ListParams::new(page, limit)).await)
        }
        Commands::DeviceId => match client.device_id().await {
            Some(id) => {
                println!("{}", id);
                Ok(())
            }
            None => Err(anyhow::anyhow!("Device id unavailable")),
        },
        Commands::Logout => {
            let envelope = client.auth().logout().await?;
            info!("Session cleared");
            print(&envelope)
        }
    }
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
