use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leasehold::{api, config::AppConfig, db};

#[derive(Parser)]
#[command(name = "leasehold")]
#[command(about = "Lease lifecycle and membership service for property managers")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port for HTTP API [env: LEASEHOLD_PORT, default: 3000]
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind [env: LEASEHOLD_HOST, default: 127.0.0.1]
        #[arg(long)]
        host: Option<String>,

        /// SQLite database file [env: LEASEHOLD_DATABASE]
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
    /// Apply pending schema migrations and exit
    Migrate {
        /// SQLite database file [env: LEASEHOLD_DATABASE]
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
}

fn init_tracing(filter: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_database(path: Option<PathBuf>) -> anyhow::Result<db::Database> {
    let db = match path {
        Some(path) => db::Database::open(path)?,
        None => db::Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let db = open_database(config.database.clone())?;
    let app = api::create_router(db, &config);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Leasehold server listening on http://{}", address);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    init_tracing(&config.log_filter);

    match cli.command {
        Some(Commands::Serve {
            port,
            host,
            database,
        }) => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(host) = host {
                config.host = host;
            }
            if database.is_some() {
                config.database = database;
            }
            serve(config).await?;
        }
        Some(Commands::Migrate { database }) => {
            open_database(database.or(config.database))?;
            tracing::info!("Migrations complete");
        }
        None => {
            // Default: start server
            serve(config).await?;
        }
    }

    Ok(())
}
