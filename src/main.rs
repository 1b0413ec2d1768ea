//! Todo REST API server.
//!
//! A per-user todo service with a two-level task hierarchy, completion
//! gating, and filtered, paged listing over HTTP.

use anyhow::Result;
use clap::Parser;
use std::fs::OpenOptions;
use todo_api::auth::{AuthService, TokenService};
use todo_api::cli::Cli;
use todo_api::config::ServerConfig;
use todo_api::db::Database;
use todo_api::http::{self, ApiContext};
use todo_api::service::TaskService;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            let file = OpenOptions::new().create(true).append(true).open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let mut config = ServerConfig::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database = Some(database);
    }
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let db_path = config.database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    info!("opening database at {}", db_path.display());
    let db = Database::open(&db_path)?;

    let tokens = TokenService::new(&config.token_secret(), config.token_ttl_hours);
    let ctx = ApiContext {
        service: TaskService::new(db.clone(), config.reference_offset()),
        auth: AuthService::new(db, tokens.clone()),
        tokens,
        default_page_size: config.default_page_size,
    };

    http::serve(ctx, &config.bind, config.port).await
}
