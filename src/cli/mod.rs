use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::auth::{Identity, TokenService};
use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "webapp-api")]
#[command(about = "Web application API server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Mint a bearer token for an already-verified identity")]
    IssueToken {
        #[arg(long, help = "User id (token subject)")]
        user_id: String,
        #[arg(long, help = "Username")]
        username: String,
        #[arg(long = "role", help = "Role claim; repeat for several")]
        roles: Vec<String>,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env()?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.api.port = port;
            }
            serve(config).await
        }
        Commands::IssueToken {
            user_id,
            username,
            roles,
        } => {
            let tokens = TokenService::new(&config.security)?;
            let identity = Identity {
                user_id,
                username,
                roles,
            };
            let issued = tokens.issue(&identity)?;
            println!("{}", serde_json::to_string_pretty(&issued)?);
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting API in {:?} mode", config.environment);

    let app = crate::app::build(&config).await?;

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
