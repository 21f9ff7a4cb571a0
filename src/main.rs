use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info};

use collectsync::config::Config;
use collectsync::login::{LoginFlow, LoginState};
use collectsync::models::{SyncOutcome, SyncStatus};
use collectsync::services::webdav::{WebDAVConfig, WebDAVRemote};
use collectsync::storage::{LocalVault, RemoteStorage};
use collectsync::sync::SyncOrchestrator;

#[derive(Parser)]
#[command(
    name = "collectsync",
    about = "Synchronize a local markdown vault with a collective folder over WebDAV"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire an app password through the browser login flow
    Login {
        /// Server base URL; defaults to COLLECTSYNC_SERVER_URL
        #[arg(long)]
        server: Option<String>,
    },
    /// Verify the remote connection and the collective root
    Check,
    /// Run a single synchronization pass
    Sync,
    /// Run as a daemon: interval sync, startup sync and the save watcher
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Login { server } => login(server).await,
        Commands::Check => check().await,
        Commands::Sync => sync_once().await,
        Commands::Run => run_daemon().await,
    }
}

async fn login(server: Option<String>) -> Result<()> {
    let server_url = match server {
        Some(url) => url,
        None => {
            let config = Config::from_env()?;
            if config.server_url.is_empty() {
                return Err(anyhow::anyhow!(
                    "No server URL; pass --server or set COLLECTSYNC_SERVER_URL"
                ));
            }
            config.server_url
        }
    };

    let flow = LoginFlow::new(&server_url)?;
    let mut pending = flow.begin().await?;

    println!("Open this URL in your browser and approve the login:");
    println!("  {}", pending.login_url);
    println!("Waiting for approval...");

    match flow.poll_until_resolved(&mut pending).await {
        LoginState::Succeeded(credentials) => {
            println!("Login approved. Add these to your environment:");
            println!("  COLLECTSYNC_SERVER_URL={}", credentials.url);
            println!("  COLLECTSYNC_USERNAME={}", credentials.username);
            println!("  COLLECTSYNC_ACCESS_TOKEN={}", credentials.secret);
            Ok(())
        }
        LoginState::Denied => Err(anyhow::anyhow!("Login was denied")),
        LoginState::TimedOut => Err(anyhow::anyhow!("Login timed out waiting for approval")),
        other => Err(anyhow::anyhow!("Login ended in unexpected state: {:?}", other)),
    }
}

async fn check() -> Result<()> {
    let config = Config::from_env()?;
    config.validate()?;

    let remote = build_remote(&config)?
        .ok_or_else(|| anyhow::anyhow!("Not connected: configure credentials first"))?;

    remote.test_connection().await?;
    info!("✅ Connection to {} succeeded", config.server_url);

    match remote.stat(&config.collective_path).await? {
        Some(_) => info!("✅ Collective root {} exists", config.collective_path),
        None => info!(
            "Collective root {} does not exist yet; it will be created on first upload",
            config.collective_path
        ),
    }

    Ok(())
}

async fn sync_once() -> Result<()> {
    let (config, orchestrator) = build_orchestrator().await?;

    if !config.is_connected() {
        error!("Not connected: configure the server URL and credentials first");
        std::process::exit(2);
    }

    match orchestrator.sync_now().await {
        SyncOutcome::Completed(report) => {
            println!(
                "Pass {}: {} uploaded, {} downloaded, {} unchanged, {} failed",
                report.pass_id,
                report.files_uploaded,
                report.files_downloaded,
                report.files_unchanged,
                report.failed()
            );
            for failure in &report.failures {
                println!("  failed: {} ({})", failure.path, failure.reason);
            }
            Ok(())
        }
        SyncOutcome::NotConnected => {
            error!("Not connected: configure the server URL and credentials first");
            std::process::exit(2);
        }
        SyncOutcome::Failed(message) => Err(anyhow::anyhow!("Sync failed: {}", message)),
        SyncOutcome::Cancelled => Err(anyhow::anyhow!("Sync was cancelled")),
        SyncOutcome::Coalesced => Ok(()),
    }
}

async fn run_daemon() -> Result<()> {
    let (config, orchestrator) = build_orchestrator().await?;

    if !config.is_connected() {
        error!("Not connected: configure the server URL and credentials first");
        std::process::exit(2);
    }

    let mut status_rx = orchestrator.subscribe();
    tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = status_rx.borrow().clone();
            match status {
                SyncStatus::Error { message } => error!("Status: error ({})", message),
                other => info!("Status: {:?}", other),
            }
        }
    });

    orchestrator.start(&config);
    info!("collectsync running; press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    orchestrator.stop();
    info!("Shutting down");

    Ok(())
}

async fn build_orchestrator() -> Result<(Config, Arc<SyncOrchestrator>)> {
    let config = Config::from_env()?;

    let vault = Arc::new(LocalVault::new(config.vault_path.clone()));
    let orchestrator = Arc::new(SyncOrchestrator::new(&config, vault));

    if let Some(remote) = build_remote(&config)? {
        orchestrator
            .set_remote(Some(remote as Arc<dyn RemoteStorage>))
            .await;
    }

    Ok((config, orchestrator))
}

fn build_remote(config: &Config) -> Result<Option<Arc<WebDAVRemote>>> {
    if !config.is_connected() {
        return Ok(None);
    }

    let webdav_config = WebDAVConfig::from_config(config)?;
    Ok(Some(Arc::new(WebDAVRemote::new(webdav_config)?)))
}
