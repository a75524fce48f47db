use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use vsc_engine::error::EngineError;
use vsc_engine::host::HostChannel;
use vsc_engine::message::{Request, Response};
use vsc_engine::service::{LocalChannel, ServiceConfig, SettingsService, shared};
use vsc_engine::store::{JsonFileStore, default_settings_path};

#[derive(Parser)]
#[command(name = "vscctl")]
#[command(about = "Inspect and edit the video speed controller settings store")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings document (defaults to $VSC_SETTINGS_PATH or ~/.vsc/settings.json)
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current settings
    Show,

    /// Export the whole document
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Replace the document with an exported one
    Import { file: PathBuf },

    /// Restore defaults
    Reset,

    /// Evaluate site access for a URL
    CheckSite { url: String },

    /// Find the URL rule matching a URL
    Rule { url: String },

    /// Resolve intro/outro skip configuration for a hostname
    SkipConfig { hostname: String },

    /// Show the last sync time
    Sync {
        /// Record now as the last sync time first
        #[arg(long)]
        mark: bool,
    },
}

async fn call<S>(channel: &LocalChannel<S>, request: Request) -> Result<Response, EngineError>
where
    S: vsc_engine::store::SettingsStore,
{
    Ok(channel.send(request).await?)
}

fn unexpected(request: &Request) -> anyhow::Error {
    EngineError::UnexpectedResponse {
        request: request.kind(),
    }
    .into()
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let path = match cli.store {
        Some(path) => path,
        None => default_settings_path()?,
    };
    log::debug!("Using settings store at {}", path.display());
    let service = shared(SettingsService::new(JsonFileStore::new(&path), ServiceConfig::default()));
    let channel = LocalChannel::new(service.clone());

    match cli.command {
        Commands::Show => {
            let request = Request::GetSettings;
            match call(&channel, request.clone()).await? {
                Response::Settings { settings } => print_json(&settings)?,
                _ => return Err(unexpected(&request)),
            }
        }
        Commands::Export { out } => {
            let request = Request::ExportSettings;
            let Response::Export { document } = call(&channel, request.clone()).await? else {
                return Err(unexpected(&request));
            };
            match out {
                Some(out) => {
                    let text = serde_json::to_string_pretty(&document)?;
                    std::fs::write(&out, text).with_context(|| format!("writing {}", out.display()))?;
                    log::info!("Exported settings to {}", out.display());
                }
                None => print_json(&document)?,
            }
        }
        Commands::Import { file } => {
            let text = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let document: serde_json::Value =
                serde_json::from_str(&text).with_context(|| format!("parsing {}", file.display()))?;
            call(&channel, Request::ImportSettings { document }).await?;
            log::info!("Imported settings from {}", file.display());
        }
        Commands::Reset => {
            call(&channel, Request::ResetSettings).await?;
            log::info!("Settings reset to defaults");
        }
        Commands::CheckSite { url } => {
            let request = Request::CheckSiteAccess { url };
            match call(&channel, request.clone()).await? {
                Response::SiteAccess(decision) => print_json(&decision)?,
                _ => return Err(unexpected(&request)),
            }
        }
        Commands::Rule { url } => {
            let request = Request::GetUrlRuleSpeed { url };
            match call(&channel, request.clone()).await? {
                Response::UrlRule(found) => print_json(&found)?,
                _ => return Err(unexpected(&request)),
            }
        }
        Commands::SkipConfig { hostname } => {
            let request = Request::GetIntroOutroConfig { hostname };
            match call(&channel, request.clone()).await? {
                Response::IntroOutro(config) => print_json(&config)?,
                _ => return Err(unexpected(&request)),
            }
        }
        Commands::Sync { mark } => {
            let request = if mark { Request::UpdateSyncTime } else { Request::GetSyncStatus };
            match call(&channel, request.clone()).await? {
                Response::SyncStatus {
                    last_sync_time: Some(ms),
                } => println!("last sync: {} ms since epoch", ms),
                Response::SyncStatus { last_sync_time: None } => println!("never synced"),
                _ => return Err(unexpected(&request)),
            }
        }
    }

    service
        .lock()
        .await
        .flush()
        .map_err(EngineError::from)
        .context("flushing pending writes")?;
    Ok(())
}
