//! Tine - Main entry point.
//!
//! ```text
//! tine serve --port 1235 --assets ./dist
//! tine check ssh://10.0.0.5:2222
//! tine import hosts.xlsx
//! tine watch --interval 30
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

use tine::config::Config;
use tine::endpoint::import::{self, ImportFormat};
use tine::endpoint::{EndpointDescriptor, EndpointList, EndpointStorage};
use tine::monitor::{Monitor, ProbeReport};
use tine::probe::{Dispatcher, Status};
use tine::rest::{ApiError, ApiState, TineServer};
use tine::{VERSION, logging};

#[derive(Parser)]
#[command(name = "tine", version, about = "Endpoint reachability prober")]
struct Cli {
    /// Config file (default: ~/.tinerc).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the status API and web UI.
    Serve {
        /// Port to listen on.
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind.
        #[arg(long)]
        bind: Option<IpAddr>,

        /// Directory of web UI assets.
        #[arg(long)]
        assets: Option<PathBuf>,
    },

    /// Probe one address and print the status.
    Check {
        /// Address as scheme://host[:port].
        address: String,

        /// Ask a running tine server instead of probing locally.
        #[arg(long)]
        server: Option<String>,
    },

    /// Show the endpoint list.
    List,

    /// Add an endpoint to the list.
    Add {
        /// Host name or IP address.
        address: String,

        /// Protocol: http, https or ssh.
        #[arg(long, default_value = "https")]
        scheme: String,

        /// Port, if not the protocol default.
        #[arg(long)]
        port: Option<String>,

        /// Display name.
        #[arg(long)]
        name: Option<String>,
    },

    /// Remove the endpoint at INDEX (as shown by `list`).
    Remove {
        index: usize,
    },

    /// Replace the endpoint list with the rows of a CSV or XLSX file.
    Import {
        file: PathBuf,
    },

    /// Poll every listed endpoint until interrupted.
    Watch {
        /// Seconds between rounds.
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let _log_guard = logging::init(&config.log_config).context("failed to initialize logging")?;
    info!("tine v{}", VERSION);
    debug!("Config: {}", config.config_path.display());

    let storage = EndpointStorage::new();

    match cli.command {
        Command::Serve { port, bind, assets } => {
            let addr = SocketAddr::new(
                bind.unwrap_or(config.bind),
                port.unwrap_or(config.port),
            );
            serve(&config, addr, assets.or_else(|| config.assets_dir.clone())).await
        }
        Command::Check { address, server } => {
            let status = match server {
                Some(server) => check_remote(&server, &address).await?,
                None => {
                    Dispatcher::from_config(&config.probe)?
                        .probe(&address)
                        .await?
                }
            };
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
        Command::List => {
            let list = storage.load()?;
            print_list(&list);
            Ok(())
        }
        Command::Add {
            address,
            scheme,
            port,
            name,
        } => {
            let descriptor = EndpointDescriptor::from_fields(
                name.as_deref().unwrap_or_default(),
                &address,
                &scheme,
                port.as_deref().unwrap_or_default(),
            )?;
            if !descriptor.scheme.is_supported() {
                warn!("Scheme '{}' has no probe and will report not_implemented", descriptor.scheme);
            }
            let mut list = storage.load()?;
            list.push(descriptor)?;
            storage.save(&list)?;
            print_list(&list);
            Ok(())
        }
        Command::Remove { index } => {
            let mut list = storage.load()?;
            let removed = list.remove(index)?;
            storage.save(&list)?;
            println!("Removed {}", removed.display_name());
            Ok(())
        }
        Command::Import { file } => import_file(&storage, &file),
        Command::Watch { interval } => {
            let interval = interval
                .filter(|secs| *secs > 0)
                .map_or(config.poll_interval, Duration::from_secs);
            let monitor = Monitor::new(
                Dispatcher::from_config(&config.probe)?,
                config.max_parallel_probes,
            );
            monitor
                .watch(&storage, interval, print_reports, async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await;
            Ok(())
        }
    }
}

async fn serve(config: &Config, addr: SocketAddr, assets: Option<PathBuf>) -> anyhow::Result<()> {
    let dispatcher = Dispatcher::from_config(&config.probe)?;
    info!(
        http_timeout_secs = config.probe.http_timeout.as_secs(),
        ssh_timeout_secs = config.probe.ssh_timeout.as_secs(),
        ssh_auth = config.probe.ssh_auth.mode_str(),
        "probe settings"
    );

    let server = TineServer::start(ApiState::new(dispatcher), addr, assets)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    println!("Listening on {}", server.url());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    server.stop().await;
    Ok(())
}

async fn check_remote(server: &str, address: &str) -> anyhow::Result<Status> {
    let url = format!("{}/status", server.trim_end_matches('/'));
    let response = reqwest::Client::new()
        .get(&url)
        .query(&[("queryUrl", address)])
        .send()
        .await
        .with_context(|| format!("failed to reach {}", url))?;

    let code = response.status();
    if code.is_success() {
        return Ok(response.json::<Status>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiError>(&body)
        .map(|e| e.error)
        .unwrap_or(body);
    bail!("server returned {}: {}", code, message)
}

fn import_file(storage: &EndpointStorage, file: &std::path::Path) -> anyhow::Result<()> {
    let format = ImportFormat::from_path(file)
        .with_context(|| format!("{} is not a .csv or .xlsx file", file.display()))?;
    let data = std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let rows = import::parse(format, &data)?;

    let mut endpoints = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        match row.to_descriptor() {
            Ok(descriptor) => endpoints.push(descriptor),
            // Row numbers count the header as row 1.
            Err(e) => warn!("Skipping row {}: {}", i + 2, e),
        }
    }

    let list = EndpointList::from_vec(endpoints);
    storage.save(&list)?;
    println!(
        "Imported {} of {} row(s); the previous list was replaced",
        list.len(),
        rows.len()
    );
    print_list(&list);
    Ok(())
}

fn print_list(list: &EndpointList) {
    if list.is_empty() {
        println!("No endpoints.");
        return;
    }
    for (i, endpoint) in list.iter().enumerate() {
        let url = endpoint.query_url().unwrap_or_else(|| "(idle)".to_string());
        println!("{:>3}  {:<24} {}", i, endpoint.display_name(), url);
    }
}

fn print_reports(reports: &[ProbeReport]) {
    let now = chrono::Local::now().format("%H:%M:%S");
    for report in reports {
        let summary = match &report.outcome {
            Ok(status) => match status.reason() {
                Some(reason) => format!("{} ({})", status.kind().as_str(), reason),
                None => status.kind().as_str().to_string(),
            },
            Err(e) => format!("error ({})", e),
        };
        println!(
            "[{}] {:<32} {:<24} {}",
            now,
            report.query_url,
            report.names.join(", "),
            summary
        );
    }
}
