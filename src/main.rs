mod config;
mod handler;
mod hosts;
mod logging;
mod metrics;
mod server;

use anyhow::{Context, Result};
use clap::Parser;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{ConfigFile, RunConfig};
use crate::handler::state::ProxyState;
use crate::handler::upstream::HttpUpstream;
use crate::hosts::HostsUpdate;

#[derive(Parser, Debug)]
#[command(
    name = "local-proxy",
    version,
    about,
    override_usage = "local-proxy --domain <name> --proxy-target <url> --rewrite-base <path> [options]"
)]
pub(crate) struct Args {
    /// Local domain name to map (e.g. "my-app")
    #[arg(short, long)]
    domain: Option<String>,

    /// Target base URL (e.g. "http://localhost:5001")
    #[arg(short = 't', long)]
    proxy_target: Option<String>,

    /// Base path on target to forward requests to (e.g. "/api/render")
    #[arg(short, long)]
    rewrite_base: Option<String>,

    /// Port to run proxy on [default: 80]
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,

    /// Add domain to the hosts file as 127.0.0.1
    #[arg(short, long, action)]
    add_to_hosts: bool,

    /// Print actions without executing
    #[arg(long, action)]
    dry_run: bool,

    /// Address the proxy listens on [default: 127.0.0.1]
    #[arg(long)]
    bind: Option<IpAddr>,

    /// Give up on the upstream if it hasn't answered within this many seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,

    /// Hosts file edited by --add-to-hosts [default: /etc/hosts]
    #[arg(long)]
    hosts_file: Option<PathBuf>,

    /// TOML file supplying defaults for any of the options above
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Serve Prometheus metrics on this loopback port
    #[arg(long)]
    metrics_port: Option<u16>,

    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long, action)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init(&args)?;

    let config_file = ConfigFile::load(args.config_file.as_deref())?;
    let config = RunConfig::resolve(&args, config_file)?;

    if config.add_to_hosts {
        update_hosts(&config);
    }

    if config.dry_run {
        // Dry-run output is the point of the run, not a log line.
        println!("{}", dry_run_banner(&config));
        return Ok(());
    }

    if let Some(metrics_port) = config.metrics_port {
        let loopback_address = IpAddr::V4(Ipv4Addr::LOCALHOST);
        metrics::init(SocketAddr::new(loopback_address, metrics_port))?;
    }

    let state = ProxyState {
        config: Arc::new(config.clone()),
        upstream: Arc::new(HttpUpstream::new(config.upstream_timeout)?),
    };

    let proxy_socket_addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(proxy_socket_addr)
        .await
        .with_context(|| format!("Couldn't bind {proxy_socket_addr}"))?;

    tracing::info!(
        "Proxy running: http://{}:{} → {}",
        config.domain,
        config.port,
        config.mapping()
    );

    server::serve(listener, state, shutdown_signal()).await
}

fn update_hosts(config: &RunConfig) {
    let hosts_file = config.hosts_file.display();
    match hosts::ensure_entry(&config.hosts_file, &config.domain, config.dry_run) {
        Ok(update @ HostsUpdate::WouldAdd) => println!("{}", hosts_message(config, &update)),
        Ok(update) => tracing::info!("{}", hosts_message(config, &update)),
        Err(error) => tracing::error!("Could not update {hosts_file}: {error:#}"),
    }
}

fn hosts_message(config: &RunConfig, update: &HostsUpdate) -> String {
    let hosts_file = config.hosts_file.display();
    let entry = hosts::entry(&config.domain);
    match update {
        HostsUpdate::Added => format!("Added '{entry}' to {hosts_file}"),
        HostsUpdate::WouldAdd => format!("[dry-run] Would add '{entry}' to {hosts_file}"),
        HostsUpdate::AlreadyPresent => format!("'{}' already in {hosts_file}", config.domain),
    }
}

fn dry_run_banner(config: &RunConfig) -> String {
    format!(
        "[dry-run] Would start proxy from http://{}:{} → {}",
        config.domain,
        config.port,
        config.mapping()
    )
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Couldn't listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down...");
}
