use anyhow::{Context, Result};
use reqwest::Url;
use serde::Deserialize;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use crate::handler::rewrite;
use crate::Args;

const fn _default_port() -> u16 { 80 }
const fn _default_bind() -> IpAddr { IpAddr::V4(Ipv4Addr::LOCALHOST) }
const DEFAULT_HOSTS_FILE: &str = "/etc/hosts";

/// Optional TOML file mirroring the command line flags. Anything given on
/// the command line wins over the file.
#[derive(Deserialize, Default, Debug)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub(crate) struct ConfigFile {
    domain: Option<String>,
    proxy_target: Option<String>,
    rewrite_base: Option<String>,
    port: Option<u16>,
    #[serde(default)]
    add_to_hosts: bool,
    bind: Option<IpAddr>,
    timeout_secs: Option<u64>,
    hosts_file: Option<PathBuf>,
    metrics_port: Option<u16>,
}

impl ConfigFile {
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Couldn't read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Couldn't parse config file {}", path.display()))
    }
}

/// Everything a run needs, fixed at startup.
#[derive(Clone, Debug)]
pub(crate) struct RunConfig {
    pub(crate) domain: String,
    pub(crate) target: Url,
    /// Always ends with exactly one `/`.
    pub(crate) rewrite_base: String,
    pub(crate) port: u16,
    pub(crate) bind: IpAddr,
    pub(crate) add_to_hosts: bool,
    pub(crate) dry_run: bool,
    pub(crate) hosts_file: PathBuf,
    pub(crate) upstream_timeout: Option<Duration>,
    pub(crate) metrics_port: Option<u16>,
}

impl RunConfig {
    pub(crate) fn resolve(args: &Args, file: ConfigFile) -> Result<Self> {
        let domain = args
            .domain
            .clone()
            .or(file.domain)
            .context("Missing required option --domain")?;
        let proxy_target = args
            .proxy_target
            .clone()
            .or(file.proxy_target)
            .context("Missing required option --proxy-target")?;
        let rewrite_base = args
            .rewrite_base
            .clone()
            .or(file.rewrite_base)
            .context("Missing required option --rewrite-base")?;

        let config = RunConfig {
            domain,
            target: parse_target(&proxy_target)?,
            rewrite_base: normalize_rewrite_base(&rewrite_base),
            port: args.port.or(file.port).unwrap_or_else(_default_port),
            bind: args.bind.or(file.bind).unwrap_or_else(_default_bind),
            add_to_hosts: args.add_to_hosts || file.add_to_hosts,
            dry_run: args.dry_run,
            hosts_file: args
                .hosts_file
                .clone()
                .or(file.hosts_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_HOSTS_FILE)),
            upstream_timeout: args
                .timeout_secs
                .or(file.timeout_secs)
                .map(Duration::from_secs),
            metrics_port: args.metrics_port.or(file.metrics_port),
        };
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.domain.trim().is_empty(), "Domain must not be empty.");
        anyhow::ensure!(self.port != 0, "Port must be between 1 and 65535.");
        anyhow::ensure!(
            self.upstream_timeout != Some(Duration::ZERO),
            "Timeout must be at least one second."
        );
        Ok(())
    }

    pub(crate) fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Where a request for `/` ends up, for banners.
    pub(crate) fn mapping(&self) -> Url {
        rewrite::resolve(&self.target, &self.rewrite_base)
    }
}

fn parse_target(proxy_target: &str) -> Result<Url> {
    let target = Url::parse(proxy_target)
        .with_context(|| format!("Proxy target \"{proxy_target}\" is not an absolute URL"))?;
    match target.scheme() {
        "http" | "https" => {}
        scheme => anyhow::bail!("Proxy target scheme \"{scheme}\" is not http or https."),
    }
    anyhow::ensure!(
        target.host_str().is_some(),
        "Proxy target \"{proxy_target}\" has no host."
    );
    Ok(target)
}

pub(crate) fn normalize_rewrite_base(rewrite_base: &str) -> String {
    format!("{}/", rewrite_base.trim_end_matches('/'))
}

#[cfg(test)]
impl RunConfig {
    pub(crate) fn for_target(target: &str, rewrite_base: &str) -> Self {
        RunConfig {
            domain: "my-app".to_string(),
            target: parse_target(target).expect("test target should parse"),
            rewrite_base: normalize_rewrite_base(rewrite_base),
            port: _default_port(),
            bind: _default_bind(),
            add_to_hosts: false,
            dry_run: false,
            hosts_file: PathBuf::from(DEFAULT_HOSTS_FILE),
            upstream_timeout: None,
            metrics_port: None,
        }
    }
}
