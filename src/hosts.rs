use anyhow::{Context, Result};
use std::{fs::OpenOptions, io::Write, path::Path};

pub(crate) const LOOPBACK_ADDRESS: &str = "127.0.0.1";

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum HostsUpdate {
    AlreadyPresent,
    Added,
    WouldAdd,
}

pub(crate) fn entry(domain: &str) -> String {
    format!("{LOOPBACK_ADDRESS} {domain}")
}

/// True when some non-comment line maps the loopback address to `domain`,
/// whether or not other aliases share the line.
pub(crate) fn has_entry(hosts: &str, domain: &str) -> bool {
    hosts
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .any(|line| {
            let mut fields = line.split_whitespace();
            fields.next() == Some(LOOPBACK_ADDRESS)
                && fields.any(|name| name.eq_ignore_ascii_case(domain))
        })
}

/// Appends `127.0.0.1 <domain>` to the hosts file unless it is already
/// there. A dry run reads the file but never writes it.
pub(crate) fn ensure_entry(path: &Path, domain: &str, dry_run: bool) -> Result<HostsUpdate> {
    let current = std::fs::read_to_string(path)
        .with_context(|| format!("Couldn't read {}", path.display()))?;

    if has_entry(&current, domain) {
        return Ok(HostsUpdate::AlreadyPresent);
    }
    if dry_run {
        return Ok(HostsUpdate::WouldAdd);
    }

    let separator = match current.is_empty() || current.ends_with('\n') {
        true => "",
        false => "\n",
    };
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .with_context(|| format!("Couldn't open {} for writing", path.display()))?;
    writeln!(file, "{separator}{}", entry(domain))
        .with_context(|| format!("Couldn't write to {}", path.display()))?;
    Ok(HostsUpdate::Added)
}
