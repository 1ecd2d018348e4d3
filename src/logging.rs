use anyhow::{Context, Result};
use std::str::FromStr;
use tracing::{level_filters::LevelFilter, Level};
use tracing_subscriber::{
    fmt::{format::FmtSpan, Layer},
    prelude::*,
    EnvFilter,
};

use crate::Args;

/// `--log-level` sets the default; `RUST_LOG` directives refine it per target.
pub fn init(args: &Args) -> Result<()> {
    let log_level = Level::from_str(&args.log_level)
        .with_context(|| format!("Unknown log level \"{}\"", args.log_level))?;
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(log_level).into())
        .from_env_lossy();

    let fmt = Layer::default().with_span_events(FmtSpan::CLOSE);
    let fmt = match args.json {
        true => fmt.json().with_filter(filter).boxed(),
        false => fmt.with_target(false).with_filter(filter).boxed(),
    };

    tracing_subscriber::registry().with(fmt).try_init()?;
    Ok(())
}
