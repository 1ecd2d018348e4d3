mod config;

pub(crate) use config::{ConfigFile, RunConfig};
