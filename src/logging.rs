use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};
use std::fs::OpenOptions;

use crate::config::LoggingConfig;

/// Send logs to the configured file; the TUI owns stdout and stderr.
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_file(config: &LoggingConfig) -> Result<()> {
    let Some(path) = config.file_path() else {
        return init_stderr(config);
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    Builder::from_env(Env::default().default_filter_or(config.level.as_str()))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()
        .context("initializing logger")?;
    Ok(())
}

pub fn init_stderr(config: &LoggingConfig) -> Result<()> {
    Builder::from_env(Env::default().default_filter_or(config.level.as_str()))
        .target(Target::Stderr)
        .try_init()
        .context("initializing logger")?;
    Ok(())
}
