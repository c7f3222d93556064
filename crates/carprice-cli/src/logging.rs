// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! File-backed `tracing` setup. The terminal belongs to the form, so log
//! lines never go to stdout or stderr.

use anyhow::{Context, Result, anyhow};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;

/// Environment variable holding a full `EnvFilter` directive string.
pub const LOG_ENV: &str = "CARPRICE_LOG";

const CRATE_TARGETS: [&str; 4] = ["carprice", "carprice_app", "carprice_client", "carprice_tui"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    pub file: PathBuf,
}

pub fn init_logging(config: &LogConfig) -> Result<()> {
    if let Some(parent) = config.file.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)
        .with_context(|| {
            format!(
                "open log file {} -- set [log].file to a writable path",
                config.file.display()
            )
        })?;

    let subscriber = build_subscriber(build_env_filter(&config.level), Mutex::new(file));
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|error| anyhow!("install log subscriber: {error}"))?;
    tracing::debug!(file = %config.file.display(), level = %config.level, "logging initialized");
    Ok(())
}

fn build_subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);
    tracing_subscriber::registry().with(filter).with(layer)
}

/// `CARPRICE_LOG` wins when set and valid; otherwise our crates log at
/// `level` and dependencies stay at warn.
fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

fn default_directives(level: &str) -> String {
    let level = level.to_ascii_lowercase();
    let mut directives = vec!["warn".to_owned()];
    directives.extend(
        CRATE_TARGETS
            .iter()
            .map(|target| format!("{target}={level}")),
    );
    directives.join(",")
}
