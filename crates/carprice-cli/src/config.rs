// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use carprice_client::{Client, DatasetSource};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "carprice";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_FILE_NAME: &str = "carprice.log";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub predictor: Predictor,
    #[serde(default)]
    pub dataset: Dataset,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            predictor: Predictor::default(),
            dataset: Dataset::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Predictor {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Predictor {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dataset {
    pub source: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            file: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("CARPRICE_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set CARPRICE_CONFIG_PATH to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version; add `version = 1` and put values under [predictor], [dataset], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        Client::new(self.base_url(), None).with_context(|| {
            format!(
                "predictor.base_url in {} is invalid; use an http:// or https:// URL",
                path.display()
            )
        })?;

        if let Some(timeout) = &self.predictor.timeout {
            let parsed = parse_duration(timeout)
                .with_context(|| format!("predictor.timeout in {}", path.display()))?;
            if parsed <= Duration::ZERO {
                bail!(
                    "predictor.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(source) = &self.dataset.source {
            DatasetSource::parse(source)
                .with_context(|| format!("invalid [dataset] config in {}", path.display()))?;
        }

        let level = self.log_level();
        if level.parse::<tracing::Level>().is_err() {
            bail!(
                "log.level in {} must be one of error, warn, info, debug, trace; got {:?}",
                path.display(),
                level
            );
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.predictor
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    /// `None` means wait for the prediction service indefinitely.
    pub fn timeout(&self) -> Result<Option<Duration>> {
        self.predictor
            .timeout
            .as_deref()
            .map(parse_duration)
            .transpose()
    }

    /// Resolves the dataset location: an explicit override first, then
    /// `[dataset].source`, then the file served next to the predictor.
    pub fn dataset_source(&self, override_source: Option<&str>) -> Result<DatasetSource> {
        match override_source.or(self.dataset.source.as_deref()) {
            Some(raw) => DatasetSource::parse(raw),
            None => DatasetSource::default_for(self.base_url()),
        }
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }
        let data_root = dirs::data_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [log].file in the config")
        })?;
        Ok(data_root.join(APP_NAME).join(LOG_FILE_NAME))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# carprice config\n# Place this file at: {}\n\nversion = 1\n\n[predictor]\nbase_url = \"{}\"\n# Optional. Unset waits for the server indefinitely.\n# timeout = \"10s\"\n\n[dataset]\n# Optional. Defaults to <base_url>/Cleaned_Car.csv; accepts a URL or a local path.\n# source = \"/absolute/path/to/Cleaned_Car.csv\"\n\n[log]\nlevel = \"{}\"\n# Optional. Default is the platform data dir (for example ~/.local/share/carprice/carprice.log)\n# file = \"/absolute/path/to/carprice.log\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins.saturating_mul(60)));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 10s)")
}
