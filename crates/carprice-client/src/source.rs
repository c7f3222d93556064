// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// File name the prediction server publishes its listings under.
pub const DATASET_FILE: &str = "Cleaned_Car.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    File(PathBuf),
    Url(Url),
}

impl DatasetSource {
    /// `http(s)://` and `file://` values are URLs; anything else is a local path.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            bail!("dataset.source must not be empty");
        }

        let lowered = trimmed.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            let url = Url::parse(trimmed)
                .with_context(|| format!("dataset.source {trimmed:?} is not a valid URL"))?;
            return Ok(Self::Url(url));
        }
        if lowered.starts_with("file://") {
            let url = Url::parse(trimmed)
                .with_context(|| format!("dataset.source {trimmed:?} is not a valid URL"))?;
            let path = url
                .to_file_path()
                .map_err(|()| anyhow!("dataset.source {trimmed:?} is not a local file URL"))?;
            return Ok(Self::File(path));
        }
        Ok(Self::File(PathBuf::from(trimmed)))
    }

    /// The listings file served next to the prediction endpoint.
    pub fn default_for(base_url: &str) -> Result<Self> {
        let joined = format!("{}/{DATASET_FILE}", base_url.trim().trim_end_matches('/'));
        let url = Url::parse(&joined)
            .with_context(|| format!("derive dataset URL from base URL {base_url:?}"))?;
        Ok(Self::Url(url))
    }
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}
