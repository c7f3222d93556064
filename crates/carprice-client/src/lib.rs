// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod source;

pub use source::{DATASET_FILE, DatasetSource};

use anyhow::{Context, Result, anyhow, bail};
use carprice_app::{PredictionRequest, PredictionResponse};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use std::fs;
use std::time::Duration;
use url::Url;

const PREDICT_PATH: &str = "predict";

/// Blocking client for the price prediction service.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Option<Duration>,
    http: HttpClient,
}

impl Client {
    /// `timeout` of `None` waits for the service indefinitely.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn predict_url(&self) -> String {
        format!("{}/{PREDICT_PATH}", self.base_url)
    }

    /// Posts one prediction request.
    ///
    /// The reply body is decoded whatever the HTTP status, so a service error
    /// payload such as `{"error": "..."}` on a 4xx/5xx still reaches the caller.
    /// Connection failures, bodies that are not JSON and a bare `null` are errors.
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        let url = self.predict_url();
        tracing::debug!(
            %url,
            company = %request.company,
            name = %request.name,
            "posting prediction request"
        );

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        let body = response
            .text()
            .with_context(|| format!("read prediction response from {url}"))?;
        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                "prediction service returned an error status"
            );
        }

        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|_| non_json_error(status, &body))?;
        PredictionResponse::from_value(&value)
            .with_context(|| format!("decode prediction response from {url}"))
    }

    pub fn fetch_dataset(&self, source: &DatasetSource) -> Result<String> {
        tracing::info!(%source, "loading dataset");
        match source {
            DatasetSource::File(path) => fs::read_to_string(path)
                .with_context(|| format!("read dataset file {}", path.display())),
            DatasetSource::Url(url) => {
                let response = self
                    .http
                    .get(url.as_str())
                    .send()
                    .map_err(|error| connection_error(url.as_str(), error))?;
                let status = response.status();
                if !status.is_success() {
                    bail!(
                        "dataset request to {url} returned {} -- check [dataset].source",
                        status.as_u16()
                    );
                }
                response
                    .text()
                    .with_context(|| format!("read dataset body from {url}"))
            }
        }
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        bail!("predictor.base_url must not be empty");
    }
    let parsed = Url::parse(trimmed)
        .with_context(|| format!("predictor.base_url {trimmed:?} is not a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!(
            "predictor.base_url {trimmed:?} must use http or https, got {}",
            parsed.scheme()
        );
    }
    Ok(trimmed.to_owned())
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- is the prediction server running? ({})",
        base_url,
        error
    )
}

fn non_json_error(status: StatusCode, body: &str) -> anyhow::Error {
    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() < 100 {
        return anyhow!(
            "prediction server returned non-JSON ({}): {}",
            status.as_u16(),
            trimmed
        );
    }
    anyhow!("prediction server returned non-JSON ({})", status.as_u16())
}
