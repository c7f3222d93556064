// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use carprice_app::{DatasetIndex, PredictionRequest, PredictionResponse, RequestId};
use carprice_client::{Client, DatasetSource};
use carprice_tui::InternalEvent;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::thread;

/// Runs dataset loads and predictions against the HTTP service on worker
/// threads, posting outcomes back to the UI loop.
pub struct HttpRuntime {
    client: Client,
    source: DatasetSource,
    canceled_through: Arc<AtomicU64>,
}

impl HttpRuntime {
    pub fn new(client: Client, source: DatasetSource) -> Self {
        Self {
            client,
            source,
            canceled_through: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn source(&self) -> &DatasetSource {
        &self.source
    }
}

fn load_index(client: &Client, source: &DatasetSource) -> Result<DatasetIndex> {
    let text = client.fetch_dataset(source)?;
    let index = DatasetIndex::parse(&text)?;
    tracing::info!(
        %source,
        rows = index.rows().len(),
        skipped = index.skipped_rows(),
        "dataset loaded"
    );
    Ok(index)
}

impl carprice_tui::PredictionRuntime for HttpRuntime {
    fn load_dataset(&mut self) -> Result<DatasetIndex> {
        load_index(&self.client, &self.source)
    }

    fn predict(&mut self, request: &PredictionRequest) -> Result<PredictionResponse> {
        self.client.predict(request)
    }

    fn spawn_dataset_load(&mut self, tx: Sender<InternalEvent>) -> Result<()> {
        let client = self.client.clone();
        let source = self.source.clone();
        thread::Builder::new()
            .name("dataset-load".to_owned())
            .spawn(move || {
                let outcome = load_index(&client, &source).map_err(|error| {
                    tracing::warn!(%source, error = %format!("{error:#}"), "dataset load failed");
                    format!("{error:#}")
                });
                let _ = tx.send(InternalEvent::DatasetLoaded(outcome));
            })
            .map_err(|error| anyhow!("spawn dataset loader: {error}"))?;
        Ok(())
    }

    fn spawn_prediction(
        &mut self,
        request_id: RequestId,
        request: &PredictionRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let client = self.client.clone();
        let request = request.clone();
        let canceled_through = Arc::clone(&self.canceled_through);
        thread::Builder::new()
            .name(format!("predict-{}", request_id.get()))
            .spawn(move || {
                let outcome = client
                    .predict(&request)
                    .map_err(|error| format!("{error:#}"));
                if canceled_through.load(Ordering::Acquire) >= request_id.get() {
                    tracing::debug!(request_id = request_id.get(), "dropping canceled reply");
                    return;
                }
                let _ = tx.send(InternalEvent::Prediction {
                    request_id,
                    outcome,
                });
            })
            .map_err(|error| anyhow!("spawn prediction worker: {error}"))?;
        Ok(())
    }

    // The blocking request cannot be interrupted; its reply is dropped instead.
    fn cancel_prediction(&mut self, request_id: RequestId) -> Result<()> {
        self.canceled_through
            .fetch_max(request_id.get(), Ordering::AcqRel);
        tracing::info!(request_id = request_id.get(), "prediction canceled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::HttpRuntime;
    use anyhow::{Result, anyhow};
    use carprice_app::{PredictionRequest, PredictionResponse, RequestId};
    use carprice_client::{Client, DatasetSource};
    use carprice_testkit::{sample_csv, temp_dataset};
    use carprice_tui::{InternalEvent, PredictionRuntime};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tiny_http::{Header, Response, Server};

    fn request() -> PredictionRequest {
        PredictionRequest {
            name: "Honda City".to_owned(),
            company: "Honda".to_owned(),
            year: 2015.0,
            kms_driven: 40_000.0,
            fuel_type: "Petrol".to_owned(),
        }
    }

    fn serve_prices(count: usize) -> Result<(String, thread::JoinHandle<()>)> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}", server.server_addr());
        let handle = thread::spawn(move || {
            for _ in 0..count {
                let request = server.recv().expect("request expected");
                let header = Header::from_bytes("Content-Type", "application/json")
                    .expect("valid content type header");
                let response = Response::from_string(r#"{"predicted_price": 450000.0}"#)
                    .with_header(header);
                request.respond(response).expect("response should succeed");
            }
        });
        Ok((addr, handle))
    }

    #[test]
    fn dataset_load_posts_index_from_file() -> Result<()> {
        let (_dir, path) = temp_dataset(sample_csv())?;
        let client = Client::new("http://127.0.0.1:1", None)?;
        let mut runtime = HttpRuntime::new(client, DatasetSource::File(path));
        let (tx, rx) = mpsc::channel();

        runtime.spawn_dataset_load(tx)?;
        match rx.recv_timeout(Duration::from_secs(5))? {
            InternalEvent::DatasetLoaded(Ok(index)) => assert_eq!(index.rows().len(), 11),
            other => panic!("unexpected event {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn dataset_load_failure_is_posted_as_message() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let client = Client::new("http://127.0.0.1:1", None)?;
        let mut runtime = HttpRuntime::new(client, DatasetSource::File(dir.path().join("nope.csv")));
        let (tx, rx) = mpsc::channel();

        runtime.spawn_dataset_load(tx)?;
        match rx.recv_timeout(Duration::from_secs(5))? {
            InternalEvent::DatasetLoaded(Err(message)) => {
                assert!(message.contains("read dataset file"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn prediction_reply_is_tagged_with_request_id() -> Result<()> {
        let (addr, handle) = serve_prices(1)?;
        let client = Client::new(&addr, Some(Duration::from_secs(5)))?;
        let mut runtime = HttpRuntime::new(client, DatasetSource::default_for(&addr)?);
        let (tx, rx) = mpsc::channel();

        runtime.spawn_prediction(RequestId::new(3), &request(), tx)?;
        let event = rx.recv_timeout(Duration::from_secs(5))?;
        assert_eq!(
            event,
            InternalEvent::Prediction {
                request_id: RequestId::new(3),
                outcome: Ok(PredictionResponse::price(450_000.0)),
            }
        );
        handle.join().expect("server thread should join");
        Ok(())
    }

    #[test]
    fn canceled_prediction_posts_nothing() -> Result<()> {
        let (addr, handle) = serve_prices(1)?;
        let client = Client::new(&addr, Some(Duration::from_secs(5)))?;
        let mut runtime = HttpRuntime::new(client, DatasetSource::default_for(&addr)?);
        let (tx, rx) = mpsc::channel();

        runtime.cancel_prediction(RequestId::new(1))?;
        runtime.spawn_prediction(RequestId::new(1), &request(), tx)?;
        handle.join().expect("server thread should join");
        assert!(rx.recv_timeout(Duration::from_millis(500)).is_err());
        Ok(())
    }

    #[test]
    fn unreachable_server_posts_failure() -> Result<()> {
        let client = Client::new("http://127.0.0.1:1", Some(Duration::from_millis(500)))?;
        let mut runtime =
            HttpRuntime::new(client, DatasetSource::default_for("http://127.0.0.1:1")?);
        let (tx, rx) = mpsc::channel();

        runtime.spawn_prediction(RequestId::new(1), &request(), tx)?;
        match rx.recv_timeout(Duration::from_secs(5))? {
            InternalEvent::Prediction {
                outcome: Err(message),
                ..
            } => assert!(message.contains("cannot reach")),
            other => panic!("unexpected event {other:?}"),
        }
        Ok(())
    }
}
