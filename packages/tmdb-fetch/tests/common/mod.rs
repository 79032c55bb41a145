//! Test infrastructure for pipeline integration tests.
//!
//! Provides a `ScriptedTransport` that answers requests from per-path queues
//! and records every request it sees, plus helpers to build a fetcher on top
//! of it.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

use tmdb_fetch::{
    FetchEvent, FetcherConfig, HttpResponse, HttpTransport, MetadataFetcher, TransportError,
    TransportErrorKind,
};

pub const API_BASE: &str = "http://tmdb.test/3";
pub const IMAGE_BASE: &str = "http://img.test/t/p/";
pub const RATE_LIMIT_BODY: &str =
    r#"{"status_code":25,"status_message":"Your request count (41) is over the allowed limit of 40."}"#;

/// A canned reply.
#[derive(Debug, Clone)]
pub enum Scripted {
    Json(u16, String),
    Bytes(u16, Vec<u8>),
    Fail(TransportErrorKind),
}

impl Scripted {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::Json(200, body.into())
    }
}

/// A request as seen by the transport.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub url: Url,
    pub at: Instant,
}

#[derive(Default)]
struct Concurrency {
    current: usize,
    max: usize,
}

/// Transport answering from per-path queues.
///
/// Unscripted paths get a TMDb-style 404 body.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    seen: Mutex<Vec<SeenRequest>>,
    concurrency: Mutex<HashMap<String, Concurrency>>,
    latency: Duration,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request takes `latency` before answering.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Queue a reply for a URL path such as `/3/movie/42`.
    pub fn script(&self, path: &str, reply: Scripted) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<SeenRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.path() == path)
            .collect()
    }

    /// Highest number of simultaneous requests observed for a resource kind
    /// (`movie`, `person`, `search`, ...).
    pub fn max_concurrency(&self, kind: &str) -> usize {
        self.concurrency
            .lock()
            .unwrap()
            .get(kind)
            .map(|c| c.max)
            .unwrap_or(0)
    }

    fn kind_of(url: &Url) -> String {
        url.path_segments()
            .and_then(|mut segments| {
                let first = segments.next()?;
                if first == "3" {
                    segments.next().map(str::to_string)
                } else {
                    Some("image".to_string())
                }
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: Url) -> Result<HttpResponse, TransportError> {
        self.seen.lock().unwrap().push(SeenRequest {
            url: url.clone(),
            at: Instant::now(),
        });

        let kind = Self::kind_of(&url);
        {
            let mut concurrency = self.concurrency.lock().unwrap();
            let entry = concurrency.entry(kind.clone()).or_default();
            entry.current += 1;
            entry.max = entry.max.max(entry.current);
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let reply = self
            .routes
            .lock()
            .unwrap()
            .get_mut(url.path())
            .and_then(VecDeque::pop_front);

        if let Some(entry) = self.concurrency.lock().unwrap().get_mut(&kind) {
            entry.current -= 1;
        }

        match reply {
            Some(Scripted::Json(status, body)) => Ok(HttpResponse {
                url,
                status,
                body: Bytes::from(body),
            }),
            Some(Scripted::Bytes(status, body)) => Ok(HttpResponse {
                url,
                status,
                body: Bytes::from(body),
            }),
            Some(Scripted::Fail(kind)) => Err(TransportError::new(kind, "scripted failure")),
            None => Ok(HttpResponse {
                url,
                status: 404,
                body: Bytes::from_static(
                    br#"{"success":false,"status_code":34,"status_message":"The resource you requested could not be found."}"#,
                ),
            }),
        }
    }
}

/// Fetcher configuration pointed at the scripted hosts.
pub fn test_config(poster_dir: &Path) -> FetcherConfig {
    FetcherConfig::new("test-key")
        .expect("valid api key")
        .api_base_url(API_BASE)
        .image_base_url(IMAGE_BASE)
        .poster_dir(poster_dir)
        .backoff(Duration::from_secs(10))
}

pub fn fetcher(transport: Arc<ScriptedTransport>, poster_dir: &Path) -> Arc<MetadataFetcher> {
    Arc::new(
        MetadataFetcher::with_transport(test_config(poster_dir), transport)
            .expect("Failed to build fetcher"),
    )
}

/// Everything currently buffered on an event receiver.
pub fn drain(rx: &mut broadcast::Receiver<FetchEvent>) -> Vec<FetchEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn configuration_body() -> String {
    format!(
        r#"{{"images":{{"base_url":"http://img.test/t/p/","secure_base_url":"{}","poster_sizes":["w92","w396","original"]}}}}"#,
        IMAGE_BASE
    )
}
