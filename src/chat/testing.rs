//! Test doubles shared by the chat module's unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::chat::error::TransportError;
use crate::chat::matcher::RandomSource;
use crate::chat::telemetry::TelemetrySink;
use crate::chat::transport::{HttpRequest, HttpResponse, Transport, TransportFuture};

/// Canned outcome for one request.
#[derive(Clone, Debug)]
pub enum Scripted {
    /// Settle with this status and body.
    Reply(u16, String),
    /// Fail at the connection level.
    Fail(TransportError),
    /// Never settle (until a day of virtual time passes).
    Hang,
}

impl Scripted {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::Reply(200, body.into())
    }
}

/// Transport answering from per-URL-prefix queues and recording every request.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<(String, VecDeque<Scripted>)>>,
    requests: Mutex<Vec<HttpRequest>>,
    completed: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an outcome for requests whose URL starts with `prefix`.
    pub fn on(self, prefix: &str, outcome: Scripted) -> Self {
        if let Ok(mut routes) = self.routes.lock() {
            if let Some((_, queue)) = routes.iter_mut().find(|(p, _)| p == prefix) {
                queue.push_back(outcome);
            } else {
                routes.push((prefix.to_string(), VecDeque::from([outcome])));
            }
        }
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn calls_to(&self, prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.url.starts_with(prefix))
            .count()
    }

    /// Requests that ran to completion (hung or aborted ones excluded).
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    fn next_outcome(&self, url: &str) -> Scripted {
        let Ok(mut routes) = self.routes.lock() else {
            return Scripted::Fail(TransportError::Network("poisoned".to_string()));
        };
        routes
            .iter_mut()
            .find(|(prefix, _)| url.starts_with(prefix.as_str()))
            .and_then(|(_, queue)| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            })
            .unwrap_or_else(|| Scripted::Reply(404, "no route".to_string()))
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: HttpRequest) -> TransportFuture<'_, Result<HttpResponse, TransportError>> {
        let outcome = self.next_outcome(&request.url);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        Box::pin(async move {
            let result = match outcome {
                Scripted::Reply(status, body) => Ok(HttpResponse { status, body }),
                Scripted::Fail(err) => Err(err),
                Scripted::Hang => {
                    tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                    Ok(HttpResponse {
                        status: 200,
                        body: "late".to_string(),
                    })
                }
            };
            self.completed.fetch_add(1, Ordering::SeqCst);
            result
        })
    }
}

/// Random source that always picks the same index (clamped to range).
pub struct FixedRandom(pub usize);

impl RandomSource for FixedRandom {
    fn pick(&self, n: usize) -> usize {
        self.0.min(n.saturating_sub(1))
    }
}

/// Recorded telemetry event: (event, category, label, value).
pub type TrackedEvent = (String, String, String, Option<f64>);

/// Telemetry sink that keeps every event in memory.
#[derive(Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<TrackedEvent>>,
}

impl RecordingTelemetry {
    pub fn events(&self) -> Vec<TrackedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn track(&self, event: &str, category: &str, label: &str, value: Option<f64>) {
        if let Ok(mut events) = self.events.lock() {
            events.push((
                event.to_string(),
                category.to_string(),
                label.to_string(),
                value,
            ));
        }
    }
}
