//! Outbound HTTP transport with per-call deadlines and cancellation.
//!
//! Providers never talk to `reqwest` directly: they build an [`HttpRequest`]
//! and hand it to a [`Transport`] through a [`DeadlineCall`], which owns the
//! deadline timer and the abort registration for exactly one call. Both are
//! released when the call settles, times out, is cancelled, or is dropped.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures::future::{AbortHandle, Abortable, Aborted};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};

use crate::chat::error::{ChatError, ChatResult, TransportError};

/// Boxed future type for transport operations.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Connection timeout for the default client. Per-call deadlines are separate.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A JSON POST request to an upstream provider.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    /// Absolute URL, including any query string.
    pub url: String,
    /// Extra headers (name, value).
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: serde_json::Value,
}

impl HttpRequest {
    /// Build a JSON POST to `url`.
    #[must_use]
    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header value (case-insensitive name).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and raw body of a settled request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Body text.
    pub body: String,
}

impl HttpResponse {
    /// True for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Issues one request and resolves once it settles.
pub trait Transport: Send + Sync {
    /// Send a request.
    ///
    /// # Errors
    /// Returns [`TransportError::Network`] for connection-level failures.
    /// Non-success statuses are *not* errors at this layer.
    fn send(&self, request: HttpRequest) -> TransportFuture<'_, Result<HttpResponse, TransportError>>;
}

/// [`Transport`] over a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a default client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> ChatResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(ua) = HeaderValue::from_str(&format!(
            "chizel-chat/{}",
            env!("CARGO_PKG_VERSION")
        )) {
            headers.insert(USER_AGENT, ua);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ChatError::HttpClient(e.to_string()))?;

        Ok(Self { client })
    }

    /// Wrap an existing client.
    #[must_use]
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> TransportFuture<'_, Result<HttpResponse, TransportError>> {
        Box::pin(async move {
            let mut builder = self.client.post(&request.url).json(&request.body);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            let response = builder
                .send()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;

            Ok(HttpResponse { status, body })
        })
    }
}

/// Handle that aborts a pending [`DeadlineCall`].
///
/// Cancelling is idempotent; cancelling a call that already settled has no effect.
#[derive(Clone, Debug)]
pub struct CallCanceller {
    handle: AbortHandle,
}

impl CallCanceller {
    /// Abort the call if it is still pending.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// True once [`CallCanceller::cancel`] was invoked or the deadline fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.handle.is_aborted()
    }
}

/// One outbound request bound to a deadline.
///
/// Nothing is sent until [`DeadlineCall::wait`] is awaited.
pub struct DeadlineCall<'a> {
    call: Abortable<TransportFuture<'a, Result<HttpResponse, TransportError>>>,
    handle: AbortHandle,
    timeout: Duration,
}

impl<'a> DeadlineCall<'a> {
    /// Prepare `request` on `transport` with the given deadline.
    #[must_use]
    pub fn start(transport: &'a dyn Transport, request: HttpRequest, timeout: Duration) -> Self {
        let (handle, registration) = AbortHandle::new_pair();
        Self {
            call: Abortable::new(transport.send(request), registration),
            handle,
            timeout,
        }
    }

    /// Handle for cancelling this call from elsewhere.
    #[must_use]
    pub fn canceller(&self) -> CallCanceller {
        CallCanceller {
            handle: self.handle.clone(),
        }
    }

    /// Drive the request until it settles, the deadline fires, or it is cancelled.
    ///
    /// # Errors
    /// Returns [`TransportError::Timeout`] when the deadline elapses (the
    /// in-flight request is dropped), [`TransportError::Aborted`] when
    /// cancelled, or the transport's own error.
    pub async fn wait(self) -> Result<HttpResponse, TransportError> {
        let Self {
            call,
            handle,
            timeout,
        } = self;

        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(settled)) => settled,
            Ok(Err(Aborted)) => Err(TransportError::Aborted),
            Err(_) => {
                handle.abort();
                Err(TransportError::Timeout(timeout))
            }
        }
    }
}

/// Send `request` with a deadline and wait for the outcome.
///
/// # Errors
/// See [`DeadlineCall::wait`].
pub async fn call_with_deadline(
    transport: &dyn Transport,
    request: HttpRequest,
    timeout: Duration,
) -> Result<HttpResponse, TransportError> {
    DeadlineCall::start(transport, request, timeout).wait().await
}
