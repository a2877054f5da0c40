use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use campusbridge_domain::constants::{
    DEFAULT_ERP_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_MAX_IDLE_CONNECTIONS,
};
use campusbridge_domain::CampusBridgeError;
use parking_lot::RwLock;
use reqwest::header::HeaderMap;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, StatusCode};
use tokio::sync::Semaphore;
use tracing::{debug, info};
use url::Url;

use crate::erp::ApiError;
use crate::errors::InfraError;

/// Status and fully read body of a response.
#[derive(Debug, Clone)]
pub struct BufferedResponse {
    pub status: StatusCode,
    pub body: String,
}

/// HTTP client with an admission gate and timeout support.
///
/// At most `max_concurrent` requests are in flight at any instant; further
/// callers wait for a permit. A permit is held until the response body has
/// been read in full. Requests are never retried.
pub struct HttpClient {
    client: RwLock<Option<ReqwestClient>>,
    gate: Semaphore,
    max_concurrent: usize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, CampusBridgeError> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, ApiError> {
        self.client.read().as_ref().map(|client| client.request(method, url)).ok_or(ApiError::Closed)
    }

    /// Execute the request once a permit is available and buffer the body.
    pub async fn send(&self, builder: RequestBuilder) -> Result<BufferedResponse, ApiError> {
        let _permit = self.gate.acquire().await.map_err(|_| ApiError::Closed)?;

        let client = self.client.read().clone().ok_or(ApiError::Closed)?;
        let request = builder
            .build()
            .map_err(|err| ApiError::Config(format!("invalid request: {err}")))?;

        let _in_flight = InFlight::enter(&self.in_flight, &self.peak_in_flight);

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "sending HTTP request");

        let response = client.execute(request).await.map_err(|err| ApiError::transport(&err))?;
        let status = response.status();
        let body = response.text().await.map_err(|err| ApiError::transport(&err))?;

        debug!(%method, %url, %status, bytes = body.len(), "received HTTP response");
        Ok(BufferedResponse { status, body })
    }

    /// Close the gate and release pooled connections.
    ///
    /// Waiting and future callers get [`ApiError::Closed`]. Requests already
    /// past the gate run to completion. Calling this again does nothing.
    pub fn close(&self) {
        if self.gate.is_closed() {
            return;
        }
        self.gate.close();
        self.client.write().take();
        info!("HTTP client closed");
    }

    pub fn is_closed(&self) -> bool {
        self.gate.is_closed()
    }

    /// Size of the admission gate.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Requests currently past the gate.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous in-flight requests observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter on drop, including on cancellation.
struct InFlight<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_concurrent: usize,
    max_idle_per_host: usize,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_ERP_TIMEOUT_SECS),
            max_concurrent: DEFAULT_MAX_CONCURRENT_REQUESTS,
            max_idle_per_host: DEFAULT_MAX_IDLE_CONNECTIONS,
            user_agent: None,
            default_headers: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of requests allowed in flight at once (at least 1).
    pub fn max_concurrent(mut self, permits: usize) -> Self {
        self.max_concurrent = permits.max(1);
        self
    }

    pub fn max_idle_per_host(mut self, connections: usize) -> Self {
        self.max_idle_per_host = connections;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<HttpClient, CampusBridgeError> {
        let mut builder = ReqwestClient::builder()
            .timeout(self.timeout)
            .pool_max_idle_per_host(self.max_idle_per_host)
            .no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder.build().map_err(|err| {
            let infra: InfraError = err.into();
            CampusBridgeError::from(infra)
        })?;

        Ok(HttpClient {
            client: RwLock::new(Some(client)),
            gate: Semaphore::new(self.max_concurrent),
            max_concurrent: self.max_concurrent,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        })
    }
}
