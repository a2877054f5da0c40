//! Authenticated ERPNext REST client
//!
//! Builds URLs from path segments, attaches the token header and turns every
//! response into either parsed JSON or an [`ApiError`]. All traffic goes
//! through the shared [`HttpClient`] admission gate.

use std::time::Duration;

use campusbridge_domain::ErpConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::errors::ApiError;
use crate::http::HttpClient;

const LOGGED_USER_PATH: [&str; 3] = ["api", "method", "frappe.auth.get_logged_user"];

/// ERPNext API client
pub struct ErpClient {
    http: HttpClient,
    base_url: Url,
}

impl ErpClient {
    /// Create a client for the configured ERP instance.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] if the base URL or credentials cannot be
    /// used to build requests.
    pub fn new(config: &ErpConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|e| ApiError::Config(format!("invalid ERP base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Config(format!("ERP base URL cannot be a base: {base_url}")));
        }

        let mut token =
            HeaderValue::from_str(&format!("token {}:{}", config.api_key, config.api_secret))
                .map_err(|_| ApiError::Config("API credentials contain invalid characters".into()))?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, token);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .max_concurrent(config.max_concurrent_requests)
            .max_idle_per_host(config.max_idle_connections)
            .user_agent(concat!("campusbridge/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to build HttpClient: {e}")))?;

        info!(
            base_url = %base_url,
            max_concurrent = config.max_concurrent_requests,
            timeout_secs = config.timeout_seconds,
            "ERP client initialised"
        );

        Ok(Self { http, base_url })
    }

    /// The shared HTTP client, for gate statistics.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve path segments against the base URL.
    ///
    /// Each segment is percent-encoded on its own, so identifiers containing
    /// `/`, `?` or spaces stay inside their segment.
    pub fn url_for(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ApiError::Config(format!("ERP base URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send one request and parse the JSON body.
    ///
    /// Non-2xx answers become [`ApiError::Status`]; an empty 2xx body is
    /// returned as `Value::Null`.
    #[instrument(skip(self, query, body), fields(path = %segments.join("/")))]
    pub async fn request(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = self.url_for(segments)?;

        let mut builder = self.http.request(method, url)?;
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = match self.http.send(builder).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "ERP request failed");
                return Err(err);
            }
        };

        if !response.status.is_success() {
            let err = ApiError::Status { status: response.status.as_u16(), body: response.body };
            warn!(error = %err, "ERP returned an error status");
            return Err(err);
        }

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&response.body).map_err(|e| {
            let err = ApiError::Decode(e.to_string());
            warn!(error = %err, "ERP response is not valid JSON");
            err
        })
    }

    /// `GET` shorthand.
    pub async fn get(
        &self,
        segments: &[&str],
        query: &[(String, String)],
    ) -> Result<Value, ApiError> {
        self.request(Method::GET, segments, query, None).await
    }

    /// Check that the ERP is reachable and accepts our credentials.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> bool {
        match self.get(&LOGGED_USER_PATH, &[]).await {
            Ok(body) => {
                let user = body.get("message").cloned().unwrap_or_default();
                debug!(user = %user, "ERP connection verified");
                true
            }
            Err(_) => false,
        }
    }

    /// Release pooled connections. Later requests fail with [`ApiError::Closed`].
    pub fn close(&self) {
        self.http.close();
    }
}
