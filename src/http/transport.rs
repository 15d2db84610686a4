//! reqwest-backed transport.

use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::sync::Arc;
use std::time::Duration;

use super::{ApiError, ApiRequest, ApiResponse, Method, PersistentCookieJar, Transport};

/// User-Agent sent with every request
const USER_AGENT: &str = concat!("taskflow-cli/", env!("CARGO_PKG_VERSION"));

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Transport that talks to the API over HTTP(S).
///
/// One instance per process: the underlying `reqwest::Client` pools
/// connections and shares the cookie jar across all requests.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
    cookies: Arc<PersistentCookieJar>,
}

impl ReqwestTransport {
    /// Create a transport for `base_url` with a fresh cookie jar.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let url = parse_base_url(base_url)?;
        Self::with_cookies(url, timeout, Arc::new(PersistentCookieJar::new()))
    }

    /// Create a transport reusing previously saved cookies.
    pub fn with_saved_cookies(
        base_url: &str,
        timeout: Duration,
        saved: &[String],
    ) -> Result<Self, ApiError> {
        let url = parse_base_url(base_url)?;
        let jar = PersistentCookieJar::restore(&url, saved);
        Self::with_cookies(url, timeout, Arc::new(jar))
    }

    fn with_cookies(
        base_url: Url,
        timeout: Duration,
        cookies: Arc<PersistentCookieJar>,
    ) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .cookie_provider(Arc::clone(&cookies))
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            cookies,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The cookie jar, for persisting the refresh credential.
    pub fn cookies(&self) -> &PersistentCookieJar {
        &self.cookies
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, self.url_for(&request.path));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Network(format!("{} timed out", request.describe()))
            } else {
                ApiError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        tracing::debug!(request = %request.describe(), status, "API response");
        Ok(ApiResponse::new(status, body.to_vec()))
    }
}

fn parse_base_url(base_url: &str) -> Result<Url, ApiError> {
    let url = Url::parse(base_url)
        .map_err(|e| ApiError::Network(format!("Invalid API URL '{}': {}", base_url, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ApiError::Network(format!(
            "Invalid API URL '{}': unsupported scheme '{}'",
            base_url, scheme
        ))),
    }
}
