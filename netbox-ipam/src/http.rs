use std::sync::Arc;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{IpamError, IpamResult};

/// Shared HTTP client for the NetBox API. Owns the connection pool, base URL
/// and token. Clone is a cheap Arc refcount bump.
#[derive(Clone)]
pub(crate) struct HttpClient {
    inner: Arc<Inner>,
}

struct Inner {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> IpamResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| IpamError::Client(e.to_string()))?;

        let base_url = config.normalized_url();
        let token = config.usable_token();

        info!(
            base_url = %base_url,
            token = token.is_some(),
            timeout_ms = config.timeout.as_millis() as u64,
            "netbox client initialized"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                base_url,
                token,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn is_configured(&self) -> bool {
        self.inner.token.is_some()
    }

    /// Build an authenticated request. `path` is appended to `<base>/api`
    /// (e.g. `/ipam/prefixes/`).
    pub fn request(&self, method: Method, path: &str) -> IpamResult<RequestBuilder> {
        let token = self.inner.token.as_deref().ok_or(IpamError::NotConfigured)?;
        let url = format!("{}/api{path}", self.inner.base_url);
        Ok(self
            .inner
            .client
            .request(method, url)
            .header(AUTHORIZATION, format!("Token {token}"))
            .header(ACCEPT, "application/json"))
    }

    /// Send and decode a JSON body.
    pub async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        req: RequestBuilder,
    ) -> IpamResult<T> {
        let resp = self.dispatch(operation, req).await?;
        resp.json().await.map_err(|e| IpamError::Unavailable {
            operation,
            status: None,
            detail: format!("decode: {e}"),
        })
    }

    /// Send and ignore the body.
    pub async fn send_discard(&self, operation: &'static str, req: RequestBuilder) -> IpamResult<()> {
        self.dispatch(operation, req).await.map(drop)
    }

    async fn dispatch(&self, operation: &'static str, req: RequestBuilder) -> IpamResult<Response> {
        let resp = req
            .send()
            .await
            .map_err(|e| IpamError::transport(operation, &e))?;

        let status = resp.status();
        debug!(operation, status = status.as_u16(), "netbox response");
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(IpamError::Unavailable {
            operation,
            status: Some(status.as_u16()),
            detail: upstream_detail(&body),
        })
    }
}

/// NetBox error bodies look like `{"detail": "..."}`; fall back to the raw text.
fn upstream_detail(body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| match v.get("detail") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            _ => None,
        });
    match detail {
        Some(detail) => detail,
        None if body.trim().is_empty() => "empty response body".to_string(),
        None => body.trim().to_string(),
    }
}
