use std::time::Duration;

use crate::filter::MAX_LIST_LIMIT;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
/// Per-request timeout for every NetBox call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for [`NetboxClient`](crate::NetboxClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// NetBox root URL, without the `/api` suffix.
    pub base_url: String,
    /// API token. Without one the client refuses to make calls.
    pub token: Option<String>,
    pub timeout: Duration,
    /// Page size for prefix listings that don't ask for one, including the
    /// bulk fetch behind the gateway index.
    pub prefix_limit: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
            prefix_limit: MAX_LIST_LIMIT,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token,
            ..Self::default()
        }
    }

    /// Base URL with trailing slashes removed.
    pub(crate) fn normalized_url(&self) -> String {
        self.base_url.trim().trim_end_matches('/').to_string()
    }

    /// The token, unless it is missing or blank.
    pub(crate) fn usable_token(&self) -> Option<String> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
    }
}
