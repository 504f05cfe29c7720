use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum IpamError {
    #[error("NETBOX_TOKEN not configured")]
    NotConfigured,

    #[error("netbox {operation} failed{}: {detail}", status_suffix(.status))]
    Unavailable {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },

    #[error("no usable address available in prefix {prefix_id} after {attempts} attempts")]
    ExhaustedAddressSpace { prefix_id: u64, attempts: u32 },

    #[error("malformed prefix {cidr:?}: {reason}")]
    MalformedPrefix { cidr: String, reason: String },

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("http client: {0}")]
    Client(String),
}

pub type IpamResult<T> = Result<T, IpamError>;

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl IpamError {
    pub(crate) fn transport(operation: &'static str, err: &reqwest::Error) -> Self {
        Self::Unavailable {
            operation,
            status: err.status().map(|s| s.as_u16()),
            detail: err.to_string(),
        }
    }

    /// HTTP status a fronting service should answer with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotConfigured | Self::Unavailable { .. } | Self::MalformedPrefix { .. } => {
                StatusCode::BAD_GATEWAY
            }
            Self::ExhaustedAddressSpace { .. } => StatusCode::CONFLICT,
            Self::InvalidAddress(_) => StatusCode::BAD_REQUEST,
            Self::Client(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Upstream failures a caller may retry; the allocator never retries them itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
