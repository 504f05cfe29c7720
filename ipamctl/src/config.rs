use std::path::Path;
use std::time::Duration;

use netbox_ipam::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, MAX_LIST_LIMIT};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CtlConfig {
    #[serde(default)]
    pub netbox: NetboxConfig,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetboxConfig {
    pub url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
    pub prefix_limit: u32,
}

impl Default for NetboxConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            prefix_limit: MAX_LIST_LIMIT,
        }
    }
}

/// Load an `ipamctl.yaml` config file.
pub async fn load(path: &Path) -> CliResult<CtlConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CliError::Config(format!("read {}: {e}", path.display())))?;
    let config: CtlConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| CliError::Config(format!("parse {}: {e}", path.display())))?;
    if config.netbox.timeout_secs == 0 {
        return Err(CliError::Config(format!(
            "{}: netbox.timeout_secs must be positive",
            path.display()
        )));
    }
    Ok(config)
}

impl CtlConfig {
    /// Client settings, with command-line overrides applied on top of the file.
    pub fn client_config(&self, url: Option<String>, token: Option<String>) -> ClientConfig {
        ClientConfig {
            base_url: url.unwrap_or_else(|| self.netbox.url.clone()),
            token: token.or_else(|| self.netbox.token.clone()),
            timeout: Duration::from_secs(self.netbox.timeout_secs),
            prefix_limit: self.netbox.prefix_limit,
        }
    }
}
