use std::process::ExitCode;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Ipam(#[from] netbox_ipam::IpamError),

    #[error("config error: {0}")]
    Config(String),

    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// 2 for an unreachable or failing NetBox, 3 for an exhausted prefix.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Ipam(netbox_ipam::IpamError::ExhaustedAddressSpace { .. }) => ExitCode::from(3),
            CliError::Ipam(
                netbox_ipam::IpamError::NotConfigured | netbox_ipam::IpamError::Unavailable { .. },
            ) => ExitCode::from(2),
            _ => ExitCode::FAILURE,
        }
    }
}
