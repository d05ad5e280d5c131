use std::time::Duration;

use thiserror::Error;

use crate::lib::host::types::{Host, HostError};

/// Fully resolved agent settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub host: Host,
    pub docker: String,
    pub listen: String,
    pub etcd_machines: Vec<String>,
    pub namespace: String,
    pub poll_interval: Duration,
    pub grace: Duration,
    pub json_logs: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    MachineId(#[from] HostError),

    #[error("{0} must have a value")]
    Missing(&'static str),

    #[error("poll interval must be greater than zero")]
    PollInterval,
}

pub type ConfigResult<T> = Result<T, ConfigError>;
