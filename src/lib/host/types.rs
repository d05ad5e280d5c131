use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lib::repository::types::RepositoryError;

/// Descriptor of the node this agent runs on, as published to the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: String,
    pub region: String,
    pub addr: String,
    pub cpus: i64,
    /// Megabytes.
    pub memory: i64,
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("invalid host descriptor: {0}")]
    Invalid(&'static str),

    #[error("unable to save host {id}: {source}")]
    Register {
        id: String,
        #[source]
        source: RepositoryError,
    },

    #[error("unable to delete host {id}: {source}")]
    Deregister {
        id: String,
        #[source]
        source: RepositoryError,
    },

    #[error("unable to read machine id: {0}")]
    MachineId(String),
}

pub type HostResult<T> = Result<T, HostError>;
