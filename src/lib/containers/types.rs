use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lib::repository::types::RepositoryError;
use crate::lib::runtime::types::RuntimeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Running,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerState {
    pub status: Status,
    pub exit_code: i64,
}

/// Repository-side mirror of a container on one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: String,
    pub image: String,
    pub host_id: String,
    /// CPU shares as reported by the runtime.
    pub cpus: i64,
    #[serde(rename = "memory")]
    pub memory_mb: i64,
    pub state: ContainerState,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unable to list containers: {0}")]
    List(#[source] RuntimeError),

    #[error("unable to inspect container {id}: {source}")]
    Inspect {
        id: String,
        #[source]
        source: RuntimeError,
    },

    #[error("unable to clear containers for host {host}: {source}")]
    Clear {
        host: String,
        #[source]
        source: RepositoryError,
    },

    #[error("unable to save container {id}: {source}")]
    Save {
        id: String,
        #[source]
        source: RepositoryError,
    },
}

pub type SyncResult<T> = Result<T, SyncError>;
