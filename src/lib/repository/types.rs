use async_trait::async_trait;
use thiserror::Error;

use crate::lib::containers::types::Container;
use crate::lib::host::types::Host;
use crate::lib::tasks::types::Task;

/// Shared cluster bookkeeping store holding host, container and task records.
///
/// Implementations must be safe to call concurrently from many tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn save_host(&self, host: &Host) -> RepositoryResult<()>;

    async fn delete_host(&self, host_id: &str) -> RepositoryResult<()>;

    async fn save_container(&self, container: &Container) -> RepositoryResult<()>;

    async fn delete_container(&self, host_id: &str, container_id: &str) -> RepositoryResult<()>;

    /// Removes every container record owned by `host_id`.
    async fn delete_host_containers(&self, host_id: &str) -> RepositoryResult<()>;

    /// Returns all pending tasks, for every host.
    async fn fetch_tasks(&self) -> RepositoryResult<Vec<Task>>;

    async fn delete_task(&self, task_id: &str) -> RepositoryResult<()>;
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("repository transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("repository returned {status} for {key}: {message}")]
    Store {
        status: u16,
        key: String,
        message: String,
    },

    #[error("malformed record at {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("no repository machines configured")]
    NoMachines,
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
