use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

/// Entry from a container listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: String,
    pub image: String,
}

/// Detailed view of a single container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDetails {
    pub id: String,
    pub image: String,
    pub cpu_shares: i64,
    pub memory_bytes: i64,
    pub running: bool,
    pub exit_code: i64,
}

/// What to create for one instance of a run task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    pub cpu_shares: i64,
    pub memory_bytes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Destroy,
    Other(String),
}

impl From<&str> for EventKind {
    fn from(action: &str) -> Self {
        match action {
            "destroy" => EventKind::Destroy,
            other => EventKind::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEvent {
    pub kind: EventKind,
    pub container_id: String,
}

impl RuntimeEvent {
    pub fn new(action: &str, container_id: &str) -> Self {
        Self {
            kind: EventKind::from(action),
            container_id: container_id.to_string(),
        }
    }

    pub fn is_destroy(&self) -> bool {
        self.kind == EventKind::Destroy
    }
}

/// Local container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn list_containers(&self, all: bool) -> RuntimeResult<Vec<ContainerSummary>>;

    async fn inspect_container(&self, id: &str) -> RuntimeResult<ContainerDetails>;

    /// Returns the new container's id.
    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String>;

    async fn start_container(&self, id: &str) -> RuntimeResult<()>;

    async fn stop_container(&self, id: &str, grace: Duration) -> RuntimeResult<()>;

    async fn restart_container(&self, id: &str, grace: Duration) -> RuntimeResult<()>;

    async fn kill_container(&self, id: &str) -> RuntimeResult<()>;

    async fn remove_container(&self, id: &str) -> RuntimeResult<()>;

    /// Forwards container lifecycle events into `sink` until the runtime's
    /// event stream ends or the receiver is dropped.
    async fn subscribe_events(&self, sink: UnboundedSender<RuntimeEvent>) -> RuntimeResult<()>;
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("docker API error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("unable to connect to docker at {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("container {0} not found")]
    NotFound(String),

    #[error("runtime event stream closed")]
    EventsClosed,

    #[error("runtime error: {0}")]
    Other(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
