use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::lib::containers::sync::Synchronizer;
use crate::lib::containers::types::SyncError;
use crate::lib::events::listener::EventListener;
use crate::lib::host::lifecycle::HostLifecycle;
use crate::lib::host::types::{Host, HostError};
use crate::lib::repository::types::RepositoryError;
use crate::lib::runtime::types::RuntimeError;
use crate::lib::tasks::poller::TaskPoller;
use crate::lib::worker::activity::{Activity, ActivitySnapshot};

/// The per-host agent: owns registration, state sync and task execution.
pub struct Worker {
    pub host: Host,
    pub lifecycle: HostLifecycle,
    pub synchronizer: Synchronizer,
    pub listener: EventListener,
    pub poller: TaskPoller,
    pub activity: Arc<Activity>,
    pub listen: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub poll_interval: Duration,
    pub grace: Duration,
    /// Status listener address; `None` disables it.
    pub listen: Option<String>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            grace: Duration::from_secs(10),
            listen: None,
        }
    }
}

/// Host utilisation as read from the operating system.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SystemUsage {
    pub hostname: String,
    pub os: String,
    pub cpus: usize,
    pub cpu_percent: f32,
    pub memory_total_mb: u64,
    pub memory_used_mb: u64,
    pub swap_total_mb: u64,
    pub swap_used_mb: u64,
    pub disk_percent: f32,
}

/// Body of `GET /stats`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AgentStats {
    pub host_id: String,
    pub system: SystemUsage,
    pub activity: ActivitySnapshot,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("unable to register host: {0}")]
    Register(#[from] HostError),

    #[error("unable to load containers: {0}")]
    InitialSync(#[from] SyncError),

    #[error("unable to fetch task queue: {0}")]
    Poll(#[source] RepositoryError),

    #[error("runtime event listener stopped: {0}")]
    Events(#[source] RuntimeError),
}

pub type WorkerResult<T> = Result<T, WorkerError>;
