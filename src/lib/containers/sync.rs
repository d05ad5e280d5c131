use std::sync::Arc;

use super::image::{is_image_id, normalize_image};
use super::types::{Container, ContainerState, Status, SyncError, SyncResult};
use crate::lib::repository::types::Repository;
use crate::lib::runtime::types::{ContainerDetails, ContainerRuntime, ContainerSummary};
use crate::lib::worker::activity::Activity;

const BYTES_PER_MB: i64 = 1024 * 1024;

/// Rebuilds this host's container records from the runtime.
#[derive(Clone)]
pub struct Synchronizer {
    host_id: String,
    repository: Arc<dyn Repository>,
    runtime: Arc<dyn ContainerRuntime>,
    activity: Arc<Activity>,
}

impl Synchronizer {
    pub fn new(
        host_id: &str,
        repository: Arc<dyn Repository>,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Self {
        Self {
            host_id: host_id.to_string(),
            repository,
            runtime,
            activity: Arc::default(),
        }
    }

    pub fn with_activity(mut self, activity: Arc<Activity>) -> Self {
        self.activity = activity;
        self
    }

    /// Full resync: every container the runtime knows about, running or not.
    ///
    /// Records are gathered before the host's existing records are cleared, so a
    /// runtime read failure leaves the repository untouched. A write failure after
    /// the clear leaves a partial set until the next successful resync.
    pub async fn resync(&self) -> SyncResult<usize> {
        let listed = self
            .runtime
            .list_containers(true)
            .await
            .map_err(SyncError::List)?;

        let mut records = Vec::with_capacity(listed.len());
        for summary in listed {
            let details = self
                .runtime
                .inspect_container(&summary.id)
                .await
                .map_err(|source| SyncError::Inspect {
                    id: summary.id.clone(),
                    source,
                })?;
            records.push(self.container_record(&summary, &details));
        }

        self.repository
            .delete_host_containers(&self.host_id)
            .await
            .map_err(|source| SyncError::Clear {
                host: self.host_id.clone(),
                source,
            })?;

        for record in &records {
            self.repository
                .save_container(record)
                .await
                .map_err(|source| SyncError::Save {
                    id: record.id.clone(),
                    source,
                })?;
        }

        self.activity.resynced();
        tracing::debug!(host = %self.host_id, containers = records.len(), "containers synchronized");
        Ok(records.len())
    }

    /// Drops the record of a single destroyed container.
    pub async fn forget(&self, container_id: &str) {
        if let Err(err) = self
            .repository
            .delete_container(&self.host_id, container_id)
            .await
        {
            tracing::warn!(
                host = %self.host_id,
                container = %container_id,
                error = %err,
                "unable to remove container from repository"
            );
        }
    }

    fn container_record(&self, summary: &ContainerSummary, details: &ContainerDetails) -> Container {
        let listed = summary.image.trim();
        let image = if listed.is_empty() || is_image_id(listed) {
            details.image.trim()
        } else {
            listed
        };
        let image = if is_image_id(image) {
            image.to_string()
        } else {
            normalize_image(image)
        };

        Container {
            id: details.id.clone(),
            image,
            host_id: self.host_id.clone(),
            // cpu shares stand in for a cpu count
            cpus: details.cpu_shares,
            memory_mb: details.memory_bytes.max(0) / BYTES_PER_MB,
            state: ContainerState {
                status: if details.running {
                    Status::Running
                } else {
                    Status::Stopped
                },
                exit_code: details.exit_code,
            },
        }
    }
}
