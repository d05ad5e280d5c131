use std::sync::Arc;

use super::types::{Host, HostError, HostResult};
use crate::lib::repository::types::Repository;

impl Host {
    /// Rejects descriptors the cluster can't schedule against.
    pub fn validate(&self) -> HostResult<()> {
        let problem = if self.id.trim().is_empty() {
            "id must have a value"
        } else if self.cpus < 1 {
            "cpus must have a value"
        } else if self.memory < 1 {
            "memory must have a value"
        } else if self.addr.trim().is_empty() {
            "addr must have a value"
        } else if self.region.trim().is_empty() {
            "region must have a value"
        } else {
            return Ok(());
        };
        Err(HostError::Invalid(problem))
    }
}

/// Publishes and withdraws this node's host record.
#[derive(Clone)]
pub struct HostLifecycle {
    repository: Arc<dyn Repository>,
}

impl HostLifecycle {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Writing an existing id overwrites the previous record.
    pub async fn register(&self, host: &Host) -> HostResult<()> {
        host.validate()?;
        self.repository
            .save_host(host)
            .await
            .map_err(|source| HostError::Register {
                id: host.id.clone(),
                source,
            })?;

        tracing::info!(
            host = %host.id,
            region = %host.region,
            addr = %host.addr,
            cpus = host.cpus,
            memory = host.memory,
            "host registered"
        );
        Ok(())
    }

    pub async fn deregister(&self, host_id: &str) -> HostResult<()> {
        self.repository
            .delete_host(host_id)
            .await
            .map_err(|source| HostError::Deregister {
                id: host_id.to_string(),
                source,
            })?;

        tracing::info!(host = %host_id, "host deregistered");
        Ok(())
    }
}
