use std::sync::Arc;
use std::time::Duration;

use super::lease::TaskLease;
use super::types::{Task, TaskCommand};
use crate::lib::repository::types::Repository;
use crate::lib::runtime::types::{ContainerRuntime, ContainerSpec};
use crate::lib::worker::activity::Activity;

const BYTES_PER_MB: i64 = 1024 * 1024;

/// Maps a task's command onto a runtime action.
///
/// Run deletes its task before doing any work; stop, restart and destroy
/// delete theirs once the runtime call has finished, whatever its result.
/// Tasks with an unknown command are left in the repository.
#[derive(Clone)]
pub struct TaskDispatcher {
    repository: Arc<dyn Repository>,
    runtime: Arc<dyn ContainerRuntime>,
    grace: Duration,
    activity: Arc<Activity>,
}

impl TaskDispatcher {
    pub fn new(
        repository: Arc<dyn Repository>,
        runtime: Arc<dyn ContainerRuntime>,
        grace: Duration,
    ) -> Self {
        Self {
            repository,
            runtime,
            grace,
            activity: Arc::default(),
        }
    }

    pub fn with_activity(mut self, activity: Arc<Activity>) -> Self {
        self.activity = activity;
        self
    }

    pub async fn dispatch(&self, task: Task) {
        let _in_flight = self.activity.handler_started();
        match task.command() {
            TaskCommand::Run => {
                tracing::info!(host = %task.host, task = %task.id, "processing run task");
                self.run(&task).await;
            }
            TaskCommand::Stop => {
                tracing::info!(host = %task.host, task = %task.id, "processing stop task");
                self.stop(&task).await;
            }
            TaskCommand::Restart => {
                tracing::info!(host = %task.host, task = %task.id, "processing restart task");
                self.restart(&task).await;
            }
            TaskCommand::Destroy => {
                tracing::info!(host = %task.host, task = %task.id, "processing destroy task");
                self.destroy(&task).await;
            }
            TaskCommand::Unknown(command) => {
                tracing::error!(task = %task.id, command = %command, "unknown task command");
            }
        }
    }

    async fn run(&self, task: &Task) {
        tracing::info!(
            host = %task.host,
            image = %task.image,
            cpus = task.cpus,
            memory = task.memory_mb,
            instances = task.instances,
            "running container"
        );

        TaskLease::new(self.repository.clone(), &task.id)
            .release()
            .await;

        let spec = ContainerSpec {
            image: task.image.clone(),
            cpu_shares: task.cpus,
            memory_bytes: task.memory_mb.saturating_mul(BYTES_PER_MB),
        };

        for instance in 0..task.instances {
            let container_id = match self.runtime.create_container(&spec).await {
                Ok(id) => id,
                Err(err) => {
                    tracing::error!(
                        task = %task.id,
                        instance,
                        error = %err,
                        "error creating container, abandoning remaining instances"
                    );
                    return;
                }
            };

            if let Err(err) = self.runtime.start_container(&container_id).await {
                tracing::error!(
                    task = %task.id,
                    container = %container_id,
                    instance,
                    error = %err,
                    "error starting container, abandoning remaining instances"
                );
                return;
            }

            tracing::info!(
                host = %task.host,
                container = %container_id,
                image = %task.image,
                "started container"
            );
        }
    }

    async fn stop(&self, task: &Task) {
        let lease = TaskLease::new(self.repository.clone(), &task.id);

        if let Some(container_id) = target(task) {
            tracing::info!(host = %task.host, container = %container_id, "stopping container");
            if let Err(err) = self.runtime.stop_container(container_id, self.grace).await {
                tracing::error!(container = %container_id, error = %err, "error stopping container");
            }
        }

        lease.release().await;
    }

    async fn restart(&self, task: &Task) {
        let lease = TaskLease::new(self.repository.clone(), &task.id);

        if let Some(container_id) = target(task) {
            tracing::info!(host = %task.host, container = %container_id, "restarting container");
            if let Err(err) = self.runtime.restart_container(container_id, self.grace).await {
                tracing::error!(container = %container_id, error = %err, "error restarting container");
            }
        }

        lease.release().await;
    }

    async fn destroy(&self, task: &Task) {
        let lease = TaskLease::new(self.repository.clone(), &task.id);

        if let Some(container_id) = target(task) {
            tracing::info!(host = %task.host, container = %container_id, "destroying container");
            match self.runtime.kill_container(container_id).await {
                Ok(()) => {
                    if let Err(err) = self.runtime.remove_container(container_id).await {
                        tracing::error!(container = %container_id, error = %err, "error removing container");
                    }
                }
                Err(err) => {
                    tracing::error!(container = %container_id, error = %err, "error killing container");
                }
            }
        }

        lease.release().await;
    }
}

fn target(task: &Task) -> Option<&str> {
    let id = task.container_id.as_deref().filter(|id| !id.is_empty());
    if id.is_none() {
        tracing::error!(task = %task.id, command = %task.command, "task has no container id");
    }
    id
}
