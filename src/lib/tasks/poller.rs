use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::handlers::TaskDispatcher;
use crate::lib::repository::types::{Repository, RepositoryResult};

/// Reads the shared task queue on a fixed interval and hands this host's
/// tasks to the dispatcher.
pub struct TaskPoller {
    host_id: String,
    repository: Arc<dyn Repository>,
    dispatcher: TaskDispatcher,
    interval: Duration,
}

impl TaskPoller {
    pub fn new(
        host_id: &str,
        repository: Arc<dyn Repository>,
        dispatcher: TaskDispatcher,
        interval: Duration,
    ) -> Self {
        Self {
            host_id: host_id.to_string(),
            repository,
            dispatcher,
            interval,
        }
    }

    /// Polls until fetching the queue fails; that failure is returned.
    pub async fn run(&self) -> RepositoryResult<()> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            // handlers are detached; nothing waits for them
            drop(self.poll_once().await?);
        }
    }

    /// One pass over the queue. Every task addressed to this host gets its own
    /// spawned handler, even one still being handled from an earlier pass.
    pub async fn poll_once(&self) -> RepositoryResult<Vec<JoinHandle<()>>> {
        let tasks = self.repository.fetch_tasks().await?;

        Ok(tasks
            .into_iter()
            .filter(|task| task.is_for(&self.host_id))
            .map(|task| {
                let dispatcher = self.dispatcher.clone();
                tokio::spawn(async move { dispatcher.dispatch(task).await })
            })
            .collect())
    }
}
