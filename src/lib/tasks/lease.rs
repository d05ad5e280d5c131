use std::sync::Arc;

use crate::lib::repository::types::Repository;

/// Obligation to delete a task record once its handler is done with it.
///
/// `release` deletes the record. A lease dropped without being released
/// (a handler that panicked, for one) schedules the deletion on the current
/// tokio runtime instead. Either way the delete is issued exactly once.
pub struct TaskLease {
    repository: Arc<dyn Repository>,
    task_id: String,
    released: bool,
}

impl TaskLease {
    pub fn new(repository: Arc<dyn Repository>, task_id: &str) -> Self {
        Self {
            repository,
            task_id: task_id.to_string(),
            released: false,
        }
    }

    pub async fn release(mut self) {
        self.released = true;
        delete_task(self.repository.as_ref(), &self.task_id).await;
    }
}

impl Drop for TaskLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let repository = self.repository.clone();
        let task_id = std::mem::take(&mut self.task_id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    delete_task(repository.as_ref(), &task_id).await;
                });
            }
            Err(_) => {
                tracing::warn!(task = %task_id, "no runtime available, task record left in place");
            }
        }
    }
}

async fn delete_task(repository: &dyn Repository, task_id: &str) {
    match repository.delete_task(task_id).await {
        Ok(()) => tracing::debug!(task = %task_id, "task removed"),
        Err(err) => tracing::error!(task = %task_id, error = %err, "unable to delete task"),
    }
}
