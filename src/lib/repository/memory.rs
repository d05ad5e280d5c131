use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::types::{Repository, RepositoryError, RepositoryResult};
use crate::lib::containers::types::Container;
use crate::lib::host::types::Host;
use crate::lib::tasks::types::Task;

/// In-process repository used by the agent's tests.
#[derive(Default)]
pub struct MemoryRepository {
    hosts: Mutex<HashMap<String, Host>>,
    containers: Mutex<HashMap<String, BTreeMap<String, Container>>>,
    tasks: Mutex<BTreeMap<String, Task>>,
    fail_fetch: AtomicBool,
    fail_save_container: AtomicBool,
    fail_save_host: AtomicBool,
}

fn unavailable(key: &str) -> RepositoryError {
    RepositoryError::Store {
        status: 503,
        key: key.to_string(),
        message: "unavailable".to_string(),
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_task(&self, task: Task) {
        self.tasks.lock().unwrap().insert(task.id.clone(), task);
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().values().cloned().collect()
    }

    pub fn has_task(&self, task_id: &str) -> bool {
        self.tasks.lock().unwrap().contains_key(task_id)
    }

    pub fn host(&self, host_id: &str) -> Option<Host> {
        self.hosts.lock().unwrap().get(host_id).cloned()
    }

    /// Container records for a host, ordered by container id.
    pub fn containers(&self, host_id: &str) -> Vec<Container> {
        self.containers
            .lock()
            .unwrap()
            .get(host_id)
            .map(|by_id| by_id.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_save_container(&self, fail: bool) {
        self.fail_save_container.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_save_host(&self, fail: bool) {
        self.fail_save_host.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn save_host(&self, host: &Host) -> RepositoryResult<()> {
        if self.fail_save_host.load(Ordering::SeqCst) {
            return Err(unavailable("hosts"));
        }
        self.hosts
            .lock()
            .unwrap()
            .insert(host.id.clone(), host.clone());
        Ok(())
    }

    async fn delete_host(&self, host_id: &str) -> RepositoryResult<()> {
        self.hosts.lock().unwrap().remove(host_id);
        Ok(())
    }

    async fn save_container(&self, container: &Container) -> RepositoryResult<()> {
        if self.fail_save_container.load(Ordering::SeqCst) {
            return Err(unavailable("containers"));
        }
        self.containers
            .lock()
            .unwrap()
            .entry(container.host_id.clone())
            .or_default()
            .insert(container.id.clone(), container.clone());
        Ok(())
    }

    async fn delete_container(&self, host_id: &str, container_id: &str) -> RepositoryResult<()> {
        if let Some(by_id) = self.containers.lock().unwrap().get_mut(host_id) {
            by_id.remove(container_id);
        }
        Ok(())
    }

    async fn delete_host_containers(&self, host_id: &str) -> RepositoryResult<()> {
        self.containers.lock().unwrap().remove(host_id);
        Ok(())
    }

    async fn fetch_tasks(&self) -> RepositoryResult<Vec<Task>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(unavailable("tasks"));
        }
        Ok(self.tasks())
    }

    async fn delete_task(&self, task_id: &str) -> RepositoryResult<()> {
        self.tasks.lock().unwrap().remove(task_id);
        Ok(())
    }
}
