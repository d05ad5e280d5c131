use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::types::{
    ContainerDetails, ContainerRuntime, ContainerSpec, ContainerSummary, RuntimeError,
    RuntimeEvent, RuntimeResult,
};
use crate::lib::repository::memory::MemoryRepository;

/// Scriptable in-memory runtime for tests.
pub struct FakeRuntime {
    containers: Mutex<BTreeMap<String, ContainerDetails>>,
    calls: Mutex<Vec<String>>,
    next_id: Mutex<usize>,
    fail_start_call: Mutex<Option<usize>>,
    start_calls: Mutex<usize>,
    failing: Mutex<HashSet<&'static str>>,
    fail_inspect: Mutex<HashSet<String>>,
    listed_images: Mutex<HashMap<String, String>>,
    watched_task: Mutex<Option<(Arc<MemoryRepository>, String)>>,
    task_at_create: Mutex<Vec<bool>>,
    events_tx: Mutex<Option<UnboundedSender<RuntimeEvent>>>,
    events_rx: Mutex<Option<UnboundedReceiver<RuntimeEvent>>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            containers: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            next_id: Mutex::new(0),
            fail_start_call: Mutex::new(None),
            start_calls: Mutex::new(0),
            failing: Mutex::new(HashSet::new()),
            fail_inspect: Mutex::new(HashSet::new()),
            listed_images: Mutex::new(HashMap::new()),
            watched_task: Mutex::new(None),
            task_at_create: Mutex::new(Vec::new()),
            events_tx: Mutex::new(Some(tx)),
            events_rx: Mutex::new(Some(rx)),
        }
    }

    pub fn add_container(&self, id: &str, image: &str, running: bool, memory_bytes: i64) {
        self.containers.lock().unwrap().insert(
            id.to_string(),
            ContainerDetails {
                id: id.to_string(),
                image: image.to_string(),
                cpu_shares: 512,
                memory_bytes,
                running,
                exit_code: if running { 0 } else { 137 },
            },
        );
    }

    /// Makes listings report `image` for `id` while inspect keeps the original.
    pub fn set_listed_image(&self, id: &str, image: &str) {
        self.listed_images
            .lock()
            .unwrap()
            .insert(id.to_string(), image.to_string());
    }

    /// Records, on every create call, whether `task_id` is still in `repo`.
    pub fn watch_task(&self, repo: Arc<MemoryRepository>, task_id: &str) {
        *self.watched_task.lock().unwrap() = Some((repo, task_id.to_string()));
    }

    pub fn task_present_at_create(&self) -> Vec<bool> {
        self.task_at_create.lock().unwrap().clone()
    }

    pub fn container(&self, id: &str) -> Option<ContainerDetails> {
        self.containers.lock().unwrap().get(id).cloned()
    }

    pub fn containers(&self) -> Vec<ContainerDetails> {
        self.containers.lock().unwrap().values().cloned().collect()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Makes the `n`th start call (1-based) fail.
    pub fn fail_start_call(&self, n: usize) {
        *self.fail_start_call.lock().unwrap() = Some(n);
    }

    /// Makes every call of `op` ("create", "stop", "restart", "kill", "remove", "list") fail.
    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn fail_inspect(&self, id: &str) {
        self.fail_inspect.lock().unwrap().insert(id.to_string());
    }

    pub fn emit(&self, action: &str, id: &str) {
        if let Some(tx) = self.events_tx.lock().unwrap().as_ref() {
            let _ = tx.send(RuntimeEvent::new(action, id));
        }
    }

    /// Ends the event stream once queued events are delivered.
    pub fn close_events(&self) {
        self.events_tx.lock().unwrap().take();
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, op: &'static str) -> RuntimeResult<()> {
        if self.failing.lock().unwrap().contains(op) {
            return Err(RuntimeError::Other(format!("{op} failed")));
        }
        Ok(())
    }

    fn set_running(&self, id: &str, running: bool, exit_code: i64) -> RuntimeResult<()> {
        let mut containers = self.containers.lock().unwrap();
        let container = containers
            .get_mut(id)
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))?;
        container.running = running;
        container.exit_code = exit_code;
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn list_containers(&self, all: bool) -> RuntimeResult<Vec<ContainerSummary>> {
        self.check("list")?;
        let listed = self.listed_images.lock().unwrap();
        Ok(self
            .containers
            .lock()
            .unwrap()
            .values()
            .filter(|c| all || c.running)
            .map(|c| ContainerSummary {
                id: c.id.clone(),
                image: listed.get(&c.id).unwrap_or(&c.image).clone(),
            })
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> RuntimeResult<ContainerDetails> {
        if self.fail_inspect.lock().unwrap().contains(id) {
            return Err(RuntimeError::Other(format!("inspect {id} failed")));
        }
        self.container(id)
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))
    }

    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String> {
        self.record(format!("create {}", spec.image));
        if let Some((repo, task_id)) = self.watched_task.lock().unwrap().as_ref() {
            let present = repo.has_task(task_id);
            self.task_at_create.lock().unwrap().push(present);
        }
        self.check("create")?;

        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            format!("c{}", *next)
        };
        self.containers.lock().unwrap().insert(
            id.clone(),
            ContainerDetails {
                id: id.clone(),
                image: spec.image.clone(),
                cpu_shares: spec.cpu_shares,
                memory_bytes: spec.memory_bytes,
                running: false,
                exit_code: 0,
            },
        );
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> RuntimeResult<()> {
        self.record(format!("start {id}"));
        let call = {
            let mut calls = self.start_calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        if *self.fail_start_call.lock().unwrap() == Some(call) {
            return Err(RuntimeError::Other(format!("start {id} failed")));
        }
        self.set_running(id, true, 0)
    }

    async fn stop_container(&self, id: &str, grace: Duration) -> RuntimeResult<()> {
        self.record(format!("stop {id} {}", grace.as_secs()));
        self.check("stop")?;
        self.set_running(id, false, 0)
    }

    async fn restart_container(&self, id: &str, grace: Duration) -> RuntimeResult<()> {
        self.record(format!("restart {id} {}", grace.as_secs()));
        self.check("restart")?;
        self.set_running(id, true, 0)
    }

    async fn kill_container(&self, id: &str) -> RuntimeResult<()> {
        self.record(format!("kill {id}"));
        self.check("kill")?;
        self.set_running(id, false, 137)
    }

    async fn remove_container(&self, id: &str) -> RuntimeResult<()> {
        self.record(format!("remove {id}"));
        self.check("remove")?;
        self.containers
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))
    }

    async fn subscribe_events(&self, sink: UnboundedSender<RuntimeEvent>) -> RuntimeResult<()> {
        let rx = self.events_rx.lock().unwrap().take();
        let Some(mut rx) = rx else {
            return Err(RuntimeError::EventsClosed);
        };

        while let Some(event) = rx.recv().await {
            if sink.send(event).is_err() {
                return Ok(());
            }
        }
        Err(RuntimeError::EventsClosed)
    }
}
