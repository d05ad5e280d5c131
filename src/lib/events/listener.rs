use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::mpsc::error::TryRecvError;

use crate::lib::containers::sync::Synchronizer;
use crate::lib::runtime::types::{ContainerRuntime, RuntimeError, RuntimeEvent, RuntimeResult};

/// Keeps the repository in step with runtime events.
///
/// A forwarder task drains the runtime's event stream into a channel so a
/// slow resync never holds up delivery. The consumer handles events in
/// arrival order: `destroy` drops one record, anything else triggers a full
/// resync. A run of queued non-destroy events collapses into one resync.
pub struct EventListener {
    runtime: Arc<dyn ContainerRuntime>,
    synchronizer: Synchronizer,
}

/// What the consumer does for one step.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    Forget(String),
    Resync { coalesced: usize },
}

impl EventListener {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, synchronizer: Synchronizer) -> Self {
        Self {
            runtime,
            synchronizer,
        }
    }

    /// Runs until the runtime's event stream ends, which is returned as an error.
    ///
    /// The end of the stream stops the agent, even though no cluster operation
    /// failed. Without events the container records would silently go stale.
    pub async fn run(&self) -> RuntimeResult<()> {
        let (tx, rx) = mpsc::unbounded_channel();

        let runtime = self.runtime.clone();
        let forwarder = tokio::spawn(async move { runtime.subscribe_events(tx).await });

        self.consume(rx).await;

        match forwarder.await {
            Ok(Ok(())) => Err(RuntimeError::EventsClosed),
            Ok(Err(err)) => Err(err),
            Err(join_err) => Err(RuntimeError::Other(format!(
                "event forwarder failed: {join_err}"
            ))),
        }
    }

    async fn consume(&self, mut rx: UnboundedReceiver<RuntimeEvent>) {
        let mut held: Option<RuntimeEvent> = None;

        loop {
            let event = match held.take() {
                Some(event) => event,
                None => match rx.recv().await {
                    Some(event) => event,
                    None => return,
                },
            };

            match next_action(event, &mut rx, &mut held) {
                Action::Forget(container_id) => {
                    tracing::debug!(container = %container_id, "container destroyed");
                    self.synchronizer.forget(&container_id).await;
                }
                Action::Resync { coalesced } => {
                    tracing::debug!(events = coalesced, "runtime state changed, resyncing");
                    if let Err(err) = self.synchronizer.resync().await {
                        tracing::error!(error = %err, "unable to synchronize containers");
                    }
                }
            }
        }
    }
}

/// Decides how to handle `event`, folding any immediately queued non-destroy
/// events into the same resync. The first destroy seen while folding is held
/// back for the next step so ordering is preserved.
fn next_action(
    event: RuntimeEvent,
    rx: &mut UnboundedReceiver<RuntimeEvent>,
    held: &mut Option<RuntimeEvent>,
) -> Action {
    if event.is_destroy() {
        return Action::Forget(event.container_id);
    }

    let mut coalesced = 1;
    loop {
        match rx.try_recv() {
            Ok(next) if next.is_destroy() => {
                *held = Some(next);
                break;
            }
            Ok(_) => coalesced += 1,
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
        }
    }
    Action::Resync { coalesced }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lib::repository::memory::MemoryRepository;
    use crate::lib::runtime::fake::FakeRuntime;
    use pretty_assertions::assert_eq;

    fn setup() -> (Arc<MemoryRepository>, Arc<FakeRuntime>, EventListener) {
        let repo = Arc::new(MemoryRepository::new());
        let runtime = Arc::new(FakeRuntime::new());
        let sync = Synchronizer::new("h1", repo.clone(), runtime.clone());
        let listener = EventListener::new(runtime.clone(), sync);
        (repo, runtime, listener)
    }

    fn ids(repo: &MemoryRepository) -> Vec<String> {
        repo.containers("h1").into_iter().map(|c| c.id).collect()
    }

    #[test]
    fn folds_queued_changes_but_not_destroys() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(RuntimeEvent::new("start", "b")).unwrap();
        tx.send(RuntimeEvent::new("die", "c")).unwrap();
        tx.send(RuntimeEvent::new("destroy", "d")).unwrap();
        tx.send(RuntimeEvent::new("start", "e")).unwrap();

        let mut held = None;
        let action = next_action(RuntimeEvent::new("create", "a"), &mut rx, &mut held);

        assert_eq!(action, Action::Resync { coalesced: 3 });
        assert_eq!(held, Some(RuntimeEvent::new("destroy", "d")));
        assert_eq!(rx.try_recv().unwrap(), RuntimeEvent::new("start", "e"));
    }

    #[test]
    fn destroy_is_targeted() {
        let (_tx, mut rx) = mpsc::unbounded_channel();
        let mut held = None;

        let action = next_action(RuntimeEvent::new("destroy", "a"), &mut rx, &mut held);

        assert_eq!(action, Action::Forget("a".to_string()));
        assert!(held.is_none());
    }

    #[tokio::test]
    async fn events_drive_repository() {
        let (repo, runtime, listener) = setup();
        runtime.add_container("a", "web", true, 0);
        runtime.add_container("b", "web", true, 0);
        runtime.emit("start", "a");
        runtime.close_events();

        let err = listener.run().await.unwrap_err();

        assert!(matches!(err, RuntimeError::EventsClosed));
        assert_eq!(ids(&repo), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn destroy_event_removes_only_its_record() {
        let (repo, runtime, listener) = setup();
        runtime.add_container("a", "web", true, 0);
        runtime.add_container("b", "web", true, 0);
        runtime.emit("create", "a");
        runtime.emit("destroy", "a");
        runtime.close_events();

        let _ = listener.run().await;

        assert_eq!(ids(&repo), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn resync_failure_does_not_stop_listener() {
        let (repo, runtime, listener) = setup();
        runtime.add_container("a", "web", true, 0);
        runtime.fail_inspect("a");
        runtime.emit("start", "a");
        runtime.emit("destroy", "zzz");
        runtime.close_events();

        let err = listener.run().await.unwrap_err();

        assert!(matches!(err, RuntimeError::EventsClosed));
        assert!(ids(&repo).is_empty());
    }
}
