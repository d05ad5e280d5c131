use std::future::Future;
use std::sync::Arc;

use super::activity::Activity;
use super::api::StatusServer;
use super::types::{Worker, WorkerError, WorkerResult, WorkerSettings};
use crate::lib::containers::sync::Synchronizer;
use crate::lib::events::listener::EventListener;
use crate::lib::host::lifecycle::HostLifecycle;
use crate::lib::host::types::Host;
use crate::lib::repository::types::Repository;
use crate::lib::runtime::types::{ContainerRuntime, RuntimeError};
use crate::lib::tasks::handlers::TaskDispatcher;
use crate::lib::tasks::poller::TaskPoller;

impl Worker {
    pub fn new(
        host: Host,
        repository: Arc<dyn Repository>,
        runtime: Arc<dyn ContainerRuntime>,
        settings: WorkerSettings,
    ) -> Self {
        let activity = Arc::new(Activity::default());
        let synchronizer = Synchronizer::new(&host.id, repository.clone(), runtime.clone())
            .with_activity(activity.clone());
        let dispatcher = TaskDispatcher::new(repository.clone(), runtime.clone(), settings.grace)
            .with_activity(activity.clone());

        Worker {
            lifecycle: HostLifecycle::new(repository.clone()),
            listener: EventListener::new(runtime, synchronizer.clone()),
            poller: TaskPoller::new(&host.id, repository, dispatcher, settings.poll_interval),
            synchronizer,
            activity,
            listen: settings.listen,
            host,
        }
    }

    /// Registers the host and loads its containers. Both are fatal on failure.
    pub async fn start(&self) -> WorkerResult<()> {
        tracing::info!(host = %self.host.id, "starting agent");
        self.lifecycle.register(&self.host).await?;

        let loaded = self.synchronizer.resync().await?;
        tracing::info!(host = %self.host.id, containers = loaded, "containers loaded");
        Ok(())
    }

    /// Runs the event listener and task poller until one of them fails or
    /// `shutdown` resolves. On shutdown the host is deregistered; handlers
    /// still in flight are not waited for.
    pub async fn serve(&self, shutdown: impl Future<Output = ()>) -> WorkerResult<()> {
        if let Some(addr) = &self.listen {
            let server = StatusServer::new(self.host.clone(), addr, self.activity.clone());
            tokio::spawn(async move {
                if let Err(err) = server.serve().await {
                    tracing::error!(error = %err, "status listener failed");
                }
            });
        }

        tokio::select! {
            res = self.poller.run() => res.map_err(WorkerError::Poll),
            res = self.listener.run() => {
                Err(WorkerError::Events(res.err().unwrap_or(RuntimeError::EventsClosed)))
            }
            _ = shutdown => {
                self.stop().await;
                Ok(())
            }
        }
    }

    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> WorkerResult<()> {
        self.start().await?;
        self.serve(shutdown).await
    }

    pub async fn stop(&self) {
        tracing::info!(host = %self.host.id, "stopping agent");
        if let Err(err) = self.lifecycle.deregister(&self.host.id).await {
            tracing::error!(error = %err, "unable to remove host from repository");
        }
    }
}
