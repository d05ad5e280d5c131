use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bollard::{
    API_DEFAULT_VERSION, Docker,
    container::{
        Config, CreateContainerOptions, InspectContainerOptions, KillContainerOptions,
        ListContainersOptions, RemoveContainerOptions, RestartContainerOptions,
        StartContainerOptions, StopContainerOptions,
    },
    errors::Error as BollardError,
    image::CreateImageOptions,
    models::HostConfig,
    system::EventsOptions,
};
use futures_util::stream::StreamExt;
use tokio::sync::mpsc::UnboundedSender;

use super::types::{
    ContainerDetails, ContainerRuntime, ContainerSpec, ContainerSummary, RuntimeError,
    RuntimeEvent, RuntimeResult,
};

const CONNECT_TIMEOUT_SECS: u64 = 120;

/// Docker engine reached through bollard.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    client: Docker,
}

fn is_not_found(err: &BollardError) -> bool {
    matches!(
        err,
        BollardError::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

fn map_err(id: &str, err: BollardError) -> RuntimeError {
    if is_not_found(&err) {
        RuntimeError::NotFound(id.to_string())
    } else {
        RuntimeError::Docker(err)
    }
}

impl DockerRuntime {
    /// Connects to `endpoint` (`unix://...` or `tcp://`/`http://...`) and pings it.
    pub async fn connect(endpoint: &str) -> RuntimeResult<Self> {
        let connected = if endpoint.starts_with("unix://") {
            Docker::connect_with_unix(endpoint, CONNECT_TIMEOUT_SECS, API_DEFAULT_VERSION)
        } else {
            Docker::connect_with_http(endpoint, CONNECT_TIMEOUT_SECS, API_DEFAULT_VERSION)
        };

        let client = connected.map_err(|e| RuntimeError::Connect {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        client.ping().await.map_err(|e| RuntimeError::Connect {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { client })
    }

    async fn pull_image(&self, image: &str) -> RuntimeResult<()> {
        tracing::info!(image = %image, "pulling image");

        let mut stream = self.client.create_image(
            Some(CreateImageOptions {
                from_image: image.to_string(),
                ..Default::default()
            }),
            None,
            None,
        );

        while let Some(msg) = stream.next().await {
            let info = msg?;
            if let Some(status) = info.status {
                tracing::debug!(image = %image, status = %status, "pull progress");
            }
        }

        tracing::info!(image = %image, "image pulled");
        Ok(())
    }

    async fn create(&self, spec: &ContainerSpec) -> Result<String, BollardError> {
        let host_config = HostConfig {
            memory: (spec.memory_bytes > 0).then_some(spec.memory_bytes),
            cpu_shares: (spec.cpu_shares > 0).then_some(spec.cpu_shares),
            ..Default::default()
        };

        let config = Config {
            image: Some(spec.image.clone()),
            host_config: Some(host_config),
            ..Default::default()
        };

        let resp = self
            .client
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await?;
        Ok(resp.id)
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_containers(&self, all: bool) -> RuntimeResult<Vec<ContainerSummary>> {
        let options = ListContainersOptions::<String> {
            all,
            ..Default::default()
        };

        let containers = self.client.list_containers(Some(options)).await?;
        Ok(containers
            .into_iter()
            .filter_map(|c| {
                Some(ContainerSummary {
                    id: c.id?,
                    image: c.image.unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> RuntimeResult<ContainerDetails> {
        let info = self
            .client
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_err(id, e))?;

        let host_config = info.host_config.unwrap_or_default();
        let state = info.state.unwrap_or_default();

        Ok(ContainerDetails {
            id: info.id.unwrap_or_else(|| id.to_string()),
            image: info.config.and_then(|c| c.image).unwrap_or_default(),
            cpu_shares: host_config.cpu_shares.unwrap_or(0),
            memory_bytes: host_config.memory.unwrap_or(0),
            running: state.running.unwrap_or(false),
            exit_code: state.exit_code.unwrap_or(0),
        })
    }

    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String> {
        match self.create(spec).await {
            Ok(id) => Ok(id),
            Err(err) if is_not_found(&err) => {
                self.pull_image(&spec.image).await?;
                Ok(self.create(spec).await?)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn start_container(&self, id: &str) -> RuntimeResult<()> {
        self.client
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| map_err(id, e))
    }

    async fn stop_container(&self, id: &str, grace: Duration) -> RuntimeResult<()> {
        let options = StopContainerOptions {
            t: grace.as_secs() as i64,
        };
        self.client
            .stop_container(id, Some(options))
            .await
            .map_err(|e| map_err(id, e))
    }

    async fn restart_container(&self, id: &str, grace: Duration) -> RuntimeResult<()> {
        let options = RestartContainerOptions {
            t: grace.as_secs() as isize,
        };
        self.client
            .restart_container(id, Some(options))
            .await
            .map_err(|e| map_err(id, e))
    }

    async fn kill_container(&self, id: &str) -> RuntimeResult<()> {
        self.client
            .kill_container(id, None::<KillContainerOptions<String>>)
            .await
            .map_err(|e| map_err(id, e))
    }

    async fn remove_container(&self, id: &str) -> RuntimeResult<()> {
        self.client
            .remove_container(id, None::<RemoveContainerOptions>)
            .await
            .map_err(|e| map_err(id, e))
    }

    async fn subscribe_events(&self, sink: UnboundedSender<RuntimeEvent>) -> RuntimeResult<()> {
        let mut filters = HashMap::new();
        filters.insert("type".to_string(), vec!["container".to_string()]);

        let mut stream = self.client.events(Some(EventsOptions::<String> {
            filters,
            ..Default::default()
        }));

        while let Some(msg) = stream.next().await {
            let msg = msg?;
            let Some(action) = msg.action else {
                continue;
            };
            let Some(id) = msg.actor.and_then(|actor| actor.id) else {
                continue;
            };

            if sink.send(RuntimeEvent::new(&action, &id)).is_err() {
                return Ok(());
            }
        }

        Err(RuntimeError::EventsClosed)
    }
}
