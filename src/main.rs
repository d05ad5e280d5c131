use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::lib::{
    config::{cli::Cli, types::AgentConfig},
    repository::etcd::EtcdRepository,
    runtime::docker::DockerRuntime,
    worker::types::{Worker, WorkerSettings},
};

mod lib {
    pub mod config;
    pub mod containers;
    pub mod events;
    pub mod host;
    pub mod repository;
    pub mod runtime;
    pub mod tasks;
    pub mod worker;
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Resolves when the process is asked to stop (ctrl-c, SIGTERM or SIGQUIT).
async fn wait_for_interrupt() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (Ok(mut term), Ok(mut quit)) = (
            signal(SignalKind::terminate()),
            signal(SignalKind::quit()),
        ) else {
            let _ = tokio::signal::ctrl_c().await;
            return;
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
            _ = quit.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let config: AgentConfig = cli.resolve().context("invalid configuration")?;

    let repository = Arc::new(EtcdRepository::new(
        config.etcd_machines.clone(),
        &config.namespace,
    ));
    let runtime = Arc::new(
        DockerRuntime::connect(&config.docker)
            .await
            .context("unable to connect to docker")?,
    );

    let worker = Worker::new(
        config.host,
        repository,
        runtime,
        WorkerSettings {
            poll_interval: config.poll_interval,
            grace: config.grace,
            listen: Some(config.listen),
        },
    );

    if let Err(err) = worker.run(wait_for_interrupt()).await {
        tracing::error!(error = %err, "agent stopped");
        return Err(err.into());
    }

    Ok(())
}
