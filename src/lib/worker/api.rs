use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use sysinfo::System;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use super::activity::Activity;
use super::stats::sample;
use super::types::AgentStats;
use crate::lib::host::types::Host;

/// Read-only view of this host over HTTP.
pub struct StatusServer {
    host: Host,
    address: String,
    activity: Arc<Activity>,
}

#[derive(Clone)]
struct StatusState {
    host: Arc<Host>,
    system: Arc<Mutex<System>>,
    activity: Arc<Activity>,
}

async fn get_host(State(state): State<StatusState>) -> Json<Host> {
    Json(state.host.as_ref().clone())
}

async fn get_stats(State(state): State<StatusState>) -> Json<AgentStats> {
    let system = {
        let mut system = state.system.lock().await;
        system.refresh_cpu_usage();
        system.refresh_memory();
        sample(&system)
    };
    Json(AgentStats {
        host_id: state.host.id.clone(),
        system,
        activity: state.activity.snapshot(),
    })
}

impl StatusServer {
    pub fn new(host: Host, address: &str, activity: Arc<Activity>) -> Self {
        Self {
            host,
            address: address.to_string(),
            activity,
        }
    }

    fn router(self) -> Router {
        let state = StatusState {
            host: Arc::new(self.host),
            system: Arc::new(Mutex::new(System::new_all())),
            activity: self.activity,
        };

        Router::new()
            .route("/host", get(get_host))
            .route("/stats", get(get_stats))
            .with_state(state)
    }

    pub async fn serve(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(&self.address).await?;
        tracing::info!(addr = %self.address, "status listener started");

        axum::serve(listener, self.router()).await
    }
}
