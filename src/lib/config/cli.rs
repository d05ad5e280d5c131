use std::time::Duration;

use clap::Parser;

use super::types::{AgentConfig, ConfigError, ConfigResult};
use crate::lib::host::machine::machine_id;
use crate::lib::host::types::{Host, HostResult};

#[derive(Parser, Debug, Clone)]
#[command(name = "cube-agent", about = "Run the host agent and connect it to the cluster")]
pub struct Cli {
    /// Host id (default: detected from the machine id)
    #[arg(long, env = "CUBE_HOST_ID")]
    pub host_id: Option<String>,

    /// Region where the host is running
    #[arg(long, env = "CUBE_REGION")]
    pub region: Option<String>,

    /// External ip address for the host
    #[arg(long, env = "CUBE_ADDR")]
    pub addr: Option<String>,

    /// Docker endpoint
    #[arg(long, env = "CUBE_DOCKER", default_value = "unix:///var/run/docker.sock")]
    pub docker: String,

    /// Number of cpus available to the host
    #[arg(long, env = "CUBE_CPUS", allow_negative_numbers = true)]
    pub cpus: Option<i64>,

    /// Megabytes of memory available to the host
    #[arg(long, env = "CUBE_MEMORY", allow_negative_numbers = true)]
    pub memory: Option<i64>,

    /// Status listener address
    #[arg(short, long, env = "CUBE_LISTEN", default_value = "0.0.0.0:8787")]
    pub listen: String,

    /// Comma separated etcd machine urls
    #[arg(
        long,
        env = "CUBE_ETCD_MACHINES",
        value_delimiter = ',',
        default_value = "http://127.0.0.1:4001"
    )]
    pub etcd_machines: Vec<String>,

    /// Key prefix for every record in etcd
    #[arg(long, env = "CUBE_NAMESPACE", default_value = "cube")]
    pub namespace: String,

    /// Milliseconds between task queue polls
    #[arg(long, env = "CUBE_POLL_INTERVAL_MS", default_value_t = 2000)]
    pub poll_interval_ms: u64,

    /// Seconds a stop or restart waits before killing the container
    #[arg(long, env = "CUBE_GRACE_SECS", default_value_t = 10)]
    pub grace_secs: u64,

    /// Emit logs as JSON
    #[arg(long, env = "CUBE_JSON_LOGS")]
    pub json_logs: bool,
}

impl Cli {
    pub fn resolve(self) -> ConfigResult<AgentConfig> {
        self.resolve_with(machine_id)
    }

    /// Same as [`Cli::resolve`] with the machine id lookup supplied by the caller.
    pub fn resolve_with(
        self,
        detect_id: impl FnOnce() -> HostResult<String>,
    ) -> ConfigResult<AgentConfig> {
        let id = match self.host_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => id,
            None => detect_id()?,
        };

        let cpus = self.cpus.filter(|c| *c >= 1).ok_or(ConfigError::Missing("cpus"))?;
        let memory = self
            .memory
            .filter(|m| *m >= 1)
            .ok_or(ConfigError::Missing("memory"))?;
        let addr = self
            .addr
            .filter(|a| !a.trim().is_empty())
            .ok_or(ConfigError::Missing("addr"))?;
        let region = self
            .region
            .filter(|r| !r.trim().is_empty())
            .ok_or(ConfigError::Missing("region"))?;

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::PollInterval);
        }

        Ok(AgentConfig {
            host: Host {
                id,
                region,
                addr,
                cpus,
                memory,
            },
            docker: self.docker,
            listen: self.listen,
            etcd_machines: self.etcd_machines,
            namespace: self.namespace,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            grace: Duration::from_secs(self.grace_secs),
            json_logs: self.json_logs,
        })
    }
}
