use serde::{Deserialize, Serialize};

/// A unit of scheduler-issued work addressed to one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub command: String,
    pub host: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub cpus: i64,
    #[serde(default, rename = "memory")]
    pub memory_mb: i64,
    #[serde(default)]
    pub instances: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskCommand {
    Run,
    Stop,
    Restart,
    Destroy,
    Unknown(String),
}

impl From<&str> for TaskCommand {
    fn from(command: &str) -> Self {
        match command {
            "run" => TaskCommand::Run,
            "stop" => TaskCommand::Stop,
            "restart" => TaskCommand::Restart,
            "destroy" => TaskCommand::Destroy,
            other => TaskCommand::Unknown(other.to_string()),
        }
    }
}

impl Task {
    pub fn command(&self) -> TaskCommand {
        TaskCommand::from(self.command.as_str())
    }

    pub fn is_for(&self, host_id: &str) -> bool {
        self.host == host_id
    }
}
