use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::types::{Repository, RepositoryError, RepositoryResult};
use crate::lib::containers::types::Container;
use crate::lib::host::types::Host;
use crate::lib::tasks::types::Task;

/// Repository backed by the etcd v2 keys API.
///
/// Records are stored as JSON string values:
///
/// ```text
/// /<namespace>/hosts/<host id>
/// /<namespace>/containers/<host id>/<container id>
/// /<namespace>/tasks/<task id>
/// ```
#[derive(Debug, Clone)]
pub struct EtcdRepository {
    client: Client,
    machines: Vec<String>,
    namespace: String,
}

#[derive(Debug, Deserialize)]
struct KeysResponse {
    node: Option<Node>,
}

#[derive(Debug, Default, Deserialize)]
struct Node {
    key: String,
    value: Option<String>,
    #[serde(default)]
    nodes: Vec<Node>,
}

#[derive(Debug, Deserialize)]
struct KeysError {
    message: String,
}

impl EtcdRepository {
    pub fn new(machines: Vec<String>, namespace: &str) -> Self {
        Self {
            client: Client::new(),
            machines: machines
                .into_iter()
                .map(|m| m.trim().trim_end_matches('/').to_string())
                .filter(|m| !m.is_empty())
                .collect(),
            namespace: namespace.trim_matches('/').to_string(),
        }
    }

    fn key(&self, parts: &[&str]) -> String {
        let mut key = format!("/{}", self.namespace);
        for part in parts {
            key.push('/');
            key.push_str(part);
        }
        key
    }

    /// Sends the request to each machine in turn until one answers.
    async fn request(
        &self,
        method: Method,
        key: &str,
        query: &[(&str, &str)],
        value: Option<&str>,
    ) -> RepositoryResult<Response> {
        let mut last_err = None;

        for machine in &self.machines {
            let url = format!("{}/v2/keys{}", machine, key);
            let mut req = self.client.request(method.clone(), &url).query(query);
            if let Some(value) = value {
                req = req.form(&[("value", value)]);
            }

            match req.send().await {
                Ok(resp) => return Ok(resp),
                Err(err) if err.is_connect() || err.is_timeout() => {
                    tracing::warn!(machine = %machine, error = %err, "repository machine unreachable");
                    last_err = Some(err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(last_err.map_or(RepositoryError::NoMachines, RepositoryError::from))
    }

    async fn put<T: serde::Serialize>(&self, key: &str, record: &T) -> RepositoryResult<()> {
        let value = serde_json::to_string(record)?;
        let resp = self.request(Method::PUT, key, &[], Some(&value)).await?;
        check(resp, key, false).await.map(|_| ())
    }

    async fn delete(&self, key: &str, recursive: bool) -> RepositoryResult<()> {
        let query: &[(&str, &str)] = if recursive {
            &[("recursive", "true")]
        } else {
            &[]
        };
        let resp = self.request(Method::DELETE, key, query, None).await?;
        check(resp, key, true).await.map(|_| ())
    }

    async fn list<T: DeserializeOwned>(&self, key: &str) -> RepositoryResult<Vec<T>> {
        let resp = self
            .request(Method::GET, key, &[("recursive", "true")], None)
            .await?;
        match check(resp, key, true).await? {
            Some(resp) => {
                let body: KeysResponse = resp.json().await?;
                records(body.node.unwrap_or_default())
            }
            None => Ok(Vec::new()),
        }
    }
}

/// Maps a response to `Some` on success and `None` on an allowed 404.
async fn check(resp: Response, key: &str, missing_ok: bool) -> RepositoryResult<Option<Response>> {
    let status = resp.status();
    if status.is_success() {
        return Ok(Some(resp));
    }
    if status == StatusCode::NOT_FOUND && missing_ok {
        return Ok(None);
    }

    let message = match resp.json::<KeysError>().await {
        Ok(body) => body.message,
        Err(_) => status.canonical_reason().unwrap_or("unknown").to_string(),
    };
    Err(RepositoryError::Store {
        status: status.as_u16(),
        key: key.to_string(),
        message,
    })
}

/// Decodes every leaf value below `node`, depth first.
fn records<T: DeserializeOwned>(node: Node) -> RepositoryResult<Vec<T>> {
    let mut out = Vec::new();
    let mut stack = vec![node];

    while let Some(node) = stack.pop() {
        if let Some(value) = &node.value {
            let record = serde_json::from_str(value).map_err(|source| RepositoryError::Decode {
                key: node.key.clone(),
                source,
            })?;
            out.push(record);
        }
        stack.extend(node.nodes.into_iter().rev());
    }

    Ok(out)
}

#[async_trait]
impl Repository for EtcdRepository {
    async fn save_host(&self, host: &Host) -> RepositoryResult<()> {
        self.put(&self.key(&["hosts", &host.id]), host).await
    }

    async fn delete_host(&self, host_id: &str) -> RepositoryResult<()> {
        self.delete(&self.key(&["hosts", host_id]), false).await
    }

    async fn save_container(&self, container: &Container) -> RepositoryResult<()> {
        let key = self.key(&["containers", &container.host_id, &container.id]);
        self.put(&key, container).await
    }

    async fn delete_container(&self, host_id: &str, container_id: &str) -> RepositoryResult<()> {
        self.delete(&self.key(&["containers", host_id, container_id]), false)
            .await
    }

    async fn delete_host_containers(&self, host_id: &str) -> RepositoryResult<()> {
        self.delete(&self.key(&["containers", host_id]), true).await
    }

    async fn fetch_tasks(&self) -> RepositoryResult<Vec<Task>> {
        self.list(&self.key(&["tasks"])).await
    }

    async fn delete_task(&self, task_id: &str) -> RepositoryResult<()> {
        self.delete(&self.key(&["tasks", task_id]), false).await
    }
}
