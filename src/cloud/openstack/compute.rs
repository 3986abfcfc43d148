//! Nova compute v2 server operations over an `osauth` session

use std::collections::HashSet;

use async_trait::async_trait;
use osauth::services::COMPUTE;
use osauth::Session;
use serde::Deserialize;

use super::template::CreateServerRequest;
use crate::cloud::error::BoxError;

/// Servers requested per listing page
pub const PAGE_SIZE: usize = 100;

/// A server as returned by `GET /servers/detail` and `GET /servers/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub flavor: FlavorRef,
}

/// Flavor reference embedded in a server
///
/// Before microversion 2.47 Nova reports `id`; from 2.47 on it embeds the
/// flavor and reports `original_name` instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FlavorRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
}

impl Server {
    pub fn instance_type(&self) -> Option<&str> {
        self.flavor
            .id
            .as_deref()
            .or(self.flavor.original_name.as_deref())
    }
}

/// The compute calls the node lifecycle needs
#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// One page of servers whose name matches `name`, after `marker`
    async fn list_servers(
        &self,
        name: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Server>, BoxError>;

    /// Boot a server and return its ID
    async fn create_server(&self, request: &CreateServerRequest<'_>) -> Result<String, BoxError>;

    async fn get_server(&self, id: &str) -> Result<Server, BoxError>;

    async fn delete_server(&self, id: &str) -> Result<(), BoxError>;
}

/// Find the first server named exactly `name`, walking every page
///
/// Nova's `name` filter is a pattern match, so candidates are compared
/// exactly here. Stops at the first page with a match and returns `None`
/// only after the last page.
pub async fn find_server_by_name<C>(compute: &C, name: &str) -> Result<Option<Server>, BoxError>
where
    C: ComputeApi + ?Sized,
{
    let mut marker: Option<String> = None;
    let mut seen = HashSet::new();
    let mut pages = 0;

    loop {
        pages += 1;
        let page = compute.list_servers(name, marker.as_deref(), PAGE_SIZE).await?;
        let full = page.len() >= PAGE_SIZE;
        let last = page.last().map(|s| s.id.clone());

        if let Some(server) = page.into_iter().find(|s| s.name == name) {
            tracing::debug!(name, pages, server = %server.id, "Found server");
            return Ok(Some(server));
        }

        match last {
            Some(id) if full => {
                if !seen.insert(id.clone()) {
                    tracing::warn!(name, marker = %id, "Server listing repeats a page, stopping");
                    break;
                }
                marker = Some(id);
            }
            _ => break,
        }
    }

    tracing::debug!(name, pages, "No server with matching name");
    Ok(None)
}

#[derive(Debug, Deserialize)]
struct ServersRoot {
    servers: Vec<Server>,
}

#[derive(Debug, Deserialize)]
struct ServerRoot {
    server: Server,
}

#[derive(Debug, Deserialize)]
struct CreatedServer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CreatedRoot {
    server: CreatedServer,
}

/// Compute client backed by an authenticated session
#[derive(Clone)]
pub struct ComputeClient {
    session: Session,
}

impl ComputeClient {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl ComputeApi for ComputeClient {
    async fn list_servers(
        &self,
        name: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Server>, BoxError> {
        let mut query = vec![("name", name.to_string()), ("limit", limit.to_string())];
        if let Some(marker) = marker {
            query.push(("marker", marker.to_string()));
        }

        let root: ServersRoot = self
            .session
            .get(COMPUTE, &["servers", "detail"])
            .query(&query)
            .fetch()
            .await?;
        Ok(root.servers)
    }

    async fn create_server(&self, request: &CreateServerRequest<'_>) -> Result<String, BoxError> {
        let root: CreatedRoot = self
            .session
            .post(COMPUTE, &["servers"])
            .json(request)
            .fetch()
            .await?;
        Ok(root.server.id)
    }

    async fn get_server(&self, id: &str) -> Result<Server, BoxError> {
        let root: ServerRoot = self.session.get(COMPUTE, &["servers", id]).fetch().await?;
        Ok(root.server)
    }

    async fn delete_server(&self, id: &str) -> Result<(), BoxError> {
        self.session.delete(COMPUTE, &["servers", id]).send().await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct ComputeState {
        pub servers: Vec<Server>,
        pub created: Vec<serde_json::Value>,
        pub deleted: Vec<String>,
        pub list_calls: usize,
        pub next_id: u32,
        pub flavor: String,
        pub fail_list: bool,
        pub fail_create: bool,
        pub fail_get: bool,
        pub fail_delete: bool,
        /// Ignore the marker and hand out the first page every time
        pub repeat_first_page: bool,
    }

    /// In-memory Nova that pages with markers like the real API
    #[derive(Debug, Default)]
    pub struct FakeCompute {
        pub state: Mutex<ComputeState>,
    }

    pub fn server(id: &str, name: &str) -> Server {
        Server {
            id: id.to_string(),
            name: name.to_string(),
            status: "ACTIVE".to_string(),
            flavor: FlavorRef {
                id: Some("m1.small".to_string()),
                original_name: None,
            },
        }
    }

    impl FakeCompute {
        pub fn with_servers(servers: Vec<Server>) -> Self {
            let fake = Self::default();
            {
                let mut state = fake.state.lock().unwrap();
                state.servers = servers;
                state.flavor = "m1.small".to_string();
            }
            fake
        }
    }

    #[async_trait]
    impl ComputeApi for FakeCompute {
        async fn list_servers(
            &self,
            name: &str,
            marker: Option<&str>,
            limit: usize,
        ) -> Result<Vec<Server>, BoxError> {
            let mut state = self.state.lock().unwrap();
            state.list_calls += 1;
            if state.fail_list {
                return Err("compute unavailable".into());
            }

            let matching = state.servers.iter().filter(|s| s.name.contains(name));
            let start = match marker {
                Some(m) if !state.repeat_first_page => state
                    .servers
                    .iter()
                    .filter(|s| s.name.contains(name))
                    .position(|s| s.id == m)
                    .map_or(0, |i| i + 1),
                _ => 0,
            };
            Ok(matching.skip(start).take(limit).cloned().collect())
        }

        async fn create_server(&self, request: &CreateServerRequest<'_>) -> Result<String, BoxError> {
            let mut state = self.state.lock().unwrap();
            if state.fail_create {
                return Err("quota exceeded".into());
            }

            let body = serde_json::to_value(request)?;
            state.next_id += 1;
            let id = format!("srv-{}", state.next_id);
            let name = body["server"]["name"].as_str().unwrap_or_default().to_string();
            let mut created = server(&id, &name);
            created.flavor.id = Some(state.flavor.clone());
            state.servers.push(created);
            state.created.push(body);
            Ok(id)
        }

        async fn get_server(&self, id: &str) -> Result<Server, BoxError> {
            let state = self.state.lock().unwrap();
            if state.fail_get {
                return Err("compute returned 500".into());
            }
            state
                .servers
                .iter()
                .find(|s| s.id == id)
                .cloned()
                .ok_or_else(|| format!("server {} not found", id).into())
        }

        async fn delete_server(&self, id: &str) -> Result<(), BoxError> {
            let mut state = self.state.lock().unwrap();
            if state.fail_delete {
                return Err("server is locked".into());
            }
            state.servers.retain(|s| s.id != id);
            state.deleted.push(id.to_string());
            Ok(())
        }
    }
}
