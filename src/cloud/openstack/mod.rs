//! OpenStack provider: the node lifecycle operations on top of an `osauth`
//! session

pub mod compute;
pub mod template;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use osauth::Session;

use self::compute::{find_server_by_name, ComputeApi, ComputeClient, Server};
use self::template::ServerTemplate;
use super::error::BoxError;
use super::{provider_id, CloudError, CloudProvider, CloudType, NodeInfo};

/// OpenStack API families a service client can be created for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Compute,
}

impl ServiceKind {
    /// Service type as listed in the Keystone catalog
    pub fn service_type(&self) -> &'static str {
        match self {
            ServiceKind::Compute => "compute",
        }
    }
}

impl FromStr for ServiceKind {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compute" => Ok(ServiceKind::Compute),
            other => Err(CloudError::UnsupportedService(other.to_string())),
        }
    }
}

/// Client for one service, sharing the session it was opened from
#[derive(Clone)]
pub enum ServiceClient {
    Compute(Arc<dyn ComputeApi>),
}

impl ServiceClient {
    pub fn kind(&self) -> ServiceKind {
        match self {
            ServiceClient::Compute(_) => ServiceKind::Compute,
        }
    }
}

impl fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServiceClient").field(&self.kind()).finish()
    }
}

/// Opens service clients over an authenticated session
pub trait ServiceConnector: Send + Sync {
    fn connect(&self, service: ServiceKind) -> ServiceClient;
}

impl ServiceConnector for Session {
    fn connect(&self, service: ServiceKind) -> ServiceClient {
        match service {
            ServiceKind::Compute => ServiceClient::Compute(Arc::new(ComputeClient::new(self.clone()))),
        }
    }
}

/// OpenStack cloud client
///
/// Service clients are created on first use and cached for the lifetime of
/// the provider.
pub struct OpenStackCloud {
    connector: Box<dyn ServiceConnector>,
    clients: HashMap<ServiceKind, ServiceClient>,
    template: Option<ServerTemplate>,
}

impl OpenStackCloud {
    /// Build a session from `OS_*` variables (or `OS_CLOUD` and clouds.yaml)
    pub async fn from_env() -> Result<Self, CloudError> {
        let session = Session::from_env()
            .await
            .map_err(|e| CloudError::Authentication {
                cloud: "OpenStack",
                source: e.into(),
            })?;

        tracing::info!("OpenStack session ready");
        Ok(Self::with_connector(session))
    }

    pub fn with_connector<C>(connector: C) -> Self
    where
        C: ServiceConnector + 'static,
    {
        Self {
            connector: Box::new(connector),
            clients: HashMap::new(),
            template: None,
        }
    }

    /// Use a fixed server template instead of reading OS_TEST_* at creation time
    pub fn with_server_template(mut self, template: ServerTemplate) -> Self {
        self.template = Some(template);
        self
    }

    /// Get the cached client for `service`, creating it on first use
    pub fn service_client(&mut self, service: ServiceKind) -> &ServiceClient {
        match self.clients.entry(service) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                tracing::debug!(service = service.service_type(), "Created service client");
                entry.insert(self.connector.connect(service))
            }
        }
    }

    /// Get a service client by catalog name
    pub fn service_client_by_name(&mut self, service: &str) -> Result<&ServiceClient, CloudError> {
        let kind: ServiceKind = service.parse()?;
        Ok(self.service_client(kind))
    }

    fn compute(&mut self) -> Arc<dyn ComputeApi> {
        let ServiceClient::Compute(compute) = self.service_client(ServiceKind::Compute);
        Arc::clone(compute)
    }

    fn server_template(&self) -> Result<ServerTemplate, CloudError> {
        match &self.template {
            Some(template) => Ok(template.clone()),
            None => ServerTemplate::from_env(),
        }
    }
}

impl fmt::Debug for OpenStackCloud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut services: Vec<_> = self.clients.keys().map(ServiceKind::service_type).collect();
        services.sort_unstable();

        f.debug_struct("OpenStackCloud")
            .field("services", &services)
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

fn node_info(server: &Server) -> NodeInfo {
    let instance_type = server.instance_type().unwrap_or_default();
    if instance_type.is_empty() {
        tracing::warn!(server = %server.id, "Server reports no flavor");
    }

    NodeInfo {
        name: server.name.clone(),
        provider_id: provider_id::make(CloudType::OpenStack, &server.id),
        instance_type: instance_type.to_string(),
    }
}

#[async_trait]
impl CloudProvider for OpenStackCloud {
    async fn get_node(&mut self, name: &str) -> Result<NodeInfo, CloudError> {
        let compute = self.compute();

        let server = find_server_by_name(compute.as_ref(), name)
            .await
            .map_err(|source| CloudError::Request {
                operation: "list servers",
                source,
            })?
            .ok_or_else(|| CloudError::NodeNotFound(name.to_string()))?;

        Ok(node_info(&server))
    }

    async fn create_node(&mut self, name: &str) -> Result<NodeInfo, CloudError> {
        let compute = self.compute();
        let creation_error = |source: BoxError| CloudError::Creation {
            name: name.to_string(),
            source,
        };

        let template = self.server_template().map_err(|e| creation_error(e.into()))?;
        let server_id = compute
            .create_server(&template.request(name))
            .await
            .map_err(creation_error)?;
        tracing::info!(server = %server_id, name, "Server created");

        // The create response only carries the ID; fetch the rest
        match compute.get_server(&server_id).await {
            Ok(server) => Ok(node_info(&server)),
            Err(source) => {
                // Best-effort cleanup of the unconfirmed server
                if let Err(e) = compute.delete_server(&server_id).await {
                    tracing::error!(server = %server_id, error = %e, "Failed to delete unconfirmed server");
                } else {
                    tracing::warn!(server = %server_id, "Deleted server that could not be confirmed");
                }
                Err(creation_error(source))
            }
        }
    }

    async fn delete_node(&mut self, node: &NodeInfo) -> Result<(), CloudError> {
        let compute = self.compute();
        let server_id = provider_id::parse(CloudType::OpenStack, &node.provider_id)?;

        compute
            .delete_server(server_id)
            .await
            .map_err(|source| CloudError::Deletion {
                provider_id: node.provider_id.clone(),
                source,
            })?;

        tracing::info!(server = server_id, "Server deleted");
        Ok(())
    }
}
