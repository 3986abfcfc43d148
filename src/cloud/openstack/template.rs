//! Server creation parameters for test nodes

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;

use crate::cloud::CloudError;

/// What a test node is booted from, read from OS_TEST_* variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTemplate {
    pub flavor_ref: String,
    pub image_ref: String,
    pub network_id: Option<String>,
    pub security_groups: Vec<String>,
    pub user_data: Option<String>,
}

impl ServerTemplate {
    pub fn from_env() -> Result<Self, CloudError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, CloudError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let security_groups = get("OS_TEST_SECGROUPS")
            .map(|groups| {
                groups
                    .split(',')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            flavor_ref: get("OS_TEST_FLAVOR").ok_or(CloudError::MissingEnv("OS_TEST_FLAVOR"))?,
            image_ref: get("OS_TEST_IMAGE").ok_or(CloudError::MissingEnv("OS_TEST_IMAGE"))?,
            network_id: get("OS_TEST_NETWORK"),
            security_groups,
            user_data: lookup("OS_TEST_USER_DATA").filter(|v| !v.is_empty()),
        })
    }

    /// Build the `POST /servers` body for a server called `name`
    pub fn request<'a>(&'a self, name: &'a str) -> CreateServerRequest<'a> {
        CreateServerRequest {
            server: CreateServer {
                name,
                flavor_ref: &self.flavor_ref,
                image_ref: &self.image_ref,
                security_groups: self
                    .security_groups
                    .iter()
                    .map(|name| SecurityGroup { name: name.as_str() })
                    .collect(),
                user_data: self.user_data.as_ref().map(|data| STANDARD.encode(data)),
                networks: self
                    .network_id
                    .iter()
                    .map(|uuid| Network { uuid: uuid.as_str() })
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateServerRequest<'a> {
    server: CreateServer<'a>,
}

#[derive(Debug, Serialize)]
struct CreateServer<'a> {
    name: &'a str,
    #[serde(rename = "flavorRef")]
    flavor_ref: &'a str,
    #[serde(rename = "imageRef")]
    image_ref: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    security_groups: Vec<SecurityGroup<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_data: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    networks: Vec<Network<'a>>,
}

#[derive(Debug, Serialize)]
struct SecurityGroup<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct Network<'a> {
    uuid: &'a str,
}
