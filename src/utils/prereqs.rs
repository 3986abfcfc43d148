//! Prerequisite checking for the environment the tests read

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrereqError {
    #[error("Environment variable '{name}' not set")]
    NotFound { name: String, hint: String },
}

/// Trait for checking prerequisites
pub trait Prerequisite {
    /// Name of the prerequisite
    fn name(&self) -> String;

    /// Check if the prerequisite is satisfied
    fn check(&self) -> Result<(), PrereqError>;

    /// Hint for the user when it is not
    fn hint(&self) -> &str;
}

/// Environment variable prerequisite, satisfied by any one of `vars`
pub struct EnvPrereq {
    pub vars: Vec<&'static str>,
    pub hint: String,
}

impl EnvPrereq {
    pub fn new(var: &'static str, hint: impl Into<String>) -> Self {
        Self::any_of(&[var], hint)
    }

    pub fn any_of(vars: &[&'static str], hint: impl Into<String>) -> Self {
        Self {
            vars: vars.to_vec(),
            hint: hint.into(),
        }
    }
}

impl Prerequisite for EnvPrereq {
    fn name(&self) -> String {
        self.vars.join(" or ")
    }

    fn check(&self) -> Result<(), PrereqError> {
        let set = self
            .vars
            .iter()
            .any(|var| std::env::var(var).is_ok_and(|v| !v.is_empty()));

        if set {
            Ok(())
        } else {
            Err(PrereqError::NotFound {
                name: self.name(),
                hint: self.hint.clone(),
            })
        }
    }

    fn hint(&self) -> &str {
        &self.hint
    }
}

/// Common prerequisites for ccm-e2e
pub struct CommonPrereqs;

impl CommonPrereqs {
    /// Variables needed to authenticate with OpenStack
    pub fn openstack_auth() -> Vec<EnvPrereq> {
        vec![
            EnvPrereq::new("OS_AUTH_URL", "Keystone endpoint, e.g. https://keystone.example.com:5000/v3"),
            EnvPrereq::any_of(
                &[
                    "OS_USERNAME",
                    "OS_USERID",
                    "OS_APPLICATION_CREDENTIAL_ID",
                    "OS_APPLICATION_CREDENTIAL_NAME",
                ],
                "Source your openrc file",
            ),
            EnvPrereq::any_of(
                &["OS_PASSWORD", "OS_APPLICATION_CREDENTIAL_SECRET"],
                "Source your openrc file",
            ),
        ]
    }

    /// Variables describing the test server to boot
    pub fn openstack_test_node() -> Vec<EnvPrereq> {
        vec![
            EnvPrereq::new("OS_TEST_FLAVOR", "Flavor for the test node, e.g. m1.small"),
            EnvPrereq::new("OS_TEST_IMAGE", "Image ID with kubelet preinstalled"),
        ]
    }

    /// Variables the test runs without, but usually needs
    pub fn openstack_recommended() -> Vec<EnvPrereq> {
        vec![
            EnvPrereq::new("OS_REGION_NAME", "Region of the compute endpoint"),
            EnvPrereq::new("OS_TEST_NETWORK", "Network ID the cluster nodes are attached to"),
            EnvPrereq::new("OS_TEST_SECGROUPS", "Comma-separated security groups for cluster nodes"),
            EnvPrereq::new("OS_TEST_USER_DATA", "Cloud-init user data that joins the node to the cluster"),
        ]
    }

    /// Check all prerequisites and return detailed results
    /// Returns (found, missing)
    pub fn check_all(prereqs: &[&dyn Prerequisite]) -> (Vec<String>, Vec<(String, String)>) {
        let mut found = Vec::new();
        let mut missing = Vec::new();

        for prereq in prereqs {
            match prereq.check() {
                Ok(_) => found.push(prereq.name()),
                Err(PrereqError::NotFound { name, hint }) => missing.push((name, hint)),
            }
        }

        (found, missing)
    }
}
