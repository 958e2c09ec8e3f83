//! Job runner configuration input
//!
//! The embedding application builds one [`RunnerConfiguration`] per runner
//! class, either in code or by deserializing JSON. Every field except the
//! auth token is optional; `resolve` fills the gaps from a `DefaultPolicy`.
//! Field rules are checked with `garde::Validate` after the credential check.

use crate::aws::iam::RoleReference;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Runner authentication token.
///
/// Never printed: `Debug` is redacted and there is no `Display`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for handing to the runner bootstrap
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Opaque configuration object forwarded without interpretation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigBlock(serde_json::Map<String, serde_json::Value>);

impl ConfigBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.0
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for ConfigBlock {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

/// Caller-supplied description of one job runner class
#[derive(Debug, Clone, Default, Deserialize, garde::Validate)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfiguration {
    /// Runner label, informational (default: `gitlab-runner`)
    #[serde(default)]
    #[garde(length(min = 1))]
    pub name: Option<String>,

    /// Runner authentication token (required)
    #[serde(default)]
    #[garde(skip)]
    pub auth_token: Option<AuthToken>,

    /// GitLab endpoint (default: `https://gitlab.com`)
    #[serde(default)]
    #[garde(length(min = 1))]
    pub service_url: Option<String>,

    /// EC2 instance type for executors (default: `t3.micro`)
    #[serde(default)]
    #[garde(skip)]
    pub compute_shape: Option<String>,

    /// Explicit AMI id; when absent the latest lineage image is looked up
    #[serde(default)]
    #[garde(skip)]
    pub image: Option<String>,

    /// Existing IAM role; when absent a role is declared for this runner
    #[serde(default)]
    #[garde(skip)]
    pub identity: Option<Arc<RoleReference>>,

    /// Maximum simultaneous jobs; 0 or absent means unbounded
    #[serde(default)]
    #[garde(skip)]
    pub concurrency_limit: Option<u32>,

    /// Job log size cap, passed through as given
    #[serde(default)]
    #[garde(range(min = 1))]
    pub log_byte_limit: Option<u64>,

    /// Ordered `KEY=VALUE` entries for the runner bootstrap
    #[serde(default)]
    #[garde(skip)]
    pub environment_overrides: Vec<String>,

    #[serde(default)]
    #[garde(skip)]
    pub container_runtime_config: ConfigBlock,

    #[serde(default)]
    #[garde(skip)]
    pub machine_provisioner_config: ConfigBlock,

    #[serde(default)]
    #[garde(skip)]
    pub autoscaling_rules: Vec<ConfigBlock>,
}

impl RunnerConfiguration {
    /// A configuration holding only the auth token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            auth_token: Some(AuthToken::new(token)),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = Some(url.into());
        self
    }

    pub fn with_compute_shape(mut self, instance_type: impl Into<String>) -> Self {
        self.compute_shape = Some(instance_type.into());
        self
    }

    pub fn with_image(mut self, image_id: impl Into<String>) -> Self {
        self.image = Some(image_id.into());
        self
    }

    pub fn with_identity(mut self, role: Arc<RoleReference>) -> Self {
        self.identity = Some(role);
        self
    }

    pub fn with_concurrency_limit(mut self, limit: u32) -> Self {
        self.concurrency_limit = Some(limit);
        self
    }

    pub fn with_log_byte_limit(mut self, limit: u64) -> Self {
        self.log_byte_limit = Some(limit);
        self
    }

    pub fn with_environment(mut self, entry: impl Into<String>) -> Self {
        self.environment_overrides.push(entry.into());
        self
    }

    pub fn with_container_runtime_config(mut self, block: ConfigBlock) -> Self {
        self.container_runtime_config = block;
        self
    }

    pub fn with_machine_provisioner_config(mut self, block: ConfigBlock) -> Self {
        self.machine_provisioner_config = block;
        self
    }

    pub fn with_autoscaling_rule(mut self, rule: ConfigBlock) -> Self {
        self.autoscaling_rules.push(rule);
        self
    }
}
