//! Default policy applied during resolution
//!
//! Defaults are passed into `resolve` explicitly rather than read from
//! module state, so tests and callers can substitute their own.

use crate::aws::ec2::ImageQuery;
use crate::aws::iam::RoleRecipe;
use job_runner_common::defaults::{
    DEFAULT_INSTANCE_TYPE, DEFAULT_LABEL, DEFAULT_SERVICE_URL, SSM_MANAGED_POLICY_ARN,
};

/// Values used for every field a configuration leaves unset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultPolicy {
    /// Runner label
    pub label: String,
    /// GitLab endpoint
    pub service_url: String,
    /// EC2 instance type, validated at resolve time
    pub instance_type: String,
    /// Query used when no explicit image is given
    pub image_query: ImageQuery,
    /// Managed policies attached to roles declared for runners
    pub managed_policy_arns: Vec<String>,
}

impl Default for DefaultPolicy {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            service_url: DEFAULT_SERVICE_URL.to_string(),
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            image_query: ImageQuery::ubuntu_focal(),
            managed_policy_arns: vec![SSM_MANAGED_POLICY_ARN.to_string()],
        }
    }
}

impl DefaultPolicy {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = url.into();
        self
    }

    pub fn with_instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.instance_type = instance_type.into();
        self
    }

    pub fn with_image_query(mut self, query: ImageQuery) -> Self {
        self.image_query = query;
        self
    }

    pub(crate) fn role_recipe(&self) -> RoleRecipe {
        RoleRecipe {
            managed_policy_arns: self.managed_policy_arns.clone(),
        }
    }
}
