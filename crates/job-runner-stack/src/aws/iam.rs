//! IAM role and instance profile declarations for job runners
//!
//! Build executors launched by docker-machine need an instance profile to
//! carry a role. The role is either supplied by the caller or declared here
//! with the smallest capability set that still allows SSM Session Manager
//! access to the instance.

use crate::stack::DeclarationId;
use job_runner_common::defaults::EC2_SERVICE_PRINCIPAL;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// IAM limit on role name length
pub const MAX_ROLE_NAME_LEN: usize = 64;

/// IAM limit on instance profile name length
pub const MAX_INSTANCE_PROFILE_NAME_LEN: usize = 128;

/// Room left for a `-NN` uniqueness suffix when truncating derived names
const UNIQUE_SUFFIX_ROOM: usize = 4;

/// Suffix for derived role names
pub const ROLE_NAME_SUFFIX: &str = "-runners-role";

/// Suffix for derived instance profile names
pub const INSTANCE_PROFILE_NAME_SUFFIX: &str = "-runners-profile";

/// Trust policy allowing EC2 to assume the role
pub fn assume_role_policy_document() -> serde_json::Value {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Principal": {
                    "Service": EC2_SERVICE_PRINCIPAL
                },
                "Action": "sts:AssumeRole"
            }
        ]
    })
}

/// Reference to an IAM role that already exists.
///
/// Accepts either a full role ARN or a bare role name. The reference is
/// checked structurally with [`RoleReference::validate`] when resolved.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleReference(String);

impl RoleReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this reference is an ARN rather than a bare name
    pub fn is_arn(&self) -> bool {
        self.0.starts_with("arn:")
    }

    /// The role name, with any ARN prefix and path stripped
    pub fn role_name(&self) -> &str {
        if self.is_arn() {
            self.0.rsplit('/').next().unwrap_or(&self.0)
        } else {
            &self.0
        }
    }

    /// Check that the reference is a well-formed role ARN or role name.
    pub fn validate(&self) -> Result<(), String> {
        if !self.is_arn() {
            return validate_role_name(&self.0);
        }

        // arn:<partition>:iam::<account>:role/<path/>name
        let parts: Vec<&str> = self.0.splitn(6, ':').collect();
        if parts.len() != 6 {
            return Err("ARN must have six ':'-separated sections".to_string());
        }
        let (partition, service, region, account, resource) =
            (parts[1], parts[2], parts[3], parts[4], parts[5]);
        if partition.is_empty() {
            return Err("ARN partition is empty".to_string());
        }
        if service != "iam" {
            return Err(format!("ARN service must be 'iam', got '{service}'"));
        }
        if !region.is_empty() {
            return Err("IAM ARNs carry no region".to_string());
        }
        if account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("ARN account must be 12 digits, got '{account}'"));
        }
        let Some(path_and_name) = resource.strip_prefix("role/") else {
            return Err("ARN resource must start with 'role/'".to_string());
        };
        validate_role_name(path_and_name.rsplit('/').next().unwrap_or_default())
    }
}

impl fmt::Debug for RoleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoleReference({})", self.0)
    }
}

impl fmt::Display for RoleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_role_name(name: &str) -> Result<(), String> {
    const ALLOWED_PUNCTUATION: &[char] = &['+', '=', ',', '.', '@', '_', '-'];
    if name.is_empty() {
        return Err("role name cannot be empty".to_string());
    }
    if name.len() > MAX_ROLE_NAME_LEN {
        return Err(format!(
            "role name exceeds {MAX_ROLE_NAME_LEN} characters"
        ));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !ALLOWED_PUNCTUATION.contains(c))
    {
        return Err(format!("role name contains forbidden character: {bad:?}"));
    }
    Ok(())
}

/// Case-normalize a runner label into a name fragment.
///
/// Lowercases, maps anything outside `[a-z0-9]` to `-`, collapses runs of
/// `-`, and trims them from both ends. An empty result becomes `runner`.
pub fn normalize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars().map(|c| c.to_ascii_lowercase()) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "runner".to_string()
    } else {
        trimmed.to_string()
    }
}

/// PascalCase logical-id prefix for a runner label (`gitlab-runner` -> `GitlabRunner`)
pub fn logical_id_prefix(label: &str) -> String {
    normalize_label(label)
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Base role name derived from a runner label, before uniqueness suffixes
pub fn derive_role_name(label: &str) -> String {
    derive_name(label, ROLE_NAME_SUFFIX, MAX_ROLE_NAME_LEN)
}

/// Base instance profile name derived from a runner label
pub fn derive_instance_profile_name(label: &str) -> String {
    derive_name(label, INSTANCE_PROFILE_NAME_SUFFIX, MAX_INSTANCE_PROFILE_NAME_LEN)
}

fn derive_name(label: &str, suffix: &str, max_len: usize) -> String {
    let mut base = normalize_label(label);
    base.truncate(max_len - suffix.len() - UNIQUE_SUFFIX_ROOM);
    let base = base.trim_end_matches('-');
    format!("{base}{suffix}")
}

/// Recipe for minting a role when the caller supplies none
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRecipe {
    /// Managed policies attached to the new role
    pub managed_policy_arns: Vec<String>,
}

/// A role declared into a stack
#[derive(Debug, Clone, PartialEq)]
pub struct RoleDeclaration {
    pub id: DeclarationId,
    pub role_name: String,
    pub assume_role_policy: serde_json::Value,
    pub managed_policy_arns: Vec<String>,
    pub tags: Vec<(String, String)>,
}

impl RoleDeclaration {
    /// A role assumable by EC2, untagged
    pub fn new(id: DeclarationId, role_name: String, recipe: &RoleRecipe) -> Self {
        Self {
            id,
            role_name,
            assume_role_policy: assume_role_policy_document(),
            managed_policy_arns: recipe.managed_policy_arns.clone(),
            tags: Vec::new(),
        }
    }
}

/// The role an instance profile wraps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileRole {
    /// A role declared in the same stack
    Declared { id: DeclarationId, role_name: String },
    /// A caller-supplied role
    Existing(Arc<RoleReference>),
}

impl ProfileRole {
    pub fn role_name(&self) -> &str {
        match self {
            ProfileRole::Declared { role_name, .. } => role_name,
            ProfileRole::Existing(reference) => reference.role_name(),
        }
    }
}

/// An instance profile declared into a stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceProfileDeclaration {
    pub id: DeclarationId,
    pub profile_name: String,
    pub role: ProfileRole,
    pub tags: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_policy_allows_ec2_only() {
        let policy = assume_role_policy_document();
        let statements = policy["Statement"].as_array().unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0]["Principal"]["Service"], "ec2.amazonaws.com");
        assert_eq!(statements[0]["Action"], "sts:AssumeRole");
    }

    #[test]
    fn test_role_reference_by_name() {
        let r = RoleReference::new("ci-executors");
        assert!(!r.is_arn());
        assert_eq!(r.role_name(), "ci-executors");
        assert!(r.validate().is_ok());
    }

    #[test]
    fn test_role_reference_by_arn() {
        let r = RoleReference::new("arn:aws:iam::123456789012:role/ci/ci-executors");
        assert!(r.is_arn());
        assert_eq!(r.role_name(), "ci-executors");
        assert!(r.validate().is_ok());

        let cn = RoleReference::new("arn:aws-cn:iam::123456789012:role/builders");
        assert!(cn.validate().is_ok());
    }

    #[test]
    fn test_malformed_role_references() {
        for bad in [
            "",
            "has space",
            "semi;colon",
            "arn:aws:iam::123:role/short-account",
            "arn:aws:s3:::bucket",
            "arn:aws:iam:us-east-1:123456789012:role/regional",
            "arn:aws:iam::123456789012:user/alice",
            "arn:aws:iam::123456789012:role/",
            "arn:aws:iam::123456789012",
        ] {
            assert!(
                RoleReference::new(bad).validate().is_err(),
                "expected '{bad}' to be rejected"
            );
        }
        assert!(RoleReference::new("a".repeat(65)).validate().is_err());
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("gitlab-runner"), "gitlab-runner");
        assert_eq!(normalize_label("GitLab Runner"), "gitlab-runner");
        assert_eq!(normalize_label("  Docker__Builds!! "), "docker-builds");
        assert_eq!(normalize_label("---"), "runner");
        assert_eq!(normalize_label(""), "runner");
    }

    #[test]
    fn test_logical_id_prefix() {
        assert_eq!(logical_id_prefix("gitlab-runner"), "GitlabRunner");
        assert_eq!(logical_id_prefix("ARM builds 2"), "ArmBuilds2");
    }

    #[test]
    fn test_derived_names() {
        assert_eq!(derive_role_name("gitlab-runner"), "gitlab-runner-runners-role");
        assert_eq!(
            derive_instance_profile_name("gitlab-runner"),
            "gitlab-runner-runners-profile"
        );
    }

    #[test]
    fn test_derived_role_name_fits_iam_limit() {
        let name = derive_role_name(&"x".repeat(200));
        assert!(name.len() + UNIQUE_SUFFIX_ROOM <= MAX_ROLE_NAME_LEN);
        assert!(name.ends_with(ROLE_NAME_SUFFIX));
        assert!(validate_role_name(&name).is_ok());
    }
}
