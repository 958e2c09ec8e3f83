//! Core types for stack declarations

use crate::aws::iam::{InstanceProfileDeclaration, RoleDeclaration};
use job_runner_common::ResourceKind;
use std::fmt;

/// Identifies one stack instance.
///
/// Two stacks built from the same name still get distinct ids, so their
/// declarations never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackId(String);

impl StackId {
    pub(crate) fn new(name: &str, sequence: u64) -> Self {
        Self(format!("{name}-{sequence}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a declaration within a specific stack
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclarationId {
    stack: StackId,
    logical_id: String,
}

impl DeclarationId {
    pub(crate) fn new(stack: StackId, logical_id: String) -> Self {
        Self { stack, logical_id }
    }

    pub fn stack(&self) -> &StackId {
        &self.stack
    }

    /// Template-local identifier, unique within the stack
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }
}

impl fmt::Display for DeclarationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.stack, self.logical_id)
    }
}

/// A resource declared into a stack
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Role(RoleDeclaration),
    InstanceProfile(InstanceProfileDeclaration),
}

impl Declaration {
    pub fn id(&self) -> &DeclarationId {
        match self {
            Declaration::Role(role) => &role.id,
            Declaration::InstanceProfile(profile) => &profile.id,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Declaration::Role(_) => ResourceKind::IamRole,
            Declaration::InstanceProfile(_) => ResourceKind::IamInstanceProfile,
        }
    }

    /// Name the resource will carry in AWS
    pub fn physical_name(&self) -> &str {
        match self {
            Declaration::Role(role) => &role.role_name,
            Declaration::InstanceProfile(profile) => &profile.profile_name,
        }
    }

    pub fn tags(&self) -> &[(String, String)] {
        match self {
            Declaration::Role(role) => &role.tags,
            Declaration::InstanceProfile(profile) => &profile.tags,
        }
    }

    pub(crate) fn tags_mut(&mut self) -> &mut Vec<(String, String)> {
        match self {
            Declaration::Role(role) => &mut role.tags,
            Declaration::InstanceProfile(profile) => &mut profile.tags,
        }
    }

    /// Get a human-readable description for logging
    pub fn description(&self) -> String {
        match self {
            Declaration::Role(role) => format!("IAM role {}", role.role_name),
            Declaration::InstanceProfile(profile) => {
                format!("Instance profile {}", profile.profile_name)
            }
        }
    }
}
