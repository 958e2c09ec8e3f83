//! Declared resource types and teardown ordering
//!
//! Resources must be torn down in dependency order: an instance profile
//! references its role, so the profile goes first.

/// Types of resources a job-runner declaration can add to a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// IAM role assumed by build executors
    IamRole,
    /// IAM instance profile wrapping a role (depends on the role)
    IamInstanceProfile,
}

impl ResourceKind {
    /// Get teardown priority (lower number = torn down first)
    ///
    /// - 0: Instance profiles (must be removed before their role)
    /// - 1: Roles
    pub fn teardown_priority(self) -> u8 {
        match self {
            ResourceKind::IamInstanceProfile => 0,
            ResourceKind::IamRole => 1,
        }
    }

    /// CloudFormation resource type name
    pub fn cfn_type(self) -> &'static str {
        match self {
            ResourceKind::IamRole => "AWS::IAM::Role",
            ResourceKind::IamInstanceProfile => "AWS::IAM::InstanceProfile",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_before_roles() {
        assert!(
            ResourceKind::IamInstanceProfile.teardown_priority()
                < ResourceKind::IamRole.teardown_priority(),
            "Instance profiles must be torn down before roles"
        );
    }

    #[test]
    fn test_cfn_types() {
        assert_eq!(ResourceKind::IamRole.cfn_type(), "AWS::IAM::Role");
        assert_eq!(
            ResourceKind::IamInstanceProfile.cfn_type(),
            "AWS::IAM::InstanceProfile"
        );
    }
}
