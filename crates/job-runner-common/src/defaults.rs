//! Default configuration values for job runners
//!
//! These constants seed `DefaultPolicy::default()` in the stack crate. They
//! are never read as hidden module state during resolution.

/// Default runner label
pub const DEFAULT_LABEL: &str = "gitlab-runner";

/// Default GitLab control-plane endpoint
pub const DEFAULT_SERVICE_URL: &str = "https://gitlab.com";

/// Default EC2 instance type for build executors
pub const DEFAULT_INSTANCE_TYPE: &str = "t3.micro";

/// Canonical's AWS account, the trusted publisher of Ubuntu AMIs
pub const CANONICAL_OWNER_ID: &str = "099720109477";

/// Ubuntu 20.04 (focal) amd64 server image lineage
pub const UBUNTU_FOCAL_NAME_PATTERN: &str = "ubuntu/images/hvm-ssd/ubuntu-focal-20.04-amd64-server-*";

/// AWS-managed policy granting SSM Session Manager access
pub const SSM_MANAGED_POLICY_ARN: &str = "arn:aws:iam::aws:policy/AmazonSSMManagedInstanceCore";

/// Service principal allowed to assume runner roles
pub const EC2_SERVICE_PRINCIPAL: &str = "ec2.amazonaws.com";
