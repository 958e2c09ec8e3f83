//! Tag constants for declared job-runner resources
//!
//! Every IAM resource declared for a job runner carries these tags so that
//! downstream cost and asset attribution can find it. Pre-existing roles
//! supplied by the caller are never tagged.
//!
//! ## Tag Schema
//!
//! | Tag Key | Applied to | Value |
//! |---------|------------|-------|
//! | `RunnersRole` | role, instance profile | `RunnersRole` |
//! | `RunnersInstanceProfile` | instance profile | `RunnersInstanceProfile` |
//! | `job-runner:tool` | role, instance profile | `job-runner-stack` |
//! | `job-runner:runner` | role, instance profile | runner label |

/// Fixed identifying tag for declared roles (key and value are identical)
pub const TAG_RUNNERS_ROLE: &str = "RunnersRole";

/// Fixed identifying tag for declared instance profiles
pub const TAG_RUNNERS_INSTANCE_PROFILE: &str = "RunnersInstanceProfile";

/// Tag key for tool identification
pub const TAG_TOOL: &str = "job-runner:tool";

/// Tag value for tool identification
pub const TAG_TOOL_VALUE: &str = "job-runner-stack";

/// Tag key carrying the runner label a resource was declared for
pub const TAG_RUNNER: &str = "job-runner:runner";

/// Tags for a declared role, in application order.
pub fn role_tags(label: &str) -> Vec<(String, String)> {
    vec![
        (TAG_RUNNERS_ROLE.to_string(), TAG_RUNNERS_ROLE.to_string()),
        (TAG_TOOL.to_string(), TAG_TOOL_VALUE.to_string()),
        (TAG_RUNNER.to_string(), label.to_string()),
    ]
}

/// Tags for a declared instance profile, in application order.
pub fn instance_profile_tags(label: &str) -> Vec<(String, String)> {
    let mut tags = role_tags(label);
    tags.insert(
        1,
        (
            TAG_RUNNERS_INSTANCE_PROFILE.to_string(),
            TAG_RUNNERS_INSTANCE_PROFILE.to_string(),
        ),
    );
    tags
}
