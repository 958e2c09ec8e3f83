//! Sample runner configurations

use job_runner_stack::aws::iam::RoleReference;
use job_runner_stack::{ConfigBlock, RunnerConfiguration};
use serde_json::json;
use std::sync::Arc;

pub const SAMPLE_TOKEN: &str = "glrt-sample-token-do-not-log";

pub const SAMPLE_ROLE_ARN: &str = "arn:aws:iam::123456789012:role/ci/shared-runner-role";

/// Only the credential; everything else comes from the default policy
pub fn token_only() -> RunnerConfiguration {
    RunnerConfiguration::with_token(SAMPLE_TOKEN)
}

/// A caller-supplied role, shared so tests can check pointer identity
pub fn sample_role() -> Arc<RoleReference> {
    Arc::new(RoleReference::new(SAMPLE_ROLE_ARN))
}

/// Every field set, with an explicit image and the given role
pub fn fully_specified(role: Arc<RoleReference>) -> RunnerConfiguration {
    RunnerConfiguration::with_token(SAMPLE_TOKEN)
        .with_name("docker-builds")
        .with_service_url("https://gitlab.example.com")
        .with_compute_shape("c5.xlarge")
        .with_image("ami-0abcdef1234567890")
        .with_identity(role)
        .with_concurrency_limit(8)
        .with_log_byte_limit(16_384)
        .with_environment("DOCKER_DRIVER=overlay2")
        .with_container_runtime_config(
            ConfigBlock::new()
                .with("image", "docker:24")
                .with("privileged", true),
        )
        .with_machine_provisioner_config(
            ConfigBlock::new()
                .with("IdleCount", 0)
                .with("MachineDriver", "amazonec2"),
        )
        .with_autoscaling_rule(ConfigBlock::new().with("Periods", json!(["* * 9-17 * * mon-fri *"])))
}
