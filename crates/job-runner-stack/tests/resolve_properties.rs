//! Resolution behaviour across identity, image and tagging paths
//!
//! Everything here runs against fixture catalogs; no AWS access needed.

use job_runner_common::tags;
use job_runner_stack::aws::ec2::{
    EmptyCatalog, FILTER_ARCHITECTURE, FILTER_IMAGE_TYPE, FILTER_ROOT_DEVICE_TYPE, FILTER_STATE,
    FILTER_VIRTUALIZATION_TYPE, ImageQuery,
};
use job_runner_stack::aws::iam::ProfileRole;
use job_runner_stack::{
    DefaultPolicy, ResolveError, ResolvedIdentity, RunnerConfiguration, Stack, Supply, resolve,
};
use job_runner_test_utils::configs::{fully_specified, sample_role, token_only, SAMPLE_TOKEN};
use job_runner_test_utils::{
    CountingCatalog, FOCAL_LATEST, capture_logs, focal_snapshot, test_stack_name,
};
use std::num::NonZeroU32;
use std::sync::Arc;

const REGION: &str = "us-east-1";

fn focal_stack() -> (Stack, Arc<CountingCatalog>) {
    let catalog = Arc::new(CountingCatalog::new(focal_snapshot(&[REGION])));
    let stack = Stack::new(&test_stack_name(), REGION, catalog.clone()).unwrap();
    (stack, catalog)
}

#[test]
fn test_default_example() {
    let (mut stack, _) = focal_stack();
    let runner = resolve(
        &mut stack,
        &DefaultPolicy::default(),
        RunnerConfiguration::with_token("tok123"),
    )
    .unwrap();

    assert_eq!(runner.resolved_image_reference().as_str(), FOCAL_LATEST);
    assert_eq!(runner.concurrency_limit(), None);
    assert_eq!(
        runner.resolved_identity().role_name(),
        "gitlab-runner-runners-role"
    );
    assert_eq!(
        runner.resolved_identity_profile().profile_name,
        "gitlab-runner-runners-profile"
    );
    assert_eq!(runner.service_url(), "https://gitlab.com");
    assert_eq!(runner.compute_shape().as_str(), "t3.micro");
}

#[test]
fn test_provided_identity_is_the_same_reference() {
    let (mut stack, _) = focal_stack();
    let role = sample_role();
    let runner = resolve(
        &mut stack,
        &DefaultPolicy::default(),
        token_only().with_identity(Arc::clone(&role)),
    )
    .unwrap();

    let ResolvedIdentity::Provided(resolved) = runner.resolved_identity() else {
        panic!("expected provided identity");
    };
    assert!(Arc::ptr_eq(resolved, &role));

    // Only the profile is declared, and it wraps the supplied role
    assert_eq!(stack.len(), 1);
    assert_eq!(stack.roles().count(), 0);
    let profile = runner.resolved_identity_profile();
    assert!(matches!(&profile.role, ProfileRole::Existing(r) if Arc::ptr_eq(r, &role)));
}

#[test]
fn test_absent_identity_declares_one_role_and_one_profile() {
    let (mut stack, _) = focal_stack();
    let runner = resolve(&mut stack, &DefaultPolicy::default(), token_only()).unwrap();

    assert_eq!(stack.roles().count(), 1);
    assert_eq!(stack.instance_profiles().count(), 1);

    let role = stack.roles().next().unwrap();
    let profile = stack.instance_profiles().next().unwrap();
    assert_eq!(role.tags, tags::role_tags("gitlab-runner"));
    assert_eq!(profile.tags, tags::instance_profile_tags("gitlab-runner"));

    let marker = (
        tags::TAG_RUNNERS_ROLE.to_string(),
        tags::TAG_RUNNERS_ROLE.to_string(),
    );
    assert!(role.tags.contains(&marker));
    assert!(profile.tags.contains(&marker));

    assert_eq!(profile.role.role_name(), role.role_name);
    assert_eq!(runner.resolved_identity().declaration_id(), Some(&role.id));
}

#[test]
fn test_explicit_image_never_queries_catalog() {
    let (mut stack, catalog) = focal_stack();
    let runner = resolve(
        &mut stack,
        &DefaultPolicy::default(),
        token_only().with_image("ami-0abcdef1234567890"),
    )
    .unwrap();

    assert_eq!(
        runner.resolved_image_reference().as_str(),
        "ami-0abcdef1234567890"
    );
    assert_eq!(runner.resolved_image_source(), &Supply::Provided(()));
    assert_eq!(stack.catalog_queries(), 0);
    assert_eq!(catalog.calls(), 0);
}

#[test]
fn test_lookup_query_carries_baseline_filters() {
    let (mut stack, _) = focal_stack();
    let runner = resolve(&mut stack, &DefaultPolicy::default(), token_only()).unwrap();

    let Supply::ToSynthesize(query) = runner.resolved_image_source() else {
        panic!("expected a dynamic lookup");
    };
    assert!(query.owners().eq(["099720109477"]));
    let expected = [
        (FILTER_ARCHITECTURE, "x86_64"),
        (FILTER_IMAGE_TYPE, "machine"),
        (FILTER_STATE, "available"),
        (FILTER_ROOT_DEVICE_TYPE, "ebs"),
        (FILTER_VIRTUALIZATION_TYPE, "hvm"),
    ];
    for (name, value) in expected {
        assert!(
            query
                .filter_values(name)
                .is_some_and(|values| values.contains(value)),
            "missing filter {name}={value}"
        );
    }
}

#[test]
fn test_same_configuration_in_two_stacks() {
    let (mut first, _) = focal_stack();
    let (mut second, _) = focal_stack();
    let policy = DefaultPolicy::default();

    let a = resolve(&mut first, &policy, token_only()).unwrap();
    let b = resolve(&mut second, &policy, token_only()).unwrap();

    assert_eq!(a.resolved_image_reference(), b.resolved_image_reference());
    assert_eq!(a.compute_shape(), b.compute_shape());
    assert_eq!(a.service_url(), b.service_url());
    assert_eq!(
        a.resolved_identity().role_name(),
        b.resolved_identity().role_name()
    );

    assert_ne!(a.stack(), b.stack());
    assert_ne!(
        a.resolved_identity().declaration_id(),
        b.resolved_identity().declaration_id()
    );
    assert_ne!(a.resolved_identity_profile().id, b.resolved_identity_profile().id);
}

#[test]
fn test_missing_credential_declares_nothing() {
    let (mut stack, catalog) = focal_stack();
    let policy = DefaultPolicy::default();

    let mut no_token = fully_specified(sample_role());
    no_token.auth_token = None;
    for config in [RunnerConfiguration::default(), RunnerConfiguration::with_token(""), no_token] {
        let err = resolve(&mut stack, &policy, config).unwrap_err();
        assert!(matches!(err, ResolveError::MissingCredential), "got {err:?}");
    }
    assert!(stack.is_empty());
    assert_eq!(catalog.calls(), 0);
}

#[test]
fn test_failed_lookup_declares_nothing() {
    let mut stack = Stack::new(&test_stack_name(), REGION, Arc::new(EmptyCatalog)).unwrap();
    let err = resolve(&mut stack, &DefaultPolicy::default(), token_only()).unwrap_err();
    assert!(err.is_lookup_ambiguity());
    assert!(stack.is_empty());
    assert!(stack.synthesize()["Resources"].as_object().unwrap().is_empty());
}

#[test]
fn test_lookup_in_region_without_images_fails() {
    let catalog = Arc::new(focal_snapshot(&["eu-west-1"]));
    let mut stack = Stack::new(&test_stack_name(), REGION, catalog).unwrap();
    let err = resolve(&mut stack, &DefaultPolicy::default(), token_only()).unwrap_err();
    assert!(err.is_lookup_ambiguity());
}

#[test]
fn test_lookup_memoized_across_runners() {
    let (mut stack, catalog) = focal_stack();
    let policy = DefaultPolicy::default();
    let first = resolve(&mut stack, &policy, token_only().with_name("builds")).unwrap();
    let second = resolve(&mut stack, &policy, token_only().with_name("deploys")).unwrap();

    assert_eq!(first.resolved_image_reference(), second.resolved_image_reference());
    assert_eq!(catalog.calls(), 1);
    assert_eq!(stack.catalog_queries(), 1);
}

#[test]
fn test_custom_image_query_from_policy() {
    let (mut stack, _) = focal_stack();
    let policy = DefaultPolicy::default().with_image_query(
        ImageQuery::ubuntu_focal().with_owner("111122223333"),
    );
    let runner = resolve(&mut stack, &policy, token_only()).unwrap();
    // The foreign-owned fixture is newer and now trusted
    assert_eq!(
        runner.resolved_image_reference().as_str(),
        "ami-0fffffffffffffff1"
    );
}

#[test]
fn test_runners_sharing_a_label_get_distinct_names() {
    let (mut stack, _) = focal_stack();
    let policy = DefaultPolicy::default();
    let a = resolve(&mut stack, &policy, token_only()).unwrap();
    let b = resolve(&mut stack, &policy, token_only()).unwrap();

    assert_eq!(a.resolved_identity().role_name(), "gitlab-runner-runners-role");
    assert_eq!(b.resolved_identity().role_name(), "gitlab-runner-runners-role-2");
    assert_ne!(
        a.resolved_identity_profile().profile_name,
        b.resolved_identity_profile().profile_name
    );
    assert_eq!(stack.len(), 4);
}

#[test]
fn test_fully_specified_configuration_passes_through() {
    let (mut stack, catalog) = focal_stack();
    let role = sample_role();
    let runner = resolve(
        &mut stack,
        &DefaultPolicy::default(),
        fully_specified(Arc::clone(&role)),
    )
    .unwrap();

    assert_eq!(runner.label(), "docker-builds");
    assert_eq!(runner.service_url(), "https://gitlab.example.com");
    assert_eq!(runner.compute_shape().as_str(), "c5.xlarge");
    assert_eq!(runner.concurrency_limit(), NonZeroU32::new(8));
    assert_eq!(runner.log_byte_limit(), Some(16_384));
    assert_eq!(runner.environment_overrides(), ["DOCKER_DRIVER=overlay2"]);
    assert_eq!(
        runner.container_runtime_config().get("image"),
        Some(&serde_json::json!("docker:24"))
    );
    assert_eq!(
        runner.machine_provisioner_config().get("MachineDriver"),
        Some(&serde_json::json!("amazonec2"))
    );
    assert_eq!(runner.autoscaling_rules().len(), 1);
    assert_eq!(runner.auth_token().expose(), SAMPLE_TOKEN);
    assert_eq!(runner.resolved_identity().role_name(), "shared-runner-role");
    assert_eq!(
        runner.resolved_identity_profile().profile_name,
        "docker-builds-runners-profile"
    );
    assert_eq!(catalog.calls(), 0);
}

#[test]
fn test_configuration_from_json() {
    let (mut stack, _) = focal_stack();
    let config: RunnerConfiguration = serde_json::from_value(serde_json::json!({
        "auth_token": "tok123",
        "name": "json-runner",
        "concurrency_limit": 0,
        "identity": "existing-role",
    }))
    .unwrap();
    let runner = resolve(&mut stack, &DefaultPolicy::default(), config).unwrap();

    assert_eq!(runner.label(), "json-runner");
    assert_eq!(runner.concurrency_limit(), None);
    assert!(runner.resolved_identity().is_provided());
    assert_eq!(runner.resolved_identity().role_name(), "existing-role");
}

#[test]
fn test_token_never_logged() {
    let (mut stack, _) = focal_stack();
    let (runner, logs) = capture_logs(|| {
        let runner = resolve(&mut stack, &DefaultPolicy::default(), token_only()).unwrap();
        tracing::info!(runner = ?runner, "debug dump");
        runner
    });

    assert!(logs.contains("Resolved job runner"), "logs: {logs}");
    assert!(!logs.contains(SAMPLE_TOKEN), "token leaked into logs: {logs}");
    assert!(!format!("{runner:?}").contains(SAMPLE_TOKEN));
}
