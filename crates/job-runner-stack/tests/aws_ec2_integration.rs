//! EC2 integration tests - actually call AWS APIs
//!
//! These tests are marked `#[ignore]` and only run with:
//! ```
//! AWS_PROFILE=your_profile cargo test --test aws_ec2_integration -- --ignored
//! ```

use job_runner_stack::aws::{AwsContext, Ec2Client, ImageQuery};
use job_runner_stack::{DefaultPolicy, Stack, resolve};
use job_runner_test_utils::configs::token_only;
use job_runner_test_utils::{get_test_region, test_stack_name};
use std::sync::Arc;

/// Snapshot the live focal catalog and resolve a runner against it
#[tokio::test]
#[ignore]
async fn test_resolve_against_live_catalog() {
    let region = get_test_region();
    let ctx = AwsContext::new(&region).await;
    let client = Ec2Client::from_context(&ctx);

    let query = ImageQuery::ubuntu_focal();
    let snapshot = client
        .snapshot(std::slice::from_ref(&query))
        .await
        .expect("AWS credentials required - set AWS_PROFILE or AWS_ACCESS_KEY_ID");
    assert!(!snapshot.is_empty(), "Canonical publishes focal images in {region}");

    let mut stack = Stack::new(&test_stack_name(), &region, Arc::new(snapshot)).unwrap();
    let runner = resolve(&mut stack, &DefaultPolicy::default(), token_only())
        .expect("Should resolve against live catalog");

    assert!(runner.resolved_image_reference().as_str().starts_with("ami-"));
    assert_eq!(stack.catalog_queries(), 1);
}
