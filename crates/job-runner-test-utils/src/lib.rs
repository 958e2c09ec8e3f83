//! Shared test utilities for job-runner-stack
//!
//! Lives in its own crate so integration tests and downstream users can
//! share fixtures without a circular dependency.
//!
//! ## Modules
//!
//! - [`aws`]: AWS region detection and unique stack names
//! - [`catalog`]: fixture image catalogs and a query-counting wrapper
//! - [`configs`]: sample runner configurations
//! - [`logs`]: capture formatted tracing output

pub mod aws;
pub mod catalog;
pub mod configs;
pub mod logs;

pub use aws::{get_test_region, test_stack_name};
pub use catalog::{CountingCatalog, FOCAL_LATEST, focal_image, focal_snapshot};
pub use logs::capture_logs;
