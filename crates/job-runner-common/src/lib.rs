//! job-runner-common - Shared constants for job-runner declarations
//!
//! This crate carries the pieces every consumer of a declared job runner
//! agrees on, without any AWS SDK dependencies to keep it lightweight.
//!
//! ## Modules
//!
//! - [`defaults`]: Default label, endpoint, shape and image lineage
//! - [`resource_kind`]: Declared resource kinds and teardown ordering
//! - [`tags`]: Tag keys and values applied to declared resources

pub mod defaults;
pub mod resource_kind;
pub mod tags;

pub use resource_kind::ResourceKind;
