//! AWS resource models for job runners
//!
//! This module provides:
//! - IAM: role references and role / instance profile declarations
//! - EC2: instance types, AMI ids, image queries and catalogs
//! - context: shared SDK config for filling catalog snapshots

pub mod context;
pub mod ec2;
pub mod iam;

pub use context::AwsContext;
pub use ec2::{
    CatalogImage, CatalogSnapshot, Ec2Client, EmptyCatalog, ImageCatalog, ImageId, ImageQuery,
    InstanceType,
};
pub use iam::{InstanceProfileDeclaration, ProfileRole, RoleDeclaration, RoleReference};
