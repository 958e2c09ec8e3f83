//! EC2 image and instance-type references

mod catalog;
mod query;
mod types;

pub use catalog::{CatalogImage, CatalogSnapshot, EmptyCatalog, ImageCatalog, select_latest};
pub use query::{
    FILTER_ARCHITECTURE, FILTER_IMAGE_TYPE, FILTER_NAME, FILTER_ROOT_DEVICE_TYPE, FILTER_STATE,
    FILTER_VIRTUALIZATION_TYPE, ImageQuery,
};
pub use types::{ImageId, InstanceType};

use crate::aws::context::AwsContext;
use anyhow::{Context, Result};
use aws_sdk_ec2::Client;
use tracing::debug;

/// EC2 client used to snapshot image catalogs ahead of resolution
pub struct Ec2Client {
    client: Client,
    region: String,
}

impl Ec2Client {
    /// Create a new EC2 client (loads AWS config from environment)
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }

    /// Create an EC2 client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ec2_client(),
            region: ctx.region().to_string(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Run `DescribeImages` for a query and convert the results.
    ///
    /// Images missing an id or name are dropped.
    pub async fn describe_images(&self, query: &ImageQuery) -> Result<Vec<CatalogImage>> {
        let response = self
            .client
            .describe_images()
            .set_owners(Some(query.owners().map(str::to_string).collect()))
            .set_filters(Some(query.to_ec2_filters()))
            .send()
            .await
            .with_context(|| format!("Failed to describe images for {query}"))?;

        let images: Vec<CatalogImage> = response
            .images()
            .iter()
            .filter_map(catalog_image_from_sdk)
            .collect();

        debug!(
            region = %self.region,
            query = %query,
            count = images.len(),
            "Described catalog images"
        );

        Ok(images)
    }

    /// Snapshot the images matching each query in this client's region.
    pub async fn snapshot(&self, queries: &[ImageQuery]) -> Result<CatalogSnapshot> {
        let mut snapshot = CatalogSnapshot::new();
        for query in queries {
            let images = self.describe_images(query).await?;
            snapshot.extend(self.region.clone(), images);
        }
        Ok(snapshot)
    }
}

fn catalog_image_from_sdk(image: &aws_sdk_ec2::types::Image) -> Option<CatalogImage> {
    Some(CatalogImage {
        image_id: image.image_id()?.to_string(),
        name: image.name()?.to_string(),
        owner_id: image.owner_id().unwrap_or_default().to_string(),
        architecture: image
            .architecture()
            .map(|a| a.as_str().to_string())
            .unwrap_or_default(),
        image_type: image
            .image_type()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default(),
        state: image
            .state()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        root_device_type: image
            .root_device_type()
            .map(|d| d.as_str().to_string())
            .unwrap_or_default(),
        virtualization_type: image
            .virtualization_type()
            .map(|v| v.as_str().to_string())
            .unwrap_or_default(),
        creation_date: image.creation_date().map(str::to_string),
    })
}
