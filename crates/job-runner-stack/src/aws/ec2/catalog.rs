//! In-memory image catalogs and latest-image selection
//!
//! Resolution never calls EC2. Lookups are answered by an [`ImageCatalog`],
//! typically a [`CatalogSnapshot`] filled ahead of time by
//! [`Ec2Client::snapshot`](super::Ec2Client::snapshot).

use super::query::{
    FILTER_ARCHITECTURE, FILTER_IMAGE_TYPE, FILTER_NAME, FILTER_ROOT_DEVICE_TYPE, FILTER_STATE,
    FILTER_VIRTUALIZATION_TYPE, ImageQuery,
};
use super::types::ImageId;
use crate::error::LookupFailure;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::warn;

/// One entry in a provider image catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogImage {
    pub image_id: String,
    pub name: String,
    pub owner_id: String,
    pub architecture: String,
    pub image_type: String,
    pub state: String,
    pub root_device_type: String,
    pub virtualization_type: String,
    /// RFC 3339 creation timestamp as reported by EC2
    pub creation_date: Option<String>,
}

impl CatalogImage {
    fn attribute(&self, filter_name: &str) -> Option<&str> {
        match filter_name {
            FILTER_NAME => Some(self.name.as_str()),
            FILTER_ARCHITECTURE => Some(self.architecture.as_str()),
            FILTER_IMAGE_TYPE => Some(self.image_type.as_str()),
            FILTER_STATE => Some(self.state.as_str()),
            FILTER_ROOT_DEVICE_TYPE => Some(self.root_device_type.as_str()),
            FILTER_VIRTUALIZATION_TYPE => Some(self.virtualization_type.as_str()),
            _ => None,
        }
    }

    /// Whether this image satisfies every owner and filter constraint.
    ///
    /// Filter values may contain `*` and `?` globs. Filters on attributes
    /// the catalog does not carry never match.
    pub fn matches(&self, query: &ImageQuery) -> bool {
        if !query.owners().any(|owner| owner == self.owner_id) {
            return false;
        }
        query.filters().all(|(name, values)| {
            let Some(actual) = self.attribute(name) else {
                return false;
            };
            values.iter().any(|pattern| glob_matches(pattern, actual))
        })
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.creation_date
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

fn glob_matches(pattern: &str, value: &str) -> bool {
    match glob::Pattern::new(pattern) {
        Ok(p) => p.matches(value),
        Err(_) => pattern == value,
    }
}

/// Source of images for dynamic lookups
pub trait ImageCatalog: Send + Sync {
    /// All images in `region` matching `query`, in no particular order
    fn find_images(&self, region: &str, query: &ImageQuery) -> Vec<CatalogImage>;
}

/// Catalog for stacks that only use explicit images
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyCatalog;

impl ImageCatalog for EmptyCatalog {
    fn find_images(&self, _region: &str, _query: &ImageQuery) -> Vec<CatalogImage> {
        Vec::new()
    }
}

/// Point-in-time copy of image catalogs, per region
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    regions: HashMap<String, Vec<CatalogImage>>,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, region: impl Into<String>, image: CatalogImage) {
        self.regions.entry(region.into()).or_default().push(image);
    }

    pub fn with_image(mut self, region: impl Into<String>, image: CatalogImage) -> Self {
        self.insert(region, image);
        self
    }

    pub fn extend(
        &mut self,
        region: impl Into<String>,
        images: impl IntoIterator<Item = CatalogImage>,
    ) {
        self.regions.entry(region.into()).or_default().extend(images);
    }

    /// Total images across all regions
    pub fn len(&self) -> usize {
        self.regions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ImageCatalog for CatalogSnapshot {
    fn find_images(&self, region: &str, query: &ImageQuery) -> Vec<CatalogImage> {
        self.regions
            .get(region)
            .map(|images| {
                images
                    .iter()
                    .filter(|image| image.matches(query))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Pick the newest image among lookup candidates.
///
/// Ordered by creation date, then by name (lineage names end in a build
/// date). Images with unparseable ids are skipped. A tie between distinct
/// image ids at the top is reported rather than broken arbitrarily.
pub fn select_latest(
    region: &str,
    query: &ImageQuery,
    candidates: Vec<CatalogImage>,
) -> Result<ImageId, LookupFailure> {
    let mut ranked: Vec<(Option<DateTime<Utc>>, String, ImageId)> = Vec::new();
    for image in candidates {
        match ImageId::parse(&image.image_id) {
            Ok(id) => ranked.push((image.created_at(), image.name.clone(), id)),
            Err(reason) => {
                warn!(image_id = %image.image_id, %reason, "Skipping catalog image with malformed id");
            }
        }
    }

    let Some(top) = ranked.iter().map(|(date, name, _)| (*date, name.clone())).max() else {
        return Err(LookupFailure::NoMatch {
            region: region.to_string(),
            query: query.cache_key(),
        });
    };

    let mut winners: Vec<&ImageId> = ranked
        .iter()
        .filter(|(date, name, _)| (*date, name.clone()) == top)
        .map(|(_, _, id)| id)
        .collect();
    winners.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    winners.dedup();

    match winners.as_slice() {
        [single] => Ok((*single).clone()),
        many => Err(LookupFailure::Ambiguous {
            region: region.to_string(),
            query: query.cache_key(),
            candidates: many.iter().map(|id| id.to_string()).collect(),
        }),
    }
}
