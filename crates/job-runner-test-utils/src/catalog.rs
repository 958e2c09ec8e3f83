//! Fixture image catalogs
//!
//! [`focal_snapshot`] holds three Canonical focal builds plus images that
//! each violate one lookup constraint, so a correct query picks
//! [`FOCAL_LATEST`] and nothing else.

use job_runner_common::defaults::CANONICAL_OWNER_ID as CANONICAL;
use job_runner_stack::aws::ec2::{CatalogImage, CatalogSnapshot, ImageCatalog, ImageQuery};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Newest matching image in [`focal_snapshot`]
pub const FOCAL_LATEST: &str = "ami-0123456789abcdef0";

/// A Canonical focal server image built on `build` (YYYYMMDD)
pub fn focal_image(image_id: &str, build: &str) -> CatalogImage {
    CatalogImage {
        image_id: image_id.to_string(),
        name: format!("ubuntu/images/hvm-ssd/ubuntu-focal-20.04-amd64-server-{build}"),
        owner_id: CANONICAL.to_string(),
        architecture: "x86_64".to_string(),
        image_type: "machine".to_string(),
        state: "available".to_string(),
        root_device_type: "ebs".to_string(),
        virtualization_type: "hvm".to_string(),
        creation_date: Some(format!(
            "{}-{}-{}T08:15:00.000Z",
            &build[..4],
            &build[4..6],
            &build[6..8]
        )),
    }
}

/// Focal fixture images, replicated in every listed region
pub fn focal_snapshot(regions: &[&str]) -> CatalogSnapshot {
    let mut images = vec![
        focal_image("ami-0aaaaaaaaaaaaaaa1", "20221101"),
        focal_image("ami-0bbbbbbbbbbbbbbb2", "20230215"),
        focal_image(FOCAL_LATEST, "20230517"),
    ];

    // Newer than FOCAL_LATEST, but each fails one constraint
    let newer = focal_image("ami-0fffffffffffffff1", "20231001");
    let mut foreign = newer.clone();
    foreign.owner_id = "111122223333".to_string();
    let mut arm = newer.clone();
    arm.image_id = "ami-0fffffffffffffff2".to_string();
    arm.architecture = "arm64".to_string();
    let mut pending = newer.clone();
    pending.image_id = "ami-0fffffffffffffff3".to_string();
    pending.state = "pending".to_string();
    let mut instance_store = newer.clone();
    instance_store.image_id = "ami-0fffffffffffffff4".to_string();
    instance_store.root_device_type = "instance-store".to_string();
    let mut jammy = newer;
    jammy.image_id = "ami-0fffffffffffffff5".to_string();
    jammy.name = "ubuntu/images/hvm-ssd/ubuntu-jammy-22.04-amd64-server-20231001".to_string();
    images.extend([foreign, arm, pending, instance_store, jammy]);

    let mut snapshot = CatalogSnapshot::new();
    for region in regions {
        snapshot.extend(*region, images.iter().cloned());
    }
    snapshot
}

/// Catalog wrapper that counts `find_images` calls
#[derive(Debug, Default)]
pub struct CountingCatalog {
    inner: CatalogSnapshot,
    calls: AtomicUsize,
}

impl CountingCatalog {
    pub fn new(inner: CatalogSnapshot) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageCatalog for CountingCatalog {
    fn find_images(&self, region: &str, query: &ImageQuery) -> Vec<CatalogImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_images(region, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use job_runner_stack::aws::ec2::select_latest;

    #[test]
    fn test_fixture_selects_latest_focal() {
        let query = ImageQuery::ubuntu_focal();
        let snapshot = focal_snapshot(&["us-east-1"]);
        let candidates = snapshot.find_images("us-east-1", &query);
        assert_eq!(candidates.len(), 3);
        let picked = select_latest("us-east-1", &query, candidates).unwrap();
        assert_eq!(picked.as_str(), FOCAL_LATEST);
    }

    #[test]
    fn test_counting_catalog_counts() {
        let catalog = CountingCatalog::new(focal_snapshot(&["us-east-1"]));
        catalog.find_images("us-east-1", &ImageQuery::ubuntu_focal());
        catalog.find_images("eu-west-1", &ImageQuery::ubuntu_focal());
        assert_eq!(catalog.calls(), 2);
    }
}
