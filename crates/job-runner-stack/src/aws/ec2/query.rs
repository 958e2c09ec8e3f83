//! Image catalog queries
//!
//! A query is an owner allow-list plus a set of `DescribeImages` filters.
//! Queries are ordered maps so the same query always renders to the same
//! cache key.

use job_runner_common::defaults::{CANONICAL_OWNER_ID, UBUNTU_FOCAL_NAME_PATTERN};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const FILTER_NAME: &str = "name";
pub const FILTER_ARCHITECTURE: &str = "architecture";
pub const FILTER_IMAGE_TYPE: &str = "image-type";
pub const FILTER_STATE: &str = "state";
pub const FILTER_ROOT_DEVICE_TYPE: &str = "root-device-type";
pub const FILTER_VIRTUALIZATION_TYPE: &str = "virtualization-type";

/// Baseline filters every lineage query carries
const BASELINE_FILTERS: &[(&str, &str)] = &[
    (FILTER_ARCHITECTURE, "x86_64"),
    (FILTER_IMAGE_TYPE, "machine"),
    (FILTER_STATE, "available"),
    (FILTER_ROOT_DEVICE_TYPE, "ebs"),
    (FILTER_VIRTUALIZATION_TYPE, "hvm"),
];

/// A declarative image lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageQuery {
    owners: BTreeSet<String>,
    filters: BTreeMap<String, BTreeSet<String>>,
}

impl ImageQuery {
    /// Query for the newest image of a named lineage from a trusted owner.
    ///
    /// Always filters on 64-bit x86, machine images, available state, EBS
    /// root storage and HVM virtualization.
    pub fn lineage(owner: impl Into<String>, name_pattern: impl Into<String>) -> Self {
        let name_pattern: String = name_pattern.into();
        let mut query = Self {
            owners: BTreeSet::from([owner.into()]),
            filters: BTreeMap::new(),
        };
        query = query.with_filter(FILTER_NAME, [name_pattern]);
        for (name, value) in BASELINE_FILTERS {
            query = query.with_filter(name, [value.to_string()]);
        }
        query
    }

    /// Ubuntu 20.04 server images published by Canonical
    pub fn ubuntu_focal() -> Self {
        Self::lineage(CANONICAL_OWNER_ID, UBUNTU_FOCAL_NAME_PATTERN)
    }

    /// Set a filter, replacing any existing values for that name
    pub fn with_filter<I, V>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.filters.insert(
            name.to_string(),
            values.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Add another trusted owner
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owners.insert(owner.into());
        self
    }

    pub fn owners(&self) -> impl Iterator<Item = &str> {
        self.owners.iter().map(String::as_str)
    }

    pub fn filters(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.filters.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn filter_values(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.filters.get(name)
    }

    /// Whether this query constrains `name` to exactly include `value`
    pub fn has_filter(&self, name: &str, value: &str) -> bool {
        self.filters
            .get(name)
            .is_some_and(|values| values.contains(value))
    }

    /// Deterministic rendering used for memo keys and stack metadata
    pub fn cache_key(&self) -> String {
        let owners: Vec<&str> = self.owners().collect();
        let mut key = format!("owners={}", owners.join(","));
        for (name, values) in &self.filters {
            let values: Vec<&str> = values.iter().map(String::as_str).collect();
            key.push_str(&format!(";{}={}", name, values.join(",")));
        }
        key
    }

    /// Render as EC2 SDK filters for `DescribeImages`
    pub fn to_ec2_filters(&self) -> Vec<aws_sdk_ec2::types::Filter> {
        use aws_sdk_ec2::types::Filter;

        self.filters
            .iter()
            .map(|(name, values)| {
                Filter::builder()
                    .name(name)
                    .set_values(Some(values.iter().cloned().collect()))
                    .build()
            })
            .collect()
    }
}

impl fmt::Display for ImageQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}
