//! In-memory provisioning context
//!
//! A [`Stack`] is the desired-state model job runners are declared into.
//! It owns the declarations, the image catalog lookups are answered from,
//! and the memo of lookups already performed. Applying the stack to AWS is
//! left to an external reconciler, which consumes [`Stack::synthesize`].

mod pending;
mod synth;
mod types;

pub use pending::PendingDeclarations;
pub use types::{Declaration, DeclarationId, StackId};

use crate::aws::ec2::{ImageCatalog, ImageId, ImageQuery, select_latest};
use crate::aws::iam::{InstanceProfileDeclaration, RoleDeclaration};
use crate::error::{LookupFailure, ResolveError, ResolveResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// CloudFormation limit on stack name length
const MAX_STACK_NAME_LEN: usize = 128;

static STACK_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Provisioning context that job runners are declared into
pub struct Stack {
    id: StackId,
    name: String,
    region: String,
    catalog: Arc<dyn ImageCatalog>,
    declarations: Vec<Declaration>,
    lookups: HashMap<(String, ImageQuery), ImageId>,
    catalog_queries: usize,
}

impl Stack {
    /// Create an empty stack.
    ///
    /// `name` follows CloudFormation rules: starts with a letter, then
    /// letters, digits and `-`, at most 128 characters.
    pub fn new(
        name: &str,
        region: &str,
        catalog: Arc<dyn ImageCatalog>,
    ) -> ResolveResult<Self> {
        validate_stack_name(name).map_err(ResolveError::InvalidStack)?;
        if region.is_empty() {
            return Err(ResolveError::InvalidStack("region cannot be empty".to_string()));
        }

        let id = StackId::new(name, STACK_SEQUENCE.fetch_add(1, Ordering::Relaxed));
        debug!(stack = %id, region = %region, "Created stack");

        Ok(Self {
            id,
            name: name.to_string(),
            region: region.to_string(),
            catalog,
            declarations: Vec::new(),
            lookups: HashMap::new(),
            catalog_queries: 0,
        })
    }

    pub fn id(&self) -> &StackId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Start a batch of declarations that lands only on `commit()`
    pub fn begin(&mut self) -> PendingDeclarations<'_> {
        PendingDeclarations::new(self)
    }

    /// Resolve an image query, querying the catalog at most once per
    /// (region, query).
    ///
    /// Failed lookups are not memoized.
    pub fn lookup_image(&mut self, query: &ImageQuery) -> Result<ImageId, LookupFailure> {
        let key = (self.region.clone(), query.clone());
        if let Some(image) = self.lookups.get(&key) {
            debug!(region = %self.region, query = %query, image = %image, "Image lookup memo hit");
            return Ok(image.clone());
        }

        self.catalog_queries += 1;
        let candidates = self.catalog.find_images(&self.region, query);
        let count = candidates.len();
        match select_latest(&self.region, query, candidates) {
            Ok(image) => {
                debug!(
                    region = %self.region,
                    query = %query,
                    candidates = count,
                    image = %image,
                    "Resolved image lookup"
                );
                self.lookups.insert(key, image.clone());
                Ok(image)
            }
            Err(e) => {
                warn!(region = %self.region, error = %e, "Image lookup failed");
                Err(e)
            }
        }
    }

    /// How many times the catalog has been queried
    pub fn catalog_queries(&self) -> usize {
        self.catalog_queries
    }

    /// Memoized lookups, as (query, image) pairs
    pub fn image_lookups(&self) -> impl Iterator<Item = (&ImageQuery, &ImageId)> {
        self.lookups.iter().map(|((_, query), image)| (query, image))
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn get(&self, id: &DeclarationId) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.id() == id)
    }

    pub fn roles(&self) -> impl Iterator<Item = &RoleDeclaration> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Role(role) => Some(role),
            Declaration::InstanceProfile(_) => None,
        })
    }

    pub fn instance_profiles(&self) -> impl Iterator<Item = &InstanceProfileDeclaration> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::InstanceProfile(profile) => Some(profile),
            Declaration::Role(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Order in which declarations must be removed when the stack is torn down.
    ///
    /// Sorted by resource teardown priority, newest first within a kind.
    pub fn teardown_order(&self) -> Vec<DeclarationId> {
        let mut ordered: Vec<(u8, usize, &Declaration)> = self
            .declarations
            .iter()
            .enumerate()
            .map(|(i, d)| (d.kind().teardown_priority(), usize::MAX - i, d))
            .collect();
        ordered.sort_by_key(|(priority, reverse_index, _)| (*priority, *reverse_index));
        ordered.into_iter().map(|(_, _, d)| d.id().clone()).collect()
    }
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack")
            .field("id", &self.id)
            .field("region", &self.region)
            .field("declarations", &self.declarations.len())
            .finish_non_exhaustive()
    }
}

fn validate_stack_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("stack name cannot be empty".to_string());
    }
    if name.len() > MAX_STACK_NAME_LEN {
        return Err(format!("stack name exceeds {MAX_STACK_NAME_LEN} characters"));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err("stack name must start with a letter".to_string());
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '-')
    {
        return Err(format!("stack name contains forbidden character: {bad:?}"));
    }
    Ok(())
}
