//! Staged declarations with commit semantics
//!
//! A resolution stages everything it declares in a [`PendingDeclarations`]
//! batch. Only `commit()` makes the declarations part of the stack; a batch
//! dropped on an error path leaves the stack untouched.

use super::Stack;
use super::types::{Declaration, DeclarationId};
use crate::aws::ec2::{ImageId, ImageQuery};
use crate::error::LookupFailure;
use job_runner_common::ResourceKind;
use tracing::debug;

/// Declarations staged against a stack but not yet committed
pub struct PendingDeclarations<'a> {
    stack: &'a mut Stack,
    staged: Vec<Declaration>,
}

impl<'a> PendingDeclarations<'a> {
    pub(super) fn new(stack: &'a mut Stack) -> Self {
        Self {
            stack,
            staged: Vec::new(),
        }
    }

    pub fn stack(&self) -> &Stack {
        self.stack
    }

    /// Resolve an image query through the stack's memoized catalog
    pub fn lookup_image(&mut self, query: &ImageQuery) -> Result<ImageId, LookupFailure> {
        self.stack.lookup_image(query)
    }

    fn logical_id_taken(&self, logical_id: &str) -> bool {
        self.stack
            .declarations()
            .iter()
            .chain(self.staged.iter())
            .any(|d| d.id().logical_id() == logical_id)
    }

    fn physical_name_taken(&self, kind: ResourceKind, name: &str) -> bool {
        self.stack
            .declarations()
            .iter()
            .chain(self.staged.iter())
            .any(|d| d.kind() == kind && d.physical_name() == name)
    }

    /// Allocate a logical id not used by the stack or this batch.
    ///
    /// The first candidate is `base`; later ones append `2`, `3`, ...
    pub fn allocate_id(&self, base: &str) -> DeclarationId {
        let logical_id = first_free(base, "", |candidate| self.logical_id_taken(candidate));
        DeclarationId::new(self.stack.id().clone(), logical_id)
    }

    /// Allocate a physical name unique among resources of `kind`.
    ///
    /// The first candidate is `base`; later ones append `-2`, `-3`, ...
    pub fn allocate_name(&self, kind: ResourceKind, base: &str) -> String {
        first_free(base, "-", |candidate| self.physical_name_taken(kind, candidate))
    }

    pub fn declare(&mut self, declaration: Declaration) {
        debug!(
            id = %declaration.id(),
            resource = %declaration.description(),
            "Staged declaration"
        );
        self.staged.push(declaration);
    }

    /// Append tags to a staged declaration. Returns false if `id` is not staged.
    pub fn apply_tags(&mut self, id: &DeclarationId, tags: Vec<(String, String)>) -> bool {
        match self.staged.iter_mut().find(|d| d.id() == id) {
            Some(declaration) => {
                declaration.tags_mut().extend(tags);
                true
            }
            None => false,
        }
    }

    pub fn staged(&self) -> &[Declaration] {
        &self.staged
    }

    /// Move every staged declaration into the stack, returning how many
    pub fn commit(mut self) -> usize {
        let staged = std::mem::take(&mut self.staged);
        let count = staged.len();
        self.stack.declarations.extend(staged);
        debug!(stack = %self.stack.id(), count, "Committed declarations");
        count
    }
}

impl Drop for PendingDeclarations<'_> {
    fn drop(&mut self) {
        if !self.staged.is_empty() {
            debug!(
                stack = %self.stack.id(),
                count = self.staged.len(),
                "Discarding uncommitted declarations"
            );
        }
    }
}

fn first_free(base: &str, separator: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (2u32..)
        .map(|n| format!("{base}{separator}{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
