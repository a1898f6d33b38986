//! Mutation options.

use valdora_core::Tag;

use super::patch::Patch;

/// Patch applied to matching entries while a mutation is in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisticUpdate {
    /// Entries providing any of these tags receive the patch.
    pub targets: Vec<Tag>,
    /// Change to apply to their data.
    pub patch: Patch,
}

impl OptimisticUpdate {
    /// Applies `patch` to every entry matched by `targets`.
    pub fn new(targets: impl IntoIterator<Item = Tag>, patch: Patch) -> Self {
        Self {
            targets: targets.into_iter().collect(),
            patch,
        }
    }
}

/// What a mutation does to the cache besides running its executor.
///
/// ```
/// use valdora::cache::{MutationOptions, OptimisticUpdate, Patch};
/// use valdora_core::{ResourceTag, Tag};
///
/// let options = MutationOptions::new()
///     .invalidates([Tag::entity(ResourceTag::Tenant, "1"), Tag::list(ResourceTag::Tenant)])
///     .optimistic(OptimisticUpdate::new(
///         [Tag::list(ResourceTag::Tenant)],
///         Patch::remove("1"),
///     ));
/// assert_eq!(options.invalidates.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationOptions {
    /// Optimistic patch, rolled back if the executor fails.
    pub optimistic: Option<OptimisticUpdate>,
    /// Tags whose entries are refetched after the executor succeeds.
    pub invalidates: Vec<Tag>,
}

impl MutationOptions {
    /// No optimistic patch, no invalidation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tags to invalidate on success.
    pub fn invalidates(self, tags: impl IntoIterator<Item = Tag>) -> Self {
        Self {
            invalidates: tags.into_iter().collect(),
            ..self
        }
    }

    /// Sets the optimistic patch.
    pub fn optimistic(self, update: OptimisticUpdate) -> Self {
        Self {
            optimistic: Some(update),
            ..self
        }
    }
}
