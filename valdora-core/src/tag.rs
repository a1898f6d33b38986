//! Resource tags used to group cache entries for bulk invalidation.
//!
//! Every cached query declares the tags it *provides*; every mutation declares
//! the tags it *invalidates*. An invalidation tag matches a provided tag when:
//!
//! - it names only a kind ([`Tag::kind`]) and the provided tag has that kind, or
//! - it is identical to the provided tag ([`Tag::list`] or [`Tag::entity`]).
//!
//! ```
//! use valdora_core::{ResourceTag, Tag};
//!
//! let provided = Tag::entity(ResourceTag::Tenant, "42");
//! assert!(Tag::kind(ResourceTag::Tenant).matches(&provided));
//! assert!(Tag::entity(ResourceTag::Tenant, "42").matches(&provided));
//! assert!(!Tag::list(ResourceTag::Tenant).matches(&provided));
//! assert!(!Tag::kind(ResourceTag::Order).matches(&provided));
//! ```

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::EntityId;

/// Kind of entity a cache entry relates to.
///
/// The set is closed, so a tag outside of the known kinds cannot be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceTag {
    /// Tenant records.
    Tenant,
    /// Back-office users.
    User,
    /// Roles.
    Role,
    /// Permissions.
    Permission,
    /// Orders.
    Order,
    /// AI store drafts.
    AiStoreDraft,
    /// In-app notifications.
    Notification,
    /// Billing alerts shown in the top bar.
    BillingAlert,
    /// Dashboard analytics.
    Analytics,
}

impl ResourceTag {
    /// Returns the tag name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResourceTag::Tenant => "Tenant",
            ResourceTag::User => "User",
            ResourceTag::Role => "Role",
            ResourceTag::Permission => "Permission",
            ResourceTag::Order => "Order",
            ResourceTag::AiStoreDraft => "AiStoreDraft",
            ResourceTag::Notification => "Notification",
            ResourceTag::BillingAlert => "BillingAlert",
            ResourceTag::Analytics => "Analytics",
        }
    }
}

impl fmt::Display for ResourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which part of a kind a tag refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TagId {
    /// The collection listing of the kind.
    List,
    /// One entity of the kind.
    Entity(EntityId),
}

/// A resource tag, optionally narrowed to a list or a single entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    kind: ResourceTag,
    id: Option<TagId>,
}

impl Tag {
    /// Tag naming the whole kind. Used for invalidation.
    pub const fn kind(kind: ResourceTag) -> Self {
        Self { kind, id: None }
    }

    /// Tag of the collection listing of a kind.
    pub const fn list(kind: ResourceTag) -> Self {
        Self {
            kind,
            id: Some(TagId::List),
        }
    }

    /// Tag of a single entity.
    pub fn entity(kind: ResourceTag, id: impl Into<EntityId>) -> Self {
        Self {
            kind,
            id: Some(TagId::Entity(id.into())),
        }
    }

    /// Returns the tag kind.
    #[inline]
    pub fn resource(&self) -> ResourceTag {
        self.kind
    }

    /// Returns the narrowing part, if any.
    #[inline]
    pub fn id(&self) -> Option<&TagId> {
        self.id.as_ref()
    }

    /// Whether invalidating `self` affects an entry that provides `provided`.
    pub fn matches(&self, provided: &Tag) -> bool {
        if self.kind != provided.kind {
            return false;
        }
        match &self.id {
            None => true,
            Some(id) => provided.id.as_ref() == Some(id),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        match &self.id {
            None => Ok(()),
            Some(TagId::List) => f.write_str(":LIST"),
            Some(TagId::Entity(id)) => write!(f, ":{id}"),
        }
    }
}

impl From<ResourceTag> for Tag {
    fn from(kind: ResourceTag) -> Self {
        Tag::kind(kind)
    }
}

/// Deduplicated, ordered set of tags provided by a cache entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet(BTreeSet<Tag>);

impl TagSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag, returning `false` when it was already present.
    pub fn insert(&mut self, tag: Tag) -> bool {
        self.0.insert(tag)
    }

    /// Whether any of `invalidating` matches a tag in this set.
    pub fn intersects<'a>(&self, invalidating: impl IntoIterator<Item = &'a Tag>) -> bool {
        invalidating
            .into_iter()
            .any(|inv| self.0.iter().any(|provided| inv.matches(provided)))
    }

    /// Iterates over the tags.
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }

    /// Number of distinct tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set holds no tags.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Tag; N]> for TagSet {
    fn from(tags: [Tag; N]) -> Self {
        tags.into_iter().collect()
    }
}

impl From<Vec<Tag>> for TagSet {
    fn from(tags: Vec<Tag>) -> Self {
        tags.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Tag::kind(ResourceTag::Role).to_string(), "Role");
        assert_eq!(Tag::list(ResourceTag::Role).to_string(), "Role:LIST");
        assert_eq!(Tag::entity(ResourceTag::Role, "3").to_string(), "Role:3");
    }

    #[test]
    fn test_list_tag_does_not_match_entity() {
        let list = Tag::list(ResourceTag::User);
        assert!(list.matches(&Tag::list(ResourceTag::User)));
        assert!(!list.matches(&Tag::entity(ResourceTag::User, "1")));
    }

    #[test]
    fn test_entity_tags_compare_ids() {
        let one = Tag::entity(ResourceTag::Order, "1");
        assert!(one.matches(&Tag::entity(ResourceTag::Order, "1")));
        assert!(!one.matches(&Tag::entity(ResourceTag::Order, "2")));
    }

    #[test]
    fn test_tag_set_deduplicates_and_intersects() {
        let mut set = TagSet::from([
            Tag::list(ResourceTag::Tenant),
            Tag::entity(ResourceTag::Tenant, "1"),
        ]);
        assert!(!set.insert(Tag::list(ResourceTag::Tenant)));
        assert_eq!(set.len(), 2);

        assert!(set.intersects(&[Tag::kind(ResourceTag::Tenant)]));
        assert!(set.intersects(&[
            Tag::kind(ResourceTag::Order),
            Tag::entity(ResourceTag::Tenant, "1"),
        ]));
        assert!(!set.intersects(&[Tag::entity(ResourceTag::Tenant, "2")]));
        assert!(!set.intersects(std::iter::empty()));
    }
}
