//! Object identity: tags, guids, and names
//!
//! Every node and component carries an [`ObjectIdentity`] used by the
//! recursive search operations. Pure value types with no graph dependencies.

use bitflags::bitflags;

bitflags! {
    /// 64-bit tag flag set
    ///
    /// Tag meanings are defined by the application; use [`TagSet::bit`] to
    /// build named constants for your game's categories.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TagSet: u64 {}
}

impl TagSet {
    /// Create a tag set with a single bit raised
    ///
    /// Indices 64 and above wrap around; callers are expected to stay within
    /// the 64 available tags.
    pub fn bit(index: u32) -> Self {
        Self::from_bits_retain(1_u64 << (index % 64))
    }
}

/// Unique object identifier, assigned monotonically per scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid(pub(crate) u64);

impl Guid {
    /// Get the raw id value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity attached to every scene object
///
/// Combines the scene-unique guid with an optional human-readable name and
/// a tag set for category matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdentity {
    guid: Guid,
    name: Option<String>,
    tags: TagSet,
}

impl ObjectIdentity {
    pub(crate) fn new(guid: Guid) -> Self {
        Self {
            guid,
            name: None,
            tags: TagSet::empty(),
        }
    }

    pub(crate) fn named(guid: Guid, name: impl Into<String>) -> Self {
        Self {
            guid,
            name: Some(name.into()),
            tags: TagSet::empty(),
        }
    }

    /// Get the scene-unique guid
    pub fn guid(&self) -> Guid {
        self.guid
    }

    /// Get the object's name, if one was assigned
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Set or clear the object's name
    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    /// Get the tag set
    pub fn tags(&self) -> TagSet {
        self.tags
    }

    /// Replace the tag set
    pub fn set_tags(&mut self, tags: TagSet) {
        self.tags = tags;
    }

    /// Raise tags without clearing existing ones
    pub fn insert_tags(&mut self, tags: TagSet) {
        self.tags |= tags;
    }

    /// Check the name against a candidate
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }

    /// Check whether any of the given tags are present
    pub fn has_any_tags(&self, tags: TagSet) -> bool {
        self.tags.intersects(tags)
    }

    /// Check whether all of the given tags are present
    pub fn has_all_tags(&self, tags: TagSet) -> bool {
        self.tags.contains(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_matching() {
        let enemy = TagSet::bit(0);
        let projectile = TagSet::bit(1);
        let boss = TagSet::bit(7);

        let mut id = ObjectIdentity::named(Guid(1), "turret");
        id.set_tags(enemy | boss);

        assert!(id.matches_name("turret"));
        assert!(!id.matches_name("Turret"));
        assert!(id.has_any_tags(enemy | projectile));
        assert!(id.has_all_tags(enemy | boss));
        assert!(!id.has_all_tags(enemy | projectile));
    }
}
