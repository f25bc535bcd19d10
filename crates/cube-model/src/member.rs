use crate::ids::{HierarchyId, LevelId, MemberId};
use serde::{Deserialize, Serialize};

/// One node of a dimension hierarchy (a specific product, store, time period…).
///
/// Members are created and owned by the schema; downstream consumers only read
/// and compare them. The parent link is a weak relation expressed as an arena
/// index, so the member tree is owned top-down by [`crate::Schema`] alone.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Member {
    pub(crate) id: MemberId,
    pub(crate) name: String,
    pub(crate) unique_name: String,
    pub(crate) hierarchy: HierarchyId,
    pub(crate) level: LevelId,
    pub(crate) parent: Option<MemberId>,
    pub(crate) depth: u32,
    pub(crate) ordinal: u32,
    pub(crate) is_all: bool,
    pub(crate) is_calculated: bool,
    pub(crate) is_null: bool,
}

impl Member {
    pub fn id(&self) -> MemberId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity of the member: equal unique names imply the same member.
    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    pub fn hierarchy(&self) -> HierarchyId {
        self.hierarchy
    }

    pub fn level(&self) -> LevelId {
        self.level
    }

    pub fn parent(&self) -> Option<MemberId> {
        self.parent
    }

    /// Distance from the hierarchy root; the All member (when present) is depth 0.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Position among siblings, in the schema's declared child order.
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// True for the synthetic All/root member of a hierarchy.
    pub fn is_all(&self) -> bool {
        self.is_all
    }

    /// True when the member is backed by an expression rather than stored data.
    pub fn is_calculated(&self) -> bool {
        self.is_calculated
    }

    /// True for the hierarchy's sentinel absent-member.
    pub fn is_null(&self) -> bool {
        self.is_null
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.unique_name == other.unique_name
    }
}

impl Eq for Member {}
