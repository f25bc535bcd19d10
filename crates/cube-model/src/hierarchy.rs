use crate::ids::{DimensionId, HierarchyId, LevelId, MemberId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dimension {
    pub(crate) id: DimensionId,
    pub(crate) name: String,
    pub(crate) hierarchies: Vec<HierarchyId>,
}

impl Dimension {
    pub fn id(&self) -> DimensionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hierarchies(&self) -> &[HierarchyId] {
        &self.hierarchies
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Hierarchy {
    pub(crate) id: HierarchyId,
    pub(crate) name: String,
    pub(crate) dimension: DimensionId,
    pub(crate) levels: Vec<LevelId>,
    pub(crate) has_all: bool,
    pub(crate) all_member: Option<MemberId>,
    pub(crate) null_member: Option<MemberId>,
    pub(crate) root_members: Vec<MemberId>,
}

impl Hierarchy {
    pub fn id(&self) -> HierarchyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension(&self) -> DimensionId {
        self.dimension
    }

    /// Levels from shallowest to deepest.
    pub fn levels(&self) -> &[LevelId] {
        &self.levels
    }

    pub fn has_all(&self) -> bool {
        self.has_all
    }

    pub fn all_member(&self) -> Option<MemberId> {
        self.all_member
    }

    /// The sentinel absent-member for this hierarchy.
    ///
    /// Populated by [`crate::SchemaBuilder::build`].
    pub fn null_member(&self) -> Option<MemberId> {
        self.null_member
    }

    /// The All member when the hierarchy has one, otherwise the top-level members.
    pub fn root_members(&self) -> &[MemberId] {
        &self.root_members
    }

    /// The member used for this hierarchy's slot in a coordinate that does not
    /// mention it: the All member when present, else the first root member.
    pub fn default_member(&self) -> MemberId {
        self.all_member.unwrap_or_else(|| {
            self.root_members
                .first()
                .copied()
                .expect("hierarchy has no members")
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Level {
    pub(crate) id: LevelId,
    pub(crate) name: String,
    pub(crate) hierarchy: HierarchyId,
    pub(crate) depth: u32,
    /// Declared member count for the level, when the schema knows it.
    pub(crate) cardinality: Option<usize>,
}

impl Level {
    pub fn id(&self) -> LevelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hierarchy(&self) -> HierarchyId {
        self.hierarchy
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn cardinality(&self) -> Option<usize> {
        self.cardinality
    }
}
