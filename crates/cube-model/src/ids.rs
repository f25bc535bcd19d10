use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub(crate) fn new(index: usize) -> Self {
                debug_assert!(index <= u32::MAX as usize);
                Self(index as u32)
            }

            /// Builds an id from an arena position. Only meaningful against
            /// the schema whose arena the position refers to.
            pub fn from_index(index: usize) -> Self {
                Self::new(index)
            }

            /// Position of this entity in its schema arena.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

arena_id! {
    /// Index of a [`crate::Member`] in its owning [`crate::Schema`] arena.
    ///
    /// Two members with equal unique names are the same logical member and
    /// therefore carry the same `MemberId`.
    MemberId
}

arena_id! {
    /// Index of a [`crate::Level`] in its owning schema.
    LevelId
}

arena_id! {
    /// Index of a [`crate::Hierarchy`] in its owning schema.
    HierarchyId
}

arena_id! {
    /// Index of a [`crate::Dimension`] in its owning schema.
    DimensionId
}
