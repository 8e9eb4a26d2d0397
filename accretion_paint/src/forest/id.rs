// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed indices into the property forest.

/// Declares a typed `u32` index into one of the forest's node vectors.
///
/// Index 0 is always the tree root. Parent indices are strictly smaller than
/// their children's, so ancestor walks terminate and equality is an integer
/// compare.
macro_rules! forest_id {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// The root node of this tree.
            pub const ROOT: Self = Self(0);

            /// The raw index.
            #[inline]
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// Returns whether this is the tree root.
            #[inline]
            #[must_use]
            pub const fn is_root(self) -> bool {
                self.0 == 0
            }
        }
    };
}

forest_id! {
    /// Index of a transform node.
    TransformId
}
forest_id! {
    /// Index of a clip node.
    ClipId
}
forest_id! {
    /// Index of an effect node.
    EffectId
}
forest_id! {
    /// Index of a scroll node.
    ScrollId
}

/// A stable identity connecting a paint node to its compositor counterpart
/// across passes.
///
/// Zero is the invalid id; nodes without one are never registered in the
/// compositor's element maps and cannot be directly updated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositorElementId(pub u64);

impl CompositorElementId {
    /// The "no element" id.
    pub const INVALID: Self = Self(0);

    /// Returns whether this id refers to an element.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl Default for CompositorElementId {
    #[inline]
    fn default() -> Self {
        Self::INVALID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roots_are_index_zero() {
        assert!(TransformId::ROOT.is_root());
        assert_eq!(ClipId::ROOT.index(), 0);
        assert!(EffectId::ROOT.is_root());
        assert!(ScrollId::ROOT.is_root());
    }

    #[test]
    fn element_id_validity() {
        assert!(!CompositorElementId::INVALID.is_valid());
        assert!(!CompositorElementId::default().is_valid());
        assert!(CompositorElementId(7).is_valid());
    }
}
