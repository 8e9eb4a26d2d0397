// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The property forest arena.

use alloc::vec::Vec;

use kurbo::{Rect, RoundedRectRadii, Size, Vec2};

use crate::filter::FilterOps;
use crate::forest::id::{ClipId, CompositorElementId, EffectId, ScrollId, TransformId};
use crate::forest::nodes::{BlendMode, ClipNode, EffectNode, ScrollNode, TransformNode};
use crate::transform::Transform3d;

/// Arena storage for the four paint property trees.
///
/// Nodes are appended and never removed; a pass builds the forest up front
/// and then treats it as immutable while translating to compositor trees.
/// Every tree has its root at index 0, and a node's parent index is strictly
/// smaller than its own, so parent chains always terminate at the root.
#[derive(Debug, Default)]
pub struct PropertyForest {
    transforms: Vec<TransformNode>,
    clips: Vec<ClipNode>,
    effects: Vec<EffectNode>,
    scrolls: Vec<ScrollNode>,
}

impl PropertyForest {
    /// Creates a forest containing the four root nodes.
    #[must_use]
    pub fn new() -> Self {
        let mut forest = Self {
            transforms: Vec::new(),
            clips: Vec::new(),
            effects: Vec::new(),
            scrolls: Vec::new(),
        };
        forest.transforms.push(TransformNode {
            parent: None,
            matrix: Transform3d::IDENTITY,
            origin: [0.0; 3],
            flattens_inherited_transform: false,
            rendering_context_id: 0,
            scroll: None,
            element_id: CompositorElementId::INVALID,
        });
        forest.clips.push(ClipNode {
            parent: None,
            local_transform_space: TransformId::ROOT,
            rect: Rect::new(
                f64::NEG_INFINITY,
                f64::NEG_INFINITY,
                f64::INFINITY,
                f64::INFINITY,
            ),
            radii: RoundedRectRadii::from_single_radius(0.0),
        });
        forest.effects.push(EffectNode {
            parent: None,
            local_transform_space: TransformId::ROOT,
            output_clip: Some(ClipId::ROOT),
            opacity: 1.0,
            filter: FilterOps::none(),
            backdrop_filter: FilterOps::none(),
            blend_mode: BlendMode::SourceOver,
            element_id: CompositorElementId::INVALID,
        });
        forest.scrolls.push(ScrollNode {
            parent: None,
            container_rect: Rect::ZERO,
            contents_size: Size::ZERO,
            user_scrollable_horizontal: false,
            user_scrollable_vertical: false,
            element_id: CompositorElementId::INVALID,
        });
        forest
    }

    // --- Node access ---

    /// The transform node for `id`.
    #[inline]
    #[must_use]
    pub fn transform(&self, id: TransformId) -> &TransformNode {
        &self.transforms[id.index()]
    }

    /// The clip node for `id`.
    #[inline]
    #[must_use]
    pub fn clip(&self, id: ClipId) -> &ClipNode {
        &self.clips[id.index()]
    }

    /// The effect node for `id`.
    #[inline]
    #[must_use]
    pub fn effect(&self, id: EffectId) -> &EffectNode {
        &self.effects[id.index()]
    }

    /// The scroll node for `id`.
    #[inline]
    #[must_use]
    pub fn scroll(&self, id: ScrollId) -> &ScrollNode {
        &self.scrolls[id.index()]
    }

    // --- Node creation ---

    /// Appends a transform node. The parent must already exist.
    pub fn create_transform(&mut self, node: TransformNode) -> TransformId {
        let parent = node.parent.expect("non-root transform nodes need a parent");
        assert!(
            parent.index() < self.transforms.len(),
            "parent transform must be created first"
        );
        debug_assert!(node.matrix.is_finite(), "transform matrix must be finite");
        self.push_transform(node)
    }

    /// Appends a plain 2-D translation transform node.
    pub fn create_2d_translation(&mut self, parent: TransformId, offset: Vec2) -> TransformId {
        assert!(
            parent.index() < self.transforms.len(),
            "parent transform must be created first"
        );
        self.push_transform(TransformNode {
            parent: Some(parent),
            matrix: Transform3d::from_translation(offset.x, offset.y, 0.0),
            origin: [0.0; 3],
            flattens_inherited_transform: false,
            rendering_context_id: 0,
            scroll: None,
            element_id: CompositorElementId::INVALID,
        })
    }

    /// Appends a scroll translation governed by `scroll`.
    ///
    /// `translation` is the applied translation, which is the negated
    /// scroll offset.
    pub fn create_scroll_translation(
        &mut self,
        parent: TransformId,
        translation: Vec2,
        scroll: ScrollId,
        element_id: CompositorElementId,
    ) -> TransformId {
        assert!(
            parent.index() < self.transforms.len(),
            "parent transform must be created first"
        );
        assert!(
            scroll.index() < self.scrolls.len(),
            "scroll node must be created first"
        );
        self.push_transform(TransformNode {
            parent: Some(parent),
            matrix: Transform3d::from_translation(translation.x, translation.y, 0.0),
            origin: [0.0; 3],
            flattens_inherited_transform: false,
            rendering_context_id: 0,
            scroll: Some(scroll),
            element_id,
        })
    }

    fn push_transform(&mut self, node: TransformNode) -> TransformId {
        let id = TransformId(u32::try_from(self.transforms.len()).expect("forest overflow"));
        self.transforms.push(node);
        id
    }

    /// Appends a rectangular clip node.
    pub fn create_clip(
        &mut self,
        parent: ClipId,
        local_transform_space: TransformId,
        rect: Rect,
    ) -> ClipId {
        self.create_rounded_clip(
            parent,
            local_transform_space,
            rect,
            RoundedRectRadii::from_single_radius(0.0),
        )
    }

    /// Appends a clip node with per-corner radii.
    pub fn create_rounded_clip(
        &mut self,
        parent: ClipId,
        local_transform_space: TransformId,
        rect: Rect,
        radii: RoundedRectRadii,
    ) -> ClipId {
        assert!(
            parent.index() < self.clips.len(),
            "parent clip must be created first"
        );
        assert!(
            local_transform_space.index() < self.transforms.len(),
            "clip transform space must be created first"
        );
        let id = ClipId(u32::try_from(self.clips.len()).expect("forest overflow"));
        self.clips.push(ClipNode {
            parent: Some(parent),
            local_transform_space,
            rect,
            radii,
        });
        id
    }

    /// Appends an effect node.
    pub fn create_effect(&mut self, node: EffectNode) -> EffectId {
        let parent = node.parent.expect("non-root effect nodes need a parent");
        assert!(
            parent.index() < self.effects.len(),
            "parent effect must be created first"
        );
        assert!(
            node.local_transform_space.index() < self.transforms.len(),
            "effect transform space must be created first"
        );
        if let Some(clip) = node.output_clip {
            assert!(
                clip.index() < self.clips.len(),
                "effect output clip must be created first"
            );
        }
        let id = EffectId(u32::try_from(self.effects.len()).expect("forest overflow"));
        self.effects.push(node);
        id
    }

    /// Appends a plain opacity effect node.
    pub fn create_opacity_effect(
        &mut self,
        parent: EffectId,
        local_transform_space: TransformId,
        output_clip: Option<ClipId>,
        opacity: f32,
    ) -> EffectId {
        self.create_effect(EffectNode {
            parent: Some(parent),
            local_transform_space,
            output_clip,
            opacity,
            filter: FilterOps::none(),
            backdrop_filter: FilterOps::none(),
            blend_mode: BlendMode::SourceOver,
            element_id: CompositorElementId::INVALID,
        })
    }

    /// Appends a filter effect node.
    pub fn create_filter_effect(
        &mut self,
        parent: EffectId,
        local_transform_space: TransformId,
        output_clip: Option<ClipId>,
        filter: FilterOps,
    ) -> EffectId {
        self.create_effect(EffectNode {
            parent: Some(parent),
            local_transform_space,
            output_clip,
            opacity: 1.0,
            filter,
            backdrop_filter: FilterOps::none(),
            blend_mode: BlendMode::SourceOver,
            element_id: CompositorElementId::INVALID,
        })
    }

    /// Appends a scroll node.
    pub fn create_scroll(&mut self, node: ScrollNode) -> ScrollId {
        let parent = node.parent.expect("non-root scroll nodes need a parent");
        assert!(
            parent.index() < self.scrolls.len(),
            "parent scroll must be created first"
        );
        let id = ScrollId(u32::try_from(self.scrolls.len()).expect("forest overflow"));
        self.scrolls.push(node);
        id
    }

    // --- Ancestor queries ---

    /// Returns whether `ancestor` is `node` or one of its ancestors.
    #[must_use]
    pub fn transform_is_ancestor_of(&self, ancestor: TransformId, node: TransformId) -> bool {
        let mut current = node;
        loop {
            if current == ancestor {
                return true;
            }
            match self.transform(current).parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Returns whether `ancestor` is `node` or one of its ancestors.
    #[must_use]
    pub fn clip_is_ancestor_of(&self, ancestor: ClipId, node: ClipId) -> bool {
        let mut current = node;
        loop {
            if current == ancestor {
                return true;
            }
            match self.clip(current).parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Returns whether `ancestor` is `node` or one of its ancestors.
    #[must_use]
    pub fn effect_is_ancestor_of(&self, ancestor: EffectId, node: EffectId) -> bool {
        let mut current = node;
        loop {
            if current == ancestor {
                return true;
            }
            match self.effect(current).parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// The lowest common ancestor of two transform nodes.
    ///
    /// Because parent indices are strictly smaller than child indices, the
    /// deeper candidate is always the one with the larger index.
    #[must_use]
    pub fn lowest_common_transform_ancestor(
        &self,
        a: TransformId,
        b: TransformId,
    ) -> TransformId {
        let (mut a, mut b) = (a, b);
        while a != b {
            if a.0 > b.0 {
                a = self.transform(a).parent.expect("walked past the root");
            } else {
                b = self.transform(b).parent.expect("walked past the root");
            }
        }
        a
    }

    /// The lowest common ancestor of two effect nodes.
    #[must_use]
    pub fn lowest_common_effect_ancestor(&self, a: EffectId, b: EffectId) -> EffectId {
        let (mut a, mut b) = (a, b);
        while a != b {
            if a.0 > b.0 {
                a = self.effect(a).parent.expect("walked past the root");
            } else {
                b = self.effect(b).parent.expect("walked past the root");
            }
        }
        a
    }

    /// Number of transform nodes, roots included.
    #[must_use]
    pub fn transform_count(&self) -> usize {
        self.transforms.len()
    }

    /// Number of clip nodes, roots included.
    #[must_use]
    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    /// Number of effect nodes, roots included.
    #[must_use]
    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    /// Number of scroll nodes, roots included.
    #[must_use]
    pub fn scroll_count(&self) -> usize {
        self.scrolls.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_forest_has_roots() {
        let forest = PropertyForest::new();
        assert_eq!(forest.transform_count(), 1);
        assert_eq!(forest.clip_count(), 1);
        assert_eq!(forest.effect_count(), 1);
        assert_eq!(forest.scroll_count(), 1);
        assert!(forest.transform(TransformId::ROOT).parent.is_none());
        assert_eq!(forest.effect(EffectId::ROOT).opacity, 1.0);
    }

    #[test]
    fn parent_indices_precede_children() {
        let mut forest = PropertyForest::new();
        let t1 = forest.create_2d_translation(TransformId::ROOT, Vec2::new(1.0, 0.0));
        let t2 = forest.create_2d_translation(t1, Vec2::new(0.0, 1.0));
        assert!(t1.0 < t2.0);
        assert_eq!(forest.transform(t2).parent, Some(t1));
    }

    #[test]
    fn ancestor_queries() {
        let mut forest = PropertyForest::new();
        let t1 = forest.create_2d_translation(TransformId::ROOT, Vec2::new(1.0, 0.0));
        let t2 = forest.create_2d_translation(t1, Vec2::new(0.0, 1.0));
        let t3 = forest.create_2d_translation(TransformId::ROOT, Vec2::new(5.0, 5.0));
        assert!(forest.transform_is_ancestor_of(t1, t2));
        assert!(forest.transform_is_ancestor_of(t2, t2));
        assert!(!forest.transform_is_ancestor_of(t2, t1));
        assert!(!forest.transform_is_ancestor_of(t3, t2));
        assert_eq!(forest.lowest_common_transform_ancestor(t2, t3), TransformId::ROOT);
        assert_eq!(forest.lowest_common_transform_ancestor(t1, t2), t1);
    }

    #[test]
    fn effect_lca() {
        let mut forest = PropertyForest::new();
        let e1 =
            forest.create_opacity_effect(EffectId::ROOT, TransformId::ROOT, None, 0.5);
        let e2 = forest.create_opacity_effect(e1, TransformId::ROOT, None, 0.25);
        let e3 =
            forest.create_opacity_effect(EffectId::ROOT, TransformId::ROOT, None, 0.75);
        assert_eq!(forest.lowest_common_effect_ancestor(e2, e3), EffectId::ROOT);
        assert_eq!(forest.lowest_common_effect_ancestor(e1, e2), e1);
        assert!(forest.effect_is_ancestor_of(e1, e2));
    }

    #[test]
    #[should_panic(expected = "parent transform must be created first")]
    fn parent_must_exist() {
        let mut forest = PropertyForest::new();
        let _ = forest.create_2d_translation(TransformId(9), Vec2::ZERO);
    }
}
