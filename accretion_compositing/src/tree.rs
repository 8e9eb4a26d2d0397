// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The persistent compositor-side property trees.
//!
//! These are the flat, id-addressed trees the compositor consumes. A
//! [`PropertyTreeManager`](crate::PropertyTreeManager) rebuilds them each
//! full pass; between passes, the `directly_*` fast paths patch individual
//! nodes through the element-id maps without a rebuild.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use kurbo::{Rect, RoundedRectRadii, Size, Vec2};

use accretion_paint::filter::FilterOps;
use accretion_paint::forest::{BlendMode, CompositorElementId};
use accretion_paint::transform::Transform3d;

/// "No node" sentinel for compositor node ids.
pub const INVALID_NODE_ID: u32 = u32::MAX;

/// Why an effect node gets its own render surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderSurfaceReason {
    /// The root effect always has a surface.
    Root,
    /// A filter must see its subtree flattened.
    Filter,
    /// A backdrop filter reads the backdrop under its subtree.
    BackdropFilter,
    /// A non-source-over blend must see a flattened backdrop.
    BlendMode,
    /// A synthesized clip mask composites against isolated content.
    ClipMask,
    /// A synthesized clip whose rect is not axis-aligned in the target
    /// surface must isolate so the clip applies in its own space.
    ClipAxisAlignment,
    /// A fast rounded-corner clip with another rounded clip nested inside
    /// must isolate so the corners compose correctly.
    RoundedCorner,
}

/// A compositor transform node.
#[derive(Clone, Debug, PartialEq)]
pub struct CcTransformNode {
    /// Parent node id, [`INVALID_NODE_ID`] for the root.
    pub parent_id: u32,
    /// Local matrix, applied about `origin`.
    pub local: Transform3d,
    /// Transform origin.
    pub origin: [f64; 3],
    /// Whether inherited 3-D flattens before this node applies.
    pub flattens_inherited_transform: bool,
    /// 3-D sorting context, 0 for none.
    pub sorting_context_id: u32,
    /// Current scroll offset when this is a scroll translation.
    pub scroll_offset: Vec2,
    /// Owning scroll node id, [`INVALID_NODE_ID`] when not a scroll
    /// translation.
    pub scroll_node_id: u32,
    /// Element id for direct updates.
    pub element_id: CompositorElementId,
    /// Set by direct updates so the compositor re-draws without a rebuild.
    pub transform_changed: bool,
    /// Pass stamp.
    pub sequence_number: u32,
}

/// A compositor clip node.
#[derive(Clone, Debug, PartialEq)]
pub struct CcClipNode {
    /// Parent node id, [`INVALID_NODE_ID`] for the root.
    pub parent_id: u32,
    /// Clip rect in the space of `transform_id`.
    pub clip_rect: Rect,
    /// Transform node the rect is defined in.
    pub transform_id: u32,
    /// Pass stamp.
    pub sequence_number: u32,
}

/// A compositor effect node.
#[derive(Clone, Debug, PartialEq)]
pub struct CcEffectNode {
    /// Parent node id, [`INVALID_NODE_ID`] for the root.
    pub parent_id: u32,
    /// Transform space of the effect's filters and mask geometry.
    pub transform_id: u32,
    /// Clip applied to the effect's output.
    pub clip_id: u32,
    /// Uniform opacity.
    pub opacity: f32,
    /// Subtree output filters.
    pub filters: FilterOps,
    /// Backdrop filters.
    pub backdrop_filters: FilterOps,
    /// Blend into the target surface.
    pub blend_mode: BlendMode,
    /// Why this node owns a render surface, if it does.
    pub render_surface_reason: Option<RenderSurfaceReason>,
    /// Rounded clip applied in the shader, without a mask layer.
    pub fast_rounded_corner: Option<(Rect, RoundedRectRadii)>,
    /// Element id for direct updates.
    pub element_id: CompositorElementId,
    /// Set by direct updates so the compositor re-draws without a rebuild.
    pub effect_changed: bool,
    /// Pass stamp.
    pub sequence_number: u32,
}

impl CcEffectNode {
    /// Returns whether this effect draws into its own render surface.
    #[inline]
    #[must_use]
    pub const fn has_render_surface(&self) -> bool {
        self.render_surface_reason.is_some()
    }
}

/// A compositor scroll node.
#[derive(Clone, Debug, PartialEq)]
pub struct CcScrollNode {
    /// Parent node id, [`INVALID_NODE_ID`] for the root.
    pub parent_id: u32,
    /// Visible container rect.
    pub container_rect: Rect,
    /// Scrolled contents size.
    pub contents_size: Size,
    /// Whether the user can scroll horizontally.
    pub user_scrollable_horizontal: bool,
    /// Whether the user can scroll vertically.
    pub user_scrollable_vertical: bool,
    /// Whether this scroller scrolls the inner (pinch) viewport.
    pub scrolls_inner_viewport: bool,
    /// Whether this scroller scrolls the outer viewport.
    pub scrolls_outer_viewport: bool,
    /// Whether scrolling happens on the compositor thread.
    pub is_composited: bool,
    /// The scroll translation transform node.
    pub transform_id: u32,
    /// Element id for scroll offset updates.
    pub element_id: CompositorElementId,
    /// Pass stamp.
    pub sequence_number: u32,
}

/// The four compositor property trees, plus the element-id maps used by the
/// between-pass direct update paths.
///
/// Scroll offsets persist across rebuilds; everything else is reconstructed
/// by each pass and stamped with that pass's sequence number.
#[derive(Debug, Default)]
pub struct PropertyTrees {
    transform_nodes: Vec<CcTransformNode>,
    clip_nodes: Vec<CcClipNode>,
    effect_nodes: Vec<CcEffectNode>,
    scroll_nodes: Vec<CcScrollNode>,

    transform_elements: BTreeMap<CompositorElementId, u32>,
    effect_elements: BTreeMap<CompositorElementId, u32>,
    scroll_elements: BTreeMap<CompositorElementId, u32>,
    scroll_offsets: BTreeMap<CompositorElementId, Vec2>,

    page_scale_transform_id: u32,
    sequence_number: u32,
}

impl PropertyTrees {
    /// Creates empty trees. A pass must populate them before use.
    #[must_use]
    pub fn new() -> Self {
        Self {
            page_scale_transform_id: INVALID_NODE_ID,
            ..Self::default()
        }
    }

    /// Discards the previous pass's nodes and starts a new pass.
    ///
    /// Element maps are rebuilt as the pass registers nodes; committed
    /// scroll offsets persist.
    pub fn clear_for_pass(&mut self) -> u32 {
        self.transform_nodes.clear();
        self.clip_nodes.clear();
        self.effect_nodes.clear();
        self.scroll_nodes.clear();
        self.transform_elements.clear();
        self.effect_elements.clear();
        self.scroll_elements.clear();
        self.page_scale_transform_id = INVALID_NODE_ID;
        self.sequence_number += 1;
        self.sequence_number
    }

    /// The current pass stamp.
    #[inline]
    #[must_use]
    pub const fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    // --- Node append and access ---

    /// Appends a transform node, registering its element id.
    pub fn push_transform(&mut self, node: CcTransformNode) -> u32 {
        let id = u32::try_from(self.transform_nodes.len()).expect("tree overflow");
        if node.element_id.is_valid() {
            self.transform_elements.insert(node.element_id, id);
        }
        self.transform_nodes.push(node);
        id
    }

    /// Appends a clip node.
    pub fn push_clip(&mut self, node: CcClipNode) -> u32 {
        let id = u32::try_from(self.clip_nodes.len()).expect("tree overflow");
        self.clip_nodes.push(node);
        id
    }

    /// Appends an effect node, registering its element id.
    pub fn push_effect(&mut self, node: CcEffectNode) -> u32 {
        let id = u32::try_from(self.effect_nodes.len()).expect("tree overflow");
        if node.element_id.is_valid() {
            self.effect_elements.insert(node.element_id, id);
        }
        self.effect_nodes.push(node);
        id
    }

    /// Appends a scroll node, registering its element id.
    pub fn push_scroll(&mut self, node: CcScrollNode) -> u32 {
        let id = u32::try_from(self.scroll_nodes.len()).expect("tree overflow");
        if node.element_id.is_valid() {
            self.scroll_elements.insert(node.element_id, id);
        }
        self.scroll_nodes.push(node);
        id
    }

    /// The transform node for `id`.
    #[inline]
    #[must_use]
    pub fn transform_node(&self, id: u32) -> &CcTransformNode {
        &self.transform_nodes[id as usize]
    }

    /// The transform node for `id`, mutably.
    #[inline]
    pub fn transform_node_mut(&mut self, id: u32) -> &mut CcTransformNode {
        &mut self.transform_nodes[id as usize]
    }

    /// The clip node for `id`.
    #[inline]
    #[must_use]
    pub fn clip_node(&self, id: u32) -> &CcClipNode {
        &self.clip_nodes[id as usize]
    }

    /// The effect node for `id`.
    #[inline]
    #[must_use]
    pub fn effect_node(&self, id: u32) -> &CcEffectNode {
        &self.effect_nodes[id as usize]
    }

    /// The effect node for `id`, mutably.
    #[inline]
    pub fn effect_node_mut(&mut self, id: u32) -> &mut CcEffectNode {
        &mut self.effect_nodes[id as usize]
    }

    /// The scroll node for `id`.
    #[inline]
    #[must_use]
    pub fn scroll_node(&self, id: u32) -> &CcScrollNode {
        &self.scroll_nodes[id as usize]
    }

    /// The scroll node for `id`, mutably.
    #[inline]
    pub fn scroll_node_mut(&mut self, id: u32) -> &mut CcScrollNode {
        &mut self.scroll_nodes[id as usize]
    }

    /// Number of transform nodes.
    #[must_use]
    pub fn transform_count(&self) -> usize {
        self.transform_nodes.len()
    }

    /// Number of clip nodes.
    #[must_use]
    pub fn clip_count(&self) -> usize {
        self.clip_nodes.len()
    }

    /// Number of effect nodes.
    #[must_use]
    pub fn effect_count(&self) -> usize {
        self.effect_nodes.len()
    }

    /// Number of scroll nodes.
    #[must_use]
    pub fn scroll_count(&self) -> usize {
        self.scroll_nodes.len()
    }

    /// Records the page scale transform node for the pass.
    pub fn set_page_scale_transform_id(&mut self, id: u32) {
        self.page_scale_transform_id = id;
    }

    /// The page scale transform node, if the pass registered one.
    #[must_use]
    pub fn page_scale_transform_id(&self) -> Option<u32> {
        (self.page_scale_transform_id != INVALID_NODE_ID).then_some(self.page_scale_transform_id)
    }

    /// The committed scroll offset for `element_id`, if any.
    #[must_use]
    pub fn scroll_offset(&self, element_id: CompositorElementId) -> Option<Vec2> {
        self.scroll_offsets.get(&element_id).copied()
    }

    /// Marks the scroll node as composited (scrolled on the compositor
    /// thread without a main-thread round trip).
    pub fn set_scroll_node_is_composited(&mut self, id: u32) {
        self.scroll_nodes[id as usize].is_composited = true;
    }

    /// Stamps an element id onto an existing effect node and registers it
    /// for direct updates. Used for mask isolation ids handed out by the
    /// client after the node was created.
    pub fn set_effect_node_element_id(&mut self, id: u32, element_id: CompositorElementId) {
        self.effect_nodes[id as usize].element_id = element_id;
        if element_id.is_valid() {
            self.effect_elements.insert(element_id, id);
        }
    }

    // --- Direct update fast paths ---
    //
    // Each returns `false` without side effects when no node is registered
    // for the element, in which case the caller needs a full pass.

    /// Patches a transform node's matrix in place.
    pub fn directly_update_transform(
        &mut self,
        element_id: CompositorElementId,
        matrix: Transform3d,
        origin: [f64; 3],
    ) -> bool {
        let Some(&id) = self.transform_elements.get(&element_id) else {
            return false;
        };
        let node = &mut self.transform_nodes[id as usize];
        node.local = matrix;
        node.origin = origin;
        node.transform_changed = true;
        true
    }

    /// Patches the page scale factor onto the page scale transform node.
    pub fn directly_update_page_scale_transform(&mut self, page_scale: f64) -> bool {
        if self.page_scale_transform_id == INVALID_NODE_ID {
            return false;
        }
        let node = &mut self.transform_nodes[self.page_scale_transform_id as usize];
        node.local = Transform3d::from_scale(page_scale, page_scale, 1.0);
        node.transform_changed = true;
        true
    }

    /// Patches a scroll translation's offset in place.
    pub fn directly_update_scroll_offset_transform(
        &mut self,
        element_id: CompositorElementId,
        offset: Vec2,
    ) -> bool {
        let Some(&id) = self.transform_elements.get(&element_id) else {
            return false;
        };
        let node = &mut self.transform_nodes[id as usize];
        if node.scroll_node_id == INVALID_NODE_ID {
            return false;
        }
        node.scroll_offset = offset;
        node.local = Transform3d::from_translation(-offset.x, -offset.y, 0.0);
        node.transform_changed = true;
        true
    }

    /// Patches an effect node's opacity in place.
    pub fn directly_update_compositor_opacity(
        &mut self,
        element_id: CompositorElementId,
        opacity: f32,
    ) -> bool {
        let Some(&id) = self.effect_elements.get(&element_id) else {
            return false;
        };
        let node = &mut self.effect_nodes[id as usize];
        node.opacity = opacity;
        node.effect_changed = true;
        true
    }

    /// Commits a scroll offset for a registered scroll node.
    pub fn directly_set_scroll_offset(
        &mut self,
        element_id: CompositorElementId,
        offset: Vec2,
    ) -> bool {
        if !self.scroll_elements.contains_key(&element_id) {
            return false;
        }
        self.scroll_offsets.insert(element_id, offset);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transform_node(element_id: CompositorElementId) -> CcTransformNode {
        CcTransformNode {
            parent_id: INVALID_NODE_ID,
            local: Transform3d::IDENTITY,
            origin: [0.0; 3],
            flattens_inherited_transform: false,
            sorting_context_id: 0,
            scroll_offset: Vec2::ZERO,
            scroll_node_id: INVALID_NODE_ID,
            element_id,
            transform_changed: false,
            sequence_number: 1,
        }
    }

    #[test]
    fn clear_for_pass_bumps_sequence_and_keeps_offsets() {
        let mut trees = PropertyTrees::new();
        let element = CompositorElementId(42);
        trees.push_scroll(CcScrollNode {
            parent_id: INVALID_NODE_ID,
            container_rect: Rect::ZERO,
            contents_size: Size::ZERO,
            user_scrollable_horizontal: true,
            user_scrollable_vertical: true,
            scrolls_inner_viewport: false,
            scrolls_outer_viewport: false,
            is_composited: false,
            transform_id: INVALID_NODE_ID,
            element_id: element,
            sequence_number: 0,
        });
        assert!(trees.directly_set_scroll_offset(element, Vec2::new(0.0, 100.0)));

        let seq = trees.clear_for_pass();
        assert_eq!(seq, 1);
        assert_eq!(trees.scroll_count(), 0);
        // The committed offset survives the rebuild.
        assert_eq!(trees.scroll_offset(element), Some(Vec2::new(0.0, 100.0)));
        // The element map does not: the node is gone.
        assert!(!trees.directly_set_scroll_offset(element, Vec2::ZERO));
    }

    #[test]
    fn direct_transform_update_requires_registration() {
        let mut trees = PropertyTrees::new();
        let element = CompositorElementId(7);
        assert!(!trees.directly_update_transform(element, Transform3d::IDENTITY, [0.0; 3]));

        let id = trees.push_transform(transform_node(element));
        let matrix = Transform3d::from_translation(5.0, 6.0, 0.0);
        assert!(trees.directly_update_transform(element, matrix, [0.0; 3]));
        assert_eq!(trees.transform_node(id).local, matrix);
        assert!(trees.transform_node(id).transform_changed);
    }

    #[test]
    fn scroll_offset_transform_update_requires_scroll_translation() {
        let mut trees = PropertyTrees::new();
        let element = CompositorElementId(9);
        // A plain transform registered under the element is not enough.
        trees.push_transform(transform_node(element));
        assert!(!trees.directly_update_scroll_offset_transform(element, Vec2::new(1.0, 2.0)));

        let mut node = transform_node(CompositorElementId(10));
        node.scroll_node_id = 0;
        let id = trees.push_transform(node);
        assert!(
            trees.directly_update_scroll_offset_transform(
                CompositorElementId(10),
                Vec2::new(0.0, 50.0)
            )
        );
        assert_eq!(
            trees.transform_node(id).local,
            Transform3d::from_translation(0.0, -50.0, 0.0)
        );
    }

    #[test]
    fn page_scale_update_needs_registered_node() {
        let mut trees = PropertyTrees::new();
        assert!(!trees.directly_update_page_scale_transform(2.0));
        let id = trees.push_transform(transform_node(CompositorElementId::INVALID));
        trees.set_page_scale_transform_id(id);
        assert!(trees.directly_update_page_scale_transform(2.0));
        assert_eq!(
            trees.transform_node(id).local,
            Transform3d::from_scale(2.0, 2.0, 1.0)
        );
    }
}
