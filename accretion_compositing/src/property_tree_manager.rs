// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Translation of the paint property forest into compositor property trees.
//!
//! [`PropertyTreeManager`] drives one compositing pass: layers arrive in
//! emission order, each tagged with the paint effect and clip it draws
//! under, and the manager incrementally opens and closes compositor effect
//! nodes to mirror that nesting. Clips the compositor cannot express in an
//! effect node's native clip slot (rounded corners without shader support,
//! rects whose space is not axis-aligned with the target surface) get
//! *synthetic* effect nodes, and rounded ones may additionally get a
//! `DstIn` mask layer when content actually draws beneath them.
//!
//! The open-effect nesting is held as an explicit stack of [`EffectState`]
//! values; the stack plus `current` is the entire recursion state of the
//! tree walk, and [`finalize`](PropertyTreeManager::finalize) consumes the
//! manager so a finished pass cannot be reused.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Affine, Vec2};

use accretion_paint::filter::FilterOps;
use accretion_paint::forest::{
    BlendMode, ClipId, CompositorElementId, EffectId, PropertyForest, ScrollId, TransformId,
};
use accretion_paint::transform::{AXIS_ALIGNMENT_EPSILON, Transform3d};

use crate::layer_list::{LayerId, LayerListBuilder, LayerListEntry, RootLayer};
use crate::trace::{
    EffectClosedEvent, EffectOpenedEvent, MaskLayerEvent, RenderSurfaceEvent, Tracer,
};
use crate::tree::{
    CcClipNode, CcEffectNode, CcScrollNode, CcTransformNode, PropertyTrees, RenderSurfaceReason,
    INVALID_NODE_ID,
};

/// What the target compositor can do, fixed for a pass.
#[derive(Clone, Copy, Debug)]
pub struct CompositorCapabilities {
    /// Whether rounded clips can be applied in the shader without a mask
    /// layer. Only axis-aligned rounded clips qualify regardless.
    pub supports_shader_rounded_corners: bool,
}

impl Default for CompositorCapabilities {
    fn default() -> Self {
        Self {
            supports_shader_rounded_corners: true,
        }
    }
}

/// The mask layer bundle the client hands back for a synthesized clip.
#[derive(Clone, Copy, Debug)]
pub struct SynthesizedClip {
    /// The mask layer, present when one was requested.
    pub layer: Option<LayerId>,
    /// Stable element id for the mask isolation effect node.
    pub mask_isolation_element: CompositorElementId,
    /// Stable element id for the mask effect node.
    pub mask_effect_element: CompositorElementId,
}

/// Supplies GPU-backed mask layers for synthesized clips.
///
/// This is the manager's only inversion-of-control point: the manager
/// decides *when* a mask is needed, the client owns and reuses the actual
/// layer objects across passes.
pub trait PropertyTreeManagerClient {
    /// Finds or creates the mask layer for a synthesized clip.
    ///
    /// `needs_layer` is false when no content drew under the clip; the
    /// client still returns stable element ids so the isolation node keeps
    /// its identity across passes, but may omit the layer.
    fn create_or_reuse_synthesized_clip_layer(
        &mut self,
        clip: ClipId,
        transform: TransformId,
        needs_layer: bool,
    ) -> SynthesizedClip;
}

/// Lazily resolved 2-D axis alignment of an effect state relative to its
/// nearest render surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Alignment2d {
    Unknown,
    Aligned,
    Misaligned,
}

/// Why a compositor effect node exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CcEffectType {
    /// Synthesized for a rounded clip that needs masking or shader corners.
    for_non_trivial_clip: bool,
    /// Synthesized so a clip applies in an axis-aligned space.
    for_2d_axis_alignment: bool,
}

impl CcEffectType {
    const PLAIN: Self = Self {
        for_non_trivial_clip: false,
        for_2d_axis_alignment: false,
    };

    const fn is_synthetic(self) -> bool {
        self.for_non_trivial_clip || self.for_2d_axis_alignment
    }
}

/// Snapshot of one open compositor effect. The stack of these mirrors the
/// nesting of the paint effects currently entered; the top of the stack is
/// always the state one level outside `current`.
#[derive(Clone, Copy, Debug)]
struct EffectState {
    /// The open compositor effect node.
    effect_id: u32,
    ty: CcEffectType,
    /// The paint effect this state was opened for. Synthetic states carry
    /// the effect of the context that created them.
    effect: EffectId,
    /// The clip in force for content under this state.
    clip: ClipId,
    /// Transform space of the state, for alignment resolution.
    transform: TransformId,
    alignment: Alignment2d,
    /// Whether an ancestor state is a surface-less synthetic rounded clip.
    contained_by_surfaceless_rounded_clip: bool,
}

/// Builds the compositor property trees for one compositing pass.
///
/// Layers must be announced via
/// [`switch_to_effect_node_with_synthesized_clip`](Self::switch_to_effect_node_with_synthesized_clip)
/// in emission order; out-of-order calls corrupt the effect stack. The
/// paint forest is read-only input; the manager exclusively owns the
/// output trees and the root layer's child list for the pass.
pub struct PropertyTreeManager<'a> {
    client: &'a mut dyn PropertyTreeManagerClient,
    forest: &'a PropertyForest,
    trees: &'a mut PropertyTrees,
    root_layer: &'a mut RootLayer,
    layer_list: &'a mut LayerListBuilder,
    capabilities: CompositorCapabilities,
    tracer: Tracer<'a>,
    sequence_number: u32,

    // Paint node index -> compositor node id, INVALID until translated.
    transform_ids: Vec<u32>,
    clip_ids: Vec<u32>,
    scroll_ids: Vec<u32>,

    current: EffectState,
    effect_stack: Vec<EffectState>,
    /// Mask isolation nodes whose mask layer may still be skipped because
    /// no content has drawn under them.
    pending_synthetic_mask_layers: BTreeSet<u32>,
}

impl core::fmt::Debug for PropertyTreeManager<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyTreeManager")
            .field("sequence_number", &self.sequence_number)
            .field("current", &self.current)
            .field("effect_stack", &self.effect_stack)
            .finish_non_exhaustive()
    }
}

impl<'a> PropertyTreeManager<'a> {
    /// Starts a pass: clears the output trees, installs the four root
    /// nodes, and opens the root effect.
    pub fn new(
        client: &'a mut dyn PropertyTreeManagerClient,
        forest: &'a PropertyForest,
        trees: &'a mut PropertyTrees,
        root_layer: &'a mut RootLayer,
        layer_list: &'a mut LayerListBuilder,
        capabilities: CompositorCapabilities,
        tracer: Tracer<'a>,
    ) -> Self {
        let sequence_number = trees.clear_for_pass();

        let root_transform = trees.push_transform(CcTransformNode {
            parent_id: INVALID_NODE_ID,
            local: Transform3d::IDENTITY,
            origin: [0.0; 3],
            flattens_inherited_transform: false,
            sorting_context_id: 0,
            scroll_offset: Vec2::ZERO,
            scroll_node_id: INVALID_NODE_ID,
            element_id: CompositorElementId::INVALID,
            transform_changed: false,
            sequence_number,
        });
        let root_clip = trees.push_clip(CcClipNode {
            parent_id: INVALID_NODE_ID,
            clip_rect: forest.clip(ClipId::ROOT).rect,
            transform_id: root_transform,
            sequence_number,
        });
        let root_effect = trees.push_effect(CcEffectNode {
            parent_id: INVALID_NODE_ID,
            transform_id: root_transform,
            clip_id: root_clip,
            opacity: 1.0,
            filters: FilterOps::none(),
            backdrop_filters: FilterOps::none(),
            blend_mode: BlendMode::SourceOver,
            render_surface_reason: Some(RenderSurfaceReason::Root),
            fast_rounded_corner: None,
            element_id: CompositorElementId::INVALID,
            effect_changed: false,
            sequence_number,
        });
        let root_scroll_node = forest.scroll(ScrollId::ROOT);
        let root_scroll = trees.push_scroll(CcScrollNode {
            parent_id: INVALID_NODE_ID,
            container_rect: root_scroll_node.container_rect,
            contents_size: root_scroll_node.contents_size,
            user_scrollable_horizontal: root_scroll_node.user_scrollable_horizontal,
            user_scrollable_vertical: root_scroll_node.user_scrollable_vertical,
            scrolls_inner_viewport: false,
            scrolls_outer_viewport: false,
            is_composited: false,
            transform_id: root_transform,
            element_id: root_scroll_node.element_id,
            sequence_number,
        });

        let mut transform_ids = alloc::vec![INVALID_NODE_ID; forest.transform_count()];
        let mut clip_ids = alloc::vec![INVALID_NODE_ID; forest.clip_count()];
        let mut scroll_ids = alloc::vec![INVALID_NODE_ID; forest.scroll_count()];
        transform_ids[0] = root_transform;
        clip_ids[0] = root_clip;
        scroll_ids[0] = root_scroll;

        Self {
            client,
            forest,
            trees,
            root_layer,
            layer_list,
            capabilities,
            tracer,
            sequence_number,
            transform_ids,
            clip_ids,
            scroll_ids,
            current: EffectState {
                effect_id: root_effect,
                ty: CcEffectType::PLAIN,
                effect: EffectId::ROOT,
                clip: ClipId::ROOT,
                transform: TransformId::ROOT,
                alignment: Alignment2d::Aligned,
                contained_by_surfaceless_rounded_clip: false,
            },
            effect_stack: Vec::new(),
            pending_synthetic_mask_layers: BTreeSet::new(),
        }
    }

    // --- Find-or-create node translation ---

    /// The compositor transform node for `id`, creating it and any missing
    /// ancestors. Scroll translations also get their scroll node ensured
    /// and wired. Idempotent.
    pub fn ensure_compositor_transform_node(&mut self, id: TransformId) -> u32 {
        if self.transform_ids[id.index()] != INVALID_NODE_ID {
            return self.transform_ids[id.index()];
        }
        // Collect the untranslated tail of the ancestor chain, then create
        // top-down so parents always exist first.
        let mut worklist = Vec::new();
        let mut cursor = id;
        while self.transform_ids[cursor.index()] == INVALID_NODE_ID {
            worklist.push(cursor);
            cursor = self
                .forest
                .transform(cursor)
                .parent
                .expect("root transform is registered at pass start");
        }
        while let Some(paint_id) = worklist.pop() {
            let node = self.forest.transform(paint_id);
            let parent_cc = self.transform_ids[node.parent.expect("non-root").index()];
            let scroll = node.scroll;

            let mut local = node.matrix;
            let mut scroll_offset = Vec2::ZERO;
            if scroll.is_some() {
                // Prefer the committed offset over the painted one so a
                // rebuild does not snap an actively scrolling node back.
                scroll_offset = self
                    .trees
                    .scroll_offset(node.element_id)
                    .unwrap_or_else(|| -node.matrix.translation_2d());
                local = Transform3d::from_translation(-scroll_offset.x, -scroll_offset.y, 0.0);
            }
            let cc_id = self.trees.push_transform(CcTransformNode {
                parent_id: parent_cc,
                local,
                origin: node.origin,
                flattens_inherited_transform: node.flattens_inherited_transform,
                sorting_context_id: node.rendering_context_id,
                scroll_offset,
                scroll_node_id: INVALID_NODE_ID,
                element_id: node.element_id,
                transform_changed: false,
                sequence_number: self.sequence_number,
            });
            self.transform_ids[paint_id.index()] = cc_id;

            if let Some(scroll) = scroll {
                let scroll_cc = self.ensure_scroll_node(scroll);
                self.trees.scroll_node_mut(scroll_cc).transform_id = cc_id;
                self.trees.transform_node_mut(cc_id).scroll_node_id = scroll_cc;
            }
        }
        self.transform_ids[id.index()]
    }

    /// The compositor clip node for `id`, creating it and any missing
    /// ancestors. Idempotent.
    pub fn ensure_compositor_clip_node(&mut self, id: ClipId) -> u32 {
        if self.clip_ids[id.index()] != INVALID_NODE_ID {
            return self.clip_ids[id.index()];
        }
        let mut worklist = Vec::new();
        let mut cursor = id;
        while self.clip_ids[cursor.index()] == INVALID_NODE_ID {
            worklist.push(cursor);
            cursor = self
                .forest
                .clip(cursor)
                .parent
                .expect("root clip is registered at pass start");
        }
        while let Some(paint_id) = worklist.pop() {
            let node = self.forest.clip(paint_id);
            let parent_cc = self.clip_ids[node.parent.expect("non-root").index()];
            let rect = node.rect;
            let space = node.local_transform_space;
            let transform_cc = self.ensure_compositor_transform_node(space);
            let cc_id = self.trees.push_clip(CcClipNode {
                parent_id: parent_cc,
                clip_rect: rect,
                transform_id: transform_cc,
                sequence_number: self.sequence_number,
            });
            self.clip_ids[paint_id.index()] = cc_id;
        }
        self.clip_ids[id.index()]
    }

    /// The compositor scroll node for the scroll translation
    /// `scroll_translation`, creating and wiring it as needed.
    pub fn ensure_compositor_scroll_node(&mut self, scroll_translation: TransformId) -> u32 {
        let transform_cc = self.ensure_compositor_transform_node(scroll_translation);
        let scroll_cc = self.trees.transform_node(transform_cc).scroll_node_id;
        assert!(
            scroll_cc != INVALID_NODE_ID,
            "transform must be a scroll translation"
        );
        scroll_cc
    }

    /// Bulk variant for pre-registering a set of scroll translations.
    pub fn ensure_compositor_scroll_nodes(&mut self, scroll_translations: &[TransformId]) {
        for &id in scroll_translations {
            let _ = self.ensure_compositor_scroll_node(id);
        }
    }

    /// Ensures the scroll node for the inner (pinch) viewport.
    pub fn ensure_compositor_inner_scroll_node(&mut self, scroll_translation: TransformId) -> u32 {
        let scroll_cc = self.ensure_compositor_scroll_node(scroll_translation);
        self.trees.scroll_node_mut(scroll_cc).scrolls_inner_viewport = true;
        scroll_cc
    }

    /// Ensures the scroll node for the outer viewport.
    pub fn ensure_compositor_outer_scroll_node(&mut self, scroll_translation: TransformId) -> u32 {
        let scroll_cc = self.ensure_compositor_scroll_node(scroll_translation);
        self.trees.scroll_node_mut(scroll_cc).scrolls_outer_viewport = true;
        scroll_cc
    }

    /// Ensures the page scale transform node and records it on the trees
    /// for the page-scale direct update path.
    pub fn ensure_compositor_page_scale_transform_node(&mut self, id: TransformId) -> u32 {
        let cc_id = self.ensure_compositor_transform_node(id);
        self.trees.set_page_scale_transform_id(cc_id);
        cc_id
    }

    /// Marks a compositor scroll node as composited.
    pub fn set_cc_scroll_node_is_composited(&mut self, cc_scroll_id: u32) {
        self.trees.set_scroll_node_is_composited(cc_scroll_id);
    }

    fn ensure_scroll_node(&mut self, id: ScrollId) -> u32 {
        if self.scroll_ids[id.index()] != INVALID_NODE_ID {
            return self.scroll_ids[id.index()];
        }
        let mut worklist = Vec::new();
        let mut cursor = id;
        while self.scroll_ids[cursor.index()] == INVALID_NODE_ID {
            worklist.push(cursor);
            cursor = self
                .forest
                .scroll(cursor)
                .parent
                .expect("root scroll is registered at pass start");
        }
        while let Some(paint_id) = worklist.pop() {
            let node = self.forest.scroll(paint_id);
            let parent_cc = self.scroll_ids[node.parent.expect("non-root").index()];
            let cc_id = self.trees.push_scroll(CcScrollNode {
                parent_id: parent_cc,
                container_rect: node.container_rect,
                contents_size: node.contents_size,
                user_scrollable_horizontal: node.user_scrollable_horizontal,
                user_scrollable_vertical: node.user_scrollable_vertical,
                scrolls_inner_viewport: false,
                scrolls_outer_viewport: false,
                is_composited: false,
                // Wired when the scroll translation is translated.
                transform_id: INVALID_NODE_ID,
                element_id: node.element_id,
                sequence_number: self.sequence_number,
            });
            self.scroll_ids[paint_id.index()] = cc_id;
        }
        self.scroll_ids[id.index()]
    }

    // --- Effect state machine ---

    /// Moves the open-effect state machine to the context a new layer draws
    /// in, and returns the compositor effect node the layer must be
    /// parented under.
    ///
    /// Must be called once per layer, in layer emission order. When
    /// `layer_draws_content` is true, all open synthetic rounded clips are
    /// committed to emitting their mask layers, and any of them nested
    /// inside another open rounded clip gets a render surface forced.
    pub fn switch_to_effect_node_with_synthesized_clip(
        &mut self,
        next_effect: EffectId,
        next_clip: ClipId,
        layer_draws_content: bool,
    ) -> u32 {
        let ancestor = self
            .forest
            .lowest_common_effect_ancestor(self.current.effect, next_effect);
        while self.current.effect != ancestor {
            self.close_cc_effect();
        }
        self.build_effect_nodes_toward(next_effect);
        let _ = self.synthesize_cc_effects_for_clips_if_needed(next_clip, None);

        if layer_draws_content {
            if self.current.contained_by_surfaceless_rounded_clip {
                self.force_render_surfaces_for_nested_rounded_clips();
            }
            self.pending_synthetic_mask_layers.clear();
        }
        self.current.effect_id
    }

    /// Closes every still-open effect, emitting any outstanding clip mask
    /// layers. Consumes the manager; a finished pass cannot be reused.
    pub fn finalize(mut self) {
        while !self.effect_stack.is_empty() {
            self.close_cc_effect();
        }
        debug_assert!(
            self.current.effect.is_root(),
            "unwinding must end at the root effect"
        );
    }

    /// Opens compositor effect nodes for every paint effect between the
    /// current effect (exclusive) and `next_effect` (inclusive).
    ///
    /// The current effect must already be an ancestor of `next_effect`;
    /// the switch's unwind step guarantees it.
    fn build_effect_nodes_toward(&mut self, next_effect: EffectId) {
        let mut worklist = Vec::new();
        let mut cursor = next_effect;
        while cursor != self.current.effect {
            worklist.push(cursor);
            cursor = self
                .forest
                .effect(cursor)
                .parent
                .expect("current effect must be an ancestor of the target");
        }

        while let Some(effect) = worklist.pop() {
            let node = self.forest.effect(effect);
            let output_clip = node.output_clip;
            let local_transform_space = node.local_transform_space;
            let clip = output_clip.unwrap_or(self.current.clip);

            // A backdrop effect whose output clip needs synthesis is
            // realized into the outermost synthetic node, so the backdrop
            // read happens outside the synthesized clips.
            let realized = match output_clip {
                Some(target) => self.synthesize_cc_effects_for_clips_if_needed(target, Some(effect)),
                None => None,
            };
            let cc_id = match realized {
                Some(id) => id,
                None => self.create_plain_cc_effect(effect, clip),
            };
            self.push_state(EffectState {
                effect_id: cc_id,
                ty: CcEffectType::PLAIN,
                effect,
                clip,
                transform: local_transform_space,
                alignment: Alignment2d::Unknown,
                contained_by_surfaceless_rounded_clip: false,
            });
        }
    }

    fn create_plain_cc_effect(&mut self, effect: EffectId, output_clip: ClipId) -> u32 {
        let transform_cc =
            self.ensure_compositor_transform_node(self.forest.effect(effect).local_transform_space);
        let clip_cc = self.ensure_compositor_clip_node(output_clip);
        let node = self.forest.effect(effect);
        let render_surface_reason = if !node.backdrop_filter.is_empty() {
            Some(RenderSurfaceReason::BackdropFilter)
        } else if !node.filter.is_empty() {
            Some(RenderSurfaceReason::Filter)
        } else if node.blend_mode != BlendMode::SourceOver {
            Some(RenderSurfaceReason::BlendMode)
        } else {
            None
        };
        let cc_id = self.trees.push_effect(CcEffectNode {
            parent_id: self.current.effect_id,
            transform_id: transform_cc,
            clip_id: clip_cc,
            opacity: node.opacity,
            filters: node.filter.clone(),
            backdrop_filters: node.backdrop_filter.clone(),
            blend_mode: node.blend_mode,
            render_surface_reason,
            fast_rounded_corner: None,
            element_id: node.element_id,
            effect_changed: false,
            sequence_number: self.sequence_number,
        });
        self.tracer.effect_opened(&EffectOpenedEvent {
            cc_effect_id: cc_id,
            synthetic_for_clip: false,
            synthetic_for_alignment: false,
        });
        cc_id
    }

    /// Exits synthetic states that no longer contain `target_clip`, then
    /// opens a synthetic effect node for every clip between the current
    /// clip (exclusive) and `target_clip` (inclusive) that the compositor
    /// cannot express natively.
    ///
    /// When `realize` names a backdrop-filtered effect and at least one
    /// synthetic node is created, the effect is folded into the outermost
    /// new node and the innermost new node's id is returned; `None` means
    /// the caller still needs a plain effect node.
    fn synthesize_cc_effects_for_clips_if_needed(
        &mut self,
        target_clip: ClipId,
        realize: Option<EffectId>,
    ) -> Option<u32> {
        while self.current.ty.is_synthetic()
            && !self.forest.clip_is_ancestor_of(self.current.clip, target_clip)
        {
            self.close_cc_effect();
        }

        let mut chain = Vec::new();
        let mut cursor = target_clip;
        while cursor != self.current.clip {
            chain.push(cursor);
            match self.forest.clip(cursor).parent {
                Some(parent) => cursor = parent,
                None => {
                    debug_assert!(false, "current clip must contain the target clip");
                    break;
                }
            }
        }

        let has_backdrop = realize
            .is_some_and(|effect| !self.forest.effect(effect).backdrop_filter.is_empty());
        let mut realized = false;
        let mut first_synthetic = true;

        // Outermost first, so each synthetic node nests inside the previous.
        for clip_id in chain.into_iter().rev() {
            let clip_node = self.forest.clip(clip_id);
            let rounded = clip_node.is_rounded();
            let rect = clip_node.rect;
            let radii = clip_node.radii;
            let space = clip_node.local_transform_space;
            let misaligned = self.clip_may_be_2d_axis_misaligned(space);
            if !rounded && !misaligned {
                // Natively expressible through the cc clip tree.
                continue;
            }

            let realize_here = has_backdrop && first_synthetic;
            first_synthetic = false;
            let transform_cc = self.ensure_compositor_transform_node(space);
            let clip_cc = self.ensure_compositor_clip_node(clip_id);
            let shader_eligible =
                rounded && self.capabilities.supports_shader_rounded_corners && !misaligned;

            let mut cc_node = CcEffectNode {
                parent_id: self.current.effect_id,
                transform_id: transform_cc,
                clip_id: clip_cc,
                opacity: 1.0,
                filters: FilterOps::none(),
                backdrop_filters: FilterOps::none(),
                blend_mode: BlendMode::SourceOver,
                render_surface_reason: None,
                fast_rounded_corner: None,
                element_id: CompositorElementId::INVALID,
                effect_changed: false,
                sequence_number: self.sequence_number,
            };
            if realize_here {
                let effect = self
                    .forest
                    .effect(realize.expect("realize_here implies a realize target"));
                cc_node.opacity = effect.opacity;
                cc_node.filters = effect.filter.clone();
                cc_node.backdrop_filters = effect.backdrop_filter.clone();
                cc_node.blend_mode = effect.blend_mode;
                cc_node.element_id = effect.element_id;
                cc_node.render_surface_reason = Some(RenderSurfaceReason::BackdropFilter);
            }
            if rounded {
                if shader_eligible {
                    cc_node.fast_rounded_corner = Some((rect, radii));
                } else if cc_node.render_surface_reason.is_none() {
                    // The DstIn mask must composite against isolated
                    // content.
                    cc_node.render_surface_reason = Some(RenderSurfaceReason::ClipMask);
                }
            } else if cc_node.render_surface_reason.is_none() {
                cc_node.render_surface_reason = Some(RenderSurfaceReason::ClipAxisAlignment);
            }

            let surface_reason = cc_node.render_surface_reason;
            let cc_id = self.trees.push_effect(cc_node);
            self.tracer.effect_opened(&EffectOpenedEvent {
                cc_effect_id: cc_id,
                synthetic_for_clip: rounded,
                synthetic_for_alignment: misaligned,
            });
            if let Some(reason) = surface_reason {
                self.tracer.render_surface(&RenderSurfaceEvent {
                    cc_effect_id: cc_id,
                    reason,
                });
            }
            if rounded && !shader_eligible {
                self.pending_synthetic_mask_layers.insert(cc_id);
            }
            // A realized state lives in the effect's transform space; plain
            // synthetic states live in the clip's.
            let (state_effect, state_transform) = if realize_here {
                let effect = realize.expect("realize_here implies a realize target");
                (effect, self.forest.effect(effect).local_transform_space)
            } else {
                (self.current.effect, space)
            };
            self.push_state(EffectState {
                effect_id: cc_id,
                ty: CcEffectType {
                    for_non_trivial_clip: rounded,
                    for_2d_axis_alignment: misaligned,
                },
                effect: state_effect,
                clip: clip_id,
                transform: state_transform,
                alignment: Alignment2d::Unknown,
                contained_by_surfaceless_rounded_clip: false,
            });
            if realize_here {
                realized = true;
            }
        }
        realized.then_some(self.current.effect_id)
    }

    /// Pushes a new innermost state, deriving the rounded-clip containment
    /// flag from the state it nests inside.
    fn push_state(&mut self, mut state: EffectState) {
        state.contained_by_surfaceless_rounded_clip = self
            .current
            .contained_by_surfaceless_rounded_clip
            || self.state_is_surfaceless_rounded(&self.current);
        let outer = core::mem::replace(&mut self.current, state);
        self.effect_stack.push(outer);
    }

    fn state_is_surfaceless_rounded(&self, state: &EffectState) -> bool {
        state.ty.for_non_trivial_clip
            && !self.trees.effect_node(state.effect_id).has_render_surface()
    }

    /// Closes the innermost open effect, emitting its clip mask layer when
    /// it is a masked synthetic rounded clip.
    fn close_cc_effect(&mut self) {
        let outer = self
            .effect_stack
            .pop()
            .expect("cannot close the root effect state");
        let state = core::mem::replace(&mut self.current, outer);

        let mut mask_emitted = false;
        if state.ty.for_non_trivial_clip
            && self
                .trees
                .effect_node(state.effect_id)
                .fast_rounded_corner
                .is_none()
        {
            // Still pending means nothing drew under the clip, so the mask
            // can be skipped this pass.
            let skip = self.pending_synthetic_mask_layers.remove(&state.effect_id);
            self.emit_clip_mask_layer(&state, !skip);
            mask_emitted = !skip;
        }
        self.tracer.effect_closed(&EffectClosedEvent {
            cc_effect_id: state.effect_id,
            mask_emitted,
        });
    }

    /// Resolves the mask layer for a closing synthetic rounded clip with
    /// the client, and appends the `DstIn` mask layer when content drew.
    fn emit_clip_mask_layer(&mut self, state: &EffectState, needs_layer: bool) {
        let transform_cc = self.ensure_compositor_transform_node(state.transform);
        let clip_cc = self.ensure_compositor_clip_node(state.clip);
        let synthesized =
            self.client
                .create_or_reuse_synthesized_clip_layer(state.clip, state.transform, needs_layer);
        self.trees
            .set_effect_node_element_id(state.effect_id, synthesized.mask_isolation_element);
        if !needs_layer {
            return;
        }
        let layer = synthesized
            .layer
            .expect("client must supply a mask layer when one is needed");
        let mask_effect_id = self.trees.push_effect(CcEffectNode {
            parent_id: state.effect_id,
            transform_id: transform_cc,
            clip_id: clip_cc,
            opacity: 1.0,
            filters: FilterOps::none(),
            backdrop_filters: FilterOps::none(),
            blend_mode: BlendMode::DstIn,
            render_surface_reason: None,
            fast_rounded_corner: None,
            element_id: synthesized.mask_effect_element,
            effect_changed: false,
            sequence_number: self.sequence_number,
        });
        self.layer_list.add(LayerListEntry {
            layer,
            transform_id: transform_cc,
            clip_id: clip_cc,
            effect_id: mask_effect_id,
            draws_content: true,
        });
        self.root_layer.add_child(layer);
        self.tracer.mask_layer(&MaskLayerEvent {
            isolation_effect_id: state.effect_id,
            mask_effect_id,
        });
    }

    /// A content-drawing layer arrived under nested open rounded clips:
    /// every open surface-less rounded clip with another rounded clip
    /// inside it must isolate, because only one shader rounded corner can
    /// apply per surface.
    fn force_render_surfaces_for_nested_rounded_clips(&mut self) {
        let mut seen_inner_rounded = false;
        for state in core::iter::once(&self.current).chain(self.effect_stack.iter().rev()) {
            if !state.ty.for_non_trivial_clip {
                continue;
            }
            if seen_inner_rounded {
                let node = self.trees.effect_node_mut(state.effect_id);
                if node.render_surface_reason.is_none() {
                    node.render_surface_reason = Some(RenderSurfaceReason::RoundedCorner);
                    self.tracer.render_surface(&RenderSurfaceEvent {
                        cc_effect_id: state.effect_id,
                        reason: RenderSurfaceReason::RoundedCorner,
                    });
                }
            }
            seen_inner_rounded = true;
        }
    }

    // --- 2-D axis alignment resolution ---

    /// Whether a clip defined in `clip_space` may be axis-misaligned
    /// relative to the render surface content currently composites into.
    fn clip_may_be_2d_axis_misaligned(&mut self, clip_space: TransformId) -> bool {
        if self.current_may_be_2d_axis_misaligned() {
            return true;
        }
        let projection = self
            .forest
            .source_to_destination_projection(clip_space, self.current.transform);
        !affine_preserves_axis_alignment(projection)
    }

    /// Resolves the current state's lazy alignment flag, memoizing every
    /// state visited along the way.
    fn current_may_be_2d_axis_misaligned(&mut self) -> bool {
        let current = self.current;
        self.effect_stack.push(current);
        let misaligned =
            resolve_alignment_chain(self.forest, self.trees, &mut self.effect_stack);
        self.current = self.effect_stack.pop().expect("chain is never empty");
        misaligned
    }
}

/// Resolves the innermost state's alignment over `[outermost..innermost]`.
///
/// Walks outward to the nearest state with a known flag or a render
/// surface (a surface resets alignment: content inside is judged against
/// it), then fills flags back inward, marking a state misaligned when its
/// outer state is misaligned or the projection between the two transform
/// spaces does not preserve axis alignment.
fn resolve_alignment_chain(
    forest: &PropertyForest,
    trees: &PropertyTrees,
    chain: &mut [EffectState],
) -> bool {
    let last = chain.len() - 1;
    let mut base = last;
    loop {
        let state = &chain[base];
        if state.alignment != Alignment2d::Unknown {
            break;
        }
        if base == 0 || trees.effect_node(state.effect_id).has_render_surface() {
            chain[base].alignment = Alignment2d::Aligned;
            break;
        }
        base -= 1;
    }
    for i in base + 1..=last {
        if trees.effect_node(chain[i].effect_id).has_render_surface() {
            chain[i].alignment = Alignment2d::Aligned;
            continue;
        }
        let outer_misaligned = chain[i - 1].alignment == Alignment2d::Misaligned;
        let step_aligned = affine_preserves_axis_alignment(
            forest.source_to_destination_projection(chain[i].transform, chain[i - 1].transform),
        );
        chain[i].alignment = if outer_misaligned || !step_aligned {
            Alignment2d::Misaligned
        } else {
            Alignment2d::Aligned
        };
    }
    chain[last].alignment == Alignment2d::Misaligned
}

/// Whether mapping by `affine` keeps axis-aligned rects axis-aligned.
///
/// Zero checks use a tolerance: rotations by exact multiples of 90° leave
/// residues around 1e-16 in the off-diagonal coefficients.
fn affine_preserves_axis_alignment(affine: Affine) -> bool {
    let near_zero = |v: f64| v.abs() <= AXIS_ALIGNMENT_EPSILON;
    let [a, b, c, d, _, _] = affine.as_coeffs();
    (near_zero(b) && near_zero(c)) || (near_zero(a) && near_zero(d))
}
