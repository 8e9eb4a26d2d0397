// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node payloads for the four property trees.

use kurbo::{Rect, RoundedRectRadii, Size};

use crate::filter::FilterOps;
use crate::forest::id::{ClipId, CompositorElementId, EffectId, ScrollId, TransformId};
use crate::transform::Transform3d;

/// How an effect's output blends into its backdrop.
///
/// Only the modes the compositing core distinguishes are listed. Everything
/// except [`SourceOver`](Self::SourceOver) requires a render surface so the
/// blend sees a flattened backdrop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlendMode {
    /// Normal source-over compositing.
    #[default]
    SourceOver,
    /// Source kept where the destination is opaque.
    SourceIn,
    /// Destination kept where the source is opaque. Used for mask layers.
    DstIn,
    /// Multiply blend.
    Multiply,
    /// Screen blend.
    Screen,
}

/// A transform node: a 3-D matrix applied about an origin, relative to the
/// parent transform space.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformNode {
    /// Parent transform node. `None` only for the root.
    pub parent: Option<TransformId>,
    /// The local matrix.
    pub matrix: Transform3d,
    /// Point the matrix applies about, in the local space.
    pub origin: [f64; 3],
    /// Whether inherited 3-D is flattened into the plane before this node
    /// applies.
    pub flattens_inherited_transform: bool,
    /// Nodes sharing a nonzero id sort in a common 3-D rendering context.
    pub rendering_context_id: u32,
    /// When set, the matrix is a scroll offset translation governed by this
    /// scroll node.
    pub scroll: Option<ScrollId>,
    /// Identity for compositor-side direct updates.
    pub element_id: CompositorElementId,
}

impl TransformNode {
    /// Returns whether this node is a scroll offset translation.
    #[inline]
    #[must_use]
    pub const fn is_scroll_translation(&self) -> bool {
        self.scroll.is_some()
    }

    /// The local matrix with the transform origin applied.
    #[must_use]
    pub fn matrix_with_origin(&self) -> Transform3d {
        self.matrix.about_origin(self.origin)
    }
}

/// A clip node: a rect, optionally rounded, in a transform space.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipNode {
    /// Parent clip node. `None` only for the root.
    pub parent: Option<ClipId>,
    /// Transform space the rect is defined in.
    pub local_transform_space: TransformId,
    /// The clip rect in the local transform space.
    pub rect: Rect,
    /// Per-corner radii. All zero for a plain rectangular clip.
    pub radii: RoundedRectRadii,
}

impl ClipNode {
    /// Returns whether any corner has a nonzero radius.
    #[must_use]
    pub fn is_rounded(&self) -> bool {
        let r = &self.radii;
        r.top_left > 0.0 || r.top_right > 0.0 || r.bottom_right > 0.0 || r.bottom_left > 0.0
    }
}

/// An effect node: a grouping that composites its subtree as a unit.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectNode {
    /// Parent effect node. `None` only for the root.
    pub parent: Option<EffectId>,
    /// Transform space the effect's filters operate in.
    pub local_transform_space: TransformId,
    /// Clip applied to the effect's output, if any.
    pub output_clip: Option<ClipId>,
    /// Uniform opacity in `[0, 1]`.
    pub opacity: f32,
    /// Filters applied to the subtree's output.
    pub filter: FilterOps,
    /// Filters applied to the backdrop behind the subtree.
    pub backdrop_filter: FilterOps,
    /// How the output blends into the backdrop.
    pub blend_mode: BlendMode,
    /// Identity for compositor-side direct updates.
    pub element_id: CompositorElementId,
}

impl EffectNode {
    /// Returns whether this effect changes pixels outside its subtree's own
    /// bounds when drawn.
    #[must_use]
    pub fn has_pixel_moving_filter(&self) -> bool {
        self.filter.moves_pixels()
    }

    /// Returns whether compositing this effect needs its own render surface:
    /// backdrop filters, any filter, or a non-default blend mode.
    #[must_use]
    pub fn needs_render_surface(&self) -> bool {
        !self.backdrop_filter.is_empty()
            || !self.filter.is_empty()
            || self.blend_mode != BlendMode::SourceOver
    }
}

/// A scroll node: the scrollable geometry behind a scroll translation.
#[derive(Clone, Debug, PartialEq)]
pub struct ScrollNode {
    /// Parent scroll node. `None` only for the root.
    pub parent: Option<ScrollId>,
    /// The visible container rect, in the container's space.
    pub container_rect: Rect,
    /// Size of the scrolled contents.
    pub contents_size: Size,
    /// Whether the user can scroll horizontally.
    pub user_scrollable_horizontal: bool,
    /// Whether the user can scroll vertically.
    pub user_scrollable_vertical: bool,
    /// Identity for compositor-side scroll offset updates.
    pub element_id: CompositorElementId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_blend_is_source_over() {
        assert_eq!(BlendMode::default(), BlendMode::SourceOver);
    }

    #[test]
    fn rounded_detection() {
        let mut node = ClipNode {
            parent: None,
            local_transform_space: TransformId::ROOT,
            rect: Rect::new(0.0, 0.0, 100.0, 100.0),
            radii: RoundedRectRadii::from_single_radius(0.0),
        };
        assert!(!node.is_rounded());
        node.radii.bottom_left = 2.0;
        assert!(node.is_rounded());
    }
}
