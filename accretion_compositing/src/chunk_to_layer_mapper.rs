// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mapping chunk-space geometry into a layer's space.

use kurbo::{Affine, Rect, Vec2};

use accretion_paint::clip_rect::FloatClipRect;
use accretion_paint::forest::{EffectId, PropertyForest};
use accretion_paint::state::{PaintChunk, PropertyTreeState};

/// Maps visual rects from paint chunk space into a composited layer's space.
///
/// One mapper serves all chunks of one layer: the layer's state and offset
/// are fixed at construction, and [`switch_to_chunk`](Self::switch_to_chunk)
/// re-derives the cached transform and clip only when the incoming chunk's
/// state differs from the current one. Chunk states must be descendants of
/// the layer state in all three trees.
///
/// When a pixel-moving filter (blur, drop shadow) sits on the effect chain
/// between chunk and layer, cheap rect mapping would under-estimate painted
/// bounds, so mapping takes a slow path that expands the rect by each such
/// filter in that filter's own transform space.
#[derive(Debug)]
pub struct ChunkToLayerMapper<'a> {
    forest: &'a PropertyForest,
    layer_state: PropertyTreeState,
    layer_offset: Vec2,
    chunk_state: PropertyTreeState,
    transform: Affine,
    clip_rect: FloatClipRect,
    has_filter_that_moves_pixels: bool,
}

impl<'a> ChunkToLayerMapper<'a> {
    /// Creates a mapper for a layer at `layer_offset` within `layer_state`'s
    /// transform space. The initial chunk state is the layer state.
    #[must_use]
    pub fn new(
        forest: &'a PropertyForest,
        layer_state: PropertyTreeState,
        layer_offset: Vec2,
    ) -> Self {
        Self {
            forest,
            layer_state,
            layer_offset,
            chunk_state: layer_state,
            transform: Affine::translate(-layer_offset),
            clip_rect: FloatClipRect::INFINITE,
            has_filter_that_moves_pixels: false,
        }
    }

    /// Points the mapper at `chunk`'s state.
    pub fn switch_to_chunk(&mut self, chunk: &PaintChunk) {
        self.switch_to_chunk_state(chunk.state);
    }

    /// Points the mapper at a new chunk state, re-deriving caches as needed.
    pub fn switch_to_chunk_state(&mut self, state: PropertyTreeState) {
        if state == self.chunk_state {
            return;
        }

        let new_has_filter = self.chain_has_pixel_moving_filter(state.effect);
        if state.transform == self.chunk_state.transform
            && state.clip == self.chunk_state.clip
            && !new_has_filter
            && !self.has_filter_that_moves_pixels
        {
            // Effect-only switch with no filter implications.
            self.chunk_state = state;
            return;
        }

        self.has_filter_that_moves_pixels = new_has_filter;
        let projection = self
            .forest
            .source_to_destination_projection(state.transform, self.layer_state.transform);
        self.transform = Affine::translate(-self.layer_offset) * projection;
        self.clip_rect = if new_has_filter {
            // The filter spreads pixels beyond any accumulated clip; the
            // slow path handles clipping per mapped rect.
            FloatClipRect::INFINITE
        } else {
            self.accumulated_clip(state)
        };
        self.chunk_state = state;
    }

    /// The cached chunk-to-layer transform, layer offset included.
    #[inline]
    #[must_use]
    pub const fn transform(&self) -> Affine {
        self.transform
    }

    /// The accumulated clip between chunk and layer, in layer space.
    #[inline]
    #[must_use]
    pub const fn clip_rect(&self) -> &FloatClipRect {
        &self.clip_rect
    }

    /// Returns whether mapping currently takes the pixel-moving filter slow
    /// path.
    #[inline]
    #[must_use]
    pub const fn has_filter_that_moves_pixels(&self) -> bool {
        self.has_filter_that_moves_pixels
    }

    /// Maps a visual rect in chunk space to an enclosing integer rect in
    /// layer space. Empty maps to empty.
    #[must_use]
    pub fn map_visual_rect(&self, rect: Rect) -> Rect {
        if rect.is_zero_area() {
            return Rect::ZERO;
        }
        if self.has_filter_that_moves_pixels {
            return self.map_with_pixel_moving_filters(rect).expand();
        }
        let mut mapped = self.transform.transform_rect_bbox(rect);
        if !self.clip_rect.is_infinite() {
            mapped = mapped.intersect(self.clip_rect.rect());
        }
        mapped.expand()
    }

    fn chain_has_pixel_moving_filter(&self, effect: EffectId) -> bool {
        let mut current = effect;
        while current != self.layer_state.effect {
            let node = self.forest.effect(current);
            if node.has_pixel_moving_filter() {
                return true;
            }
            match node.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        false
    }

    fn accumulated_clip(&self, state: PropertyTreeState) -> FloatClipRect {
        debug_assert!(
            self.forest
                .clip_is_ancestor_of(self.layer_state.clip, state.clip),
            "chunk clip must descend from the layer clip"
        );
        let mut accumulated = FloatClipRect::INFINITE;
        let mut current = state.clip;
        while current != self.layer_state.clip {
            let node = self.forest.clip(current);
            let mut clip = FloatClipRect::new(node.rect);
            if node.is_rounded() {
                clip.set_has_radius();
            }
            clip.map(self.forest.source_to_destination_projection(
                node.local_transform_space,
                self.layer_state.transform,
            ));
            accumulated.intersect(&clip);
            match node.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        accumulated.move_by(-self.layer_offset);
        accumulated
    }

    /// Walks the effect chain from chunk to layer, expanding the rect by
    /// each pixel-moving filter in that effect's local transform space.
    fn map_with_pixel_moving_filters(&self, rect: Rect) -> Rect {
        let mut mapped = rect;
        let mut space = self.chunk_state.transform;
        let mut current = self.chunk_state.effect;
        while current != self.layer_state.effect {
            let node = self.forest.effect(current);
            if node.has_pixel_moving_filter() {
                let projection = self
                    .forest
                    .source_to_destination_projection(space, node.local_transform_space);
                mapped = projection.transform_rect_bbox(mapped);
                mapped = node.filter.map_rect(mapped);
                space = node.local_transform_space;
            }
            match node.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        let projection = self
            .forest
            .source_to_destination_projection(space, self.layer_state.transform);
        mapped = projection.transform_rect_bbox(mapped);
        mapped + (-self.layer_offset)
    }
}

#[cfg(test)]
mod tests {
    use accretion_paint::filter::FilterOps;
    use accretion_paint::forest::{
        ClipId, CompositorElementId, EffectId, TransformId, TransformNode,
    };
    use accretion_paint::transform::Transform3d;
    use kurbo::Point;

    use super::*;

    struct Trees {
        forest: PropertyForest,
        layer_state: PropertyTreeState,
    }

    // A layer state with arbitrary values that must not leak into results:
    // mapping is always relative to the layer, so its own transform, clip
    // and effect cancel out.
    fn layer_trees() -> Trees {
        let mut forest = PropertyForest::new();
        let transform = forest.create_transform(TransformNode {
            parent: Some(TransformId::ROOT),
            matrix: Transform3d::from_translation(123.0, 456.0, 0.0),
            origin: [1.0, 2.0, 3.0],
            flattens_inherited_transform: false,
            rendering_context_id: 0,
            scroll: None,
            element_id: CompositorElementId::INVALID,
        });
        let clip = forest.create_clip(ClipId::ROOT, transform, Rect::new(12.0, 34.0, 68.0, 112.0));
        let effect = forest.create_opacity_effect(EffectId::ROOT, transform, Some(clip), 0.789);
        Trees {
            forest,
            layer_state: PropertyTreeState::new(transform, clip, effect),
        }
    }

    fn chunk(state: PropertyTreeState) -> PaintChunk {
        PaintChunk::new(state, Rect::new(0.0, 0.0, 100.0, 100.0))
    }

    #[test]
    fn one_chunk_using_layer_state() {
        let trees = layer_trees();
        let mut mapper =
            ChunkToLayerMapper::new(&trees.forest, trees.layer_state, Vec2::new(10.0, 20.0));
        mapper.switch_to_chunk(&chunk(trees.layer_state));
        assert!(!mapper.has_filter_that_moves_pixels());
        assert_eq!(mapper.transform(), Affine::translate((-10.0, -20.0)));
        assert_eq!(*mapper.clip_rect(), FloatClipRect::INFINITE);
        assert_eq!(
            mapper.map_visual_rect(Rect::new(30.0, 30.0, 118.0, 129.0)),
            Rect::new(20.0, 10.0, 108.0, 109.0)
        );
        assert_eq!(mapper.map_visual_rect(Rect::ZERO), Rect::ZERO);
    }

    #[test]
    fn repeated_chunk_state_is_stable() {
        let trees = layer_trees();
        let mut mapper =
            ChunkToLayerMapper::new(&trees.forest, trees.layer_state, Vec2::new(10.0, 20.0));
        for _ in 0..2 {
            mapper.switch_to_chunk(&chunk(trees.layer_state));
            assert_eq!(mapper.transform(), Affine::translate((-10.0, -20.0)));
            assert_eq!(*mapper.clip_rect(), FloatClipRect::INFINITE);
            assert_eq!(
                mapper.map_visual_rect(Rect::new(30.0, 30.0, 118.0, 129.0)),
                Rect::new(20.0, 10.0, 108.0, 109.0)
            );
        }
    }

    #[test]
    fn chunk_under_scale_and_clip() {
        let mut trees = layer_trees();
        let transform = trees.forest.create_transform(TransformNode {
            parent: Some(trees.layer_state.transform),
            matrix: Transform3d::from_scale(2.0, 2.0, 1.0),
            origin: [0.0; 3],
            flattens_inherited_transform: false,
            rendering_context_id: 0,
            scroll: None,
            element_id: CompositorElementId::INVALID,
        });
        let clip = trees.forest.create_clip(
            trees.layer_state.clip,
            trees.layer_state.transform,
            Rect::new(10.0, 10.0, 110.0, 110.0),
        );
        let state = PropertyTreeState::new(transform, clip, trees.layer_state.effect);

        let mut mapper =
            ChunkToLayerMapper::new(&trees.forest, trees.layer_state, Vec2::new(10.0, 20.0));
        mapper.switch_to_chunk(&chunk(state));
        assert!(!mapper.has_filter_that_moves_pixels());
        assert_eq!(
            mapper.transform(),
            Affine::translate((-10.0, -20.0)) * Affine::scale(2.0)
        );
        // The clip lives in the layer's own transform space, so it maps by
        // translation only and stays tight.
        assert_eq!(mapper.clip_rect().rect(), Rect::new(0.0, -10.0, 100.0, 90.0));
        assert!(mapper.clip_rect().is_tight());
        assert_eq!(
            mapper.map_visual_rect(Rect::new(30.0, 30.0, 118.0, 129.0)),
            Rect::new(50.0, 40.0, 100.0, 90.0)
        );
        assert_eq!(mapper.map_visual_rect(Rect::ZERO), Rect::ZERO);
    }

    #[test]
    fn chunk_clip_under_scaled_space_loses_tightness() {
        let mut trees = layer_trees();
        let transform1 = trees.forest.create_transform(TransformNode {
            parent: Some(trees.layer_state.transform),
            matrix: Transform3d::from_scale(2.0, 2.0, 1.0),
            origin: [0.0; 3],
            flattens_inherited_transform: false,
            rendering_context_id: 0,
            scroll: None,
            element_id: CompositorElementId::INVALID,
        });
        let transform2 = trees
            .forest
            .create_2d_translation(transform1, Vec2::new(20.0, 30.0));
        let clip2 = trees.forest.create_clip(
            trees.layer_state.clip,
            transform2,
            Rect::new(0.0, 0.0, 20.0, 20.0),
        );
        let state = PropertyTreeState::new(transform2, clip2, trees.layer_state.effect);

        let mut mapper =
            ChunkToLayerMapper::new(&trees.forest, trees.layer_state, Vec2::new(10.0, 20.0));
        mapper.switch_to_chunk(&chunk(state));
        assert!(!mapper.has_filter_that_moves_pixels());
        assert_eq!(
            mapper.transform(),
            Affine::translate((-10.0, -20.0))
                * Affine::scale(2.0)
                * Affine::translate((20.0, 30.0))
        );
        assert_eq!(
            mapper.transform() * Point::new(0.0, 0.0),
            Point::new(30.0, 40.0)
        );
        // The clip's space is reached through a scale, so the mapped rect is
        // a conservative cover.
        assert_eq!(mapper.clip_rect().rect(), Rect::new(30.0, 40.0, 70.0, 80.0));
        assert!(!mapper.clip_rect().is_tight());
        assert_eq!(
            mapper.map_visual_rect(Rect::new(0.0, 0.0, 200.0, 200.0)),
            Rect::new(30.0, 40.0, 70.0, 80.0)
        );
    }

    #[test]
    fn pixel_moving_filter_takes_slow_path() {
        let mut trees = layer_trees();
        let blur = trees.forest.create_filter_effect(
            trees.layer_state.effect,
            trees.layer_state.transform,
            Some(trees.layer_state.clip),
            FilterOps::blur(20.0),
        );
        let blur_state = PropertyTreeState::new(
            trees.layer_state.transform,
            trees.layer_state.clip,
            blur,
        );
        // A plain effect nested under the blur still crosses the blur on the
        // way to the layer.
        let nested = trees.forest.create_opacity_effect(
            blur,
            trees.layer_state.transform,
            Some(trees.layer_state.clip),
            1.0,
        );
        let nested_state = PropertyTreeState::new(
            trees.layer_state.transform,
            trees.layer_state.clip,
            nested,
        );

        let mut mapper =
            ChunkToLayerMapper::new(&trees.forest, trees.layer_state, Vec2::new(10.0, 20.0));
        mapper.switch_to_chunk(&chunk(trees.layer_state));
        assert!(!mapper.has_filter_that_moves_pixels());

        for state in [blur_state, nested_state] {
            mapper.switch_to_chunk(&chunk(state));
            assert!(mapper.has_filter_that_moves_pixels());
            assert_eq!(mapper.transform(), Affine::translate((-10.0, -20.0)));
            assert!(mapper.clip_rect().is_infinite());
            assert_eq!(
                mapper.map_visual_rect(Rect::new(30.0, 30.0, 118.0, 129.0)),
                Rect::new(-40.0, -50.0, 168.0, 169.0)
            );
            assert_eq!(mapper.map_visual_rect(Rect::ZERO), Rect::ZERO);
        }
    }

    #[test]
    fn non_moving_filter_returns_to_fast_path() {
        let mut trees = layer_trees();
        let blur = trees.forest.create_filter_effect(
            trees.layer_state.effect,
            trees.layer_state.transform,
            Some(trees.layer_state.clip),
            FilterOps::blur(20.0),
        );
        let blur_state = PropertyTreeState::new(
            trees.layer_state.transform,
            trees.layer_state.clip,
            blur,
        );
        let opacity_filter = trees.forest.create_filter_effect(
            trees.layer_state.effect,
            trees.layer_state.transform,
            Some(trees.layer_state.clip),
            FilterOps::opacity(0.5),
        );
        let opacity_state = PropertyTreeState::new(
            trees.layer_state.transform,
            trees.layer_state.clip,
            opacity_filter,
        );

        let mut mapper =
            ChunkToLayerMapper::new(&trees.forest, trees.layer_state, Vec2::new(10.0, 20.0));
        mapper.switch_to_chunk(&chunk(blur_state));
        assert!(mapper.has_filter_that_moves_pixels());

        mapper.switch_to_chunk(&chunk(opacity_state));
        assert!(!mapper.has_filter_that_moves_pixels());
        assert_eq!(mapper.transform(), Affine::translate((-10.0, -20.0)));
        assert_eq!(*mapper.clip_rect(), FloatClipRect::INFINITE);

        mapper.switch_to_chunk(&chunk(trees.layer_state));
        assert!(!mapper.has_filter_that_moves_pixels());
        assert_eq!(mapper.transform(), Affine::translate((-10.0, -20.0)));
        assert_eq!(*mapper.clip_rect(), FloatClipRect::INFINITE);
    }

    #[test]
    fn sibling_effect_does_not_inherit_filter_flag() {
        let mut trees = layer_trees();
        let effect1 = trees.forest.create_opacity_effect(
            trees.layer_state.effect,
            trees.layer_state.transform,
            Some(trees.layer_state.clip),
            0.5,
        );
        let effect2 = trees.forest.create_opacity_effect(
            trees.layer_state.effect,
            trees.layer_state.transform,
            Some(trees.layer_state.clip),
            0.5,
        );
        let state1 = PropertyTreeState::new(
            trees.layer_state.transform,
            trees.layer_state.clip,
            effect1,
        );
        let state2 = PropertyTreeState::new(
            trees.layer_state.transform,
            trees.layer_state.clip,
            effect2,
        );

        // The layer state is the first chunk's state, so the second chunk's
        // effect is a sibling of the layer effect.
        let mut mapper = ChunkToLayerMapper::new(&trees.forest, state1, Vec2::new(10.0, 20.0));
        mapper.switch_to_chunk(&chunk(state2));
        assert!(!mapper.has_filter_that_moves_pixels());
    }

    #[test]
    fn rounded_chunk_clip_is_loose() {
        let mut trees = layer_trees();
        let clip = trees.forest.create_rounded_clip(
            trees.layer_state.clip,
            trees.layer_state.transform,
            Rect::new(10.0, 10.0, 110.0, 110.0),
            kurbo::RoundedRectRadii::from_single_radius(5.0),
        );
        let state = PropertyTreeState::new(
            trees.layer_state.transform,
            clip,
            trees.layer_state.effect,
        );
        let mut mapper =
            ChunkToLayerMapper::new(&trees.forest, trees.layer_state, Vec2::new(10.0, 20.0));
        mapper.switch_to_chunk(&chunk(state));
        assert_eq!(mapper.clip_rect().rect(), Rect::new(0.0, -10.0, 100.0, 90.0));
        assert!(!mapper.clip_rect().is_tight());
    }
}
