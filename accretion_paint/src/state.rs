// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tree state and paint chunks.

use kurbo::Rect;

use crate::forest::{ClipId, EffectId, TransformId};

/// The (transform, clip, effect) triple a piece of painted content lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropertyTreeState {
    /// Transform space of the content.
    pub transform: TransformId,
    /// Clip applied to the content.
    pub clip: ClipId,
    /// Effect grouping the content.
    pub effect: EffectId,
}

impl PropertyTreeState {
    /// The root state of a forest.
    pub const ROOT: Self = Self {
        transform: TransformId::ROOT,
        clip: ClipId::ROOT,
        effect: EffectId::ROOT,
    };

    /// Creates a state from the three ids.
    #[inline]
    #[must_use]
    pub const fn new(transform: TransformId, clip: ClipId, effect: EffectId) -> Self {
        Self {
            transform,
            clip,
            effect,
        }
    }
}

/// A contiguous run of display items sharing one property tree state.
#[derive(Clone, Debug, PartialEq)]
pub struct PaintChunk {
    /// The state all items in the chunk share.
    pub state: PropertyTreeState,
    /// Drawable bounds of the chunk, in its transform space.
    pub bounds: Rect,
    /// Whether anything in the chunk actually draws.
    pub draws_content: bool,
}

impl PaintChunk {
    /// Creates a content-drawing chunk.
    #[must_use]
    pub const fn new(state: PropertyTreeState, bounds: Rect) -> Self {
        Self {
            state,
            bounds,
            draws_content: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_state_uses_root_ids() {
        let s = PropertyTreeState::ROOT;
        assert!(s.transform.is_root());
        assert!(s.clip.is_root());
        assert!(s.effect.is_root());
    }

    #[test]
    fn state_equality_is_per_component() {
        let a = PropertyTreeState::new(TransformId::ROOT, ClipId::ROOT, EffectId::ROOT);
        assert_eq!(a, PropertyTreeState::ROOT);
    }
}
