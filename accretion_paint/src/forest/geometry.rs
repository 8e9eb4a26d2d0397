// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry queries across transform spaces.
//!
//! Everything here works on the flattened 2-D projection: visual rects and
//! clip rects only need the in-plane part of the transform chain.

use kurbo::Affine;

use crate::forest::arena::PropertyForest;
use crate::forest::id::TransformId;

impl PropertyForest {
    /// The accumulated 2-D transform mapping points in `descendant`'s space
    /// into `ancestor`'s space.
    ///
    /// Each node's matrix is applied about its transform origin, then
    /// flattened. Panics if `ancestor` is not on `descendant`'s parent chain.
    #[must_use]
    pub fn accumulated_affine_to_ancestor(
        &self,
        descendant: TransformId,
        ancestor: TransformId,
    ) -> Affine {
        let mut accumulated = Affine::IDENTITY;
        let mut current = descendant;
        while current != ancestor {
            let node = self.transform(current);
            accumulated = node.matrix_with_origin().to_affine_2d() * accumulated;
            current = node
                .parent
                .expect("ancestor must be on the descendant's parent chain");
        }
        accumulated
    }

    /// The 2-D projection mapping points in `source`'s space into
    /// `destination`'s space, routed through their lowest common ancestor.
    ///
    /// A destination chain that collapses to zero area (scale by zero) has no
    /// inverse; the result then carries non-finite coefficients, matching the
    /// degenerate visual rects such a chain produces anyway.
    #[must_use]
    pub fn source_to_destination_projection(
        &self,
        source: TransformId,
        destination: TransformId,
    ) -> Affine {
        if source == destination {
            return Affine::IDENTITY;
        }
        let lca = self.lowest_common_transform_ancestor(source, destination);
        let source_to_lca = self.accumulated_affine_to_ancestor(source, lca);
        if destination == lca {
            return source_to_lca;
        }
        let destination_to_lca = self.accumulated_affine_to_ancestor(destination, lca);
        destination_to_lca.inverse() * source_to_lca
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Point, Vec2};

    use super::*;
    use crate::forest::nodes::TransformNode;
    use crate::forest::CompositorElementId;
    use crate::transform::Transform3d;

    #[test]
    fn accumulation_composes_child_first() {
        let mut forest = PropertyForest::new();
        let t1 = forest.create_2d_translation(TransformId::ROOT, Vec2::new(10.0, 0.0));
        let t2 = forest.create_transform(TransformNode {
            parent: Some(t1),
            matrix: Transform3d::from_scale(2.0, 2.0, 1.0),
            origin: [0.0; 3],
            flattens_inherited_transform: false,
            rendering_context_id: 0,
            scroll: None,
            element_id: CompositorElementId::INVALID,
        });
        let affine = forest.accumulated_affine_to_ancestor(t2, TransformId::ROOT);
        // Scale applies in the child space, then the translation.
        assert_eq!(affine * Point::new(1.0, 1.0), Point::new(12.0, 2.0));
    }

    #[test]
    fn transform_origin_is_honored() {
        let mut forest = PropertyForest::new();
        let t = forest.create_transform(TransformNode {
            parent: Some(TransformId::ROOT),
            matrix: Transform3d::from_scale(2.0, 2.0, 1.0),
            origin: [10.0, 10.0, 0.0],
            flattens_inherited_transform: false,
            rendering_context_id: 0,
            scroll: None,
            element_id: CompositorElementId::INVALID,
        });
        let affine = forest.accumulated_affine_to_ancestor(t, TransformId::ROOT);
        assert_eq!(affine * Point::new(10.0, 10.0), Point::new(10.0, 10.0));
        assert_eq!(affine * Point::new(0.0, 0.0), Point::new(-10.0, -10.0));
    }

    #[test]
    fn projection_between_siblings() {
        let mut forest = PropertyForest::new();
        let a = forest.create_2d_translation(TransformId::ROOT, Vec2::new(100.0, 0.0));
        let b = forest.create_2d_translation(TransformId::ROOT, Vec2::new(0.0, 50.0));
        let projection = forest.source_to_destination_projection(a, b);
        assert_eq!(projection * Point::new(0.0, 0.0), Point::new(100.0, -50.0));
    }

    #[test]
    fn projection_to_self_is_identity() {
        let mut forest = PropertyForest::new();
        let t = forest.create_2d_translation(TransformId::ROOT, Vec2::new(3.0, 4.0));
        assert_eq!(
            forest.source_to_destination_projection(t, t),
            Affine::IDENTITY
        );
    }

    #[test]
    fn projection_down_the_chain_inverts() {
        let mut forest = PropertyForest::new();
        let t = forest.create_transform(TransformNode {
            parent: Some(TransformId::ROOT),
            matrix: Transform3d::from_scale(2.0, 2.0, 1.0),
            origin: [0.0; 3],
            flattens_inherited_transform: false,
            rendering_context_id: 0,
            scroll: None,
            element_id: CompositorElementId::INVALID,
        });
        let projection = forest.source_to_destination_projection(TransformId::ROOT, t);
        assert_eq!(projection * Point::new(4.0, 4.0), Point::new(2.0, 2.0));
    }
}
