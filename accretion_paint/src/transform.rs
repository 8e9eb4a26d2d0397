// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal column-major 4×4 transform.
//!
//! This type covers the subset of 3-D transforms that the paint property
//! model actually needs (identity, multiply, 2-D flattening, axis-alignment
//! queries) without pulling in a full linear-algebra crate. Anything that is
//! genuinely 2-D uses [`kurbo::Affine`] instead; `Transform3d` exists because
//! paint transform nodes may carry 3-D content even though every consumer in
//! this workspace ultimately projects to 2-D.

use core::ops::Mul;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use kurbo::{Affine, Vec2};

/// Tolerance for treating a matrix entry as zero in axis-alignment checks.
/// Rotations by exact multiples of 90° leave residues around 1e-16.
pub const AXIS_ALIGNMENT_EPSILON: f64 = 1e-9;

/// A column-major 4×4 transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column* of the matrix, matching the memory layout
/// used by GPU APIs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Transform3d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a transform from a column-major 2-D array.
    #[inline]
    #[must_use]
    pub const fn from_cols_array_2d(cols: [[f64; 4]; 4]) -> Self {
        Self { cols }
    }

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the Z axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_z(radians: f64) -> Self {
        #[cfg(feature = "std")]
        let (s, c) = radians.sin_cos();
        #[cfg(not(feature = "std"))]
        let (s, c) = (radians.sin(), radians.cos());
        Self {
            cols: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Embeds a 2-D affine transform in the XY plane.
    #[inline]
    #[must_use]
    pub fn from_affine(affine: Affine) -> Self {
        let [a, b, c, d, e, f] = affine.as_coeffs();
        Self {
            cols: [
                [a, b, 0.0, 0.0],
                [c, d, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [e, f, 0.0, 1.0],
            ],
        }
    }

    /// Projects onto the XY plane, discarding all Z and perspective
    /// components.
    ///
    /// This is the deliberate 2-D approximation used for chunk-to-layer
    /// geometry: visual rects only need the in-plane part of the transform.
    #[inline]
    #[must_use]
    pub fn to_affine_2d(self) -> Affine {
        let c = &self.cols;
        Affine::new([c[0][0], c[0][1], c[1][0], c[1][1], c[3][0], c[3][1]])
    }

    /// Returns whether this is exactly the identity matrix.
    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Returns whether this transform is the identity or a pure 2-D
    /// translation.
    #[must_use]
    pub fn is_identity_or_2d_translation(&self) -> bool {
        let c = &self.cols;
        c[0] == [1.0, 0.0, 0.0, 0.0]
            && c[1] == [0.0, 1.0, 0.0, 0.0]
            && c[2] == [0.0, 0.0, 1.0, 0.0]
            && c[3][2] == 0.0
            && c[3][3] == 1.0
    }

    /// The XY translation component.
    #[inline]
    #[must_use]
    pub fn translation_2d(&self) -> Vec2 {
        Vec2::new(self.cols[3][0], self.cols[3][1])
    }

    /// Returns whether mapping through this transform keeps 2-D axis-aligned
    /// rectangles axis-aligned.
    ///
    /// True for translations, scales, flips, and rotations by multiples of
    /// 90°, judged on the flattened 2-D projection. Conservative: any
    /// out-of-plane or perspective component fails the check even when the
    /// projection happens to be aligned. Zero checks use a tolerance:
    /// `cos(π/2)` computed in floating point is ~6e-17, not zero.
    #[must_use]
    pub fn preserves_2d_axis_alignment(&self) -> bool {
        let near_zero = |v: f64| v.abs() <= AXIS_ALIGNMENT_EPSILON;
        let c = &self.cols;
        // Out-of-plane or perspective terms invalidate the 2-D judgment.
        if !near_zero(c[0][2])
            || !near_zero(c[0][3])
            || !near_zero(c[1][2])
            || !near_zero(c[1][3])
            || !near_zero(c[3][3] - 1.0)
        {
            return false;
        }
        let (a, b, cc, d) = (c[0][0], c[0][1], c[1][0], c[1][1]);
        (near_zero(b) && near_zero(cc)) || (near_zero(a) && near_zero(d))
    }

    /// Applies this transform about the given origin: `T(o) * M * T(-o)`.
    ///
    /// Pure translations are unaffected by the origin.
    #[must_use]
    pub fn about_origin(self, origin: [f64; 3]) -> Self {
        if self.is_identity_or_2d_translation() {
            return self;
        }
        let [x, y, z] = origin;
        Self::from_translation(x, y, z) * self * Self::from_translation(-x, -y, -z)
    }

    /// Is this transform [finite]?
    ///
    /// [finite]: f64::is_finite
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        let c = &self.cols;
        c[0][0].is_finite()
            && c[0][1].is_finite()
            && c[0][2].is_finite()
            && c[0][3].is_finite()
            && c[1][0].is_finite()
            && c[1][1].is_finite()
            && c[1][2].is_finite()
            && c[1][3].is_finite()
            && c[2][0].is_finite()
            && c[2][1].is_finite()
            && c[2][2].is_finite()
            && c[2][3].is_finite()
            && c[3][0].is_finite()
            && c[3][1].is_finite()
            && c[3][2].is_finite()
            && c[3][3].is_finite()
    }
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        let mut j = 0;
        while j < 4 {
            let mut i = 0;
            while i < 4 {
                out[j][i] =
                    a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
                i += 1;
            }
            j += 1;
        }
        Self { cols: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_identity() {
        assert_eq!(Transform3d::default(), Transform3d::IDENTITY);
        assert!(Transform3d::IDENTITY.is_identity());
    }

    #[test]
    fn identity_multiply() {
        let t = Transform3d::from_translation(1.0, 2.0, 3.0);
        assert_eq!(Transform3d::IDENTITY * t, t);
        assert_eq!(t * Transform3d::IDENTITY, t);
    }

    #[test]
    fn translation_composition() {
        let a = Transform3d::from_translation(1.0, 0.0, 0.0);
        let b = Transform3d::from_translation(0.0, 2.0, 0.0);
        let c = a * b;
        assert_eq!(c.cols[3], [1.0, 2.0, 0.0, 1.0]);
    }

    #[test]
    fn identity_or_2d_translation() {
        assert!(Transform3d::IDENTITY.is_identity_or_2d_translation());
        assert!(Transform3d::from_translation(5.0, -3.0, 0.0).is_identity_or_2d_translation());
        assert!(!Transform3d::from_translation(0.0, 0.0, 1.0).is_identity_or_2d_translation());
        assert!(!Transform3d::from_scale(2.0, 2.0, 1.0).is_identity_or_2d_translation());
        assert_eq!(
            Transform3d::from_translation(5.0, -3.0, 0.0).translation_2d(),
            Vec2::new(5.0, -3.0)
        );
    }

    #[test]
    fn flatten_round_trip() {
        let affine = Affine::translate((3.0, 4.0)) * Affine::scale(2.0);
        let t = Transform3d::from_affine(affine);
        assert_eq!(t.to_affine_2d(), affine);
    }

    #[test]
    fn flatten_discards_z() {
        let t = Transform3d::from_translation(7.0, 8.0, 9.0);
        assert_eq!(t.to_affine_2d(), Affine::translate((7.0, 8.0)));
    }

    #[test]
    fn axis_alignment_queries() {
        assert!(Transform3d::IDENTITY.preserves_2d_axis_alignment());
        assert!(Transform3d::from_scale(2.0, -3.0, 1.0).preserves_2d_axis_alignment());
        assert!(
            Transform3d::from_rotation_z(core::f64::consts::FRAC_PI_2)
                .preserves_2d_axis_alignment()
        );
        assert!(
            !Transform3d::from_rotation_z(core::f64::consts::FRAC_PI_4)
                .preserves_2d_axis_alignment()
        );
    }

    #[test]
    fn about_origin_scales_around_point() {
        let t = Transform3d::from_scale(2.0, 2.0, 1.0).about_origin([10.0, 10.0, 0.0]);
        // (10, 10) is the fixed point.
        let a = t.to_affine_2d();
        assert_eq!(a * kurbo::Point::new(10.0, 10.0), kurbo::Point::new(10.0, 10.0));
        assert_eq!(a * kurbo::Point::new(20.0, 10.0), kurbo::Point::new(30.0, 10.0));
    }

    #[test]
    fn about_origin_ignored_for_translations() {
        let t = Transform3d::from_translation(1.0, 2.0, 0.0);
        assert_eq!(t.about_origin([50.0, 60.0, 0.0]), t);
    }

    #[test]
    fn infinity_detected() {
        let mut t = Transform3d::IDENTITY;
        t.cols[0][3] = f64::INFINITY;
        assert!(!t.is_finite());
        assert!(Transform3d::IDENTITY.is_finite());
    }
}
