// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clip rectangles with tightness tracking.

use kurbo::{Affine, Rect, Vec2};

/// A clip rectangle that knows whether it is exact.
///
/// `is_tight` means the rect is the precise clip bounds in the current space.
/// Mapping through anything other than an identity or 2-D translation, or
/// intersecting with a rounded clip, yields a conservative cover and clears
/// the flag. The infinite value is the identity for [`intersect`] and stays
/// tight.
///
/// [`intersect`]: FloatClipRect::intersect
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloatClipRect {
    rect: Rect,
    is_infinite: bool,
    is_tight: bool,
}

impl FloatClipRect {
    /// The infinite clip rect. Tight by definition.
    pub const INFINITE: Self = Self {
        rect: Rect::new(
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
            f64::INFINITY,
            f64::INFINITY,
        ),
        is_infinite: true,
        is_tight: true,
    };

    /// A finite, tight clip rect.
    #[inline]
    #[must_use]
    pub const fn new(rect: Rect) -> Self {
        Self {
            rect,
            is_infinite: false,
            is_tight: true,
        }
    }

    /// The current rect. Meaningless when [`is_infinite`](Self::is_infinite).
    #[inline]
    #[must_use]
    pub const fn rect(&self) -> Rect {
        self.rect
    }

    /// Returns whether the rect is the exact clip bounds.
    #[inline]
    #[must_use]
    pub const fn is_tight(&self) -> bool {
        self.is_tight
    }

    /// Returns whether no clipping applies.
    #[inline]
    #[must_use]
    pub const fn is_infinite(&self) -> bool {
        self.is_infinite
    }

    /// Marks the rect as a conservative cover rather than exact bounds.
    #[inline]
    pub fn clear_is_tight(&mut self) {
        self.is_tight = false;
    }

    /// Records that a rounded clip contributed to this rect. The rect still
    /// covers the clip but no longer bounds it exactly.
    #[inline]
    pub fn set_has_radius(&mut self) {
        self.is_tight = false;
    }

    /// Maps the rect through `transform`, taking the bounding box.
    ///
    /// Identity is a no-op; a pure translation moves the rect and keeps
    /// tightness; anything else bounds the transformed corners and clears
    /// tightness. Infinite rects are unaffected.
    pub fn map(&mut self, transform: Affine) {
        if self.is_infinite || transform == Affine::IDENTITY {
            return;
        }
        let coeffs = transform.as_coeffs();
        if coeffs[..4] == [1.0, 0.0, 0.0, 1.0] {
            self.rect = self.rect + Vec2::new(coeffs[4], coeffs[5]);
            return;
        }
        self.rect = transform.transform_rect_bbox(self.rect);
        self.is_tight = false;
    }

    /// Translates the rect. Preserves tightness.
    #[inline]
    pub fn move_by(&mut self, offset: Vec2) {
        if !self.is_infinite {
            self.rect = self.rect + offset;
        }
    }

    /// Intersects with another clip rect. The result is tight only when both
    /// inputs are tight.
    pub fn intersect(&mut self, other: &Self) {
        if other.is_infinite {
            self.is_tight &= other.is_tight;
            return;
        }
        if self.is_infinite {
            self.rect = other.rect;
            self.is_infinite = false;
        } else {
            // `Rect::intersect` clamps, so disjoint inputs yield a zero-area
            // rect rather than an inverted one.
            self.rect = self.rect.intersect(other.rect);
        }
        self.is_tight &= other.is_tight;
    }
}

impl Default for FloatClipRect {
    #[inline]
    fn default() -> Self {
        Self::INFINITE
    }
}

impl From<Rect> for FloatClipRect {
    #[inline]
    fn from(rect: Rect) -> Self {
        Self::new(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_infinite_and_tight() {
        let c = FloatClipRect::default();
        assert!(c.is_infinite());
        assert!(c.is_tight());
    }

    #[test]
    fn translation_keeps_tightness() {
        let mut c = FloatClipRect::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        c.map(Affine::translate((5.0, -5.0)));
        assert_eq!(c.rect(), Rect::new(5.0, -5.0, 15.0, 5.0));
        assert!(c.is_tight());
    }

    #[test]
    fn scale_clears_tightness() {
        let mut c = FloatClipRect::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        c.map(Affine::scale(2.0));
        assert_eq!(c.rect(), Rect::new(0.0, 0.0, 20.0, 20.0));
        assert!(!c.is_tight());
    }

    #[test]
    fn map_leaves_infinite_alone() {
        let mut c = FloatClipRect::INFINITE;
        c.map(Affine::scale(3.0));
        assert!(c.is_infinite());
        assert!(c.is_tight());
    }

    #[test]
    fn intersect_with_infinite_is_identity() {
        let mut c = FloatClipRect::new(Rect::new(1.0, 2.0, 3.0, 4.0));
        c.intersect(&FloatClipRect::INFINITE);
        assert_eq!(c.rect(), Rect::new(1.0, 2.0, 3.0, 4.0));
        assert!(c.is_tight());

        let mut inf = FloatClipRect::INFINITE;
        inf.intersect(&FloatClipRect::new(Rect::new(1.0, 2.0, 3.0, 4.0)));
        assert!(!inf.is_infinite());
        assert_eq!(inf.rect(), Rect::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn intersect_propagates_looseness() {
        let mut loose = FloatClipRect::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        loose.set_has_radius();
        let mut c = FloatClipRect::new(Rect::new(5.0, 5.0, 20.0, 20.0));
        c.intersect(&loose);
        assert_eq!(c.rect(), Rect::new(5.0, 5.0, 10.0, 10.0));
        assert!(!c.is_tight());
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let mut c = FloatClipRect::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        c.intersect(&FloatClipRect::new(Rect::new(20.0, 20.0, 30.0, 30.0)));
        assert!(c.rect().is_zero_area());
    }
}
