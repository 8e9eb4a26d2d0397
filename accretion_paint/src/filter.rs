// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Filter operations attached to effect nodes.
//!
//! Only the properties the compositing core consumes are modeled: whether a
//! filter can move pixels outside their source bounds, and by how much a
//! visual rect must be outset to cover the moved pixels.

use alloc::vec::Vec;

use kurbo::{Rect, Vec2};

/// How far a Gaussian blur spreads pixels, as a multiple of its standard
/// deviation. Three sigmas cover well over 99% of the kernel's mass, matching
/// the expansion used by raster backends.
const BLUR_SIGMA_SPREAD: f64 = 3.0;

/// A single filter operation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterOp {
    /// Gaussian blur with the given standard deviation in pixels.
    Blur {
        /// Standard deviation of the blur kernel.
        std_deviation: f64,
    },
    /// Drop shadow: blurred copy offset under the source.
    DropShadow {
        /// Shadow offset.
        offset: Vec2,
        /// Standard deviation of the shadow blur.
        std_deviation: f64,
    },
    /// Uniform opacity. Never moves pixels.
    Opacity(f32),
}

impl FilterOp {
    /// Returns whether this operation can paint outside the source bounds.
    #[must_use]
    pub fn moves_pixels(&self) -> bool {
        match self {
            Self::Blur { .. } | Self::DropShadow { .. } => true,
            Self::Opacity(_) => false,
        }
    }

    /// Maps a source rect to the rect this operation may paint into.
    #[must_use]
    pub fn map_rect(&self, rect: Rect) -> Rect {
        match self {
            Self::Blur { std_deviation } => {
                let outset = BLUR_SIGMA_SPREAD * std_deviation;
                rect.inflate(outset, outset)
            }
            Self::DropShadow {
                offset,
                std_deviation,
            } => {
                let outset = BLUR_SIGMA_SPREAD * std_deviation;
                let shadow = (rect + *offset).inflate(outset, outset);
                rect.union(shadow)
            }
            Self::Opacity(_) => rect,
        }
    }
}

/// An ordered list of filter operations, applied first to last.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterOps {
    ops: Vec<FilterOp>,
}

impl FilterOps {
    /// An empty filter list.
    #[must_use]
    pub const fn none() -> Self {
        Self { ops: Vec::new() }
    }

    /// Creates a list from the given operations.
    #[must_use]
    pub fn from_ops(ops: Vec<FilterOp>) -> Self {
        Self { ops }
    }

    /// A single blur, the most common pixel-moving filter.
    #[must_use]
    pub fn blur(std_deviation: f64) -> Self {
        Self {
            ops: alloc::vec![FilterOp::Blur { std_deviation }],
        }
    }

    /// A single opacity filter.
    #[must_use]
    pub fn opacity(opacity: f32) -> Self {
        Self {
            ops: alloc::vec![FilterOp::Opacity(opacity)],
        }
    }

    /// Returns whether the list contains no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Returns whether any operation can paint outside its source bounds.
    #[must_use]
    pub fn moves_pixels(&self) -> bool {
        self.ops.iter().any(FilterOp::moves_pixels)
    }

    /// Maps a source rect through every operation in order.
    #[must_use]
    pub fn map_rect(&self, rect: Rect) -> Rect {
        self.ops.iter().fold(rect, |r, op| op.map_rect(r))
    }
}
