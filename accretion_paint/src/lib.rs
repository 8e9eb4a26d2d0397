// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint-side property tree model for compositing.
//!
//! `accretion_paint` defines the immutable paint property forest that a
//! paint pass produces: four parallel trees (transform, clip, effect,
//! scroll) stored in one push-only arena with typed `u32` indices. It is
//! `no_std` compatible (with `alloc`) and keeps geometry in `kurbo` types.
//!
//! # Architecture
//!
//! **[`forest`]** — [`PropertyForest`](forest::PropertyForest), the arena
//! holding all four trees, plus the node payloads and typed ids. Parent
//! indices always precede children, so ancestor walks terminate and the
//! lowest common ancestor falls out of an index comparison. Geometry queries
//! (accumulated transforms, cross-space projections) live here too.
//!
//! **[`transform`]** — [`Transform3d`](transform::Transform3d), a column-major
//! 4×4 matrix with the 2-D flattening and axis-alignment queries the
//! compositing core needs.
//!
//! **[`clip_rect`]** — [`FloatClipRect`](clip_rect::FloatClipRect), a clip
//! rectangle that tracks whether it is exact or a conservative cover.
//!
//! **[`filter`]** — [`FilterOps`](filter::FilterOps): blur, drop shadow and
//! opacity operations with pixel-movement queries and visual-rect expansion.
//!
//! **[`state`]** — [`PropertyTreeState`](state::PropertyTreeState), the
//! (transform, clip, effect) triple content is painted in, and
//! [`PaintChunk`](state::PaintChunk).
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod clip_rect;
pub mod filter;
pub mod forest;
pub mod state;
pub mod transform;
