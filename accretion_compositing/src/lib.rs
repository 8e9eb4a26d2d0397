// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositor property tree synthesis.
//!
//! `accretion_compositing` translates an `accretion_paint` property forest
//! into the flat, id-addressed property trees a compositor consumes, one
//! full pass at a time, synthesizing effect nodes for clips the compositor
//! cannot express natively.
//!
//! # Architecture
//!
//! **[`property_tree_manager`]** — the pass driver.
//! [`PropertyTreeManager`] walks layers in emission order, translating
//! paint nodes on demand, maintaining the open-effect stack, and
//! synthesizing effects (and `DstIn` mask layers, via
//! [`PropertyTreeManagerClient`]) for rounded or axis-misaligned clips.
//!
//! **[`tree`]** — [`PropertyTrees`](tree::PropertyTrees), the output: four
//! node vectors plus the element-id maps backing the between-pass
//! `directly_*` update fast paths. Committed scroll offsets persist across
//! rebuilds.
//!
//! **[`chunk_to_layer_mapper`]** — maps paint chunk geometry into the
//! space of the composited layer the chunks were merged into, tracking
//! clip tightness and expanding for pixel-moving filters.
//!
//! **[`layer_list`]** — the ordered layer output of a pass.
//!
//! **[`trace`]** — optional instrumentation of the synthesis pass, compiled
//! out without the `trace` feature.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables the [`trace`] sinks; without it
//!   every tracing call compiles to nothing.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod chunk_to_layer_mapper;
pub mod layer_list;
pub mod property_tree_manager;
pub mod trace;
pub mod tree;

pub use chunk_to_layer_mapper::ChunkToLayerMapper;
pub use property_tree_manager::{
    CompositorCapabilities, PropertyTreeManager, PropertyTreeManagerClient, SynthesizedClip,
};
