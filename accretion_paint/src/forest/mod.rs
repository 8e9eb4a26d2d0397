// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The paint property forest: four parallel trees in one arena.

mod arena;
mod geometry;
mod id;
mod nodes;

pub use arena::PropertyForest;
pub use id::{ClipId, CompositorElementId, EffectId, ScrollId, TransformId};
pub use nodes::{BlendMode, ClipNode, EffectNode, ScrollNode, TransformNode};
