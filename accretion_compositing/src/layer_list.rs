// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered layer output of a compositing pass.

use alloc::vec::Vec;

/// Opaque handle to a compositor layer owned by the embedder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub u64);

/// One layer in draw order, with the property nodes it draws under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerListEntry {
    /// The layer.
    pub layer: LayerId,
    /// Compositor transform node id.
    pub transform_id: u32,
    /// Compositor clip node id.
    pub clip_id: u32,
    /// Compositor effect node id.
    pub effect_id: u32,
    /// Whether the layer contributes pixels.
    pub draws_content: bool,
}

/// Collects layers in draw order during a pass.
#[derive(Debug, Default)]
pub struct LayerListBuilder {
    entries: Vec<LayerListEntry>,
}

impl LayerListBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a layer. Order of calls is draw order.
    pub fn add(&mut self, entry: LayerListEntry) {
        self.entries.push(entry);
    }

    /// The collected list, in draw order.
    #[must_use]
    pub fn entries(&self) -> &[LayerListEntry] {
        &self.entries
    }

    /// Consumes the builder, yielding the final list.
    #[must_use]
    pub fn build(self) -> Vec<LayerListEntry> {
        self.entries
    }
}

/// The root of the layer tree being assembled.
///
/// Synthesized clip mask layers are appended here as passes emit them; the
/// embedder attaches content layers itself.
#[derive(Debug, Default)]
pub struct RootLayer {
    children: Vec<LayerId>,
}

impl RootLayer {
    /// A root with no children.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a child layer.
    pub fn add_child(&mut self, layer: LayerId) {
        self.children.push(layer);
    }

    /// The child layers, in attach order.
    #[must_use]
    pub fn children(&self) -> &[LayerId] {
        &self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_preserves_order() {
        let mut builder = LayerListBuilder::new();
        for i in 0..3 {
            builder.add(LayerListEntry {
                layer: LayerId(i),
                transform_id: 0,
                clip_id: 0,
                effect_id: 0,
                draws_content: true,
            });
        }
        let list = builder.build();
        assert_eq!(list.len(), 3);
        assert_eq!(list[1].layer, LayerId(1));
    }
}
