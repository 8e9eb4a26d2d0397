// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing for the property-tree synthesis pass.
//!
//! [`TraceSink`] has one method per synthesis event, all defaulting to no-ops.
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`; with the `trace` feature
//! off every `Tracer` method compiles to nothing, with it on each method costs
//! one `Option` branch.

use crate::tree::RenderSurfaceReason;

/// Emitted when a compositor effect node is opened for a paint effect or a
/// synthesized clip.
#[derive(Clone, Copy, Debug)]
pub struct EffectOpenedEvent {
    /// The new compositor effect node id.
    pub cc_effect_id: u32,
    /// Whether the node was synthesized for a non-trivial clip.
    pub synthetic_for_clip: bool,
    /// Whether the node was synthesized for 2-D axis alignment.
    pub synthetic_for_alignment: bool,
}

/// Emitted when the innermost open compositor effect closes.
#[derive(Clone, Copy, Debug)]
pub struct EffectClosedEvent {
    /// The compositor effect node id that closed.
    pub cc_effect_id: u32,
    /// Whether a clip mask layer was emitted on close.
    pub mask_emitted: bool,
}

/// Emitted when a clip mask layer is appended to the root layer.
#[derive(Clone, Copy, Debug)]
pub struct MaskLayerEvent {
    /// The mask isolation effect node.
    pub isolation_effect_id: u32,
    /// The `DstIn` mask effect node the layer draws under.
    pub mask_effect_id: u32,
}

/// Emitted when a render surface is set on an effect node.
#[derive(Clone, Copy, Debug)]
pub struct RenderSurfaceEvent {
    /// The effect node receiving the surface.
    pub cc_effect_id: u32,
    /// Why the surface is needed.
    pub reason: RenderSurfaceReason,
}

/// Receives synthesis events.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when an effect node is opened.
    fn on_effect_opened(&mut self, e: &EffectOpenedEvent) {
        _ = e;
    }

    /// Called when an effect node is closed.
    fn on_effect_closed(&mut self, e: &EffectClosedEvent) {
        _ = e;
    }

    /// Called when a clip mask layer is emitted.
    fn on_mask_layer(&mut self, e: &MaskLayerEvent) {
        _ = e;
    }

    /// Called when a render surface is set.
    fn on_render_surface(&mut self, e: &RenderSurfaceEvent) {
        _ = e;
    }
}

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

/// Thin wrapper around an optional [`TraceSink`].
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits an [`EffectOpenedEvent`].
    #[inline]
    pub fn effect_opened(&mut self, e: &EffectOpenedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_effect_opened(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`EffectClosedEvent`].
    #[inline]
    pub fn effect_closed(&mut self, e: &EffectClosedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_effect_closed(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`MaskLayerEvent`].
    #[inline]
    pub fn mask_layer(&mut self, e: &MaskLayerEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_mask_layer(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RenderSurfaceEvent`].
    #[inline]
    pub fn render_surface(&mut self, e: &RenderSurfaceEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_render_surface(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}
