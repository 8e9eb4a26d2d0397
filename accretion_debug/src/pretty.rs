// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable views of the synthesis pass and its output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per
//! synthesis event to a [`Write`](std::io::Write) destination (default:
//! stderr). [`dump_property_trees`] writes an indented snapshot of all four
//! compositor trees.

use std::io::{self, Write};

use accretion_compositing::trace::{
    EffectClosedEvent, EffectOpenedEvent, MaskLayerEvent, RenderSurfaceEvent, TraceSink,
};
use accretion_compositing::tree::{PropertyTrees, RenderSurfaceReason, INVALID_NODE_ID};

/// Writes human-readable synthesis trace lines to a
/// [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }
}

fn reason_name(reason: RenderSurfaceReason) -> &'static str {
    match reason {
        RenderSurfaceReason::Root => "root",
        RenderSurfaceReason::Filter => "filter",
        RenderSurfaceReason::BackdropFilter => "backdrop-filter",
        RenderSurfaceReason::BlendMode => "blend-mode",
        RenderSurfaceReason::ClipMask => "clip-mask",
        RenderSurfaceReason::ClipAxisAlignment => "clip-axis-alignment",
        RenderSurfaceReason::RoundedCorner => "rounded-corner",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_effect_opened(&mut self, e: &EffectOpenedEvent) {
        let kind = match (e.synthetic_for_clip, e.synthetic_for_alignment) {
            (false, false) => "plain",
            (true, false) => "synthetic:clip",
            (false, true) => "synthetic:alignment",
            (true, true) => "synthetic:clip+alignment",
        };
        let _ = writeln!(self.writer, "[effect:open] id={} {kind}", e.cc_effect_id);
    }

    fn on_effect_closed(&mut self, e: &EffectClosedEvent) {
        let _ = writeln!(
            self.writer,
            "[effect:close] id={} mask={}",
            e.cc_effect_id, e.mask_emitted,
        );
    }

    fn on_mask_layer(&mut self, e: &MaskLayerEvent) {
        let _ = writeln!(
            self.writer,
            "[mask] isolation={} mask_effect={}",
            e.isolation_effect_id, e.mask_effect_id,
        );
    }

    fn on_render_surface(&mut self, e: &RenderSurfaceEvent) {
        let _ = writeln!(
            self.writer,
            "[surface] id={} reason={}",
            e.cc_effect_id,
            reason_name(e.reason),
        );
    }
}

fn depth_of(parent_of: impl Fn(u32) -> u32, id: u32) -> usize {
    let mut depth = 0;
    let mut cursor = id;
    loop {
        let parent = parent_of(cursor);
        if parent == INVALID_NODE_ID {
            return depth;
        }
        depth += 1;
        cursor = parent;
    }
}

/// Writes an indented snapshot of all four trees.
///
/// Parent indices always precede children, so printing in index order with
/// per-node indentation yields a readable tree.
pub fn dump_property_trees(trees: &PropertyTrees, writer: &mut dyn Write) -> io::Result<()> {
    writeln!(writer, "transform tree ({} nodes)", trees.transform_count())?;
    for id in 0..u32::try_from(trees.transform_count()).expect("tree overflow") {
        let node = trees.transform_node(id);
        let indent = depth_of(|n| trees.transform_node(n).parent_id, id);
        write!(writer, "  {:indent$}[{id}]", "", indent = indent * 2)?;
        if node.local.is_identity() {
            write!(writer, " identity")?;
        } else if node.local.is_identity_or_2d_translation() {
            let t = node.local.translation_2d();
            write!(writer, " translate({}, {})", t.x, t.y)?;
        } else {
            write!(writer, " matrix")?;
        }
        if node.scroll_node_id != INVALID_NODE_ID {
            write!(
                writer,
                " scroll={} offset=({}, {})",
                node.scroll_node_id, node.scroll_offset.x, node.scroll_offset.y,
            )?;
        }
        writeln!(writer)?;
    }

    writeln!(writer, "clip tree ({} nodes)", trees.clip_count())?;
    for id in 0..u32::try_from(trees.clip_count()).expect("tree overflow") {
        let node = trees.clip_node(id);
        let indent = depth_of(|n| trees.clip_node(n).parent_id, id);
        writeln!(
            writer,
            "  {:indent$}[{id}] rect={:?} transform={}",
            "",
            node.clip_rect,
            node.transform_id,
            indent = indent * 2,
        )?;
    }

    writeln!(writer, "effect tree ({} nodes)", trees.effect_count())?;
    for id in 0..u32::try_from(trees.effect_count()).expect("tree overflow") {
        let node = trees.effect_node(id);
        let indent = depth_of(|n| trees.effect_node(n).parent_id, id);
        write!(
            writer,
            "  {:indent$}[{id}] opacity={}",
            "",
            node.opacity,
            indent = indent * 2,
        )?;
        if let Some(reason) = node.render_surface_reason {
            write!(writer, " surface={}", reason_name(reason))?;
        }
        if node.fast_rounded_corner.is_some() {
            write!(writer, " fast-rounded-corner")?;
        }
        writeln!(writer)?;
    }

    writeln!(writer, "scroll tree ({} nodes)", trees.scroll_count())?;
    for id in 0..u32::try_from(trees.scroll_count()).expect("tree overflow") {
        let node = trees.scroll_node(id);
        let indent = depth_of(|n| trees.scroll_node(n).parent_id, id);
        writeln!(
            writer,
            "  {:indent$}[{id}] container={:?} contents={:?} composited={}",
            "",
            node.container_rect,
            node.contents_size,
            node.is_composited,
            indent = indent * 2,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_print_events() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_effect_opened(&EffectOpenedEvent {
            cc_effect_id: 1,
            synthetic_for_clip: true,
            synthetic_for_alignment: false,
        });
        sink.on_render_surface(&RenderSurfaceEvent {
            cc_effect_id: 1,
            reason: RenderSurfaceReason::ClipMask,
        });
        let output = String::from_utf8(sink.writer).unwrap();
        assert!(output.contains("[effect:open] id=1 synthetic:clip"), "got: {output}");
        assert!(output.contains("reason=clip-mask"), "got: {output}");
    }

    #[test]
    fn dump_empty_trees() {
        let trees = PropertyTrees::new();
        let mut out = Vec::new();
        dump_property_trees(&trees, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("transform tree (0 nodes)"), "got: {text}");
        assert!(text.contains("scroll tree (0 nodes)"), "got: {text}");
    }
}
