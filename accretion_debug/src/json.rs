// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON snapshots of the compositor property trees.
//!
//! [`export`] writes one JSON object holding all four trees. Node ids are
//! array indices, so two snapshots of the same pass diff cleanly.

use std::io::{self, Write};

use serde_json::{Value, json};

use accretion_compositing::tree::{PropertyTrees, INVALID_NODE_ID};

fn id_value(id: u32) -> Value {
    if id == INVALID_NODE_ID {
        Value::Null
    } else {
        json!(id)
    }
}

fn rect_value(rect: kurbo::Rect) -> Value {
    json!([rect.x0, rect.y0, rect.x1, rect.y1])
}

/// Writes a JSON snapshot of the trees.
pub fn export(trees: &PropertyTrees, writer: &mut dyn Write) -> io::Result<()> {
    let mut transform_nodes: Vec<Value> = Vec::new();
    for id in 0..u32::try_from(trees.transform_count()).expect("tree overflow") {
        let node = trees.transform_node(id);
        transform_nodes.push(json!({
            "parent": id_value(node.parent_id),
            "local": node.local.cols,
            "origin": node.origin,
            "flattens": node.flattens_inherited_transform,
            "sorting_context": node.sorting_context_id,
            "scroll_offset": [node.scroll_offset.x, node.scroll_offset.y],
            "scroll_node": id_value(node.scroll_node_id),
            "element": node.element_id.0,
            "sequence": node.sequence_number,
        }));
    }

    let mut clip_nodes: Vec<Value> = Vec::new();
    for id in 0..u32::try_from(trees.clip_count()).expect("tree overflow") {
        let node = trees.clip_node(id);
        clip_nodes.push(json!({
            "parent": id_value(node.parent_id),
            "rect": rect_value(node.clip_rect),
            "transform": id_value(node.transform_id),
            "sequence": node.sequence_number,
        }));
    }

    let mut effect_nodes: Vec<Value> = Vec::new();
    for id in 0..u32::try_from(trees.effect_count()).expect("tree overflow") {
        let node = trees.effect_node(id);
        effect_nodes.push(json!({
            "parent": id_value(node.parent_id),
            "transform": id_value(node.transform_id),
            "clip": id_value(node.clip_id),
            "opacity": node.opacity,
            "blend_mode": format!("{:?}", node.blend_mode),
            "surface": node.render_surface_reason.map(|r| format!("{r:?}")),
            "fast_rounded_corner": node.fast_rounded_corner.map(|(rect, _)| rect_value(rect)),
            "element": node.element_id.0,
            "sequence": node.sequence_number,
        }));
    }

    let mut scroll_nodes: Vec<Value> = Vec::new();
    for id in 0..u32::try_from(trees.scroll_count()).expect("tree overflow") {
        let node = trees.scroll_node(id);
        scroll_nodes.push(json!({
            "parent": id_value(node.parent_id),
            "container": rect_value(node.container_rect),
            "contents": [node.contents_size.width, node.contents_size.height],
            "scrollable": [node.user_scrollable_horizontal, node.user_scrollable_vertical],
            "composited": node.is_composited,
            "transform": id_value(node.transform_id),
            "element": node.element_id.0,
            "sequence": node.sequence_number,
        }));
    }

    let snapshot = json!({
        "sequence": trees.sequence_number(),
        "transform": transform_nodes,
        "clip": clip_nodes,
        "effect": effect_nodes,
        "scroll": scroll_nodes,
    });
    serde_json::to_writer_pretty(&mut *writer, &snapshot)?;
    writeln!(writer)
}
