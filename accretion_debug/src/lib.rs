// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing and JSON export for accretion diagnostics.
//!
//! This crate provides development and post-mortem views of the compositor
//! property trees:
//!
//! - [`pretty::PrettyPrintSink`] — human-readable one-line-per-event output
//!   for the synthesis pass.
//! - [`pretty::dump_property_trees`] — an indented dump of all four trees.
//! - [`json::export`] — a JSON snapshot of the trees, suitable for diffing
//!   across passes.

pub mod json;
pub mod pretty;
