// Copyright 2025 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared data model for the easel rendering crates.
//!
//! This crate holds everything both backends agree on: geometry and
//! color types, pixel buffers, the compact draw-op recording model,
//! the sorting draw pass, the client-facing canvas, immutable image
//! snapshots, and the glyph atlas.
//!
//! It is a foundation crate; use [`easel`](https://crates.io/crates/easel)
//! rather than depending on this directly.
//!
//! # Features
//!
//! - `png` (enabled by default): encode a [`Pixmap`](pixmap::Pixmap)'s
//!   contents as a PNG for debugging and snapshot comparisons.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod arena;
pub mod canvas;
pub mod color;
pub mod draw_pass;
pub mod geometry;
pub mod glyph;
pub mod image;
pub mod pixmap;
pub mod recording;

pub use color::{Color, PixelFormat};
pub use geometry::{Point, Rect};
