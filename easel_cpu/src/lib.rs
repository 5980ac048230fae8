// Copyright 2025 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software rasterizer backend for easel.
//!
//! [`CpuRenderer`] replays a sorted recording by writing pixels
//! directly into a [`Pixmap`] target: clipped rectangle fills with a
//! fast opaque path, Bresenham lines, glyph-atlas text, and
//! format-converting image blits with SRC-OVER blending.
//!
//! [`Pixmap`]: easel_common::pixmap::Pixmap
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod renderer;

pub use renderer::CpuRenderer;
