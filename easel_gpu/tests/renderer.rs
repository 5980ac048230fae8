// Copyright 2025 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Batching and resource-lifetime tests for the GPU renderer,
//! exercised against a recording mock device.

mod common;

use std::sync::Arc;

use common::{Call, MockDevice};
use easel_common::canvas::Canvas;
use easel_common::color::{Color, PixelFormat};
use easel_common::draw_pass::DrawPass;
use easel_common::geometry::{Point, Rect};
use easel_common::image::Image;
use easel_common::pixmap::{Pixmap, PixmapInfo};
use easel_common::recording::Recording;
use easel_gpu::{GpuRenderer, TextureId};

fn record(build: impl FnOnce(&mut Canvas)) -> (Recording, DrawPass) {
    let mut canvas = Canvas::new();
    build(&mut canvas);
    let recording = canvas.finish();
    let pass = DrawPass::create(&recording);
    (recording, pass)
}

fn renderer(width: u32, height: u32) -> (GpuRenderer<MockDevice>, Arc<std::sync::Mutex<common::State>>) {
    let device = MockDevice::new();
    let state = device.state();
    let renderer = GpuRenderer::new(device, width, height).unwrap();
    (renderer, state)
}

fn solid_image(w: u32, h: u32, color: Color) -> Arc<Image> {
    let mut pm = Pixmap::alloc(PixmapInfo::make_rgba(w, h)).unwrap();
    pm.clear(color);
    Image::from_pixmap(&pm).unwrap()
}

#[test]
fn construction_compiles_both_pipelines_and_a_target() {
    let (_renderer, state) = renderer(64, 64);
    let state = state.lock().unwrap();
    assert_eq!(state.count(|c| matches!(c, Call::CompilePipeline(_))), 2);
    assert_eq!(
        state.count(|c| matches!(c, Call::CreateFramebuffer { width: 64, height: 64 })),
        1
    );
}

#[test]
fn pipeline_failure_surfaces_as_error() {
    let mut device = MockDevice::new();
    device.fail_pipelines = true;
    assert!(GpuRenderer::new(device, 64, 64).is_err());
}

#[test]
fn begin_frame_prepares_and_clears() {
    let (mut renderer, state) = renderer(32, 16);
    renderer.begin_frame(Color::rgb(3, 4, 5));
    let state = state.lock().unwrap();
    assert_eq!(state.count(|c| matches!(c, Call::SetViewport { width: 32, height: 16 })), 1);
    assert_eq!(state.count(|c| matches!(c, Call::SetBlending(true))), 1);
    assert_eq!(state.count(|c| matches!(c, Call::EnableScissor(false))), 1);
    assert_eq!(state.count(|c| matches!(c, Call::Clear(color) if *color == Color::rgb(3, 4, 5))), 1);
}

#[test]
fn color_geometry_batches_into_one_draw() {
    let (mut renderer, state) = renderer(128, 128);
    renderer.begin_frame(Color::BLACK);

    let (recording, pass) = record(|c| {
        let color = Color::rgb(255, 0, 0);
        c.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0), color); // 6 verts
        c.stroke_rect(Rect::new(20.0, 20.0, 10.0, 10.0), color, 1.0); // 24
        c.draw_line(Point::new(0.0, 0.0), Point::new(50.0, 50.0), color, 2.0); // 6
        c.draw_polyline(
            &[Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)],
            color,
            1.0,
        ); // two segments, 12
    });
    renderer.execute(&recording, &pass);

    let state = state.lock().unwrap();
    assert_eq!(state.draws(), vec![(0, 48)]);
}

#[test]
fn degenerate_lines_are_dropped() {
    let (mut renderer, state) = renderer(64, 64);
    renderer.begin_frame(Color::BLACK);
    let (recording, pass) = record(|c| {
        c.draw_line(Point::new(5.0, 5.0), Point::new(5.0, 5.0), Color::WHITE, 3.0);
    });
    renderer.execute(&recording, &pass);
    assert!(state.lock().unwrap().draws().is_empty());
}

#[test]
fn clip_changes_flush_and_drive_the_scissor() {
    let (mut renderer, state) = renderer(100, 100);
    renderer.begin_frame(Color::BLACK);

    let (recording, pass) = record(|c| {
        c.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0), Color::WHITE);
        c.save();
        c.clip_rect(Rect::new(10.0, 20.0, 30.0, 40.0));
        c.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0), Color::WHITE);
        c.restore();
        c.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0), Color::WHITE);
    });
    renderer.execute(&recording, &pass);

    let state = state.lock().unwrap();
    // One flush per clip group.
    assert_eq!(state.draws(), vec![(0, 6), (0, 6), (0, 6)]);
    assert_eq!(state.count(|c| matches!(c, Call::EnableScissor(true))), 1);
    assert_eq!(
        state.count(|c| matches!(c, Call::SetScissor { x: 10, y: 20, width: 30, height: 40 })),
        1
    );
    // The ClearClip group disabled it again (once in begin_frame, once
    // from the op).
    assert_eq!(state.count(|c| matches!(c, Call::EnableScissor(false))), 2);
}

#[test]
fn scissor_origin_flips_on_gl_family_devices() {
    let mut device = MockDevice::new();
    device.flipped = true;
    let state = device.state();
    let mut renderer = GpuRenderer::new(device, 100, 100).unwrap();
    renderer.begin_frame(Color::BLACK);

    let (recording, pass) = record(|c| {
        c.clip_rect(Rect::new(10.0, 20.0, 30.0, 40.0));
        c.fill_rect(Rect::new(0.0, 0.0, 5.0, 5.0), Color::WHITE);
    });
    renderer.execute(&recording, &pass);

    // Top-left (10, 20, 30, 40) in a 100-tall target becomes
    // bottom-left y = 100 - (20 + 40) = 40.
    assert_eq!(
        state
            .lock()
            .unwrap()
            .count(|c| matches!(c, Call::SetScissor { x: 10, y: 40, width: 30, height: 40 })),
        1
    );
}

#[test]
fn cpu_image_uploads_once_and_is_reused() {
    let (mut renderer, state) = renderer(64, 64);
    renderer.begin_frame(Color::BLACK);

    let image = solid_image(8, 8, Color::rgb(1, 2, 3));
    let (recording, pass) = record(|c| {
        c.draw_image(image.clone(), 0.0, 0.0);
        c.draw_image(image.clone(), 16.0, 0.0);
    });
    renderer.execute(&recording, &pass);

    let state_guard = state.lock().unwrap();
    // One upload, two textured draws binding the same texture.
    assert_eq!(
        state_guard.count(|c| matches!(c, Call::CreateTexture { width: 8, height: 8, .. })),
        1
    );
    let binds: Vec<TextureId> = state_guard
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::BindTexture { texture, .. } => Some(*texture),
            _ => None,
        })
        .collect();
    assert_eq!(binds.len(), 2);
    assert_eq!(binds[0], binds[1]);
    assert_eq!(state_guard.draws(), vec![(0, 6), (0, 6)]);
    drop(state_guard);
    assert_eq!(renderer.cached_texture_count(), 1);
}

#[test]
fn gpu_backed_image_binds_its_own_handle() {
    let (mut renderer, state) = renderer(64, 64);
    renderer.begin_frame(Color::BLACK);

    let guard: easel_common::image::ReleaseGuard = Arc::new(());
    let image = Image::from_gpu_texture(77, 8, 8, PixelFormat::Rgba8888, guard).unwrap();
    let (recording, pass) = record(|c| c.draw_image(image, 4.0, 4.0));
    renderer.execute(&recording, &pass);

    let state = state.lock().unwrap();
    assert_eq!(
        state.count(|c| matches!(c, Call::BindTexture { texture: TextureId(77), .. })),
        1
    );
    // Nothing was uploaded to the cache for it (the only texture ever
    // created is the 1x1 text scratch at construction).
    assert_eq!(
        state.count(|c| matches!(c, Call::CreateTexture { width: 8, height: 8, .. })),
        0
    );
}

#[test]
fn failed_texture_upload_skips_the_image_op() {
    let (mut renderer, state) = renderer(64, 64);
    renderer.begin_frame(Color::BLACK);
    renderer.device_mut().fail_textures = true;

    let image = solid_image(8, 8, Color::WHITE);
    let (recording, pass) = record(|c| c.draw_image(image, 0.0, 0.0));
    renderer.execute(&recording, &pass);

    let state = state.lock().unwrap();
    assert!(state.draws().is_empty());
    assert_eq!(state.count(|c| matches!(c, Call::BindTexture { .. })), 0);
}

#[test]
fn image_draw_flushes_pending_color_geometry_first() {
    let (mut renderer, state) = renderer(64, 64);
    renderer.begin_frame(Color::BLACK);

    let image = solid_image(4, 4, Color::WHITE);
    let (recording, pass) = record(|c| {
        c.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0), Color::rgb(9, 9, 9));
        c.draw_image(image, 0.0, 0.0);
    });
    renderer.execute(&recording, &pass);

    // Color batch first (6 verts), then the textured quad (6 verts).
    assert_eq!(state.lock().unwrap().draws(), vec![(0, 6), (0, 6)]);
}

#[test]
fn snapshot_blits_into_a_new_texture() {
    let (mut renderer, state) = renderer(32, 32);
    renderer.begin_frame(Color::rgb(255, 0, 0));
    renderer.end_frame();

    let target_fbo = {
        // The offscreen target was the first framebuffer created.
        let state = state.lock().unwrap();
        state
            .calls
            .iter()
            .find_map(|c| match c {
                Call::BindFramebuffer(Some(fbo)) => Some(*fbo),
                _ => None,
            })
            .unwrap()
    };

    let snapshot = renderer.make_snapshot().unwrap();
    assert!(snapshot.is_gpu_backed());
    assert_eq!((snapshot.width(), snapshot.height()), (32, 32));

    let state_guard = state.lock().unwrap();
    // Blitted from the target into the snapshot attachment, then the
    // scratch framebuffer went away while its texture lives on.
    assert_eq!(
        state_guard.count(
            |c| matches!(c, Call::Blit { src: Some(s), dst: Some(_) } if *s == target_fbo)
        ),
        1
    );
    assert!(state_guard.live_textures.contains(&snapshot.gpu_handle()));
    drop(state_guard);

    // Dropping the last reference releases the texture at the next
    // frame boundary.
    let handle = snapshot.gpu_handle();
    drop(snapshot);
    renderer.begin_frame(Color::BLACK);
    let state_guard = state.lock().unwrap();
    assert!(!state_guard.live_textures.contains(&handle));
    assert_eq!(
        state_guard.count(|c| matches!(c, Call::DeleteTexture(t) if t.0 == handle)),
        1
    );
}

#[test]
fn snapshot_survives_further_rendering() {
    let (mut renderer, state) = renderer(16, 16);
    renderer.begin_frame(Color::rgb(255, 0, 0));
    renderer.end_frame();
    let snapshot = renderer.make_snapshot().unwrap();
    let handle = snapshot.gpu_handle();

    // A whole further frame leaves the snapshot texture alone.
    renderer.begin_frame(Color::rgb(0, 255, 0));
    let (recording, pass) = record(|c| {
        c.fill_rect(Rect::new(0.0, 0.0, 16.0, 16.0), Color::rgb(0, 255, 0));
    });
    renderer.execute(&recording, &pass);
    renderer.end_frame();

    let state = state.lock().unwrap();
    assert!(state.live_textures.contains(&handle));
    assert_eq!(state.count(|c| matches!(c, Call::DeleteTexture(t) if t.0 == handle)), 0);
}

#[test]
fn drop_releases_every_owned_texture() {
    let device = MockDevice::new();
    let state = device.state();
    let mut renderer = GpuRenderer::new(device, 64, 64).unwrap();
    renderer.begin_frame(Color::BLACK);

    let image = solid_image(8, 8, Color::WHITE);
    let (recording, pass) = record(|c| c.draw_image(image, 0.0, 0.0));
    renderer.execute(&recording, &pass);
    renderer.end_frame();
    drop(renderer);

    // Cache texture, temp texture and the color attachment are all
    // gone.
    assert!(state.lock().unwrap().live_textures.is_empty());
}

#[test]
fn resize_recreates_the_offscreen_target() {
    let (mut renderer, state) = renderer(32, 32);
    renderer.resize(128, 64);
    assert_eq!((renderer.width(), renderer.height()), (128, 64));
    let state = state.lock().unwrap();
    assert_eq!(state.count(|c| matches!(c, Call::DestroyFramebuffer(_))), 1);
    assert_eq!(
        state.count(|c| matches!(c, Call::CreateFramebuffer { width: 128, height: 64 })),
        1
    );
}

#[test]
fn default_target_renderer_binds_no_framebuffer() {
    let device = MockDevice::new();
    let state = device.state();
    let mut renderer = GpuRenderer::new_for_default_target(device, 64, 64).unwrap();
    renderer.begin_frame(Color::BLACK);
    let state = state.lock().unwrap();
    assert_eq!(state.count(|c| matches!(c, Call::CreateFramebuffer { .. })), 0);
    assert_eq!(state.count(|c| matches!(c, Call::BindFramebuffer(None))), 1);
}

#[test]
fn text_without_atlas_is_skipped() {
    let (mut renderer, state) = renderer(64, 64);
    renderer.begin_frame(Color::BLACK);
    let (recording, pass) = record(|c| {
        c.draw_text(Point::new(4.0, 20.0), "hello", Color::WHITE);
    });
    renderer.execute(&recording, &pass);
    let state = state.lock().unwrap();
    assert_eq!(state.count(|c| matches!(c, Call::UpdateTexture { .. })), 0);
    assert!(state.draws().is_empty());
}

#[test]
fn end_frame_flushes_remaining_geometry() {
    let (mut renderer, state) = renderer(64, 64);
    renderer.begin_frame(Color::BLACK);
    let (recording, pass) = record(|c| {
        c.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), Color::WHITE);
    });
    // Execute flushes at end-of-pass; end_frame also flushes the
    // device queue.
    renderer.execute(&recording, &pass);
    renderer.end_frame();
    let state = state.lock().unwrap();
    assert_eq!(state.draws(), vec![(0, 6)]);
    assert_eq!(state.count(|c| matches!(c, Call::Flush)), 1);
}
