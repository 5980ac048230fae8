// Copyright 2025 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A recording [`GpuDevice`] double shared by the renderer tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use easel_common::color::Color;
use easel_gpu::{
    BufferId, FramebufferId, GpuDevice, GpuError, PipelineId, TextureFormat, TextureId,
    VertexLayout,
};

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    CompilePipeline(VertexLayout),
    CreateFramebuffer { width: u32, height: u32 },
    DestroyFramebuffer(FramebufferId),
    UploadBuffer { buffer: BufferId, bytes: usize },
    BindFramebuffer(Option<FramebufferId>),
    BindPipeline(PipelineId),
    BindVertexBuffer(BufferId),
    BindTexture { slot: u32, texture: TextureId },
    SetProjection,
    DrawTriangles { first: u32, count: u32 },
    EnableScissor(bool),
    SetScissor { x: i32, y: i32, width: u32, height: u32 },
    CreateTexture { texture: TextureId, width: u32, height: u32, format: TextureFormat },
    UpdateTexture { texture: TextureId, width: u32, height: u32 },
    DeleteTexture(TextureId),
    Blit { src: Option<FramebufferId>, dst: Option<FramebufferId> },
    SetViewport { width: u32, height: u32 },
    Clear(Color),
    SetBlending(bool),
    Flush,
}

/// Shared recorder state, inspectable after the device moves into a
/// renderer.
#[derive(Debug, Default)]
pub(crate) struct State {
    pub(crate) calls: Vec<Call>,
    pub(crate) live_textures: HashSet<u64>,
    next_texture: u64,
    next_object: u32,
}

impl State {
    pub(crate) fn draws(&self) -> Vec<(u32, u32)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::DrawTriangles { first, count } => Some((*first, *count)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

/// Recording mock device.
#[derive(Debug)]
pub(crate) struct MockDevice {
    state: Arc<Mutex<State>>,
    /// Make `compile_pipeline` fail.
    pub(crate) fail_pipelines: bool,
    /// Make `create_texture` fail.
    pub(crate) fail_textures: bool,
    /// Report a bottom-left (GL-style) origin.
    pub(crate) flipped: bool,
}

impl MockDevice {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            fail_pipelines: false,
            fail_textures: false,
            flipped: false,
        }
    }

    /// A handle to the recorder state that survives moving the device
    /// into a renderer.
    pub(crate) fn state(&self) -> Arc<Mutex<State>> {
        self.state.clone()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn next_texture(&self) -> TextureId {
        let mut state = self.state.lock().unwrap();
        state.next_texture += 1;
        let id = state.next_texture;
        state.live_textures.insert(id);
        TextureId(id)
    }

    fn next_object(&self) -> u32 {
        let mut state = self.state.lock().unwrap();
        state.next_object += 1;
        state.next_object
    }
}

impl GpuDevice for MockDevice {
    fn create_framebuffer(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<(FramebufferId, TextureId), GpuError> {
        self.record(Call::CreateFramebuffer { width, height });
        let fbo = FramebufferId(self.next_object());
        let color = self.next_texture();
        Ok((fbo, color))
    }

    fn destroy_framebuffer(&mut self, fbo: FramebufferId) {
        self.record(Call::DestroyFramebuffer(fbo));
    }

    fn compile_pipeline(
        &mut self,
        layout: VertexLayout,
        _vertex_src: &str,
        _fragment_src: &str,
    ) -> Result<PipelineId, GpuError> {
        if self.fail_pipelines {
            return Err(GpuError::PipelineLink("mock link failure".into()));
        }
        self.record(Call::CompilePipeline(layout));
        Ok(PipelineId(self.next_object()))
    }

    fn create_vertex_buffer(&mut self) -> BufferId {
        BufferId(self.next_object())
    }

    fn upload_buffer(&mut self, buffer: BufferId, bytes: &[u8]) {
        self.record(Call::UploadBuffer {
            buffer,
            bytes: bytes.len(),
        });
    }

    fn bind_framebuffer(&mut self, fbo: Option<FramebufferId>) {
        self.record(Call::BindFramebuffer(fbo));
    }

    fn bind_pipeline(&mut self, pipeline: PipelineId) {
        self.record(Call::BindPipeline(pipeline));
    }

    fn bind_vertex_buffer(&mut self, buffer: BufferId) {
        self.record(Call::BindVertexBuffer(buffer));
    }

    fn bind_texture(&mut self, slot: u32, texture: TextureId) {
        self.record(Call::BindTexture { slot, texture });
    }

    fn set_projection(&mut self, _matrix: &[f32; 16]) {
        self.record(Call::SetProjection);
    }

    fn draw_triangles(&mut self, first: u32, count: u32) {
        self.record(Call::DrawTriangles { first, count });
    }

    fn enable_scissor(&mut self, enabled: bool) {
        self.record(Call::EnableScissor(enabled));
    }

    fn set_scissor(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.record(Call::SetScissor { x, y, width, height });
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        format: TextureFormat,
        _pixels: Option<&[u8]>,
    ) -> Result<TextureId, GpuError> {
        if self.fail_textures {
            return Err(GpuError::TextureAlloc { width, height });
        }
        let texture = self.next_texture();
        self.record(Call::CreateTexture {
            texture,
            width,
            height,
            format,
        });
        Ok(texture)
    }

    fn update_texture(
        &mut self,
        texture: TextureId,
        width: u32,
        height: u32,
        _format: TextureFormat,
        _pixels: &[u8],
    ) {
        self.record(Call::UpdateTexture { texture, width, height });
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.state.lock().unwrap().live_textures.remove(&texture.0);
        self.record(Call::DeleteTexture(texture));
    }

    fn blit(
        &mut self,
        src: Option<FramebufferId>,
        dst: Option<FramebufferId>,
        _width: u32,
        _height: u32,
    ) {
        self.record(Call::Blit { src, dst });
    }

    fn read_pixels(&mut self, _x: u32, _y: u32, _width: u32, _height: u32, out: &mut [u8]) {
        out.fill(0);
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.record(Call::SetViewport { width, height });
    }

    fn clear(&mut self, color: Color) {
        self.record(Call::Clear(color));
    }

    fn set_blending(&mut self, enabled: bool) {
        self.record(Call::SetBlending(enabled));
    }

    fn flush(&mut self) {
        self.record(Call::Flush);
    }

    fn origin_flipped(&self) -> bool {
        self.flipped
    }
}
