// Copyright 2025 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deferred texture release for snapshot images.
//!
//! A snapshot [`Image`](easel_common::image::Image) can outlive the
//! frame that produced it, but deleting its texture needs the device.
//! Snapshots therefore hold a [`ReleaseToken`]: when the last holder
//! drops, the texture id lands on a queue the owning renderer drains
//! at frame boundaries. If the renderer is gone first, so is the
//! device — the queue is weakly held and the drop becomes a no-op.

use std::sync::{Arc, Mutex, Weak};

use crate::device::TextureId;

/// Queue of textures whose last external holder has dropped.
pub(crate) type ReleaseQueue = Arc<Mutex<Vec<TextureId>>>;

/// Keeps a snapshot texture alive; enqueues it for deletion on drop.
#[derive(Debug)]
pub struct ReleaseToken {
    texture: TextureId,
    queue: Weak<Mutex<Vec<TextureId>>>,
}

impl ReleaseToken {
    pub(crate) fn new(texture: TextureId, queue: &ReleaseQueue) -> Self {
        Self {
            texture,
            queue: Arc::downgrade(queue),
        }
    }
}

impl Drop for ReleaseToken {
    fn drop(&mut self) {
        if let Some(queue) = self.queue.upgrade() {
            if let Ok(mut pending) = queue.lock() {
                pending.push(self.texture);
            }
        }
    }
}
