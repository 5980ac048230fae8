// Copyright 2025 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sort key and draw pass: the execution order over a recording.
//!
//! Ops are sorted by a packed 64-bit key,
//! `[63:48] clip group | [47:40] op kind | [39:8] color | [7:0] sequence`,
//! so that nothing crosses a clip boundary, ops of one kind and color
//! batch together inside a group, and clip changes land between the
//! groups they separate. Backends see "change clip, then run this
//! group" with minimal pipeline switches.

use crate::recording::{OpKind, Recording};

fn sort_key(clip_group: u16, kind: OpKind, color_hash: u32, seq: u8) -> u64 {
    (u64::from(clip_group) << 48)
        | (u64::from(kind as u8) << 40)
        | (u64::from(color_hash) << 8)
        | u64::from(seq)
}

/// A deterministic, sorted execution order over a [`Recording`].
///
/// Creating a pass is a pure function of the recording: the same ops
/// always produce the same order. Sorting is mandatory even without
/// clipping; it only costs an `O(n log n)` pass over small keys.
#[derive(Debug, Default)]
pub struct DrawPass {
    sorted_indices: Vec<u32>,
}

impl DrawPass {
    /// Compute the execution order for `recording`.
    pub fn create(recording: &Recording) -> Self {
        let ops = recording.ops();
        let mut keys: Vec<(u64, u32)> = Vec::with_capacity(ops.len());

        // Group ids advance at every clip change, so the clip op keys
        // at the end of the group it closes and everything after it
        // keys into the group it opens.
        let mut clip_group: u16 = 0;
        // The sequence byte is the in-group recording order. It wraps
        // at 256; past that, same-kind same-color ops inside one group
        // fall back to the index tiebreak below.
        let mut seq: u8 = 0;

        for (idx, op) in ops.iter().enumerate() {
            let key = sort_key(clip_group, op.kind(), op.sort_color().sort_hash(), seq);
            keys.push((key, idx as u32));
            seq = seq.wrapping_add(1);
            if matches!(op.kind(), OpKind::SetClip | OpKind::ClearClip) {
                clip_group = clip_group.saturating_add(1);
                seq = 0;
            }
        }

        // Unstable sort is fine: the sequence byte already encodes
        // recording order, and equal full keys fall back to the
        // original index.
        keys.sort_unstable();

        Self {
            sorted_indices: keys.into_iter().map(|(_, idx)| idx).collect(),
        }
    }

    /// Indices into [`Recording::ops`] in execution order.
    pub fn sorted_indices(&self) -> &[u32] {
        &self.sorted_indices
    }
}
