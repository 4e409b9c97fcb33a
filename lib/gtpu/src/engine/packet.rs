// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Packet buffers.
//!
//! A [`PacketBuf`] owns one contiguous allocation and a read pointer
//! into it. Bytes before the read pointer are headroom; growing the
//! readable region into the headroom is how outer headers get
//! prepended without relocating the payload.

use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum SegAdjustError {
    /// Attempt to place the read pointer before the base of the
    /// allocation, i.e. the headroom is too small.
    #[error("read pointer would move before the start of the segment")]
    StartBeforeBase,
}

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum WriteError {
    #[error("packet buffer too small: need {needed} bytes, have {have} bytes")]
    BufferTooSmall { needed: usize, have: usize },
}

/// A contiguous mutable packet buffer with front headroom.
///
/// One buffer exists per invocation of the engine and is exclusively
/// owned by it for that invocation's lifetime.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PacketBuf {
    data: Vec<u8>,
    head: usize,
}

impl PacketBuf {
    /// Create a buffer holding a copy of `payload` preceded by
    /// `headroom` bytes of slack.
    pub fn new_with_headroom(headroom: usize, payload: &[u8]) -> Self {
        let mut data = vec![0; headroom + payload.len()];
        data[headroom..].copy_from_slice(payload);
        Self { data, head: headroom }
    }

    /// Return the number of free bytes in front of the readable
    /// region.
    #[inline]
    pub fn headroom(&self) -> usize {
        self.head
    }

    /// Return the length of the readable region.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() - self.head
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the readable region, `[head, tail)`.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data[self.head..]
    }

    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.head..]
    }

    /// Grow the readable region by `n` bytes at the front.
    ///
    /// Existing readable bytes keep their content and order; they now
    /// begin at offset `n`, and offset 0 is writable. The newly
    /// exposed bytes are zeroed.
    pub fn expand_front(&mut self, n: usize) -> Result<(), SegAdjustError> {
        if n > self.head {
            return Err(SegAdjustError::StartBeforeBase);
        }

        self.head -= n;
        self.data[self.head..self.head + n].fill(0);
        Ok(())
    }

    /// Return an exactly-sized mutable window at `offset` within the
    /// readable region, verifying bounds before any byte access.
    pub fn window(
        &mut self,
        offset: usize,
        len: usize,
    ) -> Result<&mut [u8], WriteError> {
        let have = self.len();
        let needed = offset + len;
        if needed > have {
            return Err(WriteError::BufferTooSmall { needed, have });
        }

        Ok(&mut self.bytes_mut()[offset..offset + len])
    }
}
