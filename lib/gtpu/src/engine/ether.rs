// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Ethernet frames.

use gtpu_api::MacAddr;
use serde::Deserialize;
use serde::Serialize;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

pub const ETHER_TYPE_IPV4: u16 = 0x0800;

pub const ETHER_ADDR_LEN: usize = 6;
pub const ETHER_HDR_LEN: usize = 14;

/// The addressing of an emitted Ethernet frame.
///
/// The ethertype is not represented; every frame this engine emits
/// carries an IPv4 payload, so `emit` always writes
/// [`ETHER_TYPE_IPV4`]. MAC values come from trusted configuration
/// and get no semantic validation.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct EtherMeta {
    pub dst: MacAddr,
    pub src: MacAddr,
}

impl EtherMeta {
    /// Return the length of the header needed to emit the metadata.
    #[inline]
    pub fn hdr_len(&self) -> usize {
        ETHER_HDR_LEN
    }

    #[inline]
    pub fn emit(&self, dst: &mut [u8]) {
        // The raw header relies on the slice being exactly sized.
        debug_assert_eq!(dst.len(), ETHER_HDR_LEN);
        let raw = EtherHdrRaw::from(self);
        raw.write_to(dst).expect("slice is exactly header sized");
    }
}

/// Note: For now we keep this unaligned to be safe.
#[repr(C)]
#[derive(
    Clone, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
pub struct EtherHdrRaw {
    pub dst: [u8; 6],
    pub src: [u8; 6],
    pub ether_type: [u8; 2],
}

impl From<&EtherMeta> for EtherHdrRaw {
    #[inline]
    fn from(meta: &EtherMeta) -> Self {
        Self {
            dst: meta.dst.bytes(),
            src: meta.src.bytes(),
            ether_type: ETHER_TYPE_IPV4.to_be_bytes(),
        }
    }
}
