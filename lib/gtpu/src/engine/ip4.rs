// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! IPv4 headers.

use super::checksum::Checksum;
use super::checksum::HeaderChecksum;
use gtpu_api::Ipv4Addr;
use serde::Deserialize;
use serde::Serialize;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

pub const IPV4_HDR_LEN: usize = 20;
pub const IPV4_VERSION: u8 = 4;

/// IP protocol number for UDP.
pub const PROTO_UDP: u8 = 17;

pub const DEF_TTL: u8 = 64;

/// The fields of an outer IPv4 header.
///
/// Identification is always zero and no fragmentation flags are set:
/// the engine never fragments and never participates in reassembly.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct Ipv4Meta {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub proto: u8,
    pub ttl: u8,
    pub total_len: u16,
    pub csum: [u8; 2],
}

impl Default for Ipv4Meta {
    fn default() -> Self {
        Self {
            src: Ipv4Addr::ANY_ADDR,
            dst: Ipv4Addr::ANY_ADDR,
            proto: PROTO_UDP,
            ttl: DEF_TTL,
            total_len: 0,
            csum: [0; 2],
        }
    }
}

impl Ipv4Meta {
    /// Return the length of the header needed to emit the metadata.
    pub fn hdr_len(&self) -> usize {
        IPV4_HDR_LEN
    }

    /// Compute the header checksum one-shot: sum the header's ten
    /// 16-bit words with the checksum field zeroed, fold, complement.
    pub fn compute_hdr_csum(&mut self) {
        let mut hdr = [0; IPV4_HDR_LEN];
        self.csum = [0; 2];
        self.emit(&mut hdr);
        let csum = Checksum::compute(&hdr);
        self.csum = HeaderChecksum::from(csum).bytes();
    }

    #[inline]
    pub fn emit(&self, dst: &mut [u8]) {
        // The raw header relies on the slice being exactly sized.
        debug_assert_eq!(dst.len(), IPV4_HDR_LEN);
        let raw = Ipv4HdrRaw::from(self);
        raw.write_to(dst).expect("slice is exactly header sized");
    }

    /// Populate `bytes` with the pseudo header bytes used by ULP
    /// checksums.
    pub fn pseudo_bytes(&self, bytes: &mut [u8; 12]) {
        bytes[0..4].copy_from_slice(&self.src.bytes());
        bytes[4..8].copy_from_slice(&self.dst.bytes());
        let ulp_len = self.total_len - IPV4_HDR_LEN as u16;
        let len_bytes = ulp_len.to_be_bytes();
        bytes[8..12].copy_from_slice(&[0, self.proto, len_bytes[0], len_bytes[1]]);
    }

    /// Return a [`Checksum`] of the pseudo header.
    pub fn pseudo_csum(&self) -> Checksum {
        let mut pseudo_bytes = [0u8; 12];
        self.pseudo_bytes(&mut pseudo_bytes);
        Checksum::compute(&pseudo_bytes)
    }
}

/// Note: For now we keep this unaligned to be safe.
#[repr(C)]
#[derive(
    Clone, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
pub struct Ipv4HdrRaw {
    pub ver_hdr_len: u8,
    pub dscp_ecn: u8,
    pub total_len: [u8; 2],
    pub ident: [u8; 2],
    pub frag_and_flags: [u8; 2],
    pub ttl: u8,
    pub proto: u8,
    pub csum: [u8; 2],
    pub src: [u8; 4],
    pub dst: [u8; 4],
}

impl Default for Ipv4HdrRaw {
    fn default() -> Self {
        Ipv4HdrRaw {
            ver_hdr_len: 0x45,
            dscp_ecn: 0x0,
            total_len: [0x0; 2],
            ident: [0x0; 2],
            frag_and_flags: [0x0; 2],
            ttl: DEF_TTL,
            proto: PROTO_UDP,
            csum: [0x0; 2],
            src: [0x0; 4],
            dst: [0x0; 4],
        }
    }
}

impl From<&Ipv4Meta> for Ipv4HdrRaw {
    #[inline]
    fn from(meta: &Ipv4Meta) -> Self {
        Ipv4HdrRaw {
            total_len: meta.total_len.to_be_bytes(),
            ttl: meta.ttl,
            proto: meta.proto,
            csum: meta.csum,
            src: meta.src.bytes(),
            dst: meta.dst.bytes(),
            ..Default::default()
        }
    }
}
