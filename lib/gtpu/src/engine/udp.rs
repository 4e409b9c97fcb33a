// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! UDP headers.

use super::checksum::Checksum;
use super::checksum::HeaderChecksum;
use super::ip4::Ipv4Meta;
use serde::Deserialize;
use serde::Serialize;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

pub const UDP_HDR_LEN: usize = 8;

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
pub struct UdpMeta {
    pub src: u16,
    pub dst: u16,
    pub len: u16,
    pub csum: [u8; 2],
}

impl UdpMeta {
    /// Return the length of the header needed to emit the metadata.
    #[inline]
    pub fn hdr_len(&self) -> usize {
        UDP_HDR_LEN
    }

    #[inline]
    pub fn emit(&self, dst: &mut [u8]) {
        // The raw header relies on the slice being exactly sized.
        debug_assert_eq!(dst.len(), UDP_HDR_LEN);
        let raw = UdpHdrRaw::from(self);
        raw.write_to(dst).expect("slice is exactly header sized");
    }

    /// Compute the full UDP checksum over the IPv4 pseudo header,
    /// this header (checksum zeroed), and `payload`, and store it in
    /// `self.csum`.
    ///
    /// A computed sum of zero is transmitted as all ones, per RFC
    /// 768; zero on the wire means "not computed".
    pub fn compute_csum(&mut self, ip: &Ipv4Meta, payload: &[u8]) {
        self.csum = [0; 2];
        let mut hdr = [0; UDP_HDR_LEN];
        self.emit(&mut hdr);

        let mut csum = ip.pseudo_csum();
        csum.add_bytes(&hdr);
        csum.add_bytes(payload);

        let bytes = HeaderChecksum::from(csum).bytes();
        self.csum = if bytes == [0, 0] { [0xFF, 0xFF] } else { bytes };
    }
}

/// Note: For now we keep this unaligned to be safe.
#[repr(C)]
#[derive(
    Clone, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
pub struct UdpHdrRaw {
    pub src_port: [u8; 2],
    pub dst_port: [u8; 2],
    pub length: [u8; 2],
    pub csum: [u8; 2],
}

impl From<&UdpMeta> for UdpHdrRaw {
    #[inline]
    fn from(meta: &UdpMeta) -> Self {
        Self {
            src_port: meta.src.to_be_bytes(),
            dst_port: meta.dst.to_be_bytes(),
            length: meta.len.to_be_bytes(),
            csum: meta.csum,
        }
    }
}
