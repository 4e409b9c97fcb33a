// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! GTP-U headers and their related actions.
//!
//! 3GPP TS 29.281 GPRS Tunnelling Protocol User Plane (GTPv1-U)

use gtpu_api::Teid;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

/// The registered GTP-U port, used for both source and destination.
pub const GTPU_PORT: u16 = 2152;

pub const GTPU_HDR_LEN: usize = 8;

/// Version 1, protocol type GTP, no extension/sequence/N-PDU flags.
pub const GTPU_FLAGS_V1: u8 = 0x30;
/// Message type: T-PDU, i.e. an encapsulated user datagram.
pub const GTPU_MSGTYPE_TPDU: u8 = 0xFF;

pub const GTPU_VER_PT_MASK: u8 = 0xF0;
pub const GTPU_F_EXT: u8 = 0x04;
pub const GTPU_OPT_FLAGS_MASK: u8 = 0x07;

/// The fields of an emitted GTP-U header.
///
/// The length field covers only what follows the 8-byte header,
/// i.e. the original IP packet being tunnelled.
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
pub struct GtpuMeta {
    pub teid: Teid,
    pub payload_len: u16,
}

impl GtpuMeta {
    /// Return the length of the header needed to emit the metadata.
    #[inline]
    pub fn hdr_len(&self) -> usize {
        GTPU_HDR_LEN
    }

    #[inline]
    pub fn emit(&self, dst: &mut [u8]) {
        // The raw header relies on the slice being exactly sized.
        debug_assert_eq!(dst.len(), GTPU_HDR_LEN);
        let raw = GtpuHdrRaw::from(self);
        raw.write_to(dst).expect("slice is exactly header sized");
    }
}

/// Note: For now we keep this unaligned to be safe.
#[repr(C)]
#[derive(
    Clone, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
pub struct GtpuHdrRaw {
    pub flags: u8,
    pub msg_type: u8,
    pub length: [u8; 2],
    pub teid: [u8; 4],
}

impl From<&GtpuMeta> for GtpuHdrRaw {
    #[inline]
    fn from(meta: &GtpuMeta) -> Self {
        Self {
            flags: GTPU_FLAGS_V1,
            msg_type: GTPU_MSGTYPE_TPDU,
            length: meta.payload_len.to_be_bytes(),
            teid: meta.teid.bytes(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum GtpuHdrError {
    #[error("header truncated: need {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },
    #[error("not a GTPv1 packet: flags 0x{flags:02X}")]
    BadVersion { flags: u8 },
    #[error("not a T-PDU: message type 0x{msg_type:02X}")]
    NotTpdu { msg_type: u8 },
    #[error("malformed extension header at offset {offset}")]
    BadExtension { offset: usize },
}

/// A parsed view of a received GTP-U header, used on the decap path
/// to classify T-PDUs and locate their payload.
#[derive(Clone, Copy, Debug)]
pub struct GtpuHdr {
    flags: u8,
    length: u16,
    teid: Teid,
}

impl GtpuHdr {
    /// Validate the fixed fields of a received GTP-U packet: version
    /// 1, protocol type GTP, message type T-PDU.
    pub fn parse(bytes: &[u8]) -> Result<Self, GtpuHdrError> {
        let Ok((raw, _)) = GtpuHdrRaw::read_from_prefix(bytes) else {
            return Err(GtpuHdrError::Truncated {
                needed: GTPU_HDR_LEN,
                have: bytes.len(),
            });
        };

        if raw.flags & GTPU_VER_PT_MASK != GTPU_FLAGS_V1 {
            return Err(GtpuHdrError::BadVersion { flags: raw.flags });
        }

        if raw.msg_type != GTPU_MSGTYPE_TPDU {
            return Err(GtpuHdrError::NotTpdu { msg_type: raw.msg_type });
        }

        Ok(Self {
            flags: raw.flags,
            length: u16::from_be_bytes(raw.length),
            teid: Teid::new(u32::from_be_bytes(raw.teid)),
        })
    }

    #[inline]
    pub fn teid(&self) -> Teid {
        self.teid
    }

    #[inline]
    pub fn length(&self) -> u16 {
        self.length
    }

    /// Return the offset of the tunnelled payload within `bytes`.
    ///
    /// When any of the S/PN/E bits are set the header grows by the
    /// 4-byte options tail, and when E is set the chain of extension
    /// headers is walked until its zero terminator. Each extension
    /// header states its own length in 4-byte units in its first
    /// byte.
    pub fn payload_offset(&self, bytes: &[u8]) -> Result<usize, GtpuHdrError> {
        let mut off = GTPU_HDR_LEN;

        if self.flags & GTPU_OPT_FLAGS_MASK != 0 {
            // Sequence number and N-PDU number; the next-extension
            // byte is handled below.
            off += 3;
        }

        if self.flags & GTPU_F_EXT != 0 {
            loop {
                let next = *bytes.get(off).ok_or(GtpuHdrError::Truncated {
                    needed: off + 1,
                    have: bytes.len(),
                })?;

                if next == 0 {
                    off += 1;
                    break;
                }

                let ext_len =
                    *bytes.get(off + 1).ok_or(GtpuHdrError::Truncated {
                        needed: off + 2,
                        have: bytes.len(),
                    })?;
                if ext_len == 0 {
                    return Err(GtpuHdrError::BadExtension { offset: off + 1 });
                }
                off += ext_len as usize * 4;
            }
        } else if self.flags & GTPU_OPT_FLAGS_MASK != 0 {
            // Options tail present but no extensions; skip the
            // (zero) next-extension byte.
            off += 1;
        }

        if off > bytes.len() {
            return Err(GtpuHdrError::Truncated {
                needed: off,
                have: bytes.len(),
            });
        }

        Ok(off)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn emit() {
        let gtpu =
            GtpuMeta { teid: Teid::new(0x11223344), payload_len: 0x2E };
        let mut out = [0u8; GTPU_HDR_LEN];
        gtpu.emit(&mut out);

        #[rustfmt::skip]
        let expected = [
            // version 1, PT, no options
            0x30,
            // T-PDU
            0xFF,
            // length
            0x00, 0x2E,
            // TEID
            0x11, 0x22, 0x33, 0x44,
        ];
        assert_eq!(expected, out);
    }

    #[test]
    fn fixed_bytes_regardless_of_teid() {
        for teid in [0u32, 1, 0xFFFF_FFFF, 0x11223344] {
            let gtpu = GtpuMeta { teid: Teid::new(teid), payload_len: 999 };
            let mut out = [0u8; GTPU_HDR_LEN];
            gtpu.emit(&mut out);
            assert_eq!(out[0], 0x30);
            assert_eq!(out[1], 0xFF);
        }
    }

    #[test]
    fn parse_plain_tpdu() {
        let buf = [0x30, 0xFF, 0x00, 0x04, 0x00, 0x00, 0x00, 0x07, 1, 2, 3, 4];
        let hdr = GtpuHdr::parse(&buf).unwrap();
        assert_eq!(u32::from(hdr.teid()), 7);
        assert_eq!(hdr.length(), 4);
        assert_eq!(hdr.payload_offset(&buf).unwrap(), GTPU_HDR_LEN);
    }

    #[test]
    fn parse_rejects_non_tpdu() {
        // Echo request.
        let buf = [0x30, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert!(matches!(
            GtpuHdr::parse(&buf),
            Err(GtpuHdrError::NotTpdu { msg_type: 0x01 })
        ));

        // GTPv2 flags.
        let buf = [0x40, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert!(matches!(
            GtpuHdr::parse(&buf),
            Err(GtpuHdrError::BadVersion { flags: 0x40 })
        ));
    }

    #[test]
    fn payload_offset_with_seqnum() {
        // S bit set: 8B header + 4B options tail, no extensions.
        #[rustfmt::skip]
        let buf = [
            0x32, 0xFF, 0x00, 0x06, 0x00, 0x00, 0x00, 0x07,
            // seq, N-PDU, next-ext = none
            0x00, 0x01, 0x00, 0x00,
            // payload
            0xAA, 0xBB,
        ];
        let hdr = GtpuHdr::parse(&buf).unwrap();
        assert_eq!(hdr.payload_offset(&buf).unwrap(), 12);
    }

    #[test]
    fn payload_offset_truncated_options() {
        let buf = [0x34, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x07];
        let hdr = GtpuHdr::parse(&buf).unwrap();
        assert!(matches!(
            hdr.payload_offset(&buf),
            Err(GtpuHdrError::Truncated { .. })
        ));
    }
}
