// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use crate::ip::Ipv4Addr;
use crate::mac::MacAddr;
use crate::teid::Teid;
use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// An egress interface identifier.
///
/// Opaque to the engine; the forwarding substrate decides what it
/// names (an ifindex, a queue, a next pipeline stage).
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct EgressId(pub u32);

impl Display for EgressId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "egress:{}", self.0)
    }
}

/// The UDP checksum policy for emitted tunnel packets.
///
/// The corpus of deployments disagrees on whether the outer UDP
/// checksum is worth computing; for IPv4 a zero checksum is a valid
/// "not computed" marker, so both are legal. The active policy is
/// explicit configuration, never inferred per packet.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    PartialEq,
    Serialize,
)]
pub enum UdpCsumPolicy {
    /// Emit a zero checksum. The fast path.
    #[default]
    Zeroed,
    /// Compute the full checksum over pseudo-header, UDP header, and
    /// payload.
    Full,
}

/// The complete tunnel configuration the control plane provisions.
///
/// All five addressing fields are required for encapsulation to
/// proceed; the engine drops traffic until they are all set.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct TunnelCfg {
    /// Source MAC of the emitted frame.
    pub src_mac: MacAddr,
    /// Destination MAC of the emitted frame (next hop toward the UPF).
    pub dst_mac: MacAddr,
    /// Outer IPv4 source (local N3 endpoint).
    pub src_ip: Ipv4Addr,
    /// Outer IPv4 destination (user-plane peer).
    pub dst_ip: Ipv4Addr,
    /// Uplink tunnel endpoint identifier.
    pub teid: Teid,
    /// Where forwarded packets should be sent, if anywhere specific.
    pub egress: Option<EgressId>,
    /// Outer UDP checksum policy.
    pub udp_csum: UdpCsumPolicy,
}
