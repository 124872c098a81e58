//! IPv4 header codec and ingress handling.
//!
//! [`handle_rx`] is the entry point for every received IPv4 frame after
//! Ethernet demux.  It validates the header (version, IHL, total length,
//! checksum), then makes the router's central decision: datagrams addressed
//! to one of our interface addresses are delivered locally (ICMP echo is
//! answered, anything else earns a port-unreachable), everything else is
//! transit and is forwarded along the longest-prefix-match route with the
//! TTL decremented, or answered with the matching ICMP error when no route
//! exists or the TTL ran out.
//!
//! The codec half exposes a copied-field header view plus in-place mutators
//! for the egress path, which rewrites TTL, addresses, and checksum inside
//! frames it already owns.

use alloc::vec::Vec;

use bitflags::bitflags;
use log::debug;

use crate::clock::Clock;
use crate::iface::Interface;
use crate::netdev::FrameDriver;
use crate::router::Router;
use crate::types::{DropReason, IpProtocol, Ipv4Addr};
use crate::{
    ETH_HEADER_LEN, ICMP_CODE_NET_UNREACHABLE, ICMP_CODE_PORT_UNREACHABLE, IPV4_HEADER_LEN,
    ICMP_TYPE_DEST_UNREACHABLE, ICMP_TYPE_TIME_EXCEEDED, checksum, icmp,
};

bitflags! {
    /// IPv4 header flag bits (the upper three bits of byte 6).
    ///
    /// Fragment-offset bits sharing the byte are masked off on parse.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Ipv4Flags: u8 {
        const DONT_FRAGMENT = 0x40;
        const MORE_FRAGMENTS = 0x20;
    }
}

// =============================================================================
// Header view
// =============================================================================

/// Decoded IPv4 header.  Fields are copied out of the borrowed datagram.
#[derive(Clone, Copy, Debug)]
pub struct Ipv4Header {
    /// Header length in bytes (`IHL * 4`, at least 20).
    pub header_len: usize,
    /// Total datagram length in bytes (header + payload).
    pub total_len: usize,
    pub flags: Ipv4Flags,
    pub ttl: u8,
    pub protocol: u8,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
}

impl Ipv4Header {
    /// Parse the header at the start of `datagram`.
    ///
    /// Returns the header and the payload trimmed to the wire total length,
    /// so link-layer padding never reaches upper layers.  Checksum is not
    /// verified here; see [`Ipv4Header::checksum_valid`].
    pub fn parse(datagram: &[u8]) -> Result<(Self, &[u8]), DropReason> {
        if datagram.len() < IPV4_HEADER_LEN {
            return Err(DropReason::TooShort);
        }

        let version = datagram[0] >> 4;
        if version != 4 {
            return Err(DropReason::Malformed);
        }

        let header_len = ((datagram[0] & 0x0f) as usize) * 4;
        if header_len < IPV4_HEADER_LEN {
            return Err(DropReason::Malformed);
        }
        if datagram.len() < header_len {
            return Err(DropReason::TooShort);
        }

        let total_len = u16::from_be_bytes([datagram[2], datagram[3]]) as usize;
        if total_len < header_len {
            return Err(DropReason::Malformed);
        }
        if total_len > datagram.len() {
            return Err(DropReason::TooShort);
        }

        let header = Self {
            header_len,
            total_len,
            flags: Ipv4Flags::from_bits_truncate(datagram[6]),
            ttl: datagram[8],
            protocol: datagram[9],
            src: Ipv4Addr([datagram[12], datagram[13], datagram[14], datagram[15]]),
            dst: Ipv4Addr([datagram[16], datagram[17], datagram[18], datagram[19]]),
        };
        Ok((header, &datagram[header_len..total_len]))
    }

    /// `true` if the embedded header checksum verifies.
    ///
    /// Summing the header with its checksum field in place yields zero for a
    /// valid header, so no scratch copy is needed.
    pub fn checksum_valid(&self, datagram: &[u8]) -> bool {
        checksum(&datagram[..self.header_len]) == 0
    }
}

// =============================================================================
// In-place mutators (egress path)
// =============================================================================

/// Decrement the TTL of a serialized datagram.  The checksum is left stale;
/// call [`update_checksum`] afterwards.
pub fn decrement_ttl(datagram: &mut [u8]) {
    if datagram.len() >= IPV4_HEADER_LEN {
        datagram[8] = datagram[8].saturating_sub(1);
    }
}

/// Set the TTL of a serialized datagram.
pub fn set_ttl(datagram: &mut [u8], ttl: u8) {
    if datagram.len() >= IPV4_HEADER_LEN {
        datagram[8] = ttl;
    }
}

/// Set the source address of a serialized datagram.
pub fn set_src(datagram: &mut [u8], ip: Ipv4Addr) {
    if datagram.len() >= IPV4_HEADER_LEN {
        datagram[12..16].copy_from_slice(&ip.0);
    }
}

/// Set the destination address of a serialized datagram.
pub fn set_dst(datagram: &mut [u8], ip: Ipv4Addr) {
    if datagram.len() >= IPV4_HEADER_LEN {
        datagram[16..20].copy_from_slice(&ip.0);
    }
}

/// Zero the checksum field and recompute it over the header.
pub fn update_checksum(datagram: &mut [u8]) {
    if datagram.len() < IPV4_HEADER_LEN {
        return;
    }
    let header_len = ((datagram[0] & 0x0f) as usize) * 4;
    if header_len < IPV4_HEADER_LEN || datagram.len() < header_len {
        return;
    }
    datagram[10] = 0;
    datagram[11] = 0;
    let sum = checksum(&datagram[..header_len]);
    datagram[10..12].copy_from_slice(&sum.to_be_bytes());
}

/// Write a fresh 20-byte option-less header into `buf`, checksum included.
///
/// Used for datagrams the router originates (ICMP errors).
pub fn emit_header(buf: &mut [u8], total_len: u16, ttl: u8, protocol: u8, src: Ipv4Addr, dst: Ipv4Addr) {
    if buf.len() < IPV4_HEADER_LEN {
        return;
    }
    buf[0] = 0x45; // version 4, IHL 5
    buf[1] = 0; // TOS
    buf[2..4].copy_from_slice(&total_len.to_be_bytes());
    buf[4] = 0; // identification
    buf[5] = 0;
    buf[6] = 0; // flags + fragment offset
    buf[7] = 0;
    buf[8] = ttl;
    buf[9] = protocol;
    buf[10] = 0; // checksum, filled below
    buf[11] = 0;
    buf[12..16].copy_from_slice(&src.0);
    buf[16..20].copy_from_slice(&dst.0);
    let sum = checksum(&buf[..IPV4_HEADER_LEN]);
    buf[10..12].copy_from_slice(&sum.to_be_bytes());
}

// =============================================================================
// Ingress
// =============================================================================

/// Handle a received IPv4 frame (Ethernet header still in front).
///
/// `frame` is the complete frame as delivered by the driver; keeping it whole
/// lets the forwarding path reuse the existing frame storage and only patch
/// the Ethernet fields.
pub(crate) fn handle_rx<D: FrameDriver, C: Clock>(
    router: &Router<D, C>,
    iface: &Interface,
    frame: &[u8],
) {
    let datagram = &frame[ETH_HEADER_LEN..];

    let header = match Ipv4Header::parse(datagram) {
        Ok((header, _payload)) => header,
        Err(reason) => {
            debug!("ipv4: drop on {}: {}", iface.name, reason);
            return;
        }
    };

    if !header.checksum_valid(datagram) {
        debug!("ipv4: drop on {}: {}", iface.name, DropReason::BadChecksum);
        return;
    }

    // Drop link-layer padding here so it cannot ride into ICMP error data.
    let datagram = &datagram[..header.total_len];

    if router.ifaces().is_local_addr(header.dst) {
        deliver_local(router, frame, &header);
        return;
    }

    // Transit: route first, then TTL, then forward.
    let Some(route) = router.routes().lookup(header.dst) else {
        debug!(
            "ipv4: {} -> {}: {}, sending network unreachable",
            header.src,
            header.dst,
            DropReason::NoRoute
        );
        router.send_icmp_error(
            ICMP_TYPE_DEST_UNREACHABLE,
            ICMP_CODE_NET_UNREACHABLE,
            Some(iface.addr),
            header.src,
            datagram,
        );
        return;
    };

    if header.ttl <= 1 {
        debug!(
            "ipv4: {} -> {}: {}, sending time exceeded",
            header.src,
            header.dst,
            DropReason::TtlExpired
        );
        router.send_icmp_error(
            ICMP_TYPE_TIME_EXCEEDED,
            0,
            Some(iface.addr),
            header.src,
            datagram,
        );
        return;
    }

    let mut forwarded: Vec<u8> = frame.to_vec();
    {
        let out = &mut forwarded[ETH_HEADER_LEN..];
        decrement_ttl(out);
        update_checksum(out);
    }
    router.send_via_route(forwarded, route);
}

/// A datagram addressed to one of our interface IPs.
///
/// ICMP echo requests are answered; everything else addressed to the router
/// (TCP, UDP, ...) earns a port-unreachable carrying the offending header.
fn deliver_local<D: FrameDriver, C: Clock>(router: &Router<D, C>, frame: &[u8], header: &Ipv4Header) {
    let datagram = &frame[ETH_HEADER_LEN..ETH_HEADER_LEN + header.total_len];

    match IpProtocol::from_u8(header.protocol) {
        Some(IpProtocol::Icmp) => icmp::handle_echo(router, frame, header),
        _ => {
            debug!(
                "ipv4: {} datagram from {} for local {}: {}",
                header.protocol,
                header.src,
                header.dst,
                DropReason::NotForUs
            );
            router.send_icmp_error(
                ICMP_TYPE_DEST_UNREACHABLE,
                ICMP_CODE_PORT_UNREACHABLE,
                Some(header.dst),
                header.src,
                datagram,
            );
        }
    }
}
