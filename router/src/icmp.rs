//! ICMP — codec, echo reply transform, and error-message builders.
//!
//! The router speaks four ICMP shapes: echo request/reply (types 8/0),
//! destination-unreachable (type 3, codes 0/1/3), and time-exceeded
//! (type 11).  Echo replies are built by transforming a copy of the request
//! frame in place; error messages are built from scratch around the first
//! [`ICMP_ERROR_DATA_LEN`] bytes of the offending datagram.
//!
//! Checksums are always computed over the ICMP length actually present in
//! the IP datagram (`total_len - header_len`), never the raw frame length,
//! so link-layer padding cannot corrupt them.

use alloc::vec;
use alloc::vec::Vec;

use log::debug;

use crate::clock::Clock;
use crate::ipv4::{self, Ipv4Header};
use crate::netdev::FrameDriver;
use crate::router::Router;
use crate::types::{DropReason, IpProtocol, Ipv4Addr};
use crate::{
    ETH_HEADER_LEN, ICMP_ERROR_DATA_LEN, ICMP_TYPE_ECHO_REPLY, ICMP_TYPE_ECHO_REQUEST, INIT_TTL,
    IPV4_HEADER_LEN, checksum,
};

/// Fixed portion shared by every ICMP message: type, code, checksum.
pub const ICMP_MIN_HEADER_LEN: usize = 4;

/// On-wire size of a type-3/type-11 message: 4-byte header, 4 unused bytes
/// (type 3 splits them into 2 unused + 2 next-MTU, all zero here), then the
/// echoed datagram prefix.
pub const ICMP_ERROR_MSG_LEN: usize = 8 + ICMP_ERROR_DATA_LEN;

// =============================================================================
// Wire codec
// =============================================================================

/// Decoded ICMP fixed header.
#[derive(Clone, Copy, Debug)]
pub struct IcmpHeader {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
}

impl IcmpHeader {
    /// Parse the fixed header, returning it with the rest of the message.
    pub fn parse(data: &[u8]) -> Result<(Self, &[u8]), DropReason> {
        if data.len() < ICMP_MIN_HEADER_LEN {
            return Err(DropReason::TooShort);
        }
        let header = Self {
            icmp_type: data[0],
            code: data[1],
            checksum: u16::from_be_bytes([data[2], data[3]]),
        };
        Ok((header, &data[ICMP_MIN_HEADER_LEN..]))
    }
}

// =============================================================================
// Echo
// =============================================================================

/// Answer an ICMP message addressed to a router IP.
///
/// Only echo requests are answered; any other ICMP type delivered to the
/// router (echo replies, errors about our own traffic) is consumed silently.
/// The reply reuses the request frame: payload, identifier, and sequence
/// survive untouched, only type, addresses, TTL, and checksums change.
pub(crate) fn handle_echo<D: FrameDriver, C: Clock>(
    router: &Router<D, C>,
    frame: &[u8],
    ip: &Ipv4Header,
) {
    // Options on the local-delivery path are not supported.
    if ip.header_len != IPV4_HEADER_LEN {
        debug!("icmp: drop echo for {}: {}", ip.dst, DropReason::Malformed);
        return;
    }

    let icmp_start = ETH_HEADER_LEN + ip.header_len;
    let icmp_end = ETH_HEADER_LEN + ip.total_len;
    let message = &frame[icmp_start..icmp_end];

    let header = match IcmpHeader::parse(message) {
        Ok((header, _rest)) => header,
        Err(reason) => {
            debug!("icmp: drop echo for {}: {}", ip.dst, reason);
            return;
        }
    };

    if checksum(message) != 0 {
        debug!("icmp: drop echo for {}: {}", ip.dst, DropReason::BadChecksum);
        return;
    }

    if header.icmp_type != ICMP_TYPE_ECHO_REQUEST {
        debug!("icmp: type {} for local {}, ignoring", header.icmp_type, ip.dst);
        return;
    }

    let mut reply: Vec<u8> = frame.to_vec();
    {
        let message = &mut reply[icmp_start..icmp_end];
        message[0] = ICMP_TYPE_ECHO_REPLY;
        message[1] = 0;
        message[2] = 0;
        message[3] = 0;
        let sum = checksum(message);
        message[2..4].copy_from_slice(&sum.to_be_bytes());
    }
    {
        let datagram = &mut reply[ETH_HEADER_LEN..];
        ipv4::set_src(datagram, ip.dst);
        ipv4::set_dst(datagram, ip.src);
        ipv4::set_ttl(datagram, INIT_TTL);
        ipv4::update_checksum(datagram);
    }

    debug!("icmp: echo reply {} -> {}", ip.dst, ip.src);
    router.send_ip(reply, ip.src);
}

// =============================================================================
// Error messages
// =============================================================================

/// Build a complete Ethernet frame carrying a type-3 or type-11 message.
///
/// `original` is the offending datagram from its IP header onward; its first
/// [`ICMP_ERROR_DATA_LEN`] bytes (header + 8 payload bytes) ride along as
/// the ICMP data field, zero-padded when the datagram was shorter.  The
/// Ethernet header is left zeroed for the egress path to fill.
pub fn build_error(
    icmp_type: u8,
    code: u8,
    src: Ipv4Addr,
    dst: Ipv4Addr,
    original: &[u8],
) -> Vec<u8> {
    let mut frame = vec![0u8; ETH_HEADER_LEN + IPV4_HEADER_LEN + ICMP_ERROR_MSG_LEN];

    {
        let message = &mut frame[ETH_HEADER_LEN + IPV4_HEADER_LEN..];
        message[0] = icmp_type;
        message[1] = code;
        // Bytes 2..4 checksum, 4..8 unused/next-MTU: already zero.
        let copy = original.len().min(ICMP_ERROR_DATA_LEN);
        message[8..8 + copy].copy_from_slice(&original[..copy]);
        let sum = checksum(message);
        message[2..4].copy_from_slice(&sum.to_be_bytes());
    }

    ipv4::emit_header(
        &mut frame[ETH_HEADER_LEN..],
        (IPV4_HEADER_LEN + ICMP_ERROR_MSG_LEN) as u16,
        INIT_TTL,
        IpProtocol::Icmp.as_u8(),
        src,
        dst,
    );

    frame
}
