//! Static IPv4 route table with longest-prefix-match lookup.
//!
//! The table is loaded once at startup, from code via [`RouteTable::add`]
//! or from the text format via [`RouteTable::parse`], and is read-only
//! afterwards, so lookups take no lock.  Lookup scans every entry and keeps
//! the match with the numerically largest mask; among equal masks the entry
//! added first wins, which makes the result deterministic for any input
//! table.
//!
//! # Route file format
//!
//! ```text
//! # destination  gateway      mask             interface
//! 0.0.0.0        10.0.1.1     0.0.0.0          eth0
//! 192.168.2.0    172.64.3.10  255.255.255.0    eth1
//! ```
//!
//! Whitespace-separated columns; `#` starts a comment; blank lines are
//! skipped.  The destination is normalized to `dest & mask` on insert.

use alloc::vec::Vec;
use core::fmt;

use log::{debug, warn};

use crate::iface::{IfaceId, InterfaceTable};
use crate::types::Ipv4Addr;

// =============================================================================
// RouteEntry
// =============================================================================

/// A single route.
///
/// A `gateway` of `0.0.0.0` marks a directly connected network; the egress
/// path still resolves `gateway` as the next hop (see the crate notes on
/// this inherited behavior), so such routes only work when paired with a
/// host gateway entry or a cache primed for `0.0.0.0`.
#[derive(Clone, Copy)]
pub struct RouteEntry {
    /// Network prefix, normalized so `dest & mask == dest`.
    pub dest: Ipv4Addr,
    /// Network mask (`255.255.255.0` for a /24).
    pub mask: Ipv4Addr,
    /// Next-hop address to resolve via ARP.
    pub gateway: Ipv4Addr,
    /// Outgoing interface.
    pub iface: IfaceId,
}

impl RouteEntry {
    /// `true` if `dst` falls within this route's prefix.
    #[inline]
    pub fn matches(&self, dst: Ipv4Addr) -> bool {
        let mask = self.mask.to_u32_be();
        (dst.to_u32_be() & mask) == (self.dest.to_u32_be() & mask)
    }

    /// Number of leading one bits in the mask.
    #[inline]
    pub fn prefix_len(&self) -> u8 {
        self.mask.to_u32_be().leading_ones() as u8
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.gateway.is_unspecified() {
            write!(
                f,
                "{}/{} dev {} (connected)",
                self.dest,
                self.prefix_len(),
                self.iface
            )
        } else {
            write!(
                f,
                "{}/{} via {} dev {}",
                self.dest,
                self.prefix_len(),
                self.gateway,
                self.iface
            )
        }
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// RouteTable
// =============================================================================

/// The static route table, in insertion order.
#[derive(Debug)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a route.
    ///
    /// The destination is normalized to `dest & mask`; a warning is logged
    /// when the input violated that invariant.  Directly connected routes
    /// (gateway `0.0.0.0`) are warn-logged because the gateway address is
    /// what the egress path will ARP for.
    pub fn add(&mut self, mut entry: RouteEntry) {
        let masked = Ipv4Addr::from_u32_be(entry.dest.to_u32_be() & entry.mask.to_u32_be());
        if masked != entry.dest {
            warn!("route: normalizing destination {} to {}", entry.dest, masked);
            entry.dest = masked;
        }
        if entry.gateway.is_unspecified() {
            warn!("route: {:?} has no gateway; 0.0.0.0 becomes the ARP target", entry);
        }
        debug!("route: added {:?}", entry);
        self.entries.push(entry);
    }

    /// Longest-prefix-match lookup.
    ///
    /// Returns the matching entry with the numerically largest mask; the
    /// first-added entry wins when masks tie.
    pub fn lookup(&self, dst: Ipv4Addr) -> Option<&RouteEntry> {
        let mut best: Option<&RouteEntry> = None;
        for entry in &self.entries {
            if !entry.matches(dst) {
                continue;
            }
            match best {
                Some(current) if entry.mask.to_u32_be() <= current.mask.to_u32_be() => {}
                _ => best = Some(entry),
            }
        }
        best
    }

    /// Iterate over all routes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter()
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the table holds no routes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse the text route format against the interface inventory.
    pub fn parse(text: &str, ifaces: &InterfaceTable) -> Result<Self, ConfigError> {
        let mut table = Self::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let content = raw.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }

            let mut cols = content.split_whitespace();
            let (Some(dest), Some(gateway), Some(mask), Some(name)) =
                (cols.next(), cols.next(), cols.next(), cols.next())
            else {
                return Err(ConfigError::BadColumns { line });
            };
            if cols.next().is_some() {
                return Err(ConfigError::BadColumns { line });
            }

            let dest = Ipv4Addr::parse(dest).ok_or(ConfigError::BadAddress { line })?;
            let gateway = Ipv4Addr::parse(gateway).ok_or(ConfigError::BadAddress { line })?;
            let mask = Ipv4Addr::parse(mask).ok_or(ConfigError::BadAddress { line })?;
            let iface = ifaces
                .by_name(name)
                .ok_or(ConfigError::UnknownInterface { line })?
                .id;

            table.add(RouteEntry {
                dest,
                mask,
                gateway,
                iface,
            });
        }

        Ok(table)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigError
// =============================================================================

/// Startup-time route file problems.  Unlike the data-plane taxonomy these
/// are surfaced to the embedder, which has no packet to drop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A line did not have exactly four columns.
    BadColumns { line: usize },
    /// An address column was not a dotted quad.
    BadAddress { line: usize },
    /// The interface column named nothing in the inventory.
    UnknownInterface { line: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadColumns { line } => {
                write!(f, "line {}: expected dest, gateway, mask, interface", line)
            }
            Self::BadAddress { line } => write!(f, "line {}: bad dotted-quad address", line),
            Self::UnknownInterface { line } => write!(f, "line {}: unknown interface", line),
        }
    }
}
