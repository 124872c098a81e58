//! Interface inventory — immutable after startup.
//!
//! Every interface the driver can deliver on is registered once, before the
//! first frame, and never changes afterwards.  The table is therefore read
//! lock-free from both the ingress path and the sweep.  A name uniquely
//! identifies an interface; internally everything else refers to the
//! positional [`IfaceId`] so queued packets and route entries stay small.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::types::{Ipv4Addr, MacAddr};

// =============================================================================
// IfaceId
// =============================================================================

/// Index of an interface in the [`InterfaceTable`].
///
/// Minted only by [`InterfaceTable::add`]; stable for the life of the table.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IfaceId(pub usize);

impl fmt::Debug for IfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IfaceId({})", self.0)
    }
}

impl fmt::Display for IfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Interface
// =============================================================================

/// One link-layer interface of the router.
pub struct Interface {
    /// Positional id within the table.
    pub id: IfaceId,
    /// Driver-facing name (`"eth0"`).
    pub name: String,
    /// Hardware address frames leave this interface with.
    pub mac: MacAddr,
    /// IPv4 address the router answers for on this link.
    pub addr: Ipv4Addr,
}

impl fmt::Debug for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.mac, self.addr)
    }
}

// =============================================================================
// InterfaceTable
// =============================================================================

/// The fixed set of interfaces, in registration order.
pub struct InterfaceTable {
    ifaces: Vec<Interface>,
}

impl InterfaceTable {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self { ifaces: Vec::new() }
    }

    /// Register an interface and return its id.
    ///
    /// Names are the caller's to keep unique; a duplicate name would shadow
    /// the later entry on [`by_name`](Self::by_name) lookups.
    pub fn add(&mut self, name: &str, mac: MacAddr, addr: Ipv4Addr) -> IfaceId {
        let id = IfaceId(self.ifaces.len());
        self.ifaces.push(Interface {
            id,
            name: String::from(name),
            mac,
            addr,
        });
        id
    }

    /// Look up an interface by driver name.
    pub fn by_name(&self, name: &str) -> Option<&Interface> {
        self.ifaces.iter().find(|i| i.name == name)
    }

    /// Look up an interface by id.
    pub fn get(&self, id: IfaceId) -> Option<&Interface> {
        self.ifaces.get(id.0)
    }

    /// `true` if `ip` is assigned to any interface.
    ///
    /// The ingress path uses this to decide local delivery versus transit.
    pub fn is_local_addr(&self, ip: Ipv4Addr) -> bool {
        self.ifaces.iter().any(|i| i.addr == ip)
    }

    /// Iterate over all interfaces in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.ifaces.iter()
    }

    /// Number of registered interfaces.
    pub fn len(&self) -> usize {
        self.ifaces.len()
    }

    /// `true` if no interface is registered.
    pub fn is_empty(&self) -> bool {
        self.ifaces.is_empty()
    }
}

impl Default for InterfaceTable {
    fn default() -> Self {
        Self::new()
    }
}
