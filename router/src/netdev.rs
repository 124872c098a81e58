//! Boundary between the router core and the framing driver.
//!
//! The driver owns the link: it delivers received frames by calling
//! [`Router::handle_frame`](crate::router::Router::handle_frame) and accepts
//! outbound frames through this trait.  Only raw bytes cross the boundary.

use crate::iface::Interface;

/// Outbound half of the framing driver contract.
///
/// `send_frame` may block and is therefore never called while the ARP cache
/// mutex is held.  Transmission is best-effort: the driver reports no error
/// the core would act on, and the core never retries a send.
pub trait FrameDriver: Send + Sync {
    /// Transmit one complete Ethernet frame on the given interface.
    fn send_frame(&self, iface: &Interface, frame: &[u8]);
}
