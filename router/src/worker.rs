//! Periodic resolver sweep (requires the `std` feature).
//!
//! A single detached thread wakes once per [`SWEEP_INTERVAL`], calls
//! [`Router::sweep`], and never returns.  Tests that drive time explicitly
//! never start it; they call `sweep` themselves against a
//! [`ManualClock`](crate::clock::ManualClock).

use alloc::string::String;
use alloc::sync::Arc;

use std::io;
use std::thread;

use crate::SWEEP_INTERVAL;
use crate::clock::Clock;
use crate::netdev::FrameDriver;
use crate::router::Router;

/// Spawn the sweep thread for `router`.
///
/// The thread runs for the life of the process; the returned handle is only
/// useful for naming it in diagnostics.
pub fn spawn_sweeper<D, C>(router: Arc<Router<D, C>>) -> io::Result<thread::JoinHandle<()>>
where
    D: FrameDriver + 'static,
    C: Clock + 'static,
{
    thread::Builder::new()
        .name(String::from("arp-sweep"))
        .spawn(move || {
            loop {
                thread::sleep(SWEEP_INTERVAL);
                router.sweep();
            }
        })
}
