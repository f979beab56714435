use core::net::Ipv4Addr;

use super::super::engine::SntpEngine;
use super::super::transport::UdpTransport;
use super::super::types::TransportError;

/// Network-processor services an attempt draws on. Transports and engine
/// contexts are created fresh for every attempt.
pub trait SyncPlatform {
    type Transport: UdpTransport;
    type Engine: SntpEngine;

    fn open_transport(&mut self) -> Result<Self::Transport, TransportError>;
    /// Fresh engine context that waits at most `response_timeout_ms` for a
    /// server reply.
    fn new_engine(&mut self, response_timeout_ms: u32) -> Self::Engine;
    fn resolve(&mut self, name: &str) -> Option<Ipv4Addr>;
    /// Host wall clock, `None` when it cannot be read.
    fn unix_seconds(&mut self) -> Option<i64>;
    fn random_u32(&mut self) -> u32;
}

/// Small xorshift generator for request nonces.
#[derive(Clone, Copy, Debug)]
pub struct XorShift32 {
    state: u32,
}

impl XorShift32 {
    pub const fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9 } else { seed },
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }
}

#[cfg(feature = "std")]
pub use host::StdPlatform;

#[cfg(feature = "std")]
mod host {
    use core::net::Ipv4Addr;
    use std::net::{SocketAddr, ToSocketAddrs};
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::super::super::engine::SntpEngine;
    use super::super::super::transport::StdUdpTransport;
    use super::super::super::types::TransportError;
    use super::{SyncPlatform, XorShift32};

    /// Host platform: system resolver, system clock, UDP sockets bound on
    /// an ephemeral port. The protocol engine comes from `make_engine`.
    pub struct StdPlatform<F> {
        make_engine: F,
        rng: XorShift32,
    }

    impl<F> StdPlatform<F> {
        pub fn new(make_engine: F) -> Self {
            let seed = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.subsec_nanos() ^ elapsed.as_secs() as u32)
                .unwrap_or_default();
            Self {
                make_engine,
                rng: XorShift32::new(seed),
            }
        }
    }

    impl<F, E> SyncPlatform for StdPlatform<F>
    where
        F: FnMut(u32) -> E,
        E: SntpEngine,
    {
        type Transport = StdUdpTransport;
        type Engine = E;

        fn open_transport(&mut self) -> Result<StdUdpTransport, TransportError> {
            StdUdpTransport::bind()
        }

        fn new_engine(&mut self, response_timeout_ms: u32) -> E {
            (self.make_engine)(response_timeout_ms)
        }

        fn resolve(&mut self, name: &str) -> Option<Ipv4Addr> {
            (name, 0u16)
                .to_socket_addrs()
                .ok()?
                .find_map(|addr| match addr {
                    SocketAddr::V4(v4) => Some(*v4.ip()),
                    SocketAddr::V6(_) => None,
                })
        }

        fn unix_seconds(&mut self) -> Option<i64> {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .ok()
                .and_then(|elapsed| i64::try_from(elapsed.as_secs()).ok())
        }

        fn random_u32(&mut self) -> u32 {
            self.rng.next_u32()
        }
    }
}
