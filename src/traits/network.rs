//! Network abstraction for the game server link.
//!
//! The board talks to the game server over connectionless datagrams: the
//! server registers itself as listener, the board pushes status updates to
//! that listener and polls for inbound commands.
//!
//! ```text
//! server -> board   command packet (REGISTER_LISTENER, SHOW_PIXEL, ...)
//! board  -> server  status update (121 bytes on a 6x6 board)
//! ```

use core::net::SocketAddrV4;

/// Datagram transport trait.
///
/// This trait uses a **sync-first design** that works on the ESP32 (blocking
/// I/O with a non-blocking receive) and on desktop mocks alike.
///
/// # Implementation Notes
///
/// - `send_to` sends one whole datagram
/// - `try_recv` is non-blocking and must return `None` when nothing is queued
/// - Oversized datagrams are truncated to the buffer length
///
/// # Example
///
/// ```rust,ignore
/// use smartboard::traits::StatusTransport;
///
/// fn push<T: StatusTransport>(transport: &mut T, listener: SocketAddrV4, packet: &[u8]) {
///     transport.send_to(listener, packet).unwrap();
/// }
/// ```
pub trait StatusTransport {
    /// Error type for transport operations.
    type Error: core::fmt::Debug;

    /// Sends one datagram to `dest`.
    fn send_to(&mut self, dest: SocketAddrV4, payload: &[u8]) -> Result<(), Self::Error>;

    /// Copies the next queued datagram into `buf` (non-blocking).
    ///
    /// Returns the number of bytes written, or `None` if nothing was queued.
    fn try_recv(&mut self, buf: &mut [u8]) -> Option<usize>;
}

/// Spaces out blocking rejoin rounds while the WiFi link is down.
///
/// A rejoin blocks the scan loop for the whole retry budget, so the loop
/// only starts one when the previous round ended at least `interval_ms`
/// ago. Times are milliseconds on any monotonic clock.
///
/// ```
/// use smartboard::traits::RejoinSchedule;
///
/// let mut schedule = RejoinSchedule::new(30_000);
/// assert!(schedule.is_due(0));
/// schedule.record_attempt(10_000);
/// assert!(!schedule.is_due(25_000));
/// assert!(schedule.is_due(40_000));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RejoinSchedule {
    interval_ms: u64,
    last_attempt_ms: Option<u64>,
}

impl RejoinSchedule {
    /// Creates a schedule whose first rejoin is due immediately.
    pub const fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms: interval_ms as u64,
            last_attempt_ms: None,
        }
    }

    /// Returns true when a rejoin round may start at `now_ms`.
    pub fn is_due(&self, now_ms: u64) -> bool {
        self.last_attempt_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= self.interval_ms)
    }

    /// Records the end of a rejoin round.
    pub fn record_attempt(&mut self, now_ms: u64) {
        self.last_attempt_ms = Some(now_ms);
    }

    /// Link is back: the next drop rejoins at once.
    pub fn reset(&mut self) {
        self.last_attempt_ms = None;
    }
}
