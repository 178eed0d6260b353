//! Host collaborators
//!
//! The auth core never owns guest memory, threads or UI. Everything it
//! needs from the emulator goes through these traits.

use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::warn;

/// Longest guest C string read before giving up on a terminator
pub const MAX_GUEST_STRING: usize = 256;

/// Guest memory access.
///
/// Reads and writes assume the address was checked with
/// [`is_valid_address`](GuestMemory::is_valid_address) or
/// [`is_valid_range`](GuestMemory::is_valid_range) first.
pub trait GuestMemory {
    fn is_valid_address(&self, addr: u32) -> bool;

    /// Read a little-endian u32
    fn read_u32(&self, addr: u32) -> u32;

    /// Borrow `len` bytes for a bulk copy
    fn read_bytes(&self, addr: u32, len: usize) -> Option<&[u8]>;

    fn write_bytes(&mut self, addr: u32, data: &[u8]);

    fn fill(&mut self, addr: u32, value: u8, len: usize);

    fn is_valid_range(&self, addr: u32, len: usize) -> bool {
        if len == 0 {
            return self.is_valid_address(addr);
        }
        match u32::try_from(len - 1).ok().and_then(|last| addr.checked_add(last)) {
            Some(end) => self.is_valid_address(addr) && self.is_valid_address(end),
            None => false,
        }
    }

    fn write_u32(&mut self, addr: u32, value: u32) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    /// Read a NUL-terminated string, `None` for an invalid address
    fn read_c_string(&self, addr: u32) -> Option<String> {
        if addr == 0 || !self.is_valid_address(addr) {
            return None;
        }

        let mut bytes = Vec::new();
        for i in 0..MAX_GUEST_STRING as u32 {
            let Some(cur) = addr.checked_add(i) else { break };
            match self.read_bytes(cur, 1) {
                Some([0]) | None => break,
                Some(b) => bytes.extend_from_slice(b),
            }
        }
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// A call into guest code queued for the host scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestCall {
    pub entry_point: u32,
    pub args: Vec<u32>,
}

/// Fire-and-forget invocation of guest code
pub trait Scheduler {
    fn enqueue_call(&self, entry_point: u32, args: &[u32]);
}

impl Scheduler for mpsc::UnboundedSender<GuestCall> {
    fn enqueue_call(&self, entry_point: u32, args: &[u32]) {
        let call = GuestCall {
            entry_point,
            args: args.to_vec(),
        };
        if self.send(call).is_err() {
            warn!("Guest call to {:08x} dropped: scheduler closed", entry_point);
        }
    }
}

/// On-screen notice severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Warning,
    Error,
}

/// User-facing notices
pub trait Notifier {
    fn show_message(&self, kind: NoticeKind, text: &str, duration: Duration);
}

/// Wall clock used for ticket issue dates
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> u64;
}

/// System time clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_scheduler() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.enqueue_call(0x0880_1000, &[1, 246, 0]);

        let call = rx.try_recv().unwrap();
        assert_eq!(call.entry_point, 0x0880_1000);
        assert_eq!(call.args, vec![1, 246, 0]);
    }

    #[test]
    fn test_closed_channel_is_silent() {
        let (tx, rx) = mpsc::unbounded_channel::<GuestCall>();
        drop(rx);
        tx.enqueue_call(0x0880_1000, &[1, 246, 0]);
    }

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        assert!(clock.now_millis() > 1_600_000_000_000);
    }
}
