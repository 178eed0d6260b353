//! Common test helpers for NP auth tests
//!
//! This crate provides in-memory stand-ins for the host:
//! - Flat guest memory with write accounting ([`FakeMemory`])
//! - Recorders for scheduled guest calls and notices
//! - A fixed clock for reproducible tickets
//! - Opt-in log output via `RUST_LOG`

use npauth::{Clock, GuestCall, GuestMemory, NoticeKind, Notifier, Scheduler};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Base address of the default fake memory region
pub const DEFAULT_BASE: u32 = 0x0880_0000;

/// Size of the default fake memory region
pub const DEFAULT_SIZE: usize = 0x0001_0000;

// ============================================================================
// Logging
// ============================================================================

/// Route `tracing` output to the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Guest Memory
// ============================================================================

/// A single contiguous block of guest memory
#[derive(Debug, Clone)]
pub struct FakeMemory {
    base: u32,
    data: Vec<u8>,
    writes: usize,
}

impl FakeMemory {
    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            data: vec![0; size],
            writes: 0,
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    /// Number of `write_bytes`/`fill` calls so far
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Copy bytes in without counting it as a guest-visible write
    pub fn load(&mut self, addr: u32, bytes: &[u8]) {
        let start = self.offset(addr);
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Store a NUL-terminated string
    pub fn load_c_string(&mut self, addr: u32, s: &str) {
        self.load(addr, s.as_bytes());
        self.load(addr + s.len() as u32, &[0]);
    }

    /// Borrow a region for assertions
    pub fn slice(&self, addr: u32, len: usize) -> &[u8] {
        let start = self.offset(addr);
        &self.data[start..start + len]
    }

    fn offset(&self, addr: u32) -> usize {
        (addr - self.base) as usize
    }
}

impl Default for FakeMemory {
    fn default() -> Self {
        Self::new(DEFAULT_BASE, DEFAULT_SIZE)
    }
}

impl GuestMemory for FakeMemory {
    fn is_valid_address(&self, addr: u32) -> bool {
        addr >= self.base && ((addr - self.base) as usize) < self.data.len()
    }

    fn read_u32(&self, addr: u32) -> u32 {
        let bytes = self.slice(addr, 4);
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn read_bytes(&self, addr: u32, len: usize) -> Option<&[u8]> {
        if !self.is_valid_address(addr) {
            return None;
        }
        let start = self.offset(addr);
        self.data.get(start..start.checked_add(len)?)
    }

    fn write_bytes(&mut self, addr: u32, data: &[u8]) {
        self.writes += 1;
        let start = self.offset(addr);
        self.data[start..start + data.len()].copy_from_slice(data);
    }

    fn fill(&mut self, addr: u32, value: u8, len: usize) {
        self.writes += 1;
        let start = self.offset(addr);
        self.data[start..start + len].fill(value);
    }
}

// ============================================================================
// Recorders
// ============================================================================

/// Scheduler that records every call
#[derive(Debug, Clone, Default)]
pub struct RecordingScheduler {
    calls: Arc<Mutex<Vec<GuestCall>>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<GuestCall> {
        self.calls.lock().clone()
    }

    /// Request ids (first argument) in dispatch order
    pub fn request_ids(&self) -> Vec<u32> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| call.args.first().copied())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }
}

impl Scheduler for RecordingScheduler {
    fn enqueue_call(&self, entry_point: u32, args: &[u32]) {
        self.calls.lock().push(GuestCall {
            entry_point,
            args: args.to_vec(),
        });
    }
}

/// Notifier that records every notice
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<(NoticeKind, String, Duration)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(NoticeKind, String, Duration)> {
        self.messages.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().len()
    }
}

impl Notifier for RecordingNotifier {
    fn show_message(&self, kind: NoticeKind, text: &str, duration: Duration) {
        self.messages.lock().push((kind, text.to_string(), duration));
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Clock that only moves when told to
#[derive(Debug, Clone, Default)]
pub struct FixedClock {
    now: Arc<AtomicU64>,
}

impl FixedClock {
    pub fn new(now_millis: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(now_millis)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
