//! Pool usage accounting
//!
//! Nothing is really allocated from the pool; the numbers are fixed at
//! init and reported back unchanged.

use bytes::BufMut;

/// Bytes of the pool reserved for bookkeeping
pub const POOL_OVERHEAD: u32 = 0x20;

/// Reported peak footprint
pub const MAX_MEM_SIZE: u32 = 0x4050;

/// Size of the guest memory stat block
pub const MEMORY_STAT_SIZE: usize = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStat {
    pub mem_size: u32,
    pub max_mem_size: u32,
    pub free_mem_size: u32,
}

impl MemoryStat {
    pub fn from_pool(pool_size: u32) -> Self {
        let mem_size = pool_size.saturating_sub(POOL_OVERHEAD);
        Self {
            mem_size,
            max_mem_size: MAX_MEM_SIZE,
            free_mem_size: mem_size,
        }
    }

    /// Guest layout: three little-endian u32
    pub fn to_guest_bytes(&self) -> [u8; MEMORY_STAT_SIZE] {
        let mut out = [0u8; MEMORY_STAT_SIZE];
        let mut buf = &mut out[..];
        buf.put_u32_le(self.mem_size);
        buf.put_u32_le(self.max_mem_size);
        buf.put_u32_le(self.free_mem_size);
        out
    }
}
