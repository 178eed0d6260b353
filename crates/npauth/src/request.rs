//! Start request parameter block
//!
//! Guest layout (little-endian, `size` bytes are meaningful):
//! ```text
//! +00  size               u32
//! +04  version.major      u16
//! +06  version.minor      u16
//! +08  service id         char*
//! +0C  cookie             void*
//! +10  cookie size        u32
//! +14  entitlement id     char*
//! +18  consumed count     u32
//! +1C  ticket callback    entry point
//! +20  callback argument  void*
//! ```

use bytes::Buf;

use crate::host::GuestMemory;
use crate::{AuthError, Result};

/// Full size of the parameter block
pub const REQUEST_PARAM_SIZE: usize = 36;

/// Smallest block that carries a ticket callback
pub const MIN_SIZE_WITH_CALLBACK: u32 = 32;

/// Smallest block that carries a callback argument
pub const MIN_SIZE_WITH_ARGUMENT: u32 = 36;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TicketVersion {
    pub major: u16,
    pub minor: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartRequestParams {
    pub size: u32,
    pub version: TicketVersion,
    pub service_id_addr: u32,
    pub cookie_addr: u32,
    pub cookie_size: u32,
    pub entitlement_id_addr: u32,
    pub consumed_count: u32,
    pub ticket_cb_addr: u32,
    pub cb_arg_addr: u32,
}

impl StartRequestParams {
    /// Read the block at `addr`. Fields past the declared size read as zero.
    pub fn read_from(mem: &impl GuestMemory, addr: u32) -> Result<Self> {
        if !mem.is_valid_range(addr, 4) {
            return Err(AuthError::InvalidArgument(format!(
                "request params at {:08x}",
                addr
            )));
        }

        let size = mem.read_u32(addr);
        let len = (size as usize).min(REQUEST_PARAM_SIZE);
        let raw = mem.read_bytes(addr, len).ok_or_else(|| {
            AuthError::InvalidArgument(format!(
                "request params at {:08x} ({} bytes)",
                addr, len
            ))
        })?;

        let mut block = [0u8; REQUEST_PARAM_SIZE];
        let n = raw.len().min(len);
        block[..n].copy_from_slice(&raw[..n]);
        Ok(Self::decode(&block))
    }

    /// Decode a full 36-byte block
    pub fn decode(block: &[u8; REQUEST_PARAM_SIZE]) -> Self {
        let mut buf = &block[..];
        Self {
            size: buf.get_u32_le(),
            version: TicketVersion {
                major: buf.get_u16_le(),
                minor: buf.get_u16_le(),
            },
            service_id_addr: buf.get_u32_le(),
            cookie_addr: buf.get_u32_le(),
            cookie_size: buf.get_u32_le(),
            entitlement_id_addr: buf.get_u32_le(),
            consumed_count: buf.get_u32_le(),
            ticket_cb_addr: buf.get_u32_le(),
            cb_arg_addr: buf.get_u32_le(),
        }
    }

    /// Ticket callback, if the block is large enough and it is set
    pub fn ticket_callback(&self) -> Option<u32> {
        if self.size >= MIN_SIZE_WITH_CALLBACK && self.ticket_cb_addr != 0 {
            Some(self.ticket_cb_addr)
        } else {
            None
        }
    }

    /// Argument pointer delivered with the completion event
    pub fn event_argument(&self) -> u32 {
        if self.size >= MIN_SIZE_WITH_ARGUMENT {
            self.cb_arg_addr
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(size: u32, cb: u32, arg: u32) -> [u8; REQUEST_PARAM_SIZE] {
        let mut out = [0u8; REQUEST_PARAM_SIZE];
        out[0..4].copy_from_slice(&size.to_le_bytes());
        out[4..6].copy_from_slice(&3u16.to_le_bytes());
        out[28..32].copy_from_slice(&cb.to_le_bytes());
        out[32..36].copy_from_slice(&arg.to_le_bytes());
        out
    }

    #[test]
    fn test_decode_offsets() {
        let params = StartRequestParams::decode(&block(36, 0x0880_2000, 0x0900_1000));
        assert_eq!(params.version.major, 3);
        assert_eq!(params.ticket_callback(), Some(0x0880_2000));
        assert_eq!(params.event_argument(), 0x0900_1000);
    }

    #[test]
    fn test_short_block_has_no_argument() {
        let params = StartRequestParams::decode(&block(32, 0x0880_2000, 0x0900_1000));
        assert_eq!(params.ticket_callback(), Some(0x0880_2000));
        assert_eq!(params.event_argument(), 0);
    }

    #[test]
    fn test_no_callback() {
        assert_eq!(StartRequestParams::decode(&block(28, 0x0880_2000, 0)).ticket_callback(), None);
        assert_eq!(StartRequestParams::decode(&block(36, 0, 0)).ticket_callback(), None);
    }
}
