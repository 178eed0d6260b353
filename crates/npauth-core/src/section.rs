//! Ticket and section headers
//!
//! Login ticket layout:
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ Header:         version (uint16)   size (uint32)       6 bytes  │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ Body section:   type=1 (uint16)    size (uint32)       6 bytes  │
//! │ Body params     (TLV, `size` bytes)                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ Footer section: type=2 (uint16)    size=32 (uint32)    6 bytes  │
//! │ Footer params   (4-byte tag, 20-byte blob)            32 bytes  │
//! │ Reserved        (zero)                                36 bytes  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//! All integers are big-endian. A section `size` never includes its own
//! header.

use crate::{Error, Result};
use bytes::{Buf, BufMut};

/// Ticket header size
pub const TICKET_HEADER_SIZE: usize = 6;

/// Section header size
pub const SECTION_HEADER_SIZE: usize = 6;

/// Section type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum SectionType {
    Body = 0x0001,
    Footer = 0x0002,
}

impl SectionType {
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            0x0001 => Some(SectionType::Body),
            0x0002 => Some(SectionType::Footer),
            _ => None,
        }
    }
}

/// Leading ticket header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketHeader {
    pub version: u16,
    /// Reserved body capacity, not the encoded length
    pub size: u32,
}

impl TicketHeader {
    pub fn new(version: u16, size: u32) -> Self {
        Self { version, size }
    }

    /// Major and minor version digits ("2.1" for 0x0201)
    pub fn version_parts(&self) -> (u8, u8) {
        ((self.version >> 8) as u8, self.version as u8)
    }

    pub fn encode(&self, buf: &mut impl BufMut) -> usize {
        buf.put_u16(self.version);
        buf.put_u32(self.size);
        TICKET_HEADER_SIZE
    }

    pub fn decode(mut buf: impl Buf) -> Result<Self> {
        if buf.remaining() < TICKET_HEADER_SIZE {
            return Err(Error::BufferTooSmall {
                needed: TICKET_HEADER_SIZE,
                have: buf.remaining(),
            });
        }

        let version = buf.get_u16();
        let size = buf.get_u32();
        Ok(Self { version, size })
    }
}

/// Header preceding a run of params
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    pub ty: SectionType,
    /// Byte length of the params that follow
    pub size: u32,
}

impl SectionHeader {
    pub fn new(ty: SectionType, size: u32) -> Self {
        Self { ty, size }
    }

    pub fn encode(&self, buf: &mut impl BufMut) -> usize {
        buf.put_u16(self.ty as u16);
        buf.put_u32(self.size);
        SECTION_HEADER_SIZE
    }

    pub fn decode(mut buf: impl Buf) -> Result<Self> {
        if buf.remaining() < SECTION_HEADER_SIZE {
            return Err(Error::BufferTooSmall {
                needed: SECTION_HEADER_SIZE,
                have: buf.remaining(),
            });
        }

        let code = buf.get_u16();
        let ty = SectionType::from_u16(code).ok_or(Error::UnknownSectionType(code))?;
        let size = buf.get_u32();
        Ok(Self { ty, size })
    }
}
