//! Login ticket assembly
//!
//! Produces the structurally valid, semantically inert login ticket handed
//! to titles after a sign-in request. Nothing here is signed: the opaque
//! blobs are fixed captures and the dates only carry the issue time and a
//! fixed validity window.

use crate::param::{
    encode_param, encode_string_param, encode_u32_param, encode_u64_param, ParamType, TicketParam,
};
use crate::section::{SectionHeader, SectionType, TicketHeader, SECTION_HEADER_SIZE, TICKET_HEADER_SIZE};
use crate::{
    Error, Result, TICKET_BODY_CAPACITY, TICKET_BUFFER_SIZE, TICKET_LENGTH, TICKET_VALIDITY_MS,
    TICKET_VERSION,
};
use bytes::{BufMut, Bytes};

/// Country code used when none is configured
pub const DEFAULT_COUNTRY_CODE: &str = "us";

/// Region code used when none is configured
pub const DEFAULT_REGION_CODE: &str = "c9";

/// Reported account age
pub const DEFAULT_USER_AGE: u8 = 24;

/// Status bit set when parental control is enabled
pub const STATUS_PARENTAL_CONTROL: u32 = 0x0000_0200;

/// Status bits holding the 7-bit account age
pub const STATUS_AGE_SHIFT: u32 = 24;
pub const STATUS_AGE_MASK: u32 = 0x7F;

/// Footer section payload size (tag param + blob param)
pub const FOOTER_SIZE: u32 = 32;

/// Reserved zero bytes after the footer params
pub const FOOTER_RESERVED_SIZE: usize = 36;

/// Bytes holding encoded data: everything before the reserved tail
pub const TICKET_ENCODED_SIZE: usize = TICKET_BUFFER_SIZE - FOOTER_RESERVED_SIZE;

/// Width of the online id field
pub const ONLINE_ID_WIDTH: u16 = 32;

/// Width of the service id field
pub const SERVICE_ID_WIDTH: u16 = 24;

const BODY_SIGNATURE: [u8; 20] = [
    0x4c, 0x47, 0x56, 0x3b, 0x81, 0x39, 0x4a, 0x22, 0xd8, 0x6b, 0xc1, 0x57, 0x71, 0x6e, 0xfd, 0xb8,
    0xab, 0x63, 0xcc, 0x51,
];
const BODY_FLAGS: u32 = 0x0100;
const BODY_OPAQUE_LONG: u64 = 0x592e_71c5_46e8_6859;

const FOOTER_TAG: [u8; 4] = [0x34, 0xcd, 0x3c, 0xa9];
const FOOTER_SIGNATURE: [u8; 20] = [
    0x3a, 0x4b, 0x42, 0x66, 0x92, 0xda, 0x6b, 0x7c, 0xb7, 0x4c, 0xe8, 0xd9, 0x4f, 0x2b, 0x77, 0x15,
    0x91, 0xb8, 0xa4, 0xa9,
];

/// Inputs for a login ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginTicket {
    /// Online id (user name), embedded verbatim
    pub online_id: String,
    /// 4-byte country field, e.g. "us\0\0"
    pub country_code: [u8; 4],
    /// 4-byte region field, e.g. "c9\0\0"
    pub region_code: [u8; 4],
    /// Service id from the start request
    pub service_id: String,
    /// Issue time, milliseconds since the epoch
    pub issued_at_ms: u64,
    pub user_age: u8,
    pub parental_control: bool,
}

impl LoginTicket {
    pub fn new(online_id: impl Into<String>, service_id: impl Into<String>, issued_at_ms: u64) -> Self {
        Self {
            online_id: online_id.into(),
            country_code: code_field(DEFAULT_COUNTRY_CODE),
            region_code: code_field(DEFAULT_REGION_CODE),
            service_id: service_id.into(),
            issued_at_ms,
            user_age: DEFAULT_USER_AGE,
            parental_control: true,
        }
    }

    pub fn with_country_code(mut self, code: &str) -> Self {
        self.country_code = code_field(code);
        self
    }

    pub fn with_region_code(mut self, code: &str) -> Self {
        self.region_code = code_field(code);
        self
    }

    pub fn with_user_age(mut self, age: u8) -> Self {
        self.user_age = age;
        self
    }

    pub fn with_parental_control(mut self, enabled: bool) -> Self {
        self.parental_control = enabled;
        self
    }

    /// Expiry date written as the second date param
    pub fn expires_at_ms(&self) -> u64 {
        self.issued_at_ms.saturating_add(TICKET_VALIDITY_MS)
    }

    pub fn status(&self) -> u32 {
        status_bits(self.user_age, self.parental_control)
    }
}

/// Pack a 4-byte code field, cutting longer codes
pub fn code_field(code: &str) -> [u8; 4] {
    let mut field = [0u8; 4];
    let bytes = code.as_bytes();
    let len = bytes.len().min(field.len());
    field[..len].copy_from_slice(&bytes[..len]);
    field
}

/// Account status bitfield: age in bits 24..=30, parental control flag
pub fn status_bits(user_age: u8, parental_control: bool) -> u32 {
    let mut status = 0u32;
    if parental_control {
        status |= STATUS_PARENTAL_CONTROL;
    }
    status |= (user_age as u32 & STATUS_AGE_MASK) << STATUS_AGE_SHIFT;
    status
}

/// Write a section header followed by its params, returning bytes written
pub fn encode_section(buf: &mut impl BufMut, ty: SectionType, params: &[TicketParam]) -> usize {
    let size: usize = params.iter().map(TicketParam::encoded_len).sum();
    let mut written = SectionHeader::new(ty, size as u32).encode(buf);
    for param in params {
        written += param.encode(buf);
    }
    written
}

/// Build a login ticket into `buffer`.
///
/// The first [`TICKET_BUFFER_SIZE`] bytes of `buffer` are cleared and then
/// filled with the header, body section, footer section and reserved
/// padding. Nothing is written when the buffer is too small or the online
/// id is empty.
///
/// Returns [`TICKET_LENGTH`]: the reserved capacity from the header plus the
/// header itself. This is a fixed value and does not track the encoded
/// body.
pub fn build_login_ticket(buffer: &mut [u8], ticket: &LoginTicket) -> Result<usize> {
    if buffer.len() < TICKET_BUFFER_SIZE {
        return Err(Error::BufferTooSmall {
            needed: TICKET_BUFFER_SIZE,
            have: buffer.len(),
        });
    }
    if ticket.online_id.is_empty() {
        return Err(Error::ConfigurationMissing("online id"));
    }

    let buffer = &mut buffer[..TICKET_BUFFER_SIZE];
    buffer.fill(0);

    let (head, rest) = buffer.split_at_mut(TICKET_HEADER_SIZE + SECTION_HEADER_SIZE);

    let mut body = &mut rest[..];
    let body_len = encode_body(&mut body, ticket);

    let mut cursor = &mut head[..];
    TicketHeader::new(TICKET_VERSION, TICKET_BODY_CAPACITY).encode(&mut cursor);
    SectionHeader::new(SectionType::Body, body_len as u32).encode(&mut cursor);

    let mut footer = &mut rest[body_len..];
    SectionHeader::new(SectionType::Footer, FOOTER_SIZE).encode(&mut footer);
    encode_param(&mut footer, ParamType::AsciiString, Some(&FOOTER_TAG[..]), 4);
    encode_param(&mut footer, ParamType::AsciiString, Some(&FOOTER_SIGNATURE[..]), 20);
    // reserved language list stays zeroed

    Ok(TICKET_LENGTH)
}

/// Build a login ticket into a fresh buffer of [`TICKET_BUFFER_SIZE`] bytes
pub fn encode_login_ticket(ticket: &LoginTicket) -> Result<Bytes> {
    let mut buffer = vec![0u8; TICKET_BUFFER_SIZE];
    build_login_ticket(&mut buffer, ticket)?;
    Ok(Bytes::from(buffer))
}

fn encode_body(buf: &mut impl BufMut, ticket: &LoginTicket) -> usize {
    let mut ofs = 0;
    ofs += encode_param(buf, ParamType::AsciiString, Some(&BODY_SIGNATURE[..]), 20);
    ofs += encode_u32_param(buf, ParamType::Int, BODY_FLAGS);
    ofs += encode_u64_param(buf, ParamType::Date, ticket.issued_at_ms);
    ofs += encode_u64_param(buf, ParamType::Date, ticket.expires_at_ms());
    ofs += encode_u64_param(buf, ParamType::Long, BODY_OPAQUE_LONG);
    ofs += encode_string_param(
        buf,
        ParamType::String,
        Some(ticket.online_id.as_bytes()),
        ONLINE_ID_WIDTH,
    );
    ofs += encode_param(buf, ParamType::AsciiString, Some(&ticket.country_code[..]), 4);
    ofs += encode_string_param(buf, ParamType::String, Some(&ticket.region_code[..]), 4);
    ofs += encode_param(
        buf,
        ParamType::AsciiString,
        Some(ticket.service_id.as_bytes()),
        SERVICE_ID_WIDTH,
    );
    ofs += encode_u32_param(buf, ParamType::Int, ticket.status());
    ofs += encode_param(buf, ParamType::Null, None, 0);
    ofs += encode_param(buf, ParamType::Null, None, 0);
    ofs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_bits() {
        assert_eq!(status_bits(24, true), (24 << 24) | 0x200);
        assert_eq!(status_bits(0, false), 0);
        // age wider than 7 bits is masked
        assert_eq!(status_bits(0xFF, false), 0x7F << 24);
    }

    #[test]
    fn test_code_field() {
        assert_eq!(code_field("us"), *b"us\0\0");
        assert_eq!(code_field("abcdef"), *b"abcd");
    }

    #[test]
    fn test_body_length_is_fixed() {
        let mut buf = Vec::new();
        let short = LoginTicket::new("a", "", 0);
        assert_eq!(encode_body(&mut buf, &short), 164);

        let mut buf = Vec::new();
        let long = LoginTicket::new("x".repeat(64), "y".repeat(64), u64::MAX);
        assert_eq!(encode_body(&mut buf, &long), 164);
        assert_eq!(buf.len(), 164);
    }

    #[test]
    fn test_layout_fills_buffer() {
        let footer = SECTION_HEADER_SIZE + FOOTER_SIZE as usize + FOOTER_RESERVED_SIZE;
        assert_eq!(
            TICKET_HEADER_SIZE + SECTION_HEADER_SIZE + 164 + footer,
            TICKET_BUFFER_SIZE
        );
    }

    #[test]
    fn test_reserved_tail_is_zero() {
        let mut buf = [0xAAu8; TICKET_BUFFER_SIZE];
        build_login_ticket(&mut buf, &LoginTicket::new("user", "svc", 0)).unwrap();
        assert_eq!(TICKET_ENCODED_SIZE, 214);
        assert!(buf[TICKET_ENCODED_SIZE..].iter().all(|&b| b == 0));
        // the footer blob ends right before the tail
        assert_ne!(buf[TICKET_ENCODED_SIZE - 1], 0);
    }

    #[test]
    fn test_expiry_window() {
        let ticket = LoginTicket::new("user", "svc", 1_000);
        assert_eq!(ticket.expires_at_ms(), 601_000);
    }
}
