//! Ticket params
//!
//! Every param is a tagged length-value record:
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Byte 0-1:   Type   (uint16 big-endian)       │
//! │ Byte 2-3:   Length (uint16 big-endian)       │
//! ├──────────────────────────────────────────────┤
//! │ Payload (Length bytes, copied verbatim)      │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! A param with no payload still carries its 4-byte header with length 0.
//! Two such `Null` params terminate the login ticket body.

use crate::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};

/// Param header size (type + length)
pub const PARAM_HEADER_SIZE: usize = 4;

/// Param type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ParamType {
    /// Empty marker, used as list terminator
    Null = 0x0000,
    /// 32-bit unsigned integer
    Int = 0x0001,
    /// 64-bit unsigned integer
    Long = 0x0002,
    /// Fixed-width string, zero padded
    String = 0x0004,
    /// Milliseconds since the epoch as 64-bit integer
    Date = 0x0007,
    /// Raw bytes, copied as-is
    AsciiString = 0x0008,
}

impl ParamType {
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            0x0000 => Some(ParamType::Null),
            0x0001 => Some(ParamType::Int),
            0x0002 => Some(ParamType::Long),
            0x0004 => Some(ParamType::String),
            0x0007 => Some(ParamType::Date),
            0x0008 => Some(ParamType::AsciiString),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        self as u16
    }
}

// ============================================================================
// WRITERS
// ============================================================================

/// Write a raw param.
///
/// When `data` is `None` only the header is written, with length 0.
/// Otherwise exactly `size` payload bytes are emitted: the source is copied
/// up to `size` bytes and any shortfall is zero filled.
///
/// Returns the number of bytes written (`4 + length`).
pub fn encode_param(buf: &mut impl BufMut, ty: ParamType, data: Option<&[u8]>, size: u16) -> usize {
    let len = if data.is_some() { size } else { 0 };
    buf.put_u16(ty.code());
    buf.put_u16(len);

    if let Some(data) = data {
        let len = len as usize;
        let copied = data.len().min(len);
        buf.put_slice(&data[..copied]);
        buf.put_bytes(0, len - copied);
    }

    PARAM_HEADER_SIZE + len as usize
}

/// Write a fixed-width string param.
///
/// The copy stops at the first NUL in the source or at `size` bytes,
/// whichever comes first; the rest of the field is zero filled. A source
/// longer than `size` is cut, never extended.
pub fn encode_string_param(
    buf: &mut impl BufMut,
    ty: ParamType,
    data: Option<&[u8]>,
    size: u16,
) -> usize {
    let len = if data.is_some() { size } else { 0 };
    buf.put_u16(ty.code());
    buf.put_u16(len);

    if let Some(data) = data {
        let len = len as usize;
        let copied = string_prefix_len(data, len);
        buf.put_slice(&data[..copied]);
        buf.put_bytes(0, len - copied);
    }

    PARAM_HEADER_SIZE + len as usize
}

/// Write a 4-byte big-endian integer param
#[inline]
pub fn encode_u32_param(buf: &mut impl BufMut, ty: ParamType, value: u32) -> usize {
    buf.put_u16(ty.code());
    buf.put_u16(4);
    buf.put_u32(value);
    PARAM_HEADER_SIZE + 4
}

/// Write an 8-byte big-endian integer param
#[inline]
pub fn encode_u64_param(buf: &mut impl BufMut, ty: ParamType, value: u64) -> usize {
    buf.put_u16(ty.code());
    buf.put_u16(8);
    buf.put_u64(value);
    PARAM_HEADER_SIZE + 8
}

fn string_prefix_len(data: &[u8], width: usize) -> usize {
    let limit = data.len().min(width);
    data[..limit].iter().position(|&b| b == 0).unwrap_or(limit)
}

// ============================================================================
// OWNED PARAM
// ============================================================================

/// An owned ticket param
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketParam {
    pub ty: ParamType,
    pub payload: Bytes,
}

impl TicketParam {
    /// Empty `Null` marker
    pub fn null() -> Self {
        Self {
            ty: ParamType::Null,
            payload: Bytes::new(),
        }
    }

    pub fn int(value: u32) -> Self {
        Self {
            ty: ParamType::Int,
            payload: Bytes::copy_from_slice(&value.to_be_bytes()),
        }
    }

    pub fn long(value: u64) -> Self {
        Self {
            ty: ParamType::Long,
            payload: Bytes::copy_from_slice(&value.to_be_bytes()),
        }
    }

    /// Date in milliseconds since the epoch
    pub fn date(millis: u64) -> Self {
        Self {
            ty: ParamType::Date,
            payload: Bytes::copy_from_slice(&millis.to_be_bytes()),
        }
    }

    /// Fixed-width string, NUL-terminated copy then zero padded
    pub fn string(value: impl AsRef<[u8]>, width: u16) -> Self {
        let mut payload = BytesMut::with_capacity(width as usize);
        let value = value.as_ref();
        let copied = string_prefix_len(value, width as usize);
        payload.put_slice(&value[..copied]);
        payload.put_bytes(0, width as usize - copied);
        Self {
            ty: ParamType::String,
            payload: payload.freeze(),
        }
    }

    /// Raw bytes field of exactly `width` bytes
    pub fn ascii(value: impl AsRef<[u8]>, width: u16) -> Self {
        let mut payload = BytesMut::with_capacity(width as usize);
        let value = value.as_ref();
        let copied = value.len().min(width as usize);
        payload.put_slice(&value[..copied]);
        payload.put_bytes(0, width as usize - copied);
        Self {
            ty: ParamType::AsciiString,
            payload: payload.freeze(),
        }
    }

    /// Param with an arbitrary payload
    pub fn raw(ty: ParamType, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > u16::MAX as usize {
            return Err(Error::InvalidArgument(format!(
                "param payload of {} bytes exceeds {}",
                payload.len(),
                u16::MAX
            )));
        }
        Ok(Self { ty, payload })
    }

    /// Payload length as stored in the length field
    pub fn length(&self) -> u16 {
        self.payload.len() as u16
    }

    /// Total encoded size
    pub fn encoded_len(&self) -> usize {
        PARAM_HEADER_SIZE + self.payload.len()
    }

    /// Encode into `buf`, returning bytes written
    pub fn encode(&self, buf: &mut impl BufMut) -> usize {
        buf.put_u16(self.ty.code());
        buf.put_u16(self.length());
        buf.put_slice(&self.payload);
        self.encoded_len()
    }
}

// ============================================================================
// BORROWED VIEW
// ============================================================================

/// A param view borrowed from an encoded ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketParamRef<'a> {
    pub ty: ParamType,
    pub payload: &'a [u8],
}

impl<'a> TicketParamRef<'a> {
    /// Decode the param starting at the front of `buf`
    pub fn decode(buf: &'a [u8]) -> Result<Self> {
        if buf.len() < PARAM_HEADER_SIZE {
            return Err(Error::BufferTooSmall {
                needed: PARAM_HEADER_SIZE,
                have: buf.len(),
            });
        }

        let code = u16::from_be_bytes([buf[0], buf[1]]);
        let ty = ParamType::from_u16(code).ok_or(Error::UnknownParamType(code))?;
        let len = u16::from_be_bytes([buf[2], buf[3]]) as usize;

        let payload = buf
            .get(PARAM_HEADER_SIZE..PARAM_HEADER_SIZE + len)
            .ok_or(Error::BufferTooSmall {
                needed: PARAM_HEADER_SIZE + len,
                have: buf.len(),
            })?;

        Ok(Self { ty, payload })
    }

    pub fn length(&self) -> u16 {
        self.payload.len() as u16
    }

    pub fn encoded_len(&self) -> usize {
        PARAM_HEADER_SIZE + self.payload.len()
    }

    /// Re-encode the param; the output matches the bytes it was decoded from
    pub fn encode(&self, buf: &mut impl BufMut) -> usize {
        buf.put_u16(self.ty.code());
        buf.put_u16(self.length());
        buf.put_slice(self.payload);
        self.encoded_len()
    }

    /// Payload as u32 (Int params)
    pub fn as_u32(&self) -> Option<u32> {
        let bytes: [u8; 4] = self.payload.try_into().ok()?;
        Some(u32::from_be_bytes(bytes))
    }

    /// Payload as u64 (Long and Date params)
    pub fn as_u64(&self) -> Option<u64> {
        let bytes: [u8; 8] = self.payload.try_into().ok()?;
        Some(u64::from_be_bytes(bytes))
    }

    /// Payload up to the first NUL, if valid UTF-8
    pub fn as_str(&self) -> Option<&'a str> {
        let end = self
            .payload
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.payload.len());
        std::str::from_utf8(&self.payload[..end]).ok()
    }

    pub fn to_param(&self) -> TicketParam {
        TicketParam {
            ty: self.ty,
            payload: Bytes::copy_from_slice(self.payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_type_codes() {
        for ty in [
            ParamType::Null,
            ParamType::Int,
            ParamType::Long,
            ParamType::String,
            ParamType::Date,
            ParamType::AsciiString,
        ] {
            assert_eq!(ParamType::from_u16(ty.code()), Some(ty));
        }
        assert_eq!(ParamType::from_u16(0x0003), None);
    }

    #[test]
    fn test_missing_payload_writes_header_only() {
        let mut buf = BytesMut::new();
        let written = encode_param(&mut buf, ParamType::Null, None, 16);
        assert_eq!(written, 4);
        assert_eq!(&buf[..], &[0x00, 0x00, 0x00, 0x00]);

        let mut buf = BytesMut::new();
        let written = encode_string_param(&mut buf, ParamType::String, None, 32);
        assert_eq!(written, 4);
        assert_eq!(&buf[..], &[0x00, 0x04, 0x00, 0x00]);
    }

    #[test]
    fn test_header_is_big_endian() {
        let mut buf = BytesMut::new();
        encode_u32_param(&mut buf, ParamType::Int, 0x0100);
        assert_eq!(&buf[..], &[0x00, 0x01, 0x00, 0x04, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_string_stops_at_nul() {
        let mut buf = BytesMut::new();
        encode_string_param(&mut buf, ParamType::String, Some(&b"ab\0cd"[..]), 6);
        assert_eq!(&buf[4..], b"ab\0\0\0\0");
    }

    #[test]
    fn test_raw_copies_past_nul() {
        let mut buf = BytesMut::new();
        encode_param(&mut buf, ParamType::AsciiString, Some(&b"ab\0cd"[..]), 6);
        assert_eq!(&buf[4..], b"ab\0cd\0");
    }

    #[test]
    fn test_decode_view_accessors() {
        let param = TicketParam::date(1_700_000_000_000);
        let mut buf = BytesMut::new();
        param.encode(&mut buf);

        let view = TicketParamRef::decode(&buf).unwrap();
        assert_eq!(view.ty, ParamType::Date);
        assert_eq!(view.as_u64(), Some(1_700_000_000_000));
        assert_eq!(view.as_u32(), None);
        assert_eq!(view.to_param(), param);
    }

    #[test]
    fn test_decode_rejects_short_payload() {
        let buf = [0x00, 0x08, 0x00, 0x10, 0xAA];
        assert_eq!(
            TicketParamRef::decode(&buf),
            Err(Error::BufferTooSmall { needed: 20, have: 5 })
        );
    }

    #[test]
    fn test_raw_rejects_oversized_payload() {
        let payload = vec![0u8; u16::MAX as usize + 1];
        assert!(matches!(
            TicketParam::raw(ParamType::AsciiString, payload),
            Err(Error::InvalidArgument(_))
        ));
    }
}
