//! Body param walking
//!
//! Params are self-describing, so reading the n-th param means stepping
//! over the n params before it using their length fields. [`TicketParams`]
//! does this lazily over a borrowed buffer; cloning it or building a new
//! one restarts the walk.

use crate::param::{TicketParamRef, PARAM_HEADER_SIZE};
use crate::section::{SectionHeader, SectionType, TicketHeader, SECTION_HEADER_SIZE, TICKET_HEADER_SIZE};
use crate::{Error, Result, MAX_TICKET_PARAMS};

/// Iterator over the params of one section
#[derive(Debug, Clone)]
pub struct TicketParams<'a> {
    params: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> TicketParams<'a> {
    /// Walk `section_size` bytes of params at the front of `params`.
    ///
    /// A section size larger than the buffer is clamped; the param that
    /// runs past the end is then reported as [`Error::Truncated`].
    pub fn new(params: &'a [u8], section_size: usize) -> Self {
        let end = section_size.min(params.len());
        Self {
            params: &params[..end],
            offset: 0,
            done: false,
        }
    }
}

impl<'a> Iterator for TicketParams<'a> {
    type Item = Result<TicketParamRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.params.len() {
            return None;
        }

        let remaining = &self.params[self.offset..];
        match TicketParamRef::decode(remaining) {
            Ok(param) => {
                self.offset += param.encoded_len();
                Some(Ok(param))
            }
            Err(Error::BufferTooSmall { needed, have }) => {
                self.done = true;
                Some(Err(Error::Truncated {
                    offset: self.offset,
                    needed,
                    remaining: have,
                }))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for TicketParams<'_> {}

/// Parse the ticket and section headers and walk the body params
pub fn body_params(ticket: &[u8]) -> Result<TicketParams<'_>> {
    TicketHeader::decode(ticket)?;
    let start = TICKET_HEADER_SIZE;
    let section = SectionHeader::decode(&ticket[start..])?;
    if section.ty != SectionType::Body {
        return Err(Error::InvalidArgument(format!(
            "expected body section, found {:?}",
            section.ty
        )));
    }

    let body = &ticket[start + SECTION_HEADER_SIZE..];
    Ok(TicketParams::new(body, section.size as usize))
}

/// Walk the footer params that follow the body section
pub fn footer_params(ticket: &[u8]) -> Result<TicketParams<'_>> {
    let body = SectionHeader::decode(ticket.get(TICKET_HEADER_SIZE..).unwrap_or_default())?;
    let start = TICKET_HEADER_SIZE + SECTION_HEADER_SIZE + body.size as usize;
    let rest = ticket.get(start..).ok_or(Error::BufferTooSmall {
        needed: start,
        have: ticket.len(),
    })?;

    let section = SectionHeader::decode(rest)?;
    if section.ty != SectionType::Footer {
        return Err(Error::InvalidArgument(format!(
            "expected footer section, found {:?}",
            section.ty
        )));
    }

    Ok(TicketParams::new(
        &rest[SECTION_HEADER_SIZE..],
        section.size as usize,
    ))
}

/// Read the body param at `index`, `None` once the section is exhausted.
///
/// A param that fails to decode before `index` is reported rather than
/// treated as the end of the section.
pub fn read_ticket_param_at(ticket: &[u8], index: usize) -> Result<Option<TicketParamRef<'_>>> {
    for (i, param) in body_params(ticket)?.enumerate() {
        let param = param?;
        if i == index {
            return Ok(Some(param));
        }
    }
    Ok(None)
}

/// Bytes from the start of the ticket through the end of the body section
pub fn body_span(ticket: &[u8]) -> Result<usize> {
    TicketHeader::decode(ticket)?;
    let section = SectionHeader::decode(&ticket[TICKET_HEADER_SIZE..])?;
    if section.ty != SectionType::Body {
        return Err(Error::InvalidArgument(format!(
            "expected body section, found {:?}",
            section.ty
        )));
    }
    Ok(TICKET_HEADER_SIZE + SECTION_HEADER_SIZE + section.size as usize)
}

/// Encoded size of the param at the front of `buf`, read from its own
/// length field. `None` when the header or payload runs past `buf`.
fn raw_param_len(buf: &[u8]) -> Option<usize> {
    let len = u16::from_be_bytes([*buf.get(2)?, *buf.get(3)?]) as usize;
    let size = PARAM_HEADER_SIZE + len;
    (buf.len() >= size).then_some(size)
}

/// Copy the first `count` raw body params into `out`.
///
/// Params are moved by their own length fields; type codes are not
/// checked. `out` is always cleared first, even when an error is returned.
/// The copy stops at the end of the body section, before a param that runs
/// past the end of `ticket` or would not fit in `out`, and after the param
/// that reaches `ticket_len` bytes into the ticket.
///
/// Returns the number of bytes copied.
pub fn copy_ticket_params(
    ticket: &[u8],
    ticket_len: usize,
    count: usize,
    out: &mut [u8],
) -> Result<usize> {
    out.fill(0);

    if count >= MAX_TICKET_PARAMS {
        return Err(Error::InvalidArgument(format!(
            "param count {} out of range (max {})",
            count,
            MAX_TICKET_PARAMS - 1
        )));
    }

    let body_end = body_span(ticket)?.min(ticket.len());
    let mut in_ofs = TICKET_HEADER_SIZE + SECTION_HEADER_SIZE;
    let mut written = 0;

    for _ in 0..count {
        let Some(size) = ticket
            .get(in_ofs..body_end)
            .and_then(raw_param_len)
        else {
            break;
        };
        if written + size > out.len() {
            break;
        }

        out[written..written + size].copy_from_slice(&ticket[in_ofs..in_ofs + size]);
        written += size;
        in_ofs += size;

        if in_ofs >= ticket_len {
            break;
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::{ParamType, TicketParam};
    use crate::ticket::encode_section;

    fn ticket_with(params: &[TicketParam]) -> Vec<u8> {
        let mut buf = Vec::new();
        TicketHeader::new(0x0201, 0xF0).encode(&mut buf);
        encode_section(&mut buf, SectionType::Body, params);
        buf
    }

    #[test]
    fn test_walk_is_restartable() {
        let ticket = ticket_with(&[TicketParam::int(7), TicketParam::null()]);
        let walk = body_params(&ticket).unwrap();

        let first: Vec<_> = walk.clone().map(|p| p.unwrap().ty).collect();
        let second: Vec<_> = walk.map(|p| p.unwrap().ty).collect();
        assert_eq!(first, vec![ParamType::Int, ParamType::Null]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_truncated_param_reported_once() {
        let mut ticket = ticket_with(&[TicketParam::ascii(b"abcdef", 6)]);
        ticket.truncate(ticket.len() - 2);

        let mut walk = body_params(&ticket).unwrap();
        assert!(matches!(walk.next(), Some(Err(Error::Truncated { offset: 0, .. }))));
        assert!(walk.next().is_none());
    }

    #[test]
    fn test_section_size_bounds_walk() {
        let mut ticket = ticket_with(&[TicketParam::int(1)]);
        // trailing bytes outside the section are never visited
        TicketParam::int(2).encode(&mut ticket);

        let values: Vec<_> = body_params(&ticket)
            .unwrap()
            .map(|p| p.unwrap().as_u32())
            .collect();
        assert_eq!(values, vec![Some(1)]);
    }

    #[test]
    fn test_rejects_footer_in_body_position() {
        let mut buf = Vec::new();
        TicketHeader::new(0x0201, 0xF0).encode(&mut buf);
        encode_section(&mut buf, SectionType::Footer, &[]);
        assert!(matches!(body_params(&buf), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_copy_clears_output_on_error() {
        let ticket = ticket_with(&[TicketParam::int(1)]);
        let mut out = [0xAAu8; 16];
        let result = copy_ticket_params(&ticket, ticket.len(), MAX_TICKET_PARAMS, &mut out);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert_eq!(out, [0u8; 16]);
    }

    #[test]
    fn test_read_reports_truncation_before_index() {
        let mut ticket = ticket_with(&[TicketParam::int(1), TicketParam::ascii(b"abcdef", 6)]);
        ticket.truncate(ticket.len() - 2);

        assert_eq!(read_ticket_param_at(&ticket, 0).unwrap().unwrap().as_u32(), Some(1));
        assert!(matches!(
            read_ticket_param_at(&ticket, 1),
            Err(Error::Truncated { offset: 8, .. })
        ));
        assert!(matches!(
            read_ticket_param_at(&ticket, 3),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn test_read_reports_unknown_type_before_index() {
        let mut ticket = ticket_with(&[
            TicketParam::int(1),
            TicketParam::int(9),
            TicketParam::int(2),
        ]);
        // retag the middle param with a code the decoder does not know
        ticket[20..22].copy_from_slice(&[0x30, 0x01]);

        assert_eq!(
            read_ticket_param_at(&ticket, 2),
            Err(Error::UnknownParamType(0x3001))
        );
        // the index past the end is still an error, not end of params
        assert_eq!(
            read_ticket_param_at(&ticket, 5),
            Err(Error::UnknownParamType(0x3001))
        );
    }

    #[test]
    fn test_copy_ignores_type_codes() {
        let mut ticket = ticket_with(&[
            TicketParam::int(1),
            TicketParam::int(9),
            TicketParam::int(2),
        ]);
        ticket[20..22].copy_from_slice(&[0x30, 0x01]);

        let mut out = [0u8; 64];
        let written = copy_ticket_params(&ticket, ticket.len(), 3, &mut out).unwrap();
        assert_eq!(written, 24);
        assert_eq!(&out[..24], &ticket[12..36]);
    }

    #[test]
    fn test_copy_stops_at_short_param() {
        let mut ticket = ticket_with(&[TicketParam::int(1), TicketParam::ascii(b"abcdef", 6)]);
        ticket.truncate(ticket.len() - 2);

        let mut out = [0u8; 32];
        let written = copy_ticket_params(&ticket, 246, 5, &mut out).unwrap();
        assert_eq!(written, 8);
        assert_eq!(&out[..8], &ticket[12..20]);
    }

    #[test]
    fn test_copy_stops_after_declared_length() {
        let ticket = ticket_with(&[
            TicketParam::int(1),
            TicketParam::int(2),
            TicketParam::int(3),
        ]);

        // 12 + 8 reaches 16; the param crossing the limit is still copied
        let mut out = [0u8; 32];
        let written = copy_ticket_params(&ticket, 16, 3, &mut out).unwrap();
        assert_eq!(written, 8);

        let written = copy_ticket_params(&ticket, 21, 3, &mut out).unwrap();
        assert_eq!(written, 16);
    }

    #[test]
    fn test_body_span() {
        let ticket = ticket_with(&[TicketParam::int(1), TicketParam::null()]);
        assert_eq!(body_span(&ticket), Ok(12 + 8 + 4));
        assert!(body_span(&ticket[..8]).is_err());
    }

    #[test]
    fn test_copy_stops_before_overflow() {
        let ticket = ticket_with(&[TicketParam::int(1), TicketParam::long(2)]);
        let mut out = [0u8; 10];
        let written = copy_ticket_params(&ticket, ticket.len(), 2, &mut out).unwrap();
        assert_eq!(written, 8);
        assert_eq!(&out[..8], &[0x00, 0x01, 0x00, 0x04, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(&out[8..], &[0, 0]);
    }
}
