//! NP Auth Core
//!
//! Binary encoding for NP login tickets.
//!
//! This crate provides:
//! - Tagged length-value params ([`TicketParam`], [`ParamType`])
//! - Ticket and section headers ([`TicketHeader`], [`SectionHeader`])
//! - Login ticket assembly ([`LoginTicket`], [`build_login_ticket`])
//! - Body param walking ([`TicketParams`], [`read_ticket_param_at`])
//!
//! All multi-byte integers on the wire are big-endian. Payload bytes are
//! copied verbatim.

pub mod error;
pub mod param;
pub mod reader;
pub mod section;
pub mod ticket;

pub use error::{Error, Result};
pub use param::{
    encode_param, encode_string_param, encode_u32_param, encode_u64_param, ParamType,
    TicketParam, TicketParamRef,
};
pub use reader::{
    body_params, body_span, copy_ticket_params, footer_params, read_ticket_param_at,
    TicketParams,
};
pub use section::{SectionHeader, SectionType, TicketHeader};
pub use ticket::{
    build_login_ticket, code_field, encode_login_ticket, encode_section, status_bits, LoginTicket,
};

/// Ticket format version 2.1
pub const TICKET_VERSION: u16 = 0x0201;

/// Reserved body capacity recorded in the ticket header
pub const TICKET_BODY_CAPACITY: u32 = 0xF0;

/// Length reported to callers: reserved capacity plus the ticket header
pub const TICKET_LENGTH: usize = TICKET_BODY_CAPACITY as usize + section::TICKET_HEADER_SIZE;

/// Bytes actually touched by the fixed login ticket layout
pub const TICKET_BUFFER_SIZE: usize = 250;

/// Validity window between the two issue dates (10 minutes)
pub const TICKET_VALIDITY_MS: u64 = 10 * 60 * 1000;

/// Highest param count accepted by [`copy_ticket_params`]
pub const MAX_TICKET_PARAMS: usize = 12;

/// Size of the output block filled by [`copy_ticket_params`]
pub const PARAM_BUFFER_SIZE: usize = 256;
