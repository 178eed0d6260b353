//! NP Auth
//!
//! Request and callback plumbing for NP auth emulation:
//! - Handler registration with dedup and smallest-free ids ([`HandlerRegistry`])
//! - FIFO completion events with cancellation ([`EventQueue`])
//! - Pool usage accounting ([`MemoryStat`])
//! - Login ticket delivery into guest memory ([`NpAuth::get_ticket`])
//!
//! # Example
//!
//! ```ignore
//! let auth = NpAuth::new(NpAuthConfig::default())?;
//! auth.init(0x10000, 0, 0);
//!
//! let request_id = auth.create_start_request(&mem, param_addr)?;
//!
//! // once per host tick
//! while auth.drain_and_dispatch_one(&scheduler) {}
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod memstat;
pub mod registry;
pub mod request;

pub use auth::NpAuth;
pub use config::NpAuthConfig;
pub use error::{AuthError, Result};
pub use events::{AuthEvent, EventQueue};
pub use host::{Clock, GuestCall, GuestMemory, NoticeKind, Notifier, Scheduler, SystemClock};
pub use memstat::MemoryStat;
pub use registry::{AuthHandler, HandlerRegistry};
pub use request::{StartRequestParams, TicketVersion};
