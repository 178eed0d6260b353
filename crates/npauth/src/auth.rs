//! Auth context
//!
//! [`NpAuth`] owns everything the auth module keeps between calls: the
//! handler registry, the pending event queue, the pool accounting and the
//! identity that goes into tickets. All of it sits behind one lock, and no
//! host collaborator is called while that lock is held.
//!
//! Request flow:
//! 1. [`create_start_request`](NpAuth::create_start_request) registers the
//!    guest callback and queues one completion event.
//! 2. The host pump calls [`drain_and_dispatch_one`](NpAuth::drain_and_dispatch_one)
//!    until it returns `false`; each event becomes a guest call.
//! 3. The callback asks for the ticket with [`get_ticket`](NpAuth::get_ticket).

use npauth_core::section::{SECTION_HEADER_SIZE, TICKET_HEADER_SIZE};
use npauth_core::ticket::TICKET_ENCODED_SIZE;
use npauth_core::{
    body_span, build_login_ticket, code_field, copy_ticket_params, LoginTicket,
    PARAM_BUFFER_SIZE, TICKET_BUFFER_SIZE, TICKET_LENGTH,
};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::events::{AuthEvent, EventQueue};
use crate::host::{Clock, GuestMemory, NoticeKind, Notifier, Scheduler, SystemClock};
use crate::memstat::{MemoryStat, MEMORY_STAT_SIZE};
use crate::registry::{AuthHandler, HandlerRegistry};
use crate::request::StartRequestParams;
use crate::{AuthError, NpAuthConfig, Result};

/// Ticket and body section headers
const BODY_PARAMS_OFFSET: usize = TICKET_HEADER_SIZE + SECTION_HEADER_SIZE;

/// Notice shown when a ticket is requested without an online id
pub const MISSING_ONLINE_ID_NOTICE: &str =
    "To play in Infrastructure Mode, you must enter a username";

#[derive(Debug, Default)]
struct AuthState {
    initialized: bool,
    mem_stat: MemoryStat,
    handlers: HandlerRegistry,
    events: EventQueue,
    online_id: String,
    service_id: String,
}

/// NP auth context
pub struct NpAuth {
    config: NpAuthConfig,
    clock: Box<dyn Clock>,
    state: Mutex<AuthState>,
}

impl NpAuth {
    pub fn new(config: NpAuthConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Create with a specific clock for ticket issue dates
    pub fn with_clock(config: NpAuthConfig, clock: impl Clock + 'static) -> Result<Self> {
        config.validate()?;
        let state = AuthState {
            online_id: config.online_id.clone(),
            ..Default::default()
        };

        Ok(Self {
            config,
            clock: Box::new(clock),
            state: Mutex::new(state),
        })
    }

    pub fn config(&self) -> &NpAuthConfig {
        &self.config
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start the module: record pool accounting and drop stale events
    pub fn init(&self, pool_size: u32, stack_size: u32, thread_prio: u32) {
        let mut state = self.state.lock();
        state.mem_stat = MemoryStat::from_pool(pool_size);
        state.events.clear();
        state.initialized = true;
        warn!(
            "NpAuthInit(pool={:08x}, stack={:08x}, prio={})",
            pool_size, stack_size, thread_prio
        );
    }

    /// Stop the module. Registered handlers survive until destroyed.
    pub fn term(&self) {
        self.state.lock().initialized = false;
        warn!("NpAuthTerm");
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    // =========================================================================
    // Accounting
    // =========================================================================

    /// Zeroed until the first `init`
    pub fn memory_stat(&self) -> MemoryStat {
        self.state.lock().mem_stat
    }

    pub fn write_memory_stat(&self, mem: &mut impl GuestMemory, addr: u32) -> Result<()> {
        if !mem.is_valid_range(addr, MEMORY_STAT_SIZE) {
            error!("NpAuthGetMemoryStat: invalid address {:08x}", addr);
            return Err(AuthError::InvalidArgument(format!("memory stat at {:08x}", addr)));
        }

        let stat = self.memory_stat();
        mem.write_bytes(addr, &stat.to_guest_bytes());
        Ok(())
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Start an auth request.
    ///
    /// Returns the request id, or 0 when the block carries no ticket
    /// callback (nothing is registered or queued then).
    pub fn create_start_request(&self, mem: &impl GuestMemory, param_addr: u32) -> Result<u32> {
        let params = StartRequestParams::read_from(mem, param_addr).map_err(|e| {
            error!("NpAuthCreateStartRequest: {}", e);
            e
        })?;

        let service_id = mem.read_c_string(params.service_id_addr).unwrap_or_default();
        let entitlement_id = mem.read_c_string(params.entitlement_id_addr);
        let cookie = mem.read_c_string(params.cookie_addr);

        info!(
            "NpAuthCreateStartRequest - Max Version: {}.{}",
            params.version.major, params.version.minor
        );
        info!("NpAuthCreateStartRequest - Service ID: {}", service_id);
        info!(
            "NpAuthCreateStartRequest - Entitlement ID: {}",
            entitlement_id.as_deref().unwrap_or("N/A")
        );
        info!(
            "NpAuthCreateStartRequest - Consumed Count: {}",
            params.consumed_count
        );
        info!(
            "NpAuthCreateStartRequest - Cookie (size = {}): {}",
            params.cookie_size,
            cookie.as_deref().unwrap_or("N/A")
        );

        let entry_point_valid = params
            .ticket_callback()
            .map(|entry_point| mem.is_valid_address(entry_point))
            .unwrap_or(false);

        let mut state = self.state.lock();
        state.service_id = service_id;

        let Some(entry_point) = params.ticket_callback() else {
            warn!("NpAuthCreateStartRequest: no ticket callback, nothing queued");
            return Ok(0);
        };

        let handler_id = state
            .handlers
            .register(entry_point, params.cb_arg_addr, entry_point_valid);
        let request_id = handler_id + 1;

        state.events.push(AuthEvent::new(
            request_id,
            TICKET_LENGTH as u32,
            params.event_argument(),
        ));

        warn!("NpAuthCreateStartRequest -> request {}", request_id);
        Ok(request_id)
    }

    /// Drop queued, undelivered events of a request
    pub fn abort_request(&self, request_id: u32) -> usize {
        let cancelled = self.state.lock().events.cancel_by_request(request_id);
        warn!(
            "NpAuthAbortRequest({}): {} pending event(s) cancelled",
            request_id, cancelled
        );
        cancelled
    }

    /// Tear down a request's handler. A missing handler is logged, not
    /// returned.
    pub fn destroy_request(&self, request_id: u32) -> Result<()> {
        let removed = match request_id.checked_sub(1) {
            Some(handler_id) => self.state.lock().handlers.unregister(handler_id),
            None => Err(AuthError::NotFound(format!("request {}", request_id))),
        };

        match removed {
            Ok(_) => warn!("NpAuthDestroyRequest: Deleted handler {}", request_id - 1),
            Err(e) => error!("NpAuthDestroyRequest: Invalid request ID {}: {}", request_id, e),
        }
        Ok(())
    }

    // =========================================================================
    // Tickets
    // =========================================================================

    /// Write a login ticket to guest memory.
    ///
    /// Clears `length` bytes at `buffer_addr` and writes the ticket over
    /// them. The encoded header, body and footer are always written; the
    /// reserved zero tail only up to `length`. Returns the declared ticket
    /// length, which is fixed.
    pub fn get_ticket(
        &self,
        mem: &mut impl GuestMemory,
        notifier: &impl Notifier,
        request_id: u32,
        buffer_addr: u32,
        length: u32,
    ) -> Result<usize> {
        let write_len = (length as usize).clamp(TICKET_ENCODED_SIZE, TICKET_BUFFER_SIZE);
        let span = (length as usize).max(write_len);
        if !mem.is_valid_range(buffer_addr, span) {
            error!("NpAuthGetTicket: invalid buffer {:08x}", buffer_addr);
            return Err(AuthError::InvalidArgument(format!(
                "ticket buffer at {:08x}",
                buffer_addr
            )));
        }

        let ticket = self.login_ticket();
        if ticket.online_id.is_empty() {
            notifier.show_message(
                NoticeKind::Error,
                MISSING_ONLINE_ID_NOTICE,
                self.config.notice_duration(),
            );
            error!("NpAuthGetTicket: Missing online id");
            return Err(AuthError::ConfigurationMissing("online id".to_string()));
        }

        mem.fill(buffer_addr, 0, length as usize);

        let mut buf = [0u8; TICKET_BUFFER_SIZE];
        let ticket_len = build_login_ticket(&mut buf, &ticket)?;
        mem.write_bytes(buffer_addr, &buf[..write_len]);

        warn!(
            "NpAuthGetTicket(request={}, buffer={:08x}, length={}) -> {}",
            request_id, buffer_addr, length, ticket_len
        );
        Ok(ticket_len)
    }

    /// Copy the first `count` raw body params of a guest ticket into the
    /// 256-byte block at `out_addr`. The block is cleared even on error.
    pub fn get_ticket_param(
        &self,
        mem: &mut impl GuestMemory,
        ticket_addr: u32,
        ticket_len: u32,
        count: i32,
        out_addr: u32,
    ) -> Result<usize> {
        if !mem.is_valid_range(out_addr, PARAM_BUFFER_SIZE) {
            return Err(AuthError::InvalidArgument(format!(
                "param buffer at {:08x}",
                out_addr
            )));
        }
        mem.fill(out_addr, 0, PARAM_BUFFER_SIZE);

        let count = usize::try_from(count)
            .map_err(|_| AuthError::InvalidArgument(format!("param count {}", count)))?;

        let bad_ticket = || AuthError::InvalidArgument(format!("ticket at {:08x}", ticket_addr));

        // `ticket_len` only bounds the copy; the walk reads the whole body
        let head = mem
            .read_bytes(ticket_addr, BODY_PARAMS_OFFSET)
            .ok_or_else(bad_ticket)?;
        let span = body_span(head)?;

        let mut out = [0u8; PARAM_BUFFER_SIZE];
        let written = {
            let ticket = mem.read_bytes(ticket_addr, span).ok_or_else(bad_ticket)?;
            copy_ticket_params(ticket, ticket_len as usize, count, &mut out)?
        };

        mem.write_bytes(out_addr, &out[..written]);
        debug!(
            "NpAuthGetTicketParam: {} param(s), {} bytes copied",
            count, written
        );
        Ok(written)
    }

    fn login_ticket(&self) -> LoginTicket {
        let (online_id, service_id) = {
            let state = self.state.lock();
            (state.online_id.clone(), state.service_id.clone())
        };

        LoginTicket {
            online_id,
            country_code: code_field(&self.config.country_code),
            region_code: code_field(&self.config.region_code),
            service_id,
            issued_at_ms: self.clock.now_millis(),
            user_age: self.config.user_age,
            parental_control: self.config.parental_control,
        }
    }

    // =========================================================================
    // Event pump
    // =========================================================================

    /// Deliver the oldest pending event.
    ///
    /// Returns `false` when nothing was queued. An event whose handler is
    /// gone is consumed without a call. Hosts call this repeatedly, once per
    /// tick, until it returns `false`.
    pub fn drain_and_dispatch_one(&self, scheduler: &impl Scheduler) -> bool {
        let (event, handler) = {
            let mut state = self.state.lock();
            let Some(event) = state.events.pop_front() else {
                return false;
            };
            let handler = event
                .handler_id()
                .and_then(|id| state.handlers.get(id).copied());
            (event, handler)
        };

        match handler {
            Some(handler) => {
                debug!(
                    "NpAuthCallback [HandlerID={}][RequestID={}][Result={}][ArgsPtr={:08x}]",
                    event.request_id - 1,
                    event.request_id,
                    event.result,
                    handler.argument
                );
                scheduler.enqueue_call(handler.entry_point, &event.args());
            }
            None => debug!(
                "NpAuth event for request {} has no handler, dropped",
                event.request_id
            ),
        }
        true
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn online_id(&self) -> String {
        self.state.lock().online_id.clone()
    }

    /// Replace the identity used for new tickets
    pub fn set_online_id(&self, online_id: impl Into<String>) {
        self.state.lock().online_id = online_id.into();
    }

    /// Service id from the most recent start request
    pub fn service_id(&self) -> String {
        self.state.lock().service_id.clone()
    }

    pub fn handler(&self, handler_id: u32) -> Option<AuthHandler> {
        self.state.lock().handlers.get(handler_id).copied()
    }

    pub fn handler_count(&self) -> usize {
        self.state.lock().handlers.len()
    }

    /// Snapshot of queued events, oldest first
    pub fn pending_events(&self) -> Vec<AuthEvent> {
        self.state.lock().events.iter().copied().collect()
    }
}
