//! Per-request body and continue-handshake bookkeeping.
//!
//! # Responsibilities
//! - Track the `100 Continue` handshake
//! - Track how far the request body has been consumed
//! - Record that the response has begun, after which the body is off limits
//!
//! # Design Decisions
//! - Explicit enums with total transition functions
//! - Stored as atomics so the driver and the body reader can share one
//!   `Exchange` without a lock
//! - Advisory: the driver decides from `needs_drain` whether an unread body
//!   must be drained before the next response on the connection

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// State of the `100 Continue` handshake.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueState {
    /// Client did not ask for `100 Continue`.
    NotExpected = 0,
    /// Client asked; nothing sent yet.
    Expected = 1,
    /// Interim response written.
    Sent = 2,
    /// Interim response could not be written.
    FailedToSend = 3,
}

impl ContinueState {
    /// Initial state from the `Expect` header.
    pub fn initial(expect: Option<&str>) -> Self {
        match expect {
            Some(v) if v.trim().eq_ignore_ascii_case("100-continue") => ContinueState::Expected,
            _ => ContinueState::NotExpected,
        }
    }

    /// Transition after the driver tried to send the interim response.
    pub fn on_send_result(self, sent: bool) -> Self {
        match (self, sent) {
            (ContinueState::Expected, true) => ContinueState::Sent,
            (ContinueState::Expected, false) => ContinueState::FailedToSend,
            (other, _) => other,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ContinueState::Sent | ContinueState::FailedToSend)
    }
}

impl From<u8> for ContinueState {
    fn from(val: u8) -> Self {
        match val {
            1 => ContinueState::Expected,
            2 => ContinueState::Sent,
            3 => ContinueState::FailedToSend,
            _ => ContinueState::NotExpected,
        }
    }
}

/// How far the request body has been consumed.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyState {
    /// Request has no entity.
    NoBody = 0,
    /// Body present, not touched yet.
    Unread = 1,
    /// At least one read attempted.
    Reading = 2,
    /// Body exhausted or closed.
    Consumed = 3,
}

/// Events observed on the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEvent {
    ReadStarted,
    Exhausted,
    Closed,
}

impl BodyState {
    /// Initial state. A body statically known to be empty starts consumed.
    pub fn initial(has_entity: bool, content_length: Option<u64>) -> Self {
        match (has_entity, content_length) {
            (false, _) => BodyState::NoBody,
            (true, Some(0)) => BodyState::Consumed,
            (true, _) => BodyState::Unread,
        }
    }

    pub fn on(self, event: BodyEvent) -> Self {
        match (self, event) {
            (BodyState::Unread, BodyEvent::ReadStarted) => BodyState::Reading,
            (BodyState::Unread | BodyState::Reading, BodyEvent::Exhausted | BodyEvent::Closed) => {
                BodyState::Consumed
            }
            (state, _) => state,
        }
    }
}

impl From<u8> for BodyState {
    fn from(val: u8) -> Self {
        match val {
            1 => BodyState::Unread,
            2 => BodyState::Reading,
            3 => BodyState::Consumed,
            _ => BodyState::NoBody,
        }
    }
}

/// Shared bookkeeping for one request/response exchange.
#[derive(Debug)]
pub struct Exchange {
    continue_state: AtomicU8,
    body_state: AtomicU8,
    responded: AtomicBool,
}

impl Exchange {
    pub fn new(continue_state: ContinueState, body_state: BodyState) -> Self {
        Self {
            continue_state: AtomicU8::new(continue_state as u8),
            body_state: AtomicU8::new(body_state as u8),
            responded: AtomicBool::new(false),
        }
    }

    /// Set the initial states once the request head is complete.
    pub(crate) fn start(&self, continue_state: ContinueState, body_state: BodyState) {
        self.continue_state
            .store(continue_state as u8, Ordering::Release);
        self.body_state.store(body_state as u8, Ordering::Release);
    }

    pub fn continue_state(&self) -> ContinueState {
        ContinueState::from(self.continue_state.load(Ordering::Acquire))
    }

    pub fn body_state(&self) -> BodyState {
        BodyState::from(self.body_state.load(Ordering::Acquire))
    }

    /// Record the outcome of sending `100 Continue`.
    pub fn record_continue(&self, sent: bool) -> ContinueState {
        transition(&self.continue_state, |s| {
            ContinueState::from(s).on_send_result(sent) as u8
        })
        .into()
    }

    /// Apply a body event, returning the new state.
    pub fn record_body(&self, event: BodyEvent) -> BodyState {
        transition(&self.body_state, |s| BodyState::from(s).on(event) as u8).into()
    }

    /// Mark that the response has begun. Irreversible.
    pub fn mark_responded(&self) {
        self.responded.store(true, Ordering::Release);
    }

    pub fn is_responded(&self) -> bool {
        self.responded.load(Ordering::Acquire)
    }

    /// True when a body exists that nobody has finished reading.
    pub fn needs_drain(&self) -> bool {
        matches!(self.body_state(), BodyState::Unread | BodyState::Reading)
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new(ContinueState::NotExpected, BodyState::NoBody)
    }
}

fn transition(cell: &AtomicU8, f: impl Fn(u8) -> u8) -> u8 {
    let mut prev = cell.load(Ordering::Acquire);
    loop {
        let next = f(prev);
        if next == prev {
            return prev;
        }
        match cell.compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => return next,
            Err(actual) => prev = actual,
        }
    }
}
