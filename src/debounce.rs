//! Last-request-wins sequencing for debounced lookups.
//!
//! Word-lookup-as-you-type and reference resolution issue a network request
//! per keystroke; only the most recent request's response may be applied.
//! Instead of a shared "last input" variable, callers take a ticket per
//! request and check it when the response arrives: stale responses are
//! dropped, never queued.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic ticket source for one debounced input surface.
#[derive(Debug, Default)]
pub struct RequestSequence {
    counter: AtomicU64,
}

/// Ticket identifying one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket(u64);

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next ticket, invalidating all previously issued ones.
    pub fn issue(&self) -> RequestTicket {
        RequestTicket(self.counter.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// True while `ticket` is the most recently issued one.
    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.counter.load(Ordering::Relaxed) == ticket.0
    }

    /// Passes `response` through only when its originating request is still
    /// the newest; stale responses become `None`.
    pub fn accept<T>(&self, ticket: RequestTicket, response: T) -> Option<T> {
        self.is_current(ticket).then_some(response)
    }
}
