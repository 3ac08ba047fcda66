//! Session state data types shared between the driver actor and its public
//! handle. The state machine itself (§4.5) lives in `crate::actor`, which is
//! the only place these fields are mutated.

/// What, if anything, is waiting to go out or come back. `None` (absence of
/// this state, not a variant of it) means no MO session is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub(crate) enum MessagePending {
    Mo,
    MoMt,
}

/// Per-driver session counters (§3 "Session state"), living for the life of
/// the actor task.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) message_pending: Option<MessagePending>,
    /// Set for the duration of a `run_mo_session` call (write-buffer through
    /// the final buffer clear) and cleared on every exit path, success or
    /// error. The actor only ever runs one MO session at a time, so nothing
    /// ever observes this as contended; it exists to make that invariant an
    /// assertable fact rather than an implicit property of the call graph.
    pub(crate) mo_lock: bool,
    /// Last known count of MT messages still queued at the gateway.
    pub(crate) pending: u32,
    /// Current MO retry attempt count, reset on success or final failure.
    pub(crate) attempt: u32,
}

/// The payload an MO send cycle is carrying. Mailbox-only checks use
/// `Text(String::new())`, which — per §4.5 — falls through to `AT+SBDD0`.
#[derive(Debug, Clone)]
pub(crate) enum MoPayload {
    Text(String),
    Binary(Vec<u8>),
}

/// Result of a completed mailbox send/check cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxOutcome {
    /// Mobile-originated sequence number assigned by the gateway.
    pub momsn: u32,
    /// Number of MT messages still queued at the gateway after this cycle.
    pub mtqueued: u32,
}
