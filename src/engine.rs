//! Command Engine: the at-most-one-inflight AT command dialog.
//!
//! The engine itself does not own an event loop — the driver actor
//! (`crate::actor`) does — it only defines the command descriptor and the
//! single-cell inflight slot the actor arms and completes.

use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;
use tracing::trace;

use crate::error::{Error, Result};
use crate::pattern::Pattern;

/// Outbound payload for a command. Text payloads get a trailing CR; binary
/// payloads are written verbatim (used for the `SBDWB` write and for the
/// payload-plus-checksum frame it expects after `READY`).
#[derive(Debug, Clone)]
pub(crate) enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

/// A single AT command dialog: what to send, how to recognize its end, which
/// lines to keep, and how long to wait.
pub(crate) struct CommandSpec {
    pub(crate) payload: Payload,
    pub(crate) end_pattern: Option<Pattern>,
    pub(crate) keep_pattern: Option<Pattern>,
    pub(crate) timeout: Option<Duration>,
}

impl CommandSpec {
    pub(crate) fn text(payload: impl Into<String>, end_pattern: Pattern, timeout: Option<Duration>) -> Self {
        Self {
            payload: Payload::Text(payload.into()),
            end_pattern: Some(end_pattern),
            keep_pattern: None,
            timeout,
        }
    }

    pub(crate) fn binary(payload: Vec<u8>, end_pattern: Pattern, timeout: Option<Duration>) -> Self {
        Self {
            payload: Payload::Binary(payload),
            end_pattern: Some(end_pattern),
            keep_pattern: None,
            timeout,
        }
    }

    pub(crate) fn keep(mut self, keep_pattern: Pattern) -> Self {
        self.keep_pattern = Some(keep_pattern);
        self
    }
}

/// Writes a command's payload to the transport. Text payloads are
/// CR-terminated; byte payloads (the SBDWB write frame) go out as-is.
pub(crate) async fn write_payload<T: AsyncWrite + Unpin>(transport: &mut T, payload: &Payload) -> std::io::Result<()> {
    match payload {
        Payload::Text(s) => {
            trace!(command = %s, "writing AT command");
            transport.write_all(s.as_bytes()).await?;
            transport.write_all(b"\r").await?;
        }
        Payload::Binary(bytes) => {
            trace!(len = bytes.len(), "writing binary frame");
            transport.write_all(bytes).await?;
        }
    }
    transport.flush().await
}

/// The single-cell inflight slot. At most one of these exists at a time;
/// the actor holds it as `Option<Inflight>`.
pub(crate) struct Inflight {
    pub(crate) end_pattern: Option<Pattern>,
    pub(crate) keep_pattern: Option<Pattern>,
    body: String,
    completion: Option<oneshot::Sender<Result<String>>>,
}

impl Inflight {
    pub(crate) fn new(spec: &CommandSpec, completion: oneshot::Sender<Result<String>>) -> Self {
        Self {
            end_pattern: spec.end_pattern.clone(),
            keep_pattern: spec.keep_pattern.clone(),
            body: String::new(),
            completion: Some(completion),
        }
    }

    /// Appends a retained line (with its LF restored) to the response body.
    pub(crate) fn push_line(&mut self, line: &str) {
        self.body.push_str(line);
        self.body.push('\n');
    }

    /// Completes the slot successfully with the collected body. Invoked at
    /// most once; a second call is a no-op (the slot should already have
    /// been cleared by the first).
    pub(crate) fn complete_ok(mut self) {
        if let Some(tx) = self.completion.take() {
            let _ = tx.send(Ok(self.body));
        }
    }

    pub(crate) fn complete_err(mut self, err: Error) {
        if let Some(tx) = self.completion.take() {
            let _ = tx.send(Err(err));
        }
    }
}

impl Drop for Inflight {
    fn drop(&mut self) {
        // A slot dropped without completing is an actor-loop bug (shutdown
        // notwithstanding, where the receiver is simply gone and send fails
        // silently, which is fine).
        if let Some(tx) = self.completion.take() {
            let _ = tx.send(Err(Error::ActorShutDown));
        }
    }
}
