//! Public driver handle and its type-state builder: connection parameters
//! are pinned on the builder before the actor and its transport are
//! constructed, so a half-configured driver can never be opened.

use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

use crate::actor::{Actor, Request};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{Event, Handler};
use crate::session::MailboxOutcome;
use crate::transport::{self, Port};

const REQUEST_QUEUE_DEPTH: usize = 32;

/// Marker: the port has not been named yet.
pub struct NoPort;
/// Marker: a serial device path has been set.
pub struct WithPort;

/// Builds a [`Config`] and opens a [`Driver`] against it. The type parameter
/// tracks whether a port has been named, so `build`/`open` are only callable
/// once one has.
pub struct DriverBuilder<State = NoPort> {
    config: Config,
    handlers: Vec<Handler>,
    _state: PhantomData<State>,
}

impl Default for DriverBuilder<NoPort> {
    fn default() -> Self {
        Self { config: Config::default(), handlers: Vec::new(), _state: PhantomData }
    }
}

impl DriverBuilder<NoPort> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the serial device to open, e.g. `/dev/ttyUSB0`.
    pub fn port(self, port: impl Into<String>) -> DriverBuilder<WithPort> {
        DriverBuilder {
            config: Config { port: port.into(), ..self.config },
            handlers: self.handlers,
            _state: PhantomData,
        }
    }
}

impl<State> DriverBuilder<State> {
    /// Registers an event handler before the driver is opened, so it is in
    /// place in time to observe the `Initialized` event the init sequence
    /// publishes. Handlers registered later via [`Driver::on_event`] run
    /// after this one, in registration order, but miss anything published
    /// before they were added.
    pub fn on_event<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn baudrate(mut self, baudrate: u32) -> Self {
        self.config.baudrate = baudrate;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    pub fn default_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    pub fn simple_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.simple_timeout = timeout;
        self
    }

    pub fn max_wait(mut self, max_wait: Option<std::time::Duration>) -> Self {
        self.config.max_wait = max_wait;
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.max_attempts = max_attempts;
        self
    }

    pub fn flow_control(mut self, flow_control: bool) -> Self {
        self.config.flow_control = flow_control;
        self
    }
}

impl DriverBuilder<WithPort> {
    /// Opens the configured serial port and spawns the driver actor,
    /// running the init sequence (§4.5.3) before returning. An init failure
    /// is surfaced here as an `Err`, not just logged — the caller never
    /// receives a `Driver` that failed to initialize.
    pub async fn open(self) -> Result<Driver> {
        let port = transport::open_serial(&self.config).map_err(Error::Io)?;
        Driver::open_with_transport(self.config, port, self.handlers).await
    }
}

/// A handle to a running driver actor. Cheaply `Clone`; every clone talks to
/// the same underlying actor task over its request channel.
#[derive(Clone)]
pub struct Driver {
    tx: mpsc::Sender<Request>,
    /// The actor task's join handle, shared across clones so whichever one
    /// calls `close()` first can await the actor's exit (and, with it, the
    /// transport's drop). `None` once some clone has already taken and
    /// awaited it.
    join: Arc<AsyncMutex<Option<JoinHandle<()>>>>,
}

impl Driver {
    /// Starts building a driver for the named serial device.
    pub fn builder() -> DriverBuilder<NoPort> {
        DriverBuilder::new()
    }

    /// Opens a driver over an arbitrary [`Port`] (a real serial port or, in
    /// tests, an in-memory duplex stream), running the init sequence before
    /// returning.
    pub(crate) async fn open_with_transport<T: Port + 'static>(
        config: Config,
        port: T,
        handlers: Vec<Handler>,
    ) -> Result<Driver> {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        let (ready_tx, ready_rx) = oneshot::channel();

        let actor = Actor::new(port, config, tx.clone(), handlers);
        let handle = tokio::spawn(actor.run(rx, ready_tx));

        ready_rx.await.map_err(|_| Error::ActorShutDown)??;
        Ok(Driver { tx, join: Arc::new(AsyncMutex::new(Some(handle))) })
    }

    /// Closes the driver: sends the shutdown request, then awaits the actor
    /// task's exit so the transport is guaranteed dropped before this
    /// returns. Any request already queued completes first. Safe to call
    /// from more than one clone; only the first call actually waits on the
    /// join, later calls just send the (now redundant) shutdown request and
    /// return immediately.
    pub async fn close(&self) {
        let _ = self.tx.send(Request::Shutdown).await;
        let handle = self.join.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Sends a text mobile-originated message (`AT+SBDWT`) and runs a full
    /// mailbox session (§4.5), returning the MOMSN assigned by the gateway.
    pub async fn send_message(&self, text: impl Into<String>) -> Result<u32> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::SendMessage { text: text.into(), reply })
            .await
            .map_err(|_| Error::ActorShutDown)?;
        rx.await.map_err(|_| Error::ActorShutDown)?
    }

    /// Sends a binary mobile-originated message (`AT+SBDWB`) and runs a full
    /// mailbox session, returning the MOMSN assigned by the gateway.
    pub async fn send_binary_message(&self, bytes: impl Into<Vec<u8>>) -> Result<u32> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::SendBinaryMessage { bytes: bytes.into(), reply })
            .await
            .map_err(|_| Error::ActorShutDown)?;
        rx.await.map_err(|_| Error::ActorShutDown)?
    }

    /// Runs a mailbox session with no outbound payload, to check for and
    /// retrieve any queued mobile-terminated message.
    pub async fn mailbox_check(&self) -> Result<MailboxOutcome> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Request::MailboxCheck { reply }).await.map_err(|_| Error::ActorShutDown)?;
        rx.await.map_err(|_| Error::ActorShutDown)?
    }

    /// Queries current signal quality via `AT+CSQ`, 0 to 5 bars.
    pub async fn signal_quality(&self) -> Result<u8> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Request::SignalQuality { reply }).await.map_err(|_| Error::ActorShutDown)?;
        rx.await.map_err(|_| Error::ActorShutDown)?
    }

    /// Queries the modem's real-time clock via `AT+CCLK?`.
    pub async fn system_time(&self) -> Result<chrono::DateTime<chrono::Utc>> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Request::SystemTime { reply }).await.map_err(|_| Error::ActorShutDown)?;
        rx.await.map_err(|_| Error::ActorShutDown)?
    }

    /// Queries Iridium network time via `AT-MSSTM`.
    pub async fn network_time(&self) -> Result<chrono::DateTime<chrono::Utc>> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Request::NetworkTime { reply }).await.map_err(|_| Error::ActorShutDown)?;
        rx.await.map_err(|_| Error::ActorShutDown)?
    }

    /// Registers a handler for driver events (§4.6). Handlers run
    /// synchronously on the actor's task in registration order and must not
    /// block.
    pub async fn on_event<F>(&self, handler: F) -> Result<()>
    where
        F: FnMut(&Event) + Send + 'static,
    {
        let handler: Handler = Box::new(handler);
        self.tx
            .send(Request::Subscribe { handler })
            .await
            .map_err(|_| Error::ActorShutDown)
    }
}
