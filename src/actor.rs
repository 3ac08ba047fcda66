//! Driver Actor: the single task that owns the transport, framer, router,
//! inflight slot, and session state, and serializes every operation in
//! §5's "single-threaded cooperative" scheduling model.

use std::io;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::{Config, MAILBOX_DRAIN_DELAY, MAILBOX_RETRY_DELAY, MT_FLUSH_TIMER};
use crate::engine::{self, CommandSpec, Inflight};
use crate::error::{Error, Result};
use crate::events::{Event, EventBus, Handler};
use crate::framer::{Frame, LineFramer};
use crate::parse;
use crate::pattern::{Pattern, UnsolicitedKind};
use crate::router::{self, RouterAction};
use crate::session::{MailboxOutcome, MessagePending, MoPayload, SessionState};
use crate::transport::Port;

const READ_CHUNK: usize = 512;

/// A request sent from a `Driver` handle to its actor.
pub(crate) enum Request {
    SendMessage { text: String, reply: oneshot::Sender<Result<u32>> },
    SendBinaryMessage { bytes: Vec<u8>, reply: oneshot::Sender<Result<u32>> },
    MailboxCheck { reply: oneshot::Sender<Result<MailboxOutcome>> },
    SignalQuality { reply: oneshot::Sender<Result<u8>> },
    SystemTime { reply: oneshot::Sender<Result<chrono::DateTime<chrono::Utc>>> },
    NetworkTime { reply: oneshot::Sender<Result<chrono::DateTime<chrono::Utc>>> },
    Subscribe { handler: Handler },
    Shutdown,
}

pub(crate) struct Actor<T: Port> {
    transport: T,
    framer: LineFramer,
    inflight: Option<Inflight>,
    events: EventBus,
    config: Config,
    session: SessionState,
    /// Clone of the request channel's sender, used to schedule the
    /// fire-and-forget follow-up mailbox check (§4.5.2) without blocking
    /// the reply that triggered it.
    self_tx: mpsc::Sender<Request>,
}

impl<T: Port> Actor<T> {
    pub(crate) fn new(transport: T, config: Config, self_tx: mpsc::Sender<Request>, handlers: Vec<Handler>) -> Self {
        Self {
            transport,
            framer: LineFramer::new(),
            inflight: None,
            events: EventBus::with_handlers(handlers),
            config,
            session: SessionState::default(),
            self_tx,
        }
    }

    /// Runs the init sequence, then the request loop, until the handle is
    /// dropped or a `Shutdown` request arrives. Returns the error that
    /// aborted init, if any — the caller (`Driver::open`) surfaces it and
    /// never hands out a `Driver` for a failed init.
    pub(crate) async fn run(mut self, mut rx: mpsc::Receiver<Request>, ready: oneshot::Sender<Result<()>>) {
        match self.init_sequence().await {
            Ok(()) => {
                info!("driver initialized");
                self.events.publish(Event::Initialized);
                let _ = ready.send(Ok(()));
            }
            Err(e) => {
                warn!(error = %e, "driver init failed, actor exiting");
                let _ = ready.send(Err(e));
                return;
            }
        }

        // Idle between requests, the actor still has to notice unsolicited
        // lines (e.g. a ring alert arriving with nothing in flight), so this
        // loop races the request channel against the transport directly
        // rather than just awaiting `rx.recv()`. Once a request is being
        // handled, `drive_until_complete`'s own read loop takes over and
        // routes any interleaved unsolicited lines itself.
        let mut buf = [0u8; READ_CHUNK];
        loop {
            tokio::select! {
                req = rx.recv() => {
                    match req {
                        Some(Request::Shutdown) | None => break,
                        Some(other) => self.handle_request(other).await,
                    }
                }
                read_result = self.transport.read(&mut buf) => {
                    match read_result {
                        Ok(0) => break,
                        Ok(n) => self.ingest_text(&buf[..n]),
                        Err(e) => {
                            warn!(error = %e, "transport read error while idle");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn handle_request(&mut self, req: Request) {
        match req {
            Request::SendMessage { text, reply } => {
                let result = self.mailbox_send(MoPayload::Text(text)).await.map(|o| o.momsn);
                let _ = reply.send(result);
            }
            Request::SendBinaryMessage { bytes, reply } => {
                let result = self.mailbox_send(MoPayload::Binary(bytes)).await.map(|o| o.momsn);
                let _ = reply.send(result);
            }
            Request::MailboxCheck { reply } => {
                let result = self.mailbox_send(MoPayload::Text(String::new())).await;
                let _ = reply.send(result);
            }
            Request::SignalQuality { reply } => {
                let result = self.signal_quality().await;
                let _ = reply.send(result);
            }
            Request::SystemTime { reply } => {
                let result = self.system_time().await;
                let _ = reply.send(result);
            }
            Request::NetworkTime { reply } => {
                let result = self.network_time().await;
                let _ = reply.send(result);
            }
            Request::Subscribe { handler } => {
                self.events.subscribe(handler);
            }
            Request::Shutdown => unreachable!("handled in run()"),
        }
    }

    // ===== §4.5.3 Initialization sequence =====

    async fn init_sequence(&mut self) -> Result<()> {
        let timeout = Some(self.config.simple_timeout);
        self.issue(CommandSpec::text("ATE0", Pattern::Exact("OK"), timeout)).await?;
        self.issue(CommandSpec::text("AT+SBDD2", Pattern::Exact("OK"), timeout)).await?;
        self.issue(CommandSpec::text("AT+SBDAREG=1", Pattern::Exact("OK"), timeout)).await?;
        self.issue(CommandSpec::text("AT+SBDMTA=1", Pattern::Exact("OK"), timeout)).await?;
        Ok(())
    }

    // ===== §4.5.2 Retry & back-off =====

    async fn mailbox_send(&mut self, payload: MoPayload) -> Result<MailboxOutcome> {
        loop {
            self.session.attempt += 1;
            match self.run_mo_session(&payload).await {
                Ok(outcome) => {
                    self.session.attempt = 0;
                    if outcome.mtqueued > 0 {
                        self.schedule_followup_check();
                    }
                    return Ok(outcome);
                }
                Err(e) => {
                    if self.session.attempt >= self.config.max_attempts {
                        self.session.attempt = 0;
                        warn!(error = %e, "giving up after max attempts");
                        return Err(Error::MaxAttemptsExceeded);
                    }
                    warn!(error = %e, attempt = self.session.attempt, "MO send attempt failed, retrying in 20s");
                    tokio::time::sleep(MAILBOX_RETRY_DELAY).await;
                }
            }
        }
    }

    fn schedule_followup_check(&self) {
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(MAILBOX_DRAIN_DELAY).await;
            let (reply, _rx) = oneshot::channel();
            let _ = tx.send(Request::MailboxCheck { reply }).await;
        });
    }

    // ===== §4.5 Session state machine =====

    async fn run_mo_session(&mut self, payload: &MoPayload) -> Result<MailboxOutcome> {
        debug_assert!(!self.session.mo_lock, "run_mo_session re-entered while already locked");
        self.session.mo_lock = true;

        let result = self.run_mo_session_inner(payload).await;

        self.session.mo_lock = false;
        result
    }

    async fn run_mo_session_inner(&mut self, payload: &MoPayload) -> Result<MailboxOutcome> {
        self.write_mo_buffer(payload).await?;
        self.session.message_pending = Some(MessagePending::Mo);

        if let Err(e) = self.wait_for_network().await {
            self.clear_mo_buffers();
            return Err(e);
        }
        if let Err(e) = self.disable_signal_monitoring().await {
            self.clear_mo_buffers();
            return Err(e);
        }

        let status = match self.initiate_session().await {
            Ok(status) => status,
            Err(e) => {
                self.clear_mo_buffers();
                return Err(e);
            }
        };

        if let Err(e) = self.dispose_mo_status(&status) {
            self.clear_mo_buffers();
            return Err(e);
        }
        let mtqueued = self.dispose_mt_status(&status).await;

        self.clear_mo_buffers();
        Ok(MailboxOutcome { momsn: status.momsn, mtqueued })
    }

    async fn write_mo_buffer(&mut self, payload: &MoPayload) -> Result<()> {
        match payload {
            MoPayload::Text(text) if !text.is_empty() => {
                let cmd = format!("AT+SBDWT={text}");
                self.issue(CommandSpec::text(cmd, Pattern::Exact("OK"), Some(self.config.default_timeout)))
                    .await?;
            }
            MoPayload::Binary(bytes) if !bytes.is_empty() => {
                let len_cmd = format!("AT+SBDWB={}", bytes.len());
                self.issue(CommandSpec::text(len_cmd, Pattern::Exact("READY"), Some(self.config.default_timeout)))
                    .await?;
                let frame = parse::encode_sbdwb_frame(bytes);
                self.issue(CommandSpec::binary(frame, Pattern::Exact("OK"), Some(self.config.default_timeout)))
                    .await?;
            }
            // Zero-length text or binary: fall through to the mailbox-check path.
            _ => {
                self.issue(CommandSpec::text("AT+SBDD0", Pattern::Exact("OK"), Some(self.config.default_timeout)))
                    .await?;
            }
        }
        Ok(())
    }

    async fn wait_for_network(&mut self) -> Result<String> {
        self.issue(CommandSpec::text(
            "AT+CIER=1,1,0",
            Pattern::SignalQualityNonZero,
            self.config.max_wait,
        ))
        .await
    }

    async fn disable_signal_monitoring(&mut self) -> Result<String> {
        self.issue(CommandSpec::text("AT+CIER=0,0,0", Pattern::Exact("OK"), Some(self.config.simple_timeout)))
            .await
    }

    async fn initiate_session(&mut self) -> Result<parse::SbdixStatus> {
        let body = self
            .issue(
                CommandSpec::text("AT+SBDIXA", Pattern::Exact("OK"), Some(self.config.default_timeout))
                    .keep(Pattern::Prefix("+SBDIX")),
            )
            .await?;
        parse::parse_sbdix(&body)
    }

    fn dispose_mo_status(&mut self, status: &parse::SbdixStatus) -> Result<()> {
        match status.mo_status {
            s if s <= 4 => {
                self.session.message_pending = None;
                Ok(())
            }
            18 => Err(Error::RadioFailure),
            32 => Err(Error::NetworkFailure),
            other => Err(Error::UnknownSbdFailure(other)),
        }
    }

    async fn dispose_mt_status(&mut self, status: &parse::SbdixStatus) -> u32 {
        match status.mt_status {
            0 => 0,
            1 => {
                self.session.message_pending = Some(MessagePending::MoMt);
                match self.read_mt_message().await {
                    Ok(payload) => {
                        self.session.pending = status.mtqueued;
                        self.events.publish(Event::NewMessage { payload, mtqueued: status.mtqueued });
                        status.mtqueued
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to read queued MT message");
                        0
                    }
                }
            }
            other => {
                info!(mt_status = other, "unrecognized MT status, treating as no message");
                0
            }
        }
    }

    fn clear_mo_buffers(&mut self) {
        self.session.message_pending = None;
    }

    // ===== §4.5.1 Binary MT read =====

    async fn read_mt_message(&mut self) -> Result<Vec<u8>> {
        self.framer.enter_binary_mode();
        engine::write_payload(&mut self.transport, &engine::Payload::Text("AT+SBDRB".to_string()))
            .await
            .map_err(Error::Io)?;

        let blob = self.flush_binary_after(MT_FLUSH_TIMER).await.map_err(Error::Io)?;
        parse::decode_sbdrb_frame(&blob)
    }

    async fn flush_binary_after(&mut self, window: Duration) -> io::Result<Vec<u8>> {
        let deadline = Instant::now() + window;
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match tokio::time::timeout_at(deadline, self.transport.read(&mut buf)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => {
                    self.framer.feed(&buf[..n]);
                }
                Ok(Err(e)) => return Err(e),
                Err(_elapsed) => break,
            }
        }
        Ok(self.framer.flush_binary().unwrap_or_default())
    }

    // ===== §4.7 Modem queries =====

    async fn signal_quality(&mut self) -> Result<u8> {
        let body = self
            .issue(
                CommandSpec::text("AT+CSQ", Pattern::Exact("OK"), Some(self.config.simple_timeout))
                    .keep(Pattern::Prefix("+CSQ")),
            )
            .await?;
        parse::parse_csq(&body)
    }

    async fn system_time(&mut self) -> Result<chrono::DateTime<chrono::Utc>> {
        let body = self
            .issue(
                CommandSpec::text("AT+CCLK?", Pattern::Exact("OK"), Some(self.config.simple_timeout))
                    .keep(Pattern::Prefix("+CCLK")),
            )
            .await?;
        parse::parse_cclk(&body)
    }

    async fn network_time(&mut self) -> Result<chrono::DateTime<chrono::Utc>> {
        let body = self
            .issue(
                CommandSpec::text("AT-MSSTM", Pattern::Exact("OK"), Some(self.config.simple_timeout))
                    .keep(Pattern::Prefix("-MSSTM")),
            )
            .await?;
        parse::parse_msstm(&body)
    }

    // ===== Command Engine drive loop =====

    /// Issues one command and drives the read loop until the Response
    /// Router completes it or its timeout fires.
    async fn issue(&mut self, spec: CommandSpec) -> Result<String> {
        if self.inflight.is_some() {
            debug_assert!(false, "issue() called while a command was already in flight");
            warn!("command issued while one was already in flight");
            return Err(Error::AlreadyInFlight);
        }

        engine::write_payload(&mut self.transport, &spec.payload).await?;
        let (tx, rx) = oneshot::channel();
        let timeout = spec.timeout;
        self.inflight = Some(Inflight::new(&spec, tx));
        self.drive_until_complete(timeout, rx).await
    }

    async fn drive_until_complete(
        &mut self,
        timeout: Option<Duration>,
        mut rx: oneshot::Receiver<Result<String>>,
    ) -> Result<String> {
        let deadline = timeout.map(|d| Instant::now() + d);
        let mut buf = [0u8; READ_CHUNK];

        loop {
            if let Ok(result) = rx.try_recv() {
                return result;
            }

            let read_result = match deadline {
                Some(dl) => match tokio::time::timeout_at(dl, self.transport.read(&mut buf)).await {
                    Ok(r) => r,
                    Err(_elapsed) => {
                        if let Some(slot) = self.inflight.take() {
                            slot.complete_err(Error::Timeout);
                        }
                        continue;
                    }
                },
                None => self.transport.read(&mut buf).await,
            };

            let n = read_result.map_err(Error::Io)?;
            if n == 0 {
                return Err(Error::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "transport closed")));
            }
            self.ingest_text(&buf[..n]);
        }
    }

    fn ingest_text(&mut self, bytes: &[u8]) {
        for frame in self.framer.feed(bytes) {
            if let Frame::Line(line) = frame {
                match router::route_line(&line, &mut self.inflight) {
                    RouterAction::Unsolicited(kind, raw) => self.handle_unsolicited(kind, raw),
                    RouterAction::Completed | RouterAction::Continue | RouterAction::Discarded => {}
                }
            }
        }
    }

    fn handle_unsolicited(&mut self, kind: UnsolicitedKind, raw: String) {
        match kind {
            UnsolicitedKind::RingAlert => self.events.publish(Event::RingAlert),
            UnsolicitedKind::Areg => info!(line = %raw, "AREG notification"),
        }
        if self.config.debug {
            self.events.publish(Event::Debug(raw));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{duplex, AsyncWriteExt, DuplexStream};

    /// One step of a scripted fake modem conversation.
    enum Step {
        /// Read a CR-terminated command, then write `reply`.
        Line(&'static [u8]),
        /// Read exactly `n` raw bytes (the SBDWB data frame, which carries
        /// no terminator), then write `reply`.
        Bytes(usize, &'static [u8]),
        /// Write `reply` with no preceding read — an unsolicited push.
        Push(&'static [u8]),
    }

    /// Plays `steps` against `server`, returning whatever each `Line`/`Bytes`
    /// step actually consumed, for assertions on the commands sent.
    async fn fake_modem(mut server: DuplexStream, steps: Vec<Step>) -> Vec<Vec<u8>> {
        let mut log = Vec::new();
        for step in steps {
            match step {
                Step::Line(reply) => {
                    let mut consumed = Vec::new();
                    let mut byte = [0u8; 1];
                    loop {
                        server.read_exact(&mut byte).await.expect("fake modem read");
                        if byte[0] == b'\r' {
                            break;
                        }
                        consumed.push(byte[0]);
                    }
                    server.write_all(reply).await.expect("fake modem write");
                    log.push(consumed);
                }
                Step::Bytes(n, reply) => {
                    let mut consumed = vec![0u8; n];
                    server.read_exact(&mut consumed).await.expect("fake modem read");
                    server.write_all(reply).await.expect("fake modem write");
                    log.push(consumed);
                }
                Step::Push(reply) => {
                    server.write_all(reply).await.expect("fake modem write");
                }
            }
        }
        log
    }

    fn init_steps() -> Vec<Step> {
        vec![Step::Line(b"OK\r\n"), Step::Line(b"OK\r\n"), Step::Line(b"OK\r\n"), Step::Line(b"OK\r\n")]
    }

    /// A full MO session's command cycle (write, wait-for-network,
    /// disable-monitoring, initiate-session), ending with `sbdix_reply`.
    fn send_cycle_steps(sbdix_reply: &'static [u8]) -> Vec<Step> {
        vec![
            Step::Line(b"OK\r\n"),
            Step::Line(b"+CIEV:0,5\r\n"),
            Step::Line(b"OK\r\n"),
            Step::Line(sbdix_reply),
        ]
    }

    fn spawn_driver(
        client: DuplexStream,
        config: Config,
        handlers: Vec<Handler>,
    ) -> (mpsc::Sender<Request>, oneshot::Receiver<Result<()>>) {
        let (tx, rx) = mpsc::channel(32);
        let (ready_tx, ready_rx) = oneshot::channel();
        let actor = Actor::new(client, config, tx.clone(), handlers);
        tokio::spawn(actor.run(rx, ready_tx));
        (tx, ready_rx)
    }

    fn recording_handler() -> (Handler, Arc<Mutex<Vec<Event>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let recorded = events.clone();
        let handler: Handler = Box::new(move |e: &Event| recorded.lock().unwrap().push(e.clone()));
        (handler, events)
    }

    #[tokio::test]
    async fn init_happy_path_emits_initialized() {
        let (client, server) = duplex(4096);
        let modem = tokio::spawn(fake_modem(server, init_steps()));
        let (handler, events) = recording_handler();

        let (tx, ready_rx) = spawn_driver(client, Config::new("test"), vec![handler]);
        ready_rx.await.unwrap().expect("init should succeed");

        let log = modem.await.unwrap();
        assert_eq!(log[0], b"ATE0");
        assert_eq!(log[1], b"AT+SBDD2");
        assert_eq!(log[2], b"AT+SBDAREG=1");
        assert_eq!(log[3], b"AT+SBDMTA=1");
        assert!(matches!(events.lock().unwrap().as_slice(), [Event::Initialized]));

        let _ = tx.send(Request::Shutdown).await;
    }

    #[tokio::test]
    async fn text_send_with_no_mt_returns_momsn() {
        let (client, server) = duplex(4096);
        let mut steps = init_steps();
        steps.extend(send_cycle_steps(b"+SBDIX: 0, 1, 0, 0, 0, 0\r\nOK\r\n"));
        let modem = tokio::spawn(fake_modem(server, steps));

        let (tx, ready_rx) = spawn_driver(client, Config::new("test"), Vec::new());
        ready_rx.await.unwrap().expect("init should succeed");

        let (reply, rx) = oneshot::channel();
        tx.send(Request::SendMessage { text: "hello".into(), reply }).await.unwrap();
        let momsn = rx.await.unwrap().expect("send should succeed");
        assert_eq!(momsn, 1);

        let log = modem.await.unwrap();
        assert_eq!(log[4], b"AT+SBDWT=hello");
        assert_eq!(log[7], b"AT+SBDIXA");

        let _ = tx.send(Request::Shutdown).await;
    }

    #[tokio::test(start_paused = true)]
    async fn binary_send_reads_queued_mt_message() {
        let (client, server) = duplex(4096);
        let payload = b"hi";
        let cksum = crate::parse::checksum(payload);
        let mut blob = vec![0u8, payload.len() as u8];
        blob.extend_from_slice(payload);
        blob.extend_from_slice(&cksum.to_be_bytes());
        let blob: &'static [u8] = &*Box::leak(blob.into_boxed_slice());

        let mut steps = init_steps();
        steps.push(Step::Line(b"READY\r\n"));
        steps.push(Step::Bytes(payload.len() + 2, b"OK\r\n"));
        steps.push(Step::Line(b"+CIEV:0,5\r\n"));
        steps.push(Step::Line(b"OK\r\n"));
        steps.push(Step::Line(b"+SBDIX: 0, 7, 1, 3, 5, 0\r\nOK\r\n"));
        steps.push(Step::Line(blob));
        let modem = tokio::spawn(fake_modem(server, steps));

        let (handler, events) = recording_handler();
        let (tx, ready_rx) = spawn_driver(client, Config::new("test"), vec![handler]);
        ready_rx.await.unwrap().expect("init should succeed");

        let (reply, rx) = oneshot::channel();
        tx.send(Request::SendBinaryMessage { bytes: payload.to_vec(), reply }).await.unwrap();

        let momsn = rx.await.unwrap().expect("send should succeed");
        assert_eq!(momsn, 7);

        let log = modem.await.unwrap();
        assert_eq!(log[4], b"AT+SBDWB=2");
        assert_eq!(&log[5][..payload.len()], payload);
        assert_eq!(log[9], b"AT+SBDRB");

        let recorded = events.lock().unwrap();
        assert!(recorded.iter().any(|e| matches!(e, Event::NewMessage { payload: p, mtqueued: 0 } if p == b"hi")));

        let _ = tx.send(Request::Shutdown).await;
    }

    #[tokio::test]
    async fn ring_alert_while_idle_is_published_with_no_inflight_command() {
        let (client, server) = duplex(4096);
        let mut steps = init_steps();
        steps.push(Step::Push(b"SBDRING\r\n"));
        let _modem = tokio::spawn(fake_modem(server, steps));

        let (handler, events) = recording_handler();
        let (tx, ready_rx) = spawn_driver(client, Config::new("test"), vec![handler]);
        ready_rx.await.unwrap().expect("init should succeed");

        // No request is ever sent; the actor must still notice the ring
        // alert purely from its idle transport read.
        for _ in 0..50 {
            if events.lock().unwrap().iter().any(|e| matches!(e, Event::RingAlert)) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(events.lock().unwrap().iter().any(|e| matches!(e, Event::RingAlert)));

        let _ = tx.send(Request::Shutdown).await;
    }

    #[tokio::test(start_paused = true)]
    async fn radio_failure_retries_then_succeeds() {
        let (client, server) = duplex(4096);
        let mut steps = init_steps();
        steps.extend(send_cycle_steps(b"+SBDIX: 18, 0, 0, 0, 0, 0\r\nOK\r\n"));
        steps.extend(send_cycle_steps(b"+SBDIX: 0, 9, 0, 0, 0, 0\r\nOK\r\n"));
        let modem = tokio::spawn(fake_modem(server, steps));

        let config = Config::new("test").max_attempts(3);
        let (tx, ready_rx) = spawn_driver(client, config, Vec::new());
        ready_rx.await.unwrap().expect("init should succeed");

        let (reply, rx) = oneshot::channel();
        tx.send(Request::SendMessage { text: "retry me".into(), reply }).await.unwrap();
        let momsn = rx.await.unwrap().expect("send should eventually succeed");
        assert_eq!(momsn, 9);

        let log = modem.await.unwrap();
        assert_eq!(log.len(), 4 + 4 + 4);

        let _ = tx.send(Request::Shutdown).await;
    }

    #[tokio::test(start_paused = true)]
    async fn max_attempts_exceeded_after_repeated_failures() {
        let (client, server) = duplex(4096);
        let mut steps = init_steps();
        steps.extend(send_cycle_steps(b"+SBDIX: 18, 0, 0, 0, 0, 0\r\nOK\r\n"));
        steps.extend(send_cycle_steps(b"+SBDIX: 18, 0, 0, 0, 0, 0\r\nOK\r\n"));
        let modem = tokio::spawn(fake_modem(server, steps));

        let config = Config::new("test").max_attempts(2);
        let (tx, ready_rx) = spawn_driver(client, config, Vec::new());
        ready_rx.await.unwrap().expect("init should succeed");

        let (reply, rx) = oneshot::channel();
        tx.send(Request::SendMessage { text: "doomed".into(), reply }).await.unwrap();
        let result = rx.await.unwrap();
        assert!(matches!(result, Err(Error::MaxAttemptsExceeded)));

        let _ = modem.await.unwrap();
        let _ = tx.send(Request::Shutdown).await;
    }
}
