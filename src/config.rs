//! Driver configuration. Populated once at
//! [`DriverBuilder::open`](crate::driver::DriverBuilder::open) and immutable
//! thereafter.

use std::time::Duration;

pub(crate) const DEFAULT_BAUD: u32 = 19_200;
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(40);
pub(crate) const SIMPLE_TIMEOUT: Duration = Duration::from_secs(2);
pub(crate) const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub(crate) const MT_FLUSH_TIMER: Duration = Duration::from_millis(1000);
pub(crate) const MAILBOX_RETRY_DELAY: Duration = Duration::from_secs(20);
pub(crate) const MAILBOX_DRAIN_DELAY: Duration = Duration::from_millis(1000);

/// Driver configuration. See `SPEC_FULL.md` §3 for the full rationale behind
/// each field's default.
#[derive(Debug, Clone)]
pub struct Config {
    /// Serial baud rate. Default 19200.
    pub baudrate: u32,
    /// Emit [`crate::events::Event::Debug`] for raw AT line traffic.
    pub debug: bool,
    /// Ceiling for ordinary commands (`SBDWT`, `SBDWB`, `SBDIXA`, ...). Default 40s.
    pub default_timeout: Duration,
    /// Ceiling for short commands (`ATE0`, `CIER`, ...). Default 2s.
    pub simple_timeout: Duration,
    /// Ceiling for `wait_for_network`. `None` disables the timeout entirely
    /// (the `timeout_forever` sentinel from the distilled spec).
    pub max_wait: Option<Duration>,
    /// Maximum MO send attempts before `mailbox_send` gives up. Default 5.
    pub max_attempts: u32,
    /// Serial device path, e.g. `/dev/ttyUSB0` or `COM4`.
    pub port: String,
    /// Whether to request hardware flow control on the serial line.
    pub flow_control: bool,
}

impl Config {
    /// Starts a `Config` for the given serial device with every other field
    /// at its documented default.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Default::default()
        }
    }

    pub fn baudrate(mut self, baudrate: u32) -> Self {
        self.baudrate = baudrate;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn simple_timeout(mut self, timeout: Duration) -> Self {
        self.simple_timeout = timeout;
        self
    }

    pub fn max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn flow_control(mut self, flow_control: bool) -> Self {
        self.flow_control = flow_control;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            baudrate: DEFAULT_BAUD,
            debug: false,
            default_timeout: DEFAULT_TIMEOUT,
            simple_timeout: SIMPLE_TIMEOUT,
            max_wait: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            port: String::new(),
            flow_control: false,
        }
    }
}
