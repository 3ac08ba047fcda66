//! Driver for Iridium Short Burst Data (SBD) satellite modems.
//!
//! `sbd-modem` speaks the `AT+SBD*` command set over a serial connection to
//! an Iridium 9602/9603-class transceiver: sending and receiving short
//! burst-data messages, running the mailbox session state machine with
//! automatic retry, and surfacing signal quality, modem clock, and Iridium
//! network time queries. A single actor task owns the transport and all
//! protocol state; [`Driver`] is a cheap, cloneable handle to it.
//!
//! # Example
//! This example opens a driver on a serial-attached modem, subscribes to
//! ring-alert and new-message events, and sends a short text message.
//!
//! ```no_run
//! # async fn example() -> sbd_modem::Result<()> {
//! use sbd_modem::Driver;
//!
//! let driver = Driver::builder()
//!     .port("/dev/ttyUSB0")
//!     .baudrate(19200)
//!     .open()
//!     .await?;
//!
//! driver
//!     .on_event(|event| println!("{event:?}"))
//!     .await?;
//!
//! let momsn = driver.send_message("hello from the field").await?;
//! println!("sent as MOMSN {momsn}");
//! # Ok(())
//! # }
//! ```

mod actor;
mod engine;
mod events;
mod framer;
mod pattern;
mod router;
mod session;

pub mod config;
pub mod driver;
pub mod error;
pub(crate) mod parse;
pub(crate) mod transport;

pub use config::Config;
pub use driver::{Driver, DriverBuilder};
pub use error::{Error, Result};
pub use events::Event;
pub use session::MailboxOutcome;
pub use transport::Port;
