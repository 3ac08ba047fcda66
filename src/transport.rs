//! Transport: owns the raw byte stream. Opaque to protocol concerns —
//! the driver actor only needs something it can read from and write to.

use serial2_tokio::SerialPort;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::Config;

/// Anything the driver actor can read from and write to asynchronously.
/// Blanket-implemented for any combination of `AsyncRead + AsyncWrite`, so
/// both the real serial port and an in-memory test double (e.g.
/// `tokio::io::DuplexStream`) satisfy it without extra glue.
pub trait Port: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Port for T {}

/// Opens the serial device named in `config` at the configured baud rate.
pub(crate) fn open_serial(config: &Config) -> std::io::Result<SerialPort> {
    let port = SerialPort::open(&config.port, config.baudrate)?;
    if config.flow_control {
        let mut settings = port.get_configuration()?;
        settings.set_flow_control(serial2_tokio::FlowControl::RtsCts);
        port.set_configuration(&settings)?;
    }
    Ok(port)
}
