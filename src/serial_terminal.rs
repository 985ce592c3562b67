use crate::transport::{read_block, read_line, Transport, TransportError, DEFAULT_CHUNK_SIZE, DEFAULT_TIMEOUT};
use serialport::SerialPort;
use std::io::Write;
use std::time::Duration;

/// SCPI over a serial line (RS-232 or a USB CDC port), `\n` terminated.
pub struct SerialTerminal {
    serial: Box<dyn SerialPort>,
    timeout: Duration,
    chunk_size: usize,
}

impl SerialTerminal {
    pub const DEFAULT_BAUD_RATE: u32 = 115_200;

    /// Gap after which a binary transfer is considered complete.
    const POLL_INTERVAL: Duration = Duration::from_millis(10);

    pub fn new(port: &str, baud_rate: u32) -> Result<Self, TransportError> {
        log::debug!("Opening serial port {} at {} baud", port, baud_rate);
        let serial = serialport::new(port, baud_rate)
            .timeout(Self::POLL_INTERVAL)
            .open()?;

        let mut terminal = Self {
            serial,
            timeout: DEFAULT_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
        };

        terminal.flush()?;
        Ok(terminal)
    }

    /// Drop anything left over from a previous session.
    fn flush(&mut self) -> Result<(), TransportError> {
        self.serial.clear(serialport::ClearBuffer::All)?;
        Ok(())
    }
}

impl Transport for SerialTerminal {
    fn write(&mut self, command: &str) -> Result<(), TransportError> {
        let command_with_newline = format!("{}\n", command);
        self.serial.write_all(command_with_newline.as_bytes())?;
        Ok(())
    }

    fn query(&mut self, command: &str) -> Result<String, TransportError> {
        self.write(command)?;
        read_line(&mut self.serial, command, self.timeout)
    }

    fn read_raw(&mut self) -> Result<Vec<u8>, TransportError> {
        read_block(&mut self.serial, self.chunk_size, self.timeout)
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), TransportError> {
        self.timeout = timeout;
        Ok(())
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn set_chunk_size(&mut self, bytes: usize) {
        self.chunk_size = bytes;
    }
}
