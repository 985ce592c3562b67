use crate::transport::{read_block, read_line, Transport, TransportError, DEFAULT_CHUNK_SIZE, DEFAULT_TIMEOUT};
use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

/// SCPI over the instrument's raw LAN socket.
pub struct SocketTerminal {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
    timeout: Duration,
    chunk_size: usize,
}

impl SocketTerminal {
    pub const DEFAULT_PORT: u16 = 5025;

    const POLL_INTERVAL: Duration = Duration::from_millis(50);

    pub fn connect(address: SocketAddr, connect_timeout: Duration) -> Result<Self, TransportError> {
        log::debug!("Connecting to {}", address);
        let stream = TcpStream::connect_timeout(&address, connect_timeout)?;
        stream.set_read_timeout(Some(Self::POLL_INTERVAL))?;
        stream.set_nodelay(true)?;

        let reader = BufReader::new(stream.try_clone()?);

        Ok(Self {
            stream,
            reader,
            timeout: DEFAULT_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }
}

impl Transport for SocketTerminal {
    fn write(&mut self, command: &str) -> Result<(), TransportError> {
        let command_with_newline = format!("{}\n", command);
        self.stream.write_all(command_with_newline.as_bytes())?;
        self.stream.flush()?;
        Ok(())
    }

    fn query(&mut self, command: &str) -> Result<String, TransportError> {
        self.write(command)?;
        read_line(&mut self.reader, command, self.timeout)
    }

    fn read_raw(&mut self) -> Result<Vec<u8>, TransportError> {
        read_block(&mut self.reader, self.chunk_size, self.timeout)
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
