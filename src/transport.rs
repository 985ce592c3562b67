use crate::frame::WaveformFrame;
use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout error: no complete response to '{command}' within {waited:?}")]
    Timeout { command: String, waited: Duration },

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Not connected: the instrument closed the connection")]
    NotConnected,
}

/// The instrument session the scope driver talks through.
///
/// One request is outstanding at a time: `query` writes and then blocks for
/// the reply, `read_raw` blocks for a binary block following a `write`.
/// Implementations hold no locks; share a session by serialising access.
pub trait Transport {
    /// Send a command without waiting for a reply.
    fn write(&mut self, command: &str) -> Result<(), TransportError>;

    /// Send a command and return the textual reply, line terminator included.
    fn query(&mut self, command: &str) -> Result<String, TransportError>;

    /// Read one undecoded binary block.
    fn read_raw(&mut self) -> Result<Vec<u8>, TransportError>;

    fn timeout(&self) -> Duration;

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), TransportError>;

    fn chunk_size(&self) -> usize;

    fn set_chunk_size(&mut self, bytes: usize);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, command: &str) -> Result<(), TransportError> {
        (**self).write(command)
    }

    fn query(&mut self, command: &str) -> Result<String, TransportError> {
        (**self).query(command)
    }

    fn read_raw(&mut self) -> Result<Vec<u8>, TransportError> {
        (**self).read_raw()
    }

    fn timeout(&self) -> Duration {
        (**self).timeout()
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), TransportError> {
        (**self).set_timeout(timeout)
    }

    fn chunk_size(&self) -> usize {
        (**self).chunk_size()
    }

    fn set_chunk_size(&mut self, bytes: usize) {
        (**self).set_chunk_size(bytes);
    }
}

pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);
pub(crate) const DEFAULT_CHUNK_SIZE: usize = 20 * 1024;

/// Read bytes until a `\n` arrives. The stream must be configured with a
/// short per-read timeout so the deadline is checked between polls.
pub(crate) fn read_line<R: Read + ?Sized>(
    stream: &mut R,
    command: &str,
    timeout: Duration,
) -> Result<String, TransportError> {
    let mut response = Vec::new();
    let start = Instant::now();

    loop {
        let mut byte = [0u8; 1];
        match stream.read(&mut byte) {
            Ok(0) => return Err(TransportError::NotConnected),
            Ok(_) => {
                response.push(byte[0]);
                if byte[0] == b'\n' {
                    break;
                }
            }
            Err(e) if is_poll_timeout(&e) => {
                if start.elapsed() >= timeout {
                    return Err(TransportError::Timeout {
                        command: command.to_string(),
                        waited: timeout,
                    });
                }
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(String::from_utf8(response)?)
}

/// Read a binary block in chunks of `chunk_size`.
///
/// A block that opens with a waveform frame header is read until the size
/// it declares has arrived, however long the line pauses in between. Any
/// other block ends when the line goes idle after data has started to
/// arrive.
pub(crate) fn read_block<R: Read + ?Sized>(
    stream: &mut R,
    chunk_size: usize,
    timeout: Duration,
) -> Result<Vec<u8>, TransportError> {
    let mut block = Vec::new();
    let mut chunk = vec![0u8; chunk_size.max(1)];
    let mut expected = None;
    let start = Instant::now();

    loop {
        if expected.is_some_and(|size| block.len() >= size) {
            break;
        }

        match stream.read(&mut chunk) {
            Ok(0) if block.is_empty() => return Err(TransportError::NotConnected),
            Ok(0) => break,
            Ok(n) => {
                block.extend_from_slice(&chunk[..n]);
                if expected.is_none() {
                    expected = WaveformFrame::expected_size(&block);
                }
            }
            Err(e) if is_poll_timeout(&e) => {
                if expected.is_none() && !block.is_empty() && !may_be_frame_header(&block) {
                    break;
                }
                if start.elapsed() >= timeout {
                    return Err(TransportError::Timeout {
                        command: "<binary block>".to_string(),
                        waited: timeout,
                    });
                }
            }
            Err(e) => return Err(e.into()),
        }
    }

    log::debug!("Received binary block of {} bytes", block.len());
    Ok(block)
}

/// Whether `partial` could still grow into a frame header.
fn may_be_frame_header(partial: &[u8]) -> bool {
    let marker = WaveformFrame::MARKER;
    partial.len() < WaveformFrame::HEADER_LEN
        && partial[..partial.len().min(marker.len())] == marker[..partial.len().min(marker.len())]
}

fn is_poll_timeout(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
}

#[cfg(test)]
pub(crate) mod mock {
    //! A software stand-in for an SDS scope that answers the commands the
    //! driver issues and honours `COMM_HEADER`.

    use super::{Transport, TransportError, DEFAULT_CHUNK_SIZE, DEFAULT_TIMEOUT};
    use std::time::Duration;

    pub struct FakeSiglent {
        pub idn: String,
        pub header_long: bool,
        pub volts_per_div: String,
        pub offset: String,
        pub time_per_div: String,
        pub trigger_delay: String,
        pub sample_rate: String,
        pub sample_num: String,
        pub frame: Vec<u8>,
        pub fail_raw_read: bool,
        pub written: Vec<String>,
        pub timeout: Duration,
        pub chunk_size: usize,
        pending_frame: bool,
    }

    impl FakeSiglent {
        pub fn new() -> Self {
            Self {
                idn: "Siglent Technologies,SDS1202X-E,SDSMMEBQ4R5097,8.2.6.1.37R9\n".to_string(),
                header_long: true,
                volts_per_div: "5.00E-01V".to_string(),
                offset: "0.00E+00V".to_string(),
                time_per_div: "5.00E-04S".to_string(),
                trigger_delay: "0.00s".to_string(),
                sample_rate: "1.00MSa/s".to_string(),
                sample_num: "200".to_string(),
                frame: Vec::new(),
                fail_raw_read: false,
                written: Vec::new(),
                timeout: DEFAULT_TIMEOUT,
                chunk_size: DEFAULT_CHUNK_SIZE,
                pending_frame: false,
            }
        }

        pub fn with_frame(mut self, frame: Vec<u8>) -> Self {
            self.frame = frame;
            self
        }

        fn reply(&self, header: &str, value: &str) -> String {
            if self.header_long {
                format!("{} {}\n", header, value)
            } else {
                format!("{}\n", value)
            }
        }
    }

    /// Build a well formed `C<n>:WF? DAT2` response around `payload`.
    pub fn frame_for(payload: &[u8]) -> Vec<u8> {
        let mut raw = b"ALL,#9".to_vec();
        raw.extend_from_slice(format!("{:09}", payload.len()).as_bytes());
        raw.extend_from_slice(payload);
        raw.extend_from_slice(&[0x0A, 0x0A]);
        raw
    }

    impl Transport for FakeSiglent {
        fn write(&mut self, command: &str) -> Result<(), TransportError> {
            self.written.push(command.to_string());
            match command {
                "COMM_HEADER LONG" => self.header_long = true,
                "COMM_HEADER OFF" => self.header_long = false,
                c if c.ends_with(":WF? DAT2") => self.pending_frame = true,
                _ => {}
            }
            Ok(())
        }

        fn query(&mut self, command: &str) -> Result<String, TransportError> {
            self.written.push(command.to_string());
            let response = match command {
                "*IDN?" => self.idn.clone(),
                "C1:OFFSET?" | "C2:OFFSET?" => {
                    self.reply(&format!("{}:OFST", &command[..2]), &self.offset)
                }
                "C1:VOLT_DIV?" | "C2:VOLT_DIV?" => {
                    self.reply(&format!("{}:VDIV", &command[..2]), &self.volts_per_div)
                }
                "TIME_DIV?" => self.reply("TDIV", &self.time_per_div),
                "TRIG_DELAY?" => self.reply("TRDL", &self.trigger_delay),
                "SAMPLE_RATE?" => self.reply("SARA", &self.sample_rate),
                "SAMPLE_NUM? C1" | "SAMPLE_NUM? C2" => self.reply("SANU", &self.sample_num),
                _ => "\n".to_string(),
            };
            Ok(response)
        }

        fn read_raw(&mut self) -> Result<Vec<u8>, TransportError> {
            if self.fail_raw_read || !self.pending_frame {
                return Err(TransportError::Timeout {
                    command: "<binary block>".to_string(),
                    waited: self.timeout,
                });
            }
            self.pending_frame = false;
            Ok(self.frame.clone())
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Yields its data, then reports a poll timeout forever.
    struct IdleAfter {
        data: Cursor<Vec<u8>>,
    }

    impl Read for IdleAfter {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.data.read(buf)? {
                0 => Err(std::io::Error::new(ErrorKind::TimedOut, "idle")),
                n => Ok(n),
            }
        }
    }

    fn idle_after(bytes: &[u8]) -> IdleAfter {
        IdleAfter {
            data: Cursor::new(bytes.to_vec()),
        }
    }

    #[test]
    fn test_read_line_stops_at_newline() {
        let mut stream = idle_after(b"1.00E+00V\nrest");
        let line = read_line(&mut stream, "C1:VOLT_DIV?", Duration::from_millis(5)).unwrap();
        assert_eq!(line, "1.00E+00V\n");
    }

    #[test]
    fn test_read_line_times_out_without_newline() {
        let mut stream = idle_after(b"partial");
        let result = read_line(&mut stream, "TIME_DIV?", Duration::from_millis(0));
        assert!(matches!(result, Err(TransportError::Timeout { .. })));
    }

    #[test]
    fn test_read_block_collects_all_chunks() {
        let payload: Vec<u8> = (0..=255).collect();
        let mut stream = idle_after(&payload);
        let block = read_block(&mut stream, 16, Duration::from_millis(5)).unwrap();
        assert_eq!(block, payload);
    }

    /// Plays back `bursts`, with a poll timeout between each.
    struct Bursts {
        bursts: Vec<Vec<u8>>,
        pause: bool,
    }

    impl Read for Bursts {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pause || self.bursts.is_empty() {
                self.pause = false;
                return Err(std::io::Error::new(ErrorKind::TimedOut, "idle"));
            }
            let burst = self.bursts.remove(0);
            buf[..burst.len()].copy_from_slice(&burst);
            self.pause = true;
            Ok(burst.len())
        }
    }

    #[test]
    fn test_read_block_waits_out_pauses_inside_a_frame() {
        let mut stream = Bursts {
            bursts: vec![
                b"ALL,".to_vec(),
                b"#9000000004\x01\x02".to_vec(),
                b"\x03\x04\n\n".to_vec(),
                b"next".to_vec(),
            ],
            pause: false,
        };
        let block = read_block(&mut stream, 64, Duration::from_secs(5)).unwrap();
        assert_eq!(block, b"ALL,#9000000004\x01\x02\x03\x04\n\n");
        assert!(WaveformFrame::parse(&block).is_ok());
    }

    #[test]
    fn test_read_block_times_out_on_a_stalled_frame() {
        let mut stream = Bursts {
            bursts: vec![b"ALL,#9000000004\x01\x02".to_vec()],
            pause: false,
        };
        let result = read_block(&mut stream, 64, Duration::from_millis(0));
        assert!(matches!(result, Err(TransportError::Timeout { .. })));
    }

    #[test]
    fn test_read_block_on_silent_line_times_out() {
        let mut stream = idle_after(b"");
        let result = read_block(&mut stream, 16, Duration::from_millis(0));
        assert!(matches!(result, Err(TransportError::Timeout { .. })));
    }

    #[test]
    fn test_read_block_reports_closed_connection() {
        let mut stream = Cursor::new(Vec::<u8>::new());
        let result = read_block(&mut stream, 16, Duration::from_millis(5));
        assert!(matches!(result, Err(TransportError::NotConnected)));
    }
}
