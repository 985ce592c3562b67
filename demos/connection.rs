// Shared connection arguments for the demos.

use clap::Args;
use siglent_scope::{SerialTerminal, SocketTerminal, Transport};
use std::time::Duration;

#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Instrument LAN address, e.g. 192.168.1.50 or 192.168.1.50:5025
    #[arg(long, conflicts_with = "serial")]
    pub host: Option<String>,

    /// Serial port the instrument is attached to, e.g. /dev/ttyUSB0
    #[arg(long)]
    pub serial: Option<String>,

    /// Baud rate for --serial
    #[arg(long, default_value_t = SerialTerminal::DEFAULT_BAUD_RATE)]
    pub baud: u32,

    /// Enable verbose logging
    #[arg(short, long, help = "Show debug information and every command sent")]
    pub verbose: bool,
}

impl ConnectionArgs {
    pub fn init_logging(&self) {
        if self.verbose {
            env_logger::Builder::from_default_env()
                .filter_level(log::LevelFilter::Debug)
                .init();
        } else {
            env_logger::init();
        }
    }

    pub fn open(&self) -> Result<Box<dyn Transport>, Box<dyn std::error::Error>> {
        if let Some(port) = &self.serial {
            return Ok(Box::new(SerialTerminal::new(port, self.baud)?));
        }

        let host = self.host.as_deref().unwrap_or("192.168.1.50");
        let address = if host.contains(':') {
            host.parse()?
        } else {
            format!("{}:{}", host, SocketTerminal::DEFAULT_PORT).parse()?
        };
        Ok(Box::new(SocketTerminal::connect(address, Duration::from_secs(2))?))
    }
}
