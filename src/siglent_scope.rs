use crate::echo_controller::{EchoController, EchoMode};
use crate::frame::{FrameError, WaveformFrame, WindowPlacement};
use crate::scale::{self, analog};
use crate::settings::{
    is_time_div_step, Channel, Coupling, InvalidSetting, TimeUnit, TriggerCoupling, TriggerMode,
    TriggerSlope, VoltUnit,
};
use crate::transport::{Transport, TransportError};
use crate::units::PhysicalQuantity;
use crate::waveform::{Calibration, OffsetSign, Waveform};
use polars::prelude::{DataFrame, PolarsError};
use std::time::Duration;

/// How a reply failed to match the headerless form parsers expect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatMismatch {
    #[error("reply '{0}' starts with an echoed command header")]
    EchoedHeader(String),

    #[error("query not sent because the scope is echoing command headers")]
    EchoModeActive,
}

#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] InvalidSetting),

    #[error("Unexpected response format to '{command}': {mismatch}")]
    UnexpectedResponseFormat {
        command: String,
        mismatch: FormatMismatch,
    },

    #[error("Malformed response to '{command}': '{response}'")]
    MalformedResponse { command: String, response: String },

    #[error("Invalid wave data received from oscilloscope: {0}")]
    CorruptFrame(#[from] FrameError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Failed to connect to a Siglent instrument, identified as '{idn}'")]
    NotSiglent { idn: String },

    #[error("Failed to package waveform: {0}")]
    DataFrame(#[from] PolarsError),
}

/// Fields of the `*IDN?` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware: String,
}

impl Identity {
    pub fn parse(idn: &str) -> Result<Self, ScopeError> {
        let not_siglent = || ScopeError::NotSiglent {
            idn: idn.trim().to_string(),
        };

        let mut fields = idn.trim().split(',').map(str::trim);
        let manufacturer = fields.next().ok_or_else(not_siglent)?;
        if !manufacturer.to_ascii_uppercase().contains("SIGLENT") {
            return Err(not_siglent());
        }
        let model = fields.next().ok_or_else(not_siglent)?;
        let serial_number = fields.next().ok_or_else(not_siglent)?;
        let firmware = fields.next().unwrap_or_default();

        Ok(Self {
            manufacturer: manufacturer.to_string(),
            model: model.to_string(),
            serial_number: serial_number.to_string(),
            firmware: firmware.to_string(),
        })
    }
}

/// Transfer and decoding settings for `SiglentScope::get_wave`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionConfig {
    read_timeout: Duration,
    chunk_size: usize,
    offset_sign: OffsetSign,
    window: WindowPlacement,
}

impl AcquisitionConfig {
    pub const MIN_READ_TIMEOUT: Duration = Duration::from_millis(3000);
    pub const DEFAULT_CHUNK_SIZE: usize = 20 * 1024 * 1024;

    /// Clamped to at least `MIN_READ_TIMEOUT`.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout.max(Self::MIN_READ_TIMEOUT);
        self
    }

    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    pub fn with_offset_sign(mut self, sign: OffsetSign) -> Self {
        self.offset_sign = sign;
        self
    }

    pub fn with_window(mut self, window: WindowPlacement) -> Self {
        self.window = window;
        self
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn offset_sign(&self) -> OffsetSign {
        self.offset_sign
    }

    pub fn window(&self) -> WindowPlacement {
        self.window
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            read_timeout: Self::MIN_READ_TIMEOUT,
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            offset_sign: OffsetSign::Subtract,
            window: WindowPlacement::Centered,
        }
    }
}

fn finite(kind: &'static str, value: f64) -> Result<f64, ScopeError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(InvalidSetting {
            kind,
            value: value.to_string(),
            allowed: "finite numbers",
        }
        .into())
    }
}

/// A session with one SDS oscilloscope. The instrument answers one request
/// at a time, so a session shared between threads needs external locking.
pub struct SiglentScope<T: Transport> {
    link: EchoController<T>,
    identity: Identity,
    config: AcquisitionConfig,
}

impl<T: Transport> SiglentScope<T> {
    /// Identify the instrument behind `transport` and put it in QUIET mode.
    pub fn new(transport: T) -> Result<Self, ScopeError> {
        Self::with_config(transport, AcquisitionConfig::default())
    }

    pub fn with_config(transport: T, config: AcquisitionConfig) -> Result<Self, ScopeError> {
        // The mode is unknown until the first COMM_HEADER goes out
        let mut link = EchoController::new(transport, EchoMode::Verbose);

        let idn = link.query_unchecked("*IDN?")?;
        let identity = Identity::parse(&idn)?;
        log::info!(
            "Connected to {} with S/N {}",
            identity.model,
            identity.serial_number
        );

        link.set_echo_mode(false)?;

        Ok(Self {
            link,
            identity,
            config,
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: AcquisitionConfig) {
        self.config = config;
    }

    pub fn echo_mode(&self) -> EchoMode {
        self.link.mode()
    }

    pub fn set_echo_mode(&mut self, verbose: bool) -> Result<(), ScopeError> {
        Ok(self.link.set_echo_mode(verbose)?)
    }

    pub fn transport(&self) -> &T {
        self.link.transport()
    }

    pub fn into_transport(self) -> T {
        self.link.into_transport()
    }

    /// Send a raw command.
    pub fn command(&mut self, command: &str) -> Result<(), ScopeError> {
        Ok(self.link.write(command)?)
    }

    /// Send a raw query and return the reply without its line terminator.
    pub fn query(&mut self, command: &str) -> Result<String, ScopeError> {
        let response = self.link.query_unchecked(command)?;
        Ok(response.trim_end_matches(['\r', '\n']).to_string())
    }

    pub fn read_raw(&mut self) -> Result<Vec<u8>, ScopeError> {
        Ok(self.link.read_raw()?)
    }

    /// Run `op` with command headers off, restoring the caller's mode on
    /// every exit path.
    fn quietly<R>(
        &mut self,
        op: impl FnOnce(&mut EchoController<T>) -> Result<R, ScopeError>,
    ) -> Result<R, ScopeError> {
        let mut link = self.link.quiet()?;
        let value = op(&mut *link)?;
        link.finish()?;
        Ok(value)
    }

    pub fn get_offset(&mut self, channel: Channel) -> Result<PhysicalQuantity, ScopeError> {
        analog(channel)?;
        self.quietly(|link| scale::offset(link, channel))
    }

    pub fn get_volts_per_div(&mut self, channel: Channel) -> Result<PhysicalQuantity, ScopeError> {
        analog(channel)?;
        self.quietly(|link| scale::volts_per_div(link, channel))
    }

    pub fn get_time_per_div(&mut self) -> Result<PhysicalQuantity, ScopeError> {
        self.quietly(scale::time_per_div)
    }

    pub fn get_trigger_delay(&mut self) -> Result<PhysicalQuantity, ScopeError> {
        self.quietly(scale::trigger_delay)
    }

    pub fn get_sample_rate(&mut self) -> Result<PhysicalQuantity, ScopeError> {
        self.quietly(scale::sample_rate)
    }

    pub fn get_sample_length(&mut self, channel: Channel) -> Result<usize, ScopeError> {
        analog(channel)?;
        self.quietly(|link| scale::sample_length(link, channel))
    }

    /// Transfer the full acquisition buffer of `channel` and decode the
    /// on-screen part of it.
    ///
    /// The timebase must not change between this call and the transfer;
    /// sample rate and length are read right before the waveform.
    pub fn get_wave(&mut self, channel: Channel) -> Result<Waveform, ScopeError> {
        let span = tracing::debug_span!("get_wave", %channel);
        let _entered = span.enter();

        let channel = analog(channel)?;
        let config = self.config;

        self.quietly(|link| {
            link.transport_mut().set_timeout(config.read_timeout)?;
            link.transport_mut().set_chunk_size(config.chunk_size);

            let sample_rate = scale::sample_rate(link)?.magnitude;
            let visible_length = scale::sample_length(link, channel)?;

            link.write(&format!("{}:WF? DAT2", channel))?;
            let raw = link.read_raw()?;
            let frame = WaveformFrame::parse(&raw)?;
            log::debug!(
                "Waveform frame of {} samples, {} visible",
                frame.len(),
                visible_length
            );

            let calibration = Calibration {
                volts_per_div: scale::volts_per_div(link, channel)?.magnitude,
                offset: scale::offset(link, channel)?.magnitude,
                sample_rate,
                visible_length,
            };

            Ok(Waveform::decode(
                &frame,
                &calibration,
                config.window,
                config.offset_sign,
            )?)
        })
    }

    /// `get_wave` packaged as a `"Time (s)"` / `"Volts (V)"` table.
    pub fn get_wave_dataframe(&mut self, channel: Channel) -> Result<DataFrame, ScopeError> {
        Ok(self.get_wave(channel)?.to_dataframe()?)
    }

    pub fn set_coupling(&mut self, channel: Channel, coupling: Coupling) -> Result<(), ScopeError> {
        let channel = analog(channel)?;
        self.command(&format!("{}:COUPLING {}", channel, coupling.command_value()))
    }

    pub fn set_offset(&mut self, channel: Channel, value: f64, units: VoltUnit) -> Result<(), ScopeError> {
        let channel = analog(channel)?;
        let value = finite("offset", value)?;
        self.command(&format!("{}:OFFSET {:.6}{}", channel, value, units))
    }

    pub fn set_volts_per_div(
        &mut self,
        channel: Channel,
        value: f64,
        units: VoltUnit,
    ) -> Result<(), ScopeError> {
        let channel = analog(channel)?;
        let value = finite("volts/div", value)?;
        self.command(&format!("{}:VOLT_DIV {:.6}{}", channel, value, units))
    }

    /// Only the front panel steps 1, 2.5, 5, 10, 25, 50, 100, 250, 500 are accepted.
    pub fn set_time_per_div(&mut self, value: f64, units: TimeUnit) -> Result<(), ScopeError> {
        if !is_time_div_step(value) {
            return Err(InvalidSetting {
                kind: "time/div value",
                value: value.to_string(),
                allowed: "1, 2.5, 5, 10, 25, 50, 100, 250, or 500",
            }
            .into());
        }
        self.command(&format!("TIME_DIV {:.1}{}", value, units))
    }

    pub fn set_trigger_delay(&mut self, value: f64, units: TimeUnit) -> Result<(), ScopeError> {
        let value = finite("trigger delay", value)?;
        self.command(&format!("TRIG_DELAY {:.1}{}", value, units))
    }

    pub fn set_trigger_coupling(
        &mut self,
        channel: Channel,
        coupling: TriggerCoupling,
    ) -> Result<(), ScopeError> {
        self.command(&format!("{}:TRIG_COUPLING {}", channel, coupling))
    }

    pub fn set_trigger_level(
        &mut self,
        channel: Channel,
        value: f64,
        units: VoltUnit,
    ) -> Result<(), ScopeError> {
        let value = finite("trigger level", value)?;
        self.command(&format!("{}:TRIG_LEVEL {:.2}{}", channel, value, units))
    }

    pub fn set_trigger_mode(&mut self, mode: TriggerMode) -> Result<(), ScopeError> {
        self.command(&format!("TRIG_MODE {}", mode))
    }

    pub fn set_trigger_slope(&mut self, channel: Channel, slope: TriggerSlope) -> Result<(), ScopeError> {
        self.command(&format!("{}:TRIG_SLOPE {}", channel, slope))
    }
}
