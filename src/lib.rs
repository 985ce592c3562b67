//! # Siglent Scope
//!
//! A Rust library for driving Siglent SDS bench oscilloscopes and decoding
//! their binary waveform transfers into calibrated time/voltage samples.
//!
//! ## Features
//!
//! - **Echo-mode tracking**: command headers are switched off for every parsed
//!   query and the caller's mode is restored afterwards, even on failure
//! - **Typed scale queries**: volts/div, offset, timebase, trigger delay, sample
//!   rate and sample length with engineering-suffix parsing
//! - **Frame validation**: the `WF? DAT2` block is checked for marker, length
//!   and trailer before a single sample is decoded
//! - **DataFrame output**: decoded traces convert to a `polars` `DataFrame`
//! - **Transport agnostic**: serial and raw-socket transports are included; any
//!   other session type can implement [`Transport`]
//!
//! ## Examples
//!
//! ### Acquiring a Waveform
//!
//! ```rust,no_run
//! use siglent_scope::{Channel, SiglentScope, SocketTerminal};
//! use std::time::Duration;
//!
//! let address = "192.168.1.50:5025".parse()?;
//! let terminal = SocketTerminal::connect(address, Duration::from_secs(2))?;
//! let mut scope = SiglentScope::new(terminal)?;
//!
//! let wave = scope.get_wave(Channel::C1)?;
//! println!("Captured {} samples", wave.len());
//!
//! let df = wave.to_dataframe()?;
//! println!("{}", df.head(Some(5)));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Decoding a Frame Without an Instrument
//!
//! ```rust
//! use siglent_scope::{Calibration, OffsetSign, Waveform, WaveformFrame, WindowPlacement};
//!
//! let mut raw = b"ALL,#9000000004".to_vec();
//! raw.extend_from_slice(&[0, 200, 25, 0]);
//! raw.extend_from_slice(b"\n\n");
//!
//! let frame = WaveformFrame::parse(&raw)?;
//! let calibration = Calibration {
//!     volts_per_div: 0.5,
//!     offset: 0.0,
//!     sample_rate: 1e6,
//!     visible_length: 2,
//! };
//! let wave = Waveform::decode(&frame, &calibration, WindowPlacement::Centered, OffsetSign::Subtract)?;
//! assert_eq!(wave.len(), 2);
//! assert!((wave.volts()[0] + 1.12).abs() < 1e-12);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Configuring the Front End
//!
//! ```rust,no_run
//! use siglent_scope::{Channel, Coupling, SerialTerminal, SiglentScope, TimeUnit, TriggerMode};
//!
//! let terminal = SerialTerminal::new("/dev/ttyUSB0", SerialTerminal::DEFAULT_BAUD_RATE)?;
//! let mut scope = SiglentScope::new(terminal)?;
//!
//! scope.set_coupling(Channel::C1, Coupling::Dc)?;
//! scope.set_time_per_div(500.0, TimeUnit::Us)?;
//! scope.set_trigger_mode(TriggerMode::Single)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod echo_controller;
pub mod frame;
pub mod scale;
pub mod serial_terminal;
pub mod settings;
pub mod siglent_scope;
pub mod socket_terminal;
pub mod transport;
pub mod units;
pub mod waveform;

// Re-export the main types for convenience
pub use echo_controller::{EchoController, EchoMode, QuietGuard};

pub use frame::{decode_sample, FrameError, WaveformFrame, WindowPlacement};

pub use settings::{
    Channel, Coupling, InvalidSetting, TimeUnit, TriggerCoupling, TriggerMode, TriggerSlope,
    VoltUnit,
};

pub use serial_terminal::SerialTerminal;
pub use socket_terminal::SocketTerminal;
pub use transport::{Transport, TransportError};

pub use siglent_scope::{AcquisitionConfig, FormatMismatch, Identity, ScopeError, SiglentScope};

pub use units::{PhysicalQuantity, Unit};

pub use waveform::{Calibration, OffsetSign, Waveform};
