//! Typed readings of the instrument's calibration settings. Every function
//! here expects the controller to be QUIET already; `SiglentScope` wraps
//! them in a `QuietGuard`.

use crate::echo_controller::EchoController;
use crate::settings::{Channel, InvalidSetting};
use crate::siglent_scope::{FormatMismatch, ScopeError};
use crate::transport::Transport;
use crate::units::{parse_scaled, PhysicalQuantity, SuffixTable, Unit, UnitParseError};

/// Reject `External` for settings that only exist on the analog inputs.
pub(crate) fn analog(channel: Channel) -> Result<Channel, ScopeError> {
    if channel.is_analog() {
        Ok(channel)
    } else {
        Err(InvalidSetting {
            kind: "channel",
            value: channel.to_string(),
            allowed: "1 or 2",
        }
        .into())
    }
}

fn query_scaled<T: Transport>(
    link: &mut EchoController<T>,
    command: &str,
    table: &SuffixTable,
) -> Result<f64, ScopeError> {
    let response = link.query_terse(command)?;
    parse_scaled(&response, table).map_err(|e| match e {
        UnitParseError::EchoedHeader(response) => ScopeError::UnexpectedResponseFormat {
            command: command.to_string(),
            mismatch: FormatMismatch::EchoedHeader(response),
        },
        UnitParseError::NoMagnitude(response) => ScopeError::MalformedResponse {
            command: command.to_string(),
            response,
        },
    })
}

pub fn offset<T: Transport>(
    link: &mut EchoController<T>,
    channel: Channel,
) -> Result<PhysicalQuantity, ScopeError> {
    let channel = analog(channel)?;
    let volts = query_scaled(link, &format!("{}:OFFSET?", channel), &SuffixTable::VOLTAGE)?;
    Ok(PhysicalQuantity::volts(volts))
}

pub fn volts_per_div<T: Transport>(
    link: &mut EchoController<T>,
    channel: Channel,
) -> Result<PhysicalQuantity, ScopeError> {
    let channel = analog(channel)?;
    let volts = query_scaled(link, &format!("{}:VOLT_DIV?", channel), &SuffixTable::VOLTAGE)?;
    Ok(PhysicalQuantity::volts(volts))
}

pub fn time_per_div<T: Transport>(
    link: &mut EchoController<T>,
) -> Result<PhysicalQuantity, ScopeError> {
    let seconds = query_scaled(link, "TIME_DIV?", &SuffixTable::TIME)?;
    Ok(PhysicalQuantity::seconds(seconds))
}

pub fn trigger_delay<T: Transport>(
    link: &mut EchoController<T>,
) -> Result<PhysicalQuantity, ScopeError> {
    let seconds = query_scaled(link, "TRIG_DELAY?", &SuffixTable::TIME)?;
    Ok(PhysicalQuantity::seconds(seconds))
}

/// Samples per second. A zero or negative rate cannot place samples in
/// time and is reported as malformed.
pub fn sample_rate<T: Transport>(
    link: &mut EchoController<T>,
) -> Result<PhysicalQuantity, ScopeError> {
    const COMMAND: &str = "SAMPLE_RATE?";
    let rate = query_scaled(link, COMMAND, &SuffixTable::SAMPLE_RATE)?;
    if !(rate.is_finite() && rate > 0.0) {
        return Err(ScopeError::MalformedResponse {
            command: COMMAND.to_string(),
            response: rate.to_string(),
        });
    }
    Ok(PhysicalQuantity::hertz(rate))
}

/// Number of samples shown on screen for `channel`.
pub fn sample_length<T: Transport>(
    link: &mut EchoController<T>,
    channel: Channel,
) -> Result<usize, ScopeError> {
    let channel = analog(channel)?;
    let command = format!("SAMPLE_NUM? {}", channel);
    let count = query_scaled(link, &command, &SuffixTable::SAMPLE_COUNT)?;

    if !count.is_finite() || count < 0.0 || count.fract() != 0.0 || count > usize::MAX as f64 {
        return Err(ScopeError::MalformedResponse {
            command,
            response: count.to_string(),
        });
    }
    Ok(count as usize)
}

/// Same as the other queries but typed as a `PhysicalQuantity`.
pub fn sample_length_quantity<T: Transport>(
    link: &mut EchoController<T>,
    channel: Channel,
) -> Result<PhysicalQuantity, ScopeError> {
    sample_length(link, channel).map(|n| PhysicalQuantity::new(n as f64, Unit::Samples))
}
