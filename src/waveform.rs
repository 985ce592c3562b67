use crate::frame::{decode_sample, FrameError, WaveformFrame, WindowPlacement};
use polars::prelude::*;

pub const TIME_COLUMN_NAME: &str = "Time (s)";
pub const VOLTS_COLUMN_NAME: &str = "Volts (V)";

/// How the channel offset enters the voltage formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetSign {
    /// `volts = code / 25 * vdiv - offset`, what SDS1000X-E firmware needs.
    #[default]
    Subtract,
    Add,
}

/// Everything besides the raw frame that the conversion needs, queried from
/// the instrument right before the transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub volts_per_div: f64,
    pub offset: f64,
    pub sample_rate: f64,
    pub visible_length: usize,
}

impl Calibration {
    /// Vertical resolution of the 8-bit ADC.
    pub const CODES_PER_DIV: f64 = 25.0;

    pub fn code_to_volts(&self, code: i8, sign: OffsetSign) -> f64 {
        let scaled = f64::from(code) / Self::CODES_PER_DIV * self.volts_per_div;
        match sign {
            OffsetSign::Subtract => scaled - self.offset,
            OffsetSign::Add => scaled + self.offset,
        }
    }

    /// Sample `index` on a time axis whose zero sits mid-window.
    pub fn index_to_time(&self, index: usize) -> f64 {
        (index as f64 - self.visible_length as f64 / 2.0) / self.sample_rate
    }
}

/// A decoded trace: one `(time, volts)` pair per visible sample, in
/// ascending time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Waveform {
    time: Vec<f64>,
    volts: Vec<f64>,
}

impl Waveform {
    /// Convert the visible window of `frame` into physical units.
    pub fn decode(
        frame: &WaveformFrame<'_>,
        calibration: &Calibration,
        placement: WindowPlacement,
        sign: OffsetSign,
    ) -> Result<Self, FrameError> {
        #[cfg(feature = "cpu-profiling")]
        let _zone = tracy_client::Client::running()
            .map(|client| client.span(tracy_client::span_location!("Waveform::decode"), 0));

        let window = frame.visible_window(calibration.visible_length, placement)?;

        let volts = window
            .iter()
            .map(|&byte| calibration.code_to_volts(decode_sample(byte), sign))
            .collect();
        let time = (0..window.len())
            .map(|i| calibration.index_to_time(i))
            .collect();

        Ok(Self { time, volts })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn volts(&self) -> &[f64] {
        &self.volts
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time.iter().copied().zip(self.volts.iter().copied())
    }

    /// Package the trace as a two column table.
    pub fn to_dataframe(&self) -> Result<DataFrame, PolarsError> {
        df!(
            TIME_COLUMN_NAME => self.time.as_slice(),
            VOLTS_COLUMN_NAME => self.volts.as_slice()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::frame_for as frame;

    fn calibration(visible_length: usize) -> Calibration {
        Calibration {
            volts_per_div: 0.5,
            offset: 0.0,
            sample_rate: 1e6,
            visible_length,
        }
    }

    #[test]
    fn test_code_to_volts() {
        let cal = calibration(200);
        assert!((cal.code_to_volts(decode_sample(200), OffsetSign::Subtract) + 1.12).abs() < 1e-12);
        assert!((cal.code_to_volts(25, OffsetSign::Subtract) - 0.5).abs() < 1e-12);

        let offset = Calibration { offset: 0.25, ..cal };
        assert!((offset.code_to_volts(25, OffsetSign::Subtract) - 0.25).abs() < 1e-12);
        assert!((offset.code_to_volts(25, OffsetSign::Add) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_time_axis_is_centered() {
        let cal = calibration(200);
        assert!((cal.index_to_time(0) + 1e-4).abs() < 1e-15);
        assert_eq!(cal.index_to_time(100), 0.0);
        assert!((cal.index_to_time(199) - 9.9e-5).abs() < 1e-15);
    }

    #[test]
    fn test_decode_takes_visible_window_only() {
        let mut payload = vec![0u8; 1000];
        payload[400..600].fill(200);
        let raw = frame(&payload);
        let parsed = WaveformFrame::parse(&raw).unwrap();

        let wave = Waveform::decode(
            &parsed,
            &calibration(200),
            WindowPlacement::Centered,
            OffsetSign::Subtract,
        )
        .unwrap();

        assert_eq!(wave.len(), 200);
        assert!(wave.volts().iter().all(|v| (v + 1.12).abs() < 1e-12));
        assert!(wave.time().windows(2).all(|pair| pair[0] < pair[1]));
        assert!((wave.time()[0] + 1e-4).abs() < 1e-15);
    }

    #[test]
    fn test_decode_rejects_oversized_window() {
        let raw = frame(&[0u8; 10]);
        let parsed = WaveformFrame::parse(&raw).unwrap();
        let result = Waveform::decode(
            &parsed,
            &calibration(20),
            WindowPlacement::Centered,
            OffsetSign::Subtract,
        );
        assert!(matches!(result, Err(FrameError::WindowOutOfRange { .. })));
    }

    #[test]
    fn test_to_dataframe() {
        let raw = frame(&[0, 25, 231, 0]);
        let parsed = WaveformFrame::parse(&raw).unwrap();
        let wave = Waveform::decode(
            &parsed,
            &calibration(4),
            WindowPlacement::Centered,
            OffsetSign::Subtract,
        )
        .unwrap();

        let df = wave.to_dataframe().unwrap();
        assert_eq!(df.height(), 4);
        assert_eq!(df.width(), 2);

        let volts: Vec<f64> = df
            .column(VOLTS_COLUMN_NAME)
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(volts, wave.volts());
        assert_eq!(wave.iter().count(), 4);
    }
}
