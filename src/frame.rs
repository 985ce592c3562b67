//! Layout of the block returned by `C<n>:WF? DAT2`:
//!
//! ```text
//! offset  0..3    "ALL"
//! offset  3..6    ",#9" (not checked)
//! offset  6..15   payload length, 9 ASCII decimal digits
//! offset 15..N-2  payload, one signed 8-bit code per sample
//! offset N-2..N   0x0A 0x0A
//! ```

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("Frame of {0} bytes is shorter than header and trailer")]
    Truncated(usize),

    #[error("Frame does not start with the 'ALL' marker")]
    BadMarker,

    #[error("Frame length field is not a 9 digit decimal number")]
    BadLengthField,

    #[error("Frame declares {declared} payload bytes but carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("Frame does not end with the 0x0A 0x0A trailer")]
    BadTrailer,

    #[error("Visible window of {visible} samples does not fit in a payload of {payload}")]
    WindowOutOfRange { visible: usize, payload: usize },
}

/// Where the on-screen trace sits inside the captured buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowPlacement {
    /// Centred in the payload, the layout of the `DAT2` transfer.
    #[default]
    Centered,
    /// Starting at the first payload byte.
    Leading,
}

/// A validated waveform frame borrowing the payload of the raw block.
#[derive(Debug, Clone, Copy)]
pub struct WaveformFrame<'a> {
    payload: &'a [u8],
}

impl<'a> WaveformFrame<'a> {
    pub const MARKER: &'static [u8; 3] = b"ALL";
    pub const LENGTH_FIELD: std::ops::Range<usize> = 6..15;
    pub const HEADER_LEN: usize = 15;
    pub const TRAILER: [u8; 2] = [0x0A, 0x0A];

    /// Check marker, length field and trailer. Any violation rejects the
    /// whole block.
    pub fn parse(raw: &'a [u8]) -> Result<Self, FrameError> {
        let overhead = Self::HEADER_LEN + Self::TRAILER.len();
        if raw.len() < overhead {
            return Err(FrameError::Truncated(raw.len()));
        }

        let declared = Self::declared_length(raw)?;

        let (body, trailer) = raw.split_at(raw.len() - Self::TRAILER.len());
        if trailer != Self::TRAILER {
            return Err(FrameError::BadTrailer);
        }

        let payload = &body[Self::HEADER_LEN..];
        if declared != payload.len() {
            return Err(FrameError::LengthMismatch {
                declared,
                actual: payload.len(),
            });
        }

        Ok(Self { payload })
    }

    /// Payload length announced by the header at the start of `raw`.
    pub fn declared_length(raw: &[u8]) -> Result<usize, FrameError> {
        if raw.len() < Self::HEADER_LEN {
            return Err(FrameError::Truncated(raw.len()));
        }

        if &raw[..Self::MARKER.len()] != Self::MARKER {
            return Err(FrameError::BadMarker);
        }

        let length_field = &raw[Self::LENGTH_FIELD];
        if !length_field.iter().all(u8::is_ascii_digit) {
            return Err(FrameError::BadLengthField);
        }
        std::str::from_utf8(length_field)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or(FrameError::BadLengthField)
    }

    /// Total size of the block whose header starts `raw`, trailer included.
    /// `None` until a full, well formed header is present.
    pub fn expected_size(raw: &[u8]) -> Option<usize> {
        let declared = Self::declared_length(raw).ok()?;
        Some(Self::HEADER_LEN + declared + Self::TRAILER.len())
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// The `visible` bytes shown on screen.
    pub fn visible_window(
        &self,
        visible: usize,
        placement: WindowPlacement,
    ) -> Result<&'a [u8], FrameError> {
        let start = window_start(self.payload.len(), visible, placement).ok_or(
            FrameError::WindowOutOfRange {
                visible,
                payload: self.payload.len(),
            },
        )?;
        Ok(&self.payload[start..start + visible])
    }
}

/// `floor(payload/2 - visible/2)` for a centred window, `None` if the
/// window is larger than the payload.
pub fn window_start(payload: usize, visible: usize, placement: WindowPlacement) -> Option<usize> {
    let slack = payload.checked_sub(visible)?;
    Some(match placement {
        WindowPlacement::Centered => slack / 2,
        WindowPlacement::Leading => 0,
    })
}

/// Interpret a transferred byte as a two's-complement code in `-128..=127`.
pub fn decode_sample(byte: u8) -> i8 {
    byte as i8
}
