//! FIS-B uplink decoder
//!
//! Decodes UAT ground uplinks as captured by a 978 MHz receiver: the capture
//! record envelope, the uplink header, the information frames carried in the
//! application data, and the FIS-B products inside them (textual METAR/TAF,
//! and text with graphical overlay products like AIRMET and NOTAM-TFR).
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let line = "";
//! let message: fisbee_uat::UplinkMessage = line.parse()?;
//! for report in message.text_reports()? {
//!     println!("{report}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! - DO-358B - FIS-B message formats
//! - DO-282B - UAT MOPS, uplink header and information frames

pub mod airmet;
pub mod config;
pub mod dlac;
pub mod envelope;
pub mod frame;
pub mod header;
pub mod reports;
pub(crate) mod util;

use std::sync::OnceLock;

pub use crate::{
    config::{
        DecoderConfig,
        MalformedFramePolicy,
    },
    envelope::{
        Direction,
        DirectionError,
        FormatError,
        ParseError,
        parse,
    },
    frame::{
        DecodeError,
        InformationFrame,
    },
    header::UplinkHeader,
};
use crate::util::BufReadBytesExt;

/// Length of the data in an uplink frame, after FEC has been removed.
pub const UPLINK_FRAME_DATA_BYTES: usize = 432;

/// A single ground uplink.
///
/// Only uplinks are represented; downlink records are rejected by [`parse`].
/// The payload is always exactly [`UPLINK_FRAME_DATA_BYTES`] long. Frames are
/// decoded on first use, and the result of the first decode is kept for the
/// lifetime of the message. Decoding from multiple threads is safe.
#[derive(Clone, Debug)]
pub struct UplinkMessage {
    payload: [u8; UPLINK_FRAME_DATA_BYTES],
    rs_errors: Option<i32>,
    signal_strength: Option<i32>,
    decoded: OnceLock<Result<DecodedUplink, DecodeError>>,
}

impl UplinkMessage {
    /// Creates an uplink from raw payload bytes, zero-padding or truncating
    /// them to [`UPLINK_FRAME_DATA_BYTES`].
    pub fn from_payload(data: &[u8]) -> Self {
        let mut payload = [0; UPLINK_FRAME_DATA_BYTES];
        let length = data.len().min(UPLINK_FRAME_DATA_BYTES);
        payload[..length].copy_from_slice(&data[..length]);

        Self {
            payload,
            rs_errors: None,
            signal_strength: None,
            decoded: OnceLock::new(),
        }
    }

    pub fn with_rs_errors(mut self, rs_errors: Option<i32>) -> Self {
        self.rs_errors = rs_errors.filter(|value| *value >= 0);
        self
    }

    pub fn with_signal_strength(mut self, signal_strength: Option<i32>) -> Self {
        self.signal_strength = signal_strength.filter(|value| *value >= 0);
        self
    }

    pub fn payload(&self) -> &[u8; UPLINK_FRAME_DATA_BYTES] {
        &self.payload
    }

    /// Number of byte errors corrected by FEC, if known.
    ///
    /// Negative values are treated as unknown.
    pub fn rs_errors(&self) -> Option<i32> {
        self.rs_errors
    }

    /// Relative signal strength, if known.
    ///
    /// Negative values are treated as unknown.
    pub fn signal_strength(&self) -> Option<i32> {
        self.signal_strength
    }

    /// Decodes the uplink with the default configuration.
    pub fn decode(&self) -> Result<&DecodedUplink, DecodeError> {
        self.decode_with(&DecoderConfig::default())
    }

    /// Decodes the uplink.
    ///
    /// Only the first call decodes. Later calls return the first result,
    /// regardless of `config`.
    pub fn decode_with(&self, config: &DecoderConfig) -> Result<&DecodedUplink, DecodeError> {
        self.decoded
            .get_or_init(|| DecodedUplink::decode(&self.payload, config))
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn is_decoded(&self) -> bool {
        self.decoded.get().is_some()
    }

    /// Decoded frames. Empty if the uplink hasn't been decoded yet, or if
    /// decoding failed.
    pub fn frames(&self) -> &[InformationFrame] {
        match self.decoded.get() {
            Some(Ok(decoded)) => &decoded.frames,
            _ => &[],
        }
    }

    pub fn header(&self) -> Option<&UplinkHeader> {
        match self.decoded.get() {
            Some(Ok(decoded)) => Some(&decoded.header),
            _ => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_frames(frames: Vec<InformationFrame>) -> Self {
        let decoded = DecodedUplink {
            header: UplinkHeader::decode(&[0; header::UPLINK_HEADER_BYTES]),
            frames,
        };
        Self {
            decoded: OnceLock::from(Ok(decoded)),
            ..Self::from_payload(&[])
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DecodedUplink {
    pub header: UplinkHeader,
    pub frames: Vec<InformationFrame>,
}

impl DecodedUplink {
    fn decode(
        payload: &[u8; UPLINK_FRAME_DATA_BYTES],
        config: &DecoderConfig,
    ) -> Result<Self, DecodeError> {
        let mut buffer = &payload[..];
        let header = UplinkHeader::decode(&buffer.try_get_bytes()?);

        let frames = if header.application_data_valid {
            frame::segment(buffer, config)?
        }
        else {
            tracing::debug!(slot_id = header.slot_id, "application data not valid");
            vec![]
        };

        Ok(Self { header, frames })
    }
}
