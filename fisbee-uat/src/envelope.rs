//! Capture record parser
//!
//! One uplink per line:
//!
//! ```plain
//! +<hex payload>;rs=<int>;ss=<int>
//! ```
//!
//! The `;` after the payload is mandatory, even without metadata.

use std::str::FromStr;

use crate::UplinkMessage;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Direction(#[from] DirectionError),
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum FormatError {
    #[error("missing ';' after the payload")]
    MissingSeparator,

    #[error("invalid hex payload")]
    InvalidHex(#[from] hex::FromHexError),
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DirectionError {
    #[error("not an uplink frame: sign {sign:?}")]
    NotUplink { sign: Option<char> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Direction {
    Uplink,
    Downlink,
}

impl Direction {
    pub fn from_sign(sign: char) -> Option<Self> {
        match sign {
            '+' => Some(Self::Uplink),
            '-' => Some(Self::Downlink),
            _ => None,
        }
    }
}

/// Parses a capture record into an uplink message.
///
/// Payloads shorter than [`UPLINK_FRAME_DATA_BYTES`][crate::UPLINK_FRAME_DATA_BYTES]
/// are zero-padded, longer ones are truncated. Downlink records are rejected.
pub fn parse(raw: &str) -> Result<UplinkMessage, ParseError> {
    let raw = raw.trim_end_matches(['\r', '\n']);

    let (data, metadata) = raw.split_once(';').ok_or(FormatError::MissingSeparator)?;

    let mut chars = data.chars();
    let sign = chars.next();
    match sign.and_then(Direction::from_sign) {
        Some(Direction::Uplink) => {}
        _ => return Err(DirectionError::NotUplink { sign }.into()),
    }

    let payload = hex::decode(chars.as_str()).map_err(FormatError::from)?;

    let mut rs_errors = None;
    let mut signal_strength = None;
    for token in metadata.split(';').filter(|token| !token.is_empty()) {
        let Some((key, value)) = token.split_once('=')
        else {
            tracing::debug!(token, "ignoring metadata token without value");
            continue;
        };

        let target = match key {
            "rs" => &mut rs_errors,
            "ss" => &mut signal_strength,
            _ => continue,
        };
        match value.trim().parse::<i32>() {
            Ok(value) => *target = Some(value),
            Err(error) => tracing::debug!(key, value, ?error, "ignoring invalid metadata value"),
        }
    }

    Ok(UplinkMessage::from_payload(&payload)
        .with_rs_errors(rs_errors)
        .with_signal_strength(signal_strength))
}

impl FromStr for UplinkMessage {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}
