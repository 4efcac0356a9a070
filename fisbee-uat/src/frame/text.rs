use crate::{
    config::DecoderConfig,
    dlac,
};

/// Generic textual product.
///
/// The whole APDU body is DLAC text, e.g. `METAR KSEA 191853Z ...`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TextProduct {
    pub reports: Vec<String>,
}

impl TextProduct {
    pub fn decode(body: &[u8], config: &DecoderConfig) -> Self {
        let text = config.decode_text(body, body.len() * 8);
        Self {
            reports: dlac::split_reports(&text),
        }
    }
}
