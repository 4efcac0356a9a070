//! Text report aggregation across information frames.

use crate::{
    UplinkMessage,
    config::DecoderConfig,
    frame::{
        DecodeError,
        InformationFrame,
    },
};

/// Collects the non-empty text reports of `frames`, in frame order and then
/// report order.
pub fn collect_reports<'a>(frames: impl IntoIterator<Item = &'a InformationFrame>) -> Vec<String> {
    frames
        .into_iter()
        .flat_map(InformationFrame::text)
        .filter(|report| !report.is_empty())
        .cloned()
        .collect()
}

impl UplinkMessage {
    /// All text reports of this uplink, decoding it first if necessary.
    pub fn text_reports(&self) -> Result<Vec<String>, DecodeError> {
        self.text_reports_with(&DecoderConfig::default())
    }

    pub fn text_reports_with(&self, config: &DecoderConfig) -> Result<Vec<String>, DecodeError> {
        let decoded = self.decode_with(config)?;
        Ok(collect_reports(&decoded.frames))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        UplinkMessage,
        config::DecoderConfig,
        frame::{
            FisBApdu,
            FrameType,
            FramePayload,
            InformationFrame,
            Product,
            apdu::ApduHeader,
            tests::{
                apdu_frame,
                frame,
                text_frame,
            },
            text::TextProduct,
            twgo::tests::text_record_body,
        },
        tests::capture,
    };

    fn text_product(reports: &[&str]) -> InformationFrame {
        let mut buffer = &[0x06, 0x74, 0x4b, 0x50][..];
        InformationFrame {
            frame_type: FrameType::FisB,
            payload: FramePayload::FisB(FisBApdu {
                header: ApduHeader::decode(&mut buffer).unwrap(),
                product: Product::Text(TextProduct {
                    reports: reports.iter().map(|report| report.to_string()).collect(),
                }),
            }),
        }
    }

    #[test]
    fn it_collects_non_empty_reports_in_order() {
        let message = UplinkMessage::with_frames(vec![
            text_product(&["Text1", "Text2", ""]),
            text_product(&["Text3"]),
        ]);
        assert!(message.is_decoded());
        assert_eq!(message.text_reports().unwrap(), ["Text1", "Text2", "Text3"]);
    }

    #[test]
    fn it_decodes_only_once() {
        let message: UplinkMessage = capture(&[
            text_frame("METAR KSEA 191853Z\x1e\x1eMETAR KBFI 191853Z\x03"),
            frame(15, &[1, 2, 3]),
            apdu_frame(11, false, &text_record_body("AIRMET TANGO\x03")),
        ])
        .parse()
        .unwrap();

        let first = message.text_reports().unwrap();
        let frames = message.frames().as_ptr();
        let second = message.text_reports_with(&DecoderConfig::strict()).unwrap();

        assert_eq!(
            first,
            ["METAR KSEA 191853Z", "METAR KBFI 191853Z", "AIRMET TANGO"]
        );
        assert_eq!(first, second);
        assert_eq!(message.frames().as_ptr(), frames);
    }

    #[test]
    fn it_returns_no_reports_on_error() {
        let message: UplinkMessage = capture(&[text_frame("FIRST\x03"), frame(0, &[0x06])])
            .parse()
            .unwrap();

        assert!(
            message
                .text_reports_with(&DecoderConfig::strict())
                .is_err()
        );
        assert!(message.text_reports().is_err());
        assert_eq!(message.text_reports_with(&DecoderConfig::default()), message.text_reports());
    }

    #[test]
    fn it_skips_malformed_frames_by_default() {
        let message: UplinkMessage = capture(&[text_frame("FIRST\x03"), frame(0, &[0x06])])
            .parse()
            .unwrap();
        assert_eq!(message.text_reports().unwrap(), ["FIRST"]);
    }
}
