//! Information frame segmentation and product dispatch
//!
//! The application data of an uplink (payload bytes 8 to 432) is a sequence
//! of information frames. Each frame starts with a 2 byte header:
//!
//! ```plain
//! byte         0        1
//! bit   01234567 01234567
//! value llllllll lrrrtttt
//! ```
//!
//! - l: frame length (9 bits), not counting the header
//! - r: reserved
//! - t: frame type
//!
//! A header with length 0 and type 0 ends the sequence. FIS-B frames (type 0)
//! carry an APDU, whose product id selects the product decoder.

pub mod apdu;
pub mod text;
pub mod twgo;

use bytes::{
    Buf,
    TryGetError,
};

use crate::{
    config::{
        DecoderConfig,
        MalformedFramePolicy,
    },
    frame::{
        apdu::{
            ApduHeader,
            ApduTime,
            PRODUCT_TEXT,
        },
        text::TextProduct,
        twgo::{
            Geometry,
            Record,
            TwgoProduct,
        },
    },
    util::{
        BufReadBytesExt,
        take_slice,
    },
};

/// Length of an information frame header.
pub const FRAME_HEADER_BYTES: usize = 2;

/// Upper bound on the number of information frames in one uplink.
pub const MAX_INFORMATION_FRAMES: usize = 70;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("expected {expected_length} bytes, but buffer is only {buffer_length} bytes long")]
    Truncated {
        expected_length: usize,
        buffer_length: usize,
    },

    #[error(
        "information frame at offset {offset} is {length} bytes long, but only {remaining} bytes remain"
    )]
    FrameOverrun {
        offset: usize,
        length: usize,
        remaining: usize,
    },

    #[error("invalid record length: {length}")]
    InvalidRecordLength { length: u16 },
}

impl From<TryGetError> for DecodeError {
    fn from(error: TryGetError) -> Self {
        Self::Truncated {
            expected_length: error.requested,
            buffer_length: error.available,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FrameType {
    FisB,
    Developmental,
    /// TIS-B/ADS-R service status
    ServiceStatus,
    Reserved(u8),
}

impl FrameType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::FisB,
            14 => Self::Developmental,
            15 => Self::ServiceStatus,
            _ => Self::Reserved(value),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InformationFrame {
    pub frame_type: FrameType,
    pub payload: FramePayload,
}

impl InformationFrame {
    pub fn decode(
        frame_type: FrameType,
        body: &[u8],
        config: &DecoderConfig,
    ) -> Result<Self, DecodeError> {
        let payload = match frame_type {
            FrameType::FisB => FramePayload::FisB(FisBApdu::decode(body, config)?),
            _ => FramePayload::Raw(body.to_vec()),
        };
        Ok(Self {
            frame_type,
            payload,
        })
    }

    pub fn apdu(&self) -> Option<&FisBApdu> {
        match &self.payload {
            FramePayload::FisB(apdu) => Some(apdu),
            FramePayload::Raw(_) => None,
        }
    }

    pub fn product_id(&self) -> Option<u16> {
        self.apdu().map(|apdu| apdu.header.product_id)
    }

    /// Text reports carried by this frame, including empty placeholders.
    pub fn text(&self) -> &[String] {
        match self.apdu().map(|apdu| &apdu.product) {
            Some(Product::Text(product)) => &product.reports,
            Some(Product::Twgo(product)) => product.reports(),
            _ => &[],
        }
    }

    pub fn start_time(&self) -> Option<&str> {
        self.graphical().and_then(|record| record.start.as_deref())
    }

    pub fn end_time(&self) -> Option<&str> {
        self.graphical().and_then(|record| record.end.as_deref())
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.graphical()
            .and_then(|record| record.geometry.as_ref())
    }

    fn graphical(&self) -> Option<&twgo::GraphicalRecord> {
        match self.apdu().map(|apdu| &apdu.product) {
            Some(Product::Twgo(TwgoProduct {
                record: Record::Graphical(record),
                ..
            })) => Some(record),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FramePayload {
    FisB(FisBApdu),
    /// Body of a frame that isn't FIS-B.
    Raw(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FisBApdu {
    pub header: ApduHeader,
    pub product: Product,
}

impl FisBApdu {
    pub fn decode(body: &[u8], config: &DecoderConfig) -> Result<Self, DecodeError> {
        let mut buffer = body;
        let header = ApduHeader::decode(&mut buffer)?;

        let product = if header.segmented {
            Product::Segmented(buffer.to_vec())
        }
        else if let Some((_, decoder)) = PRODUCT_DECODERS
            .iter()
            .find(|(product_id, _)| *product_id == header.product_id)
        {
            decoder(buffer, config)?
        }
        else {
            tracing::debug!(product_id = header.product_id, "unsupported product");
            Product::Unsupported(buffer.to_vec())
        };

        Ok(Self { header, product })
    }

    pub fn time(&self) -> &ApduTime {
        &self.header.time
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Product {
    Text(TextProduct),
    Twgo(TwgoProduct),
    /// One segment of a product that spans multiple APDUs.
    Segmented(Vec<u8>),
    Unsupported(Vec<u8>),
}

type ProductDecoder = fn(&[u8], &DecoderConfig) -> Result<Product, DecodeError>;

/// Product decoders by product id.
const PRODUCT_DECODERS: &[(u16, ProductDecoder)] = &[
    (PRODUCT_TEXT, decode_text_product),
    // NOTAM-TFR
    (8, decode_twgo_product),
    // AIRMET
    (11, decode_twgo_product),
    // SIGMET
    (12, decode_twgo_product),
    // G-AIRMET
    (14, decode_twgo_product),
    // CWA
    (15, decode_twgo_product),
    // NOTAM-TRA
    (16, decode_twgo_product),
    // NOTAM-TMOA
    (17, decode_twgo_product),
];

fn decode_text_product(body: &[u8], config: &DecoderConfig) -> Result<Product, DecodeError> {
    Ok(Product::Text(TextProduct::decode(body, config)))
}

fn decode_twgo_product(body: &[u8], config: &DecoderConfig) -> Result<Product, DecodeError> {
    Ok(Product::Twgo(TwgoProduct::decode(body, config)?))
}

/// Splits application data into information frames and decodes them.
pub(crate) fn segment(
    application_data: &[u8],
    config: &DecoderConfig,
) -> Result<Vec<InformationFrame>, DecodeError> {
    let mut buffer = application_data;
    let mut frames = vec![];

    for _ in 0..MAX_INFORMATION_FRAMES {
        if buffer.remaining() < FRAME_HEADER_BYTES {
            break;
        }

        let offset = application_data.len() - buffer.remaining();
        let [byte_0, byte_1]: [u8; 2] = buffer.try_get_bytes()?;
        let length = (usize::from(byte_0) << 1) | usize::from(byte_1 >> 7);
        let frame_type = byte_1 & 0b1111;

        if length == 0 && frame_type == 0 {
            break;
        }

        let Ok(body) = take_slice(&mut buffer, length)
        else {
            let error = DecodeError::FrameOverrun {
                offset,
                length,
                remaining: buffer.remaining(),
            };
            match config.malformed_frames {
                MalformedFramePolicy::Skip => {
                    tracing::warn!(?error, "information frame overruns the payload");
                    break;
                }
                MalformedFramePolicy::Abort => return Err(error),
            }
        };

        let frame_type = FrameType::from_u8(frame_type);
        match InformationFrame::decode(frame_type, body, config) {
            Ok(frame) => frames.push(frame),
            Err(error) => {
                match config.malformed_frames {
                    MalformedFramePolicy::Skip => {
                        tracing::debug!(offset, ?frame_type, ?error, "skipping malformed frame");
                    }
                    MalformedFramePolicy::Abort => return Err(error),
                }
            }
        }
    }

    Ok(frames)
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::{
        config::DecoderConfig,
        dlac::tests::encode,
        frame::{
            DecodeError,
            FramePayload,
            FrameType,
            Product,
            segment,
            twgo::tests::{
                polygon_body,
                text_record_body,
            },
        },
        util::tests::BitWriter,
    };

    /// Information frame header followed by `body`.
    pub fn frame(frame_type: u32, body: &[u8]) -> Vec<u8> {
        BitWriter::default()
            .bits(body.len() as u32, 9)
            .bits(0, 3)
            .bits(frame_type, 4)
            .bytes(body)
            .finish()
    }

    /// FIS-B frame with an 18:53 APDU header.
    pub fn apdu_frame(product_id: u32, segmented: bool, body: &[u8]) -> Vec<u8> {
        let apdu = BitWriter::default()
            .bits(0, 3)
            .bits(product_id, 11)
            .bits(segmented.into(), 1)
            .bits(0, 2)
            .bits(18, 5)
            .bits(53, 6)
            .bits(0, 4)
            .bytes(body)
            .finish();
        frame(0, &apdu)
    }

    pub fn text_frame(text: &str) -> Vec<u8> {
        apdu_frame(413, false, &encode(text).0)
    }

    pub fn application_data(frames: &[Vec<u8>]) -> Vec<u8> {
        let mut data = frames.concat();
        data.resize(424, 0);
        data
    }

    #[test]
    fn it_stops_at_the_terminator() {
        let frames = segment(&[0; 424], &DecoderConfig::default()).unwrap();
        assert!(frames.is_empty());
    }

    #[test]
    fn it_decodes_text_frames_in_order() {
        let data = application_data(&[
            text_frame("METAR KSEA 191853Z\x1eMETAR KBFI 191853Z\x03"),
            text_frame("TAF KPDX 191720Z\x03"),
        ]);
        let frames = segment(&data, &DecoderConfig::default()).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].frame_type, FrameType::FisB);
        assert_eq!(frames[0].product_id(), Some(413));
        assert_eq!(frames[0].text()[..2], ["METAR KSEA 191853Z", "METAR KBFI 191853Z"]);
        assert_eq!(frames[1].text()[0], "TAF KPDX 191720Z");
        assert_eq!(
            frames[1].apdu().unwrap().time().to_string(),
            "18:53"
        );
    }

    #[test]
    fn it_dispatches_twgo_products() {
        let data = application_data(&[
            apdu_frame(11, false, &text_record_body("AIRMET TANGO\x03")),
            apdu_frame(
                8,
                false,
                &polygon_body(&[(47.5, -122.25, 1000), (46.0, -121.0, 1000)]),
            ),
        ]);
        let frames = segment(&data, &DecoderConfig::default()).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].text()[0], "AIRMET TANGO");
        assert!(frames[0].geometry().is_none());
        assert_eq!(frames[1].product_id(), Some(8));
        assert!(frames[1].text().is_empty());
        assert_eq!(frames[1].start_time(), Some("10-19 18:00"));
        assert_eq!(frames[1].end_time(), Some("10-20 00:00"));
        assert_eq!(frames[1].geometry().unwrap().vertices.len(), 2);
    }

    #[test]
    fn it_keeps_unsupported_and_segmented_products() {
        let data = application_data(&[
            apdu_frame(63, false, &[1, 2, 3]),
            apdu_frame(413, true, &[4, 5]),
            frame(15, &[6, 7, 8]),
        ]);
        let frames = segment(&data, &DecoderConfig::default()).unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(
            frames[0].apdu().unwrap().product,
            Product::Unsupported(vec![1, 2, 3])
        );
        assert_eq!(frames[1].apdu().unwrap().product, Product::Segmented(vec![4, 5]));
        assert_eq!(frames[2].frame_type, FrameType::ServiceStatus);
        assert_eq!(frames[2].payload, FramePayload::Raw(vec![6, 7, 8]));
        assert!(frames.iter().all(|frame| frame.text().is_empty()));
    }

    #[test]
    fn it_skips_malformed_frames() {
        let data = application_data(&[
            text_frame("FIRST\x03"),
            // APDU header needs 4 bytes
            frame(0, &[0x06, 0x74]),
            text_frame("THIRD\x03"),
        ]);
        let frames = segment(&data, &DecoderConfig::default()).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].text()[0], "FIRST");
        assert_eq!(frames[1].text()[0], "THIRD");
    }

    #[test]
    fn it_aborts_on_malformed_frames_when_strict() {
        let data = application_data(&[
            text_frame("FIRST\x03"),
            frame(0, &[0x06, 0x74]),
            text_frame("THIRD\x03"),
        ]);
        assert!(matches!(
            segment(&data, &DecoderConfig::strict()),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn it_handles_frames_overrunning_the_payload() {
        let mut data = application_data(&[text_frame("FIRST\x03")]);
        let offset = text_frame("FIRST\x03").len();
        // 500 byte frame of type 0
        data[offset] = 0xfa;
        data[offset + 1] = 0x00;

        let frames = segment(&data, &DecoderConfig::default()).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].text()[0], "FIRST");

        assert_eq!(
            segment(&data, &DecoderConfig::strict()),
            Err(DecodeError::FrameOverrun {
                offset,
                length: 500,
                remaining: 424 - offset - 2,
            })
        );
    }

    #[test]
    fn it_reads_at_most_70_frames() {
        let frames = (0..80).map(|_| frame(14, &[0xaa])).collect::<Vec<_>>();
        let data = frames.concat();
        let decoded = segment(&data, &DecoderConfig::default()).unwrap();
        assert_eq!(decoded.len(), 70);
        assert!(
            decoded
                .iter()
                .all(|frame| frame.frame_type == FrameType::Developmental)
        );
    }
}
