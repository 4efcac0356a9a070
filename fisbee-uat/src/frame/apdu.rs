//! FIS-B APDU header

use std::fmt::{
    Display,
    Formatter,
};

use bytes::Buf;

use crate::{
    frame::DecodeError,
    util::BufReadBytesExt,
};

/// Product id of generic textual weather (METAR, TAF, PIREP, winds aloft).
pub const PRODUCT_TEXT: u16 = 413;

/// ```plain
/// byte         0        1        2
/// bit   01234567 01234567 01234567
/// value agpiiiii iiiiiist t.......
/// ```
///
/// - a: application method flag
/// - g: geographic location flag
/// - p: provider specific flag
/// - i: product id (11 bits)
/// - s: segmentation flag
/// - t: time option (2 bits)
///
/// Followed by the product time, whose layout depends on the time option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ApduHeader {
    pub application_method: bool,
    pub geographic_location: bool,
    pub provider_specific: bool,
    pub segmented: bool,
    pub product_id: u16,
    pub time: ApduTime,
}

impl ApduHeader {
    pub fn decode<B: Buf>(buffer: &mut B) -> Result<Self, DecodeError> {
        let [byte_0, byte_1, byte_2]: [u8; 3] = buffer.try_get_bytes()?;

        let time_option = ((byte_1 & 0b1) << 1) | (byte_2 >> 7);
        let time = match time_option {
            0 => {
                let byte_3 = buffer.try_get_u8()?;
                ApduTime {
                    hours: (byte_2 & 0b01111100) >> 2,
                    minutes: ((byte_2 & 0b11) << 4) | (byte_3 >> 4),
                    ..Default::default()
                }
            }
            1 => {
                let [byte_3, byte_4]: [u8; 2] = buffer.try_get_bytes()?;
                ApduTime {
                    hours: (byte_2 & 0b01111100) >> 2,
                    minutes: ((byte_2 & 0b11) << 4) | (byte_3 >> 4),
                    seconds: Some(((byte_3 & 0b1111) << 2) | (byte_4 >> 6)),
                    ..Default::default()
                }
            }
            2 => {
                let [byte_3, byte_4]: [u8; 2] = buffer.try_get_bytes()?;
                ApduTime {
                    month: Some((byte_2 & 0b01111000) >> 3),
                    day: Some(((byte_2 & 0b111) << 2) | (byte_3 >> 6)),
                    hours: (byte_3 & 0b00111110) >> 1,
                    minutes: ((byte_3 & 0b1) << 5) | (byte_4 >> 3),
                    seconds: None,
                }
            }
            _ => {
                let [byte_3, byte_4, byte_5]: [u8; 3] = buffer.try_get_bytes()?;
                ApduTime {
                    month: Some((byte_2 & 0b01111000) >> 3),
                    day: Some(((byte_2 & 0b111) << 2) | (byte_3 >> 6)),
                    hours: (byte_3 & 0b00111110) >> 1,
                    minutes: ((byte_3 & 0b1) << 5) | (byte_4 >> 3),
                    seconds: Some(((byte_4 & 0b111) << 3) | (byte_5 >> 5)),
                }
            }
        };

        Ok(Self {
            application_method: byte_0 & 0b10000000 != 0,
            geographic_location: byte_0 & 0b01000000 != 0,
            provider_specific: byte_0 & 0b00100000 != 0,
            segmented: byte_1 & 0b10 != 0,
            product_id: (u16::from(byte_0 & 0b00011111) << 6) | u16::from(byte_1 >> 2),
            time,
        })
    }
}

/// Product valid time. Which fields are present depends on the time option.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ApduTime {
    pub month: Option<u8>,
    pub day: Option<u8>,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: Option<u8>,
}

impl Display for ApduTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let (Some(month), Some(day)) = (self.month, self.day) {
            write!(f, "{month:02}-{day:02} ")?;
        }
        write!(f, "{:02}:{:02}", self.hours, self.minutes)?;
        if let Some(seconds) = self.seconds {
            write!(f, ":{seconds:02}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        frame::{
            DecodeError,
            apdu::{
                ApduHeader,
                ApduTime,
                PRODUCT_TEXT,
            },
        },
        util::tests::BitWriter,
    };

    #[test]
    fn it_decodes_hours_and_minutes() {
        // product 413, time option 0, 18:53
        let mut buffer = &[0x06, 0x74, 0x4b, 0x50, 0xaa][..];
        let header = ApduHeader::decode(&mut buffer).unwrap();
        assert_eq!(header.product_id, PRODUCT_TEXT);
        assert!(!header.segmented);
        assert_eq!(
            header.time,
            ApduTime {
                hours: 18,
                minutes: 53,
                ..Default::default()
            }
        );
        assert_eq!(header.time.to_string(), "18:53");
        assert_eq!(buffer, &[0xaa]);
    }

    #[test]
    fn it_decodes_month_day_hours_minutes_seconds() {
        // product 11, time option 3, 10-19 18:53:42
        let mut buffer = &[0x00, 0x2f, 0xd4, 0xe5, 0xad, 0x40][..];
        let header = ApduHeader::decode(&mut buffer).unwrap();
        assert_eq!(header.product_id, 11);
        assert!(header.segmented);
        assert_eq!(header.time.to_string(), "10-19 18:53:42");
        assert!(buffer.is_empty());
    }

    #[test]
    fn it_decodes_hours_minutes_seconds() {
        let bytes = BitWriter::default()
            .bits(0b100, 3)
            .bits(8, 11)
            .bits(0, 1)
            .bits(1, 2)
            .bits(7, 5)
            .bits(5, 6)
            .bits(59, 6)
            .bits(0, 6)
            .bytes(&[0xaa])
            .finish();
        let mut buffer = &bytes[..];
        let header = ApduHeader::decode(&mut buffer).unwrap();

        assert!(header.application_method);
        assert!(!header.geographic_location);
        assert_eq!(header.product_id, 8);
        assert_eq!(
            header.time,
            ApduTime {
                hours: 7,
                minutes: 5,
                seconds: Some(59),
                ..Default::default()
            }
        );
        assert_eq!(header.time.to_string(), "07:05:59");
        assert_eq!(buffer, &[0xaa]);
    }

    #[test]
    fn it_decodes_month_day_hours_minutes() {
        let bytes = BitWriter::default()
            .bits(0, 3)
            .bits(14, 11)
            .bits(0, 1)
            .bits(2, 2)
            .bits(12, 4)
            .bits(31, 5)
            .bits(23, 5)
            .bits(59, 6)
            .bits(0, 3)
            .bytes(&[0xaa])
            .finish();
        let mut buffer = &bytes[..];
        let header = ApduHeader::decode(&mut buffer).unwrap();

        assert_eq!(header.product_id, 14);
        assert_eq!(
            header.time,
            ApduTime {
                month: Some(12),
                day: Some(31),
                hours: 23,
                minutes: 59,
                seconds: None,
            }
        );
        assert_eq!(header.time.to_string(), "12-31 23:59");
        assert_eq!(buffer, &[0xaa]);
    }

    #[test]
    fn it_rejects_a_truncated_header() {
        let mut buffer = &[0x06, 0x75, 0xc8, 0xd0][..];
        assert!(matches!(
            ApduHeader::decode(&mut buffer),
            Err(DecodeError::Truncated { .. })
        ));
    }
}
