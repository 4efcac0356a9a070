//! Text with graphical overlay products (AIRMET, SIGMET, NOTAM-TFR, ...)
//!
//! Every product carries a record header, followed by either a DLAC text
//! record, or a graphical overlay record with geometry and applicability
//! times.

use bytes::Buf;

use crate::{
    airmet::{
        DateTimeFormat,
        lat_lng,
    },
    config::DecoderConfig,
    dlac,
    frame::DecodeError,
    util::{
        BufReadBytesExt,
        take_slice,
    },
};

/// Length of a date/time field slot in a graphical overlay record.
const DATE_TIME_FIELD_BYTES: usize = 4;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TwgoProduct {
    pub record_format: RecordFormat,
    pub product_version: u8,
    pub record_count: u8,
    pub location_identifier: String,
    pub record_reference: u8,
    pub record: Record,
}

impl TwgoProduct {
    /// Decodes the product from an APDU body.
    ///
    /// ```plain
    /// byte         0        1        2        3        4        5
    /// bit   01234567 01234567 01234567 01234567 01234567 01234567
    /// value ffffvvvv cccc.... llllllll llllllll llllllll rrrrrrrr
    /// ```
    ///
    /// - f: record format
    /// - v: product version
    /// - c: record count
    /// - l: location identifier (4 DLAC symbols)
    /// - r: record reference
    pub fn decode(body: &[u8], config: &DecoderConfig) -> Result<Self, DecodeError> {
        let mut buffer = body;
        let [byte_0, byte_1]: [u8; 2] = buffer.try_get_bytes()?;
        let location_identifier: [u8; 3] = buffer.try_get_bytes()?;
        let record_reference = buffer.try_get_u8()?;

        let record_format = RecordFormat::from_u8(byte_0 >> 4);
        let record_count = byte_1 >> 4;

        let record = if record_count != 1 {
            tracing::debug!(record_count, "multiple records are not supported");
            Record::Unsupported
        }
        else {
            match record_format {
                RecordFormat::DlacText => Record::Text(TextRecord::decode(&mut buffer, config)?),
                RecordFormat::GraphicalOverlay => {
                    Record::Graphical(GraphicalRecord::decode(&mut buffer)?)
                }
                _ => {
                    tracing::debug!(?record_format, "unsupported record format");
                    Record::Unsupported
                }
            }
        };

        Ok(Self {
            record_format,
            product_version: byte_0 & 0b1111,
            record_count,
            location_identifier: dlac::decode(&location_identifier, 24)
                .trim_end_matches([dlac::ETX, ' '])
                .to_owned(),
            record_reference,
            record,
        })
    }

    pub fn reports(&self) -> &[String] {
        match &self.record {
            Record::Text(record) => &record.reports,
            _ => &[],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum RecordFormat {
    NoData,
    AsciiText,
    DlacText,
    DlacTextWithDictionary,
    FormattedText,
    GraphicalOverlay,
    Reserved(u8),
}

impl RecordFormat {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::NoData,
            1 => Self::AsciiText,
            2 => Self::DlacText,
            3 => Self::DlacTextWithDictionary,
            4 => Self::FormattedText,
            8 => Self::GraphicalOverlay,
            _ => Self::Reserved(value),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Record {
    Text(TextRecord),
    Graphical(GraphicalRecord),
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TextRecord {
    pub report_number: u16,
    pub report_year: u8,
    pub active: bool,
    pub reports: Vec<String>,
}

impl TextRecord {
    /// ```plain
    /// byte         0        1        2        3        4
    /// bit   01234567 01234567 01234567 01234567 01234567
    /// value llllllll llllllll nnnnnnnn nnnnnnyy yyyyys..
    /// ```
    ///
    /// - l: record length, counted from the report number
    /// - n: report number
    /// - y: report year
    /// - s: report status (1 = active)
    ///
    /// Followed by `record length - 5` bytes of DLAC text.
    pub fn decode(buffer: &mut &[u8], config: &DecoderConfig) -> Result<Self, DecodeError> {
        let record_length = buffer.try_get_u16()?;
        let text_length = usize::from(record_length)
            .checked_sub(5)
            .ok_or(DecodeError::InvalidRecordLength {
                length: record_length,
            })?;
        let [byte_2, byte_3, byte_4]: [u8; 3] = buffer.try_get_bytes()?;
        let text = take_slice(buffer, text_length)?;

        Ok(Self {
            report_number: (u16::from(byte_2) << 6) | u16::from(byte_3 >> 2),
            report_year: ((byte_3 & 0b11) << 5) | (byte_4 >> 3),
            active: byte_4 & 0b100 != 0,
            reports: dlac::split_reports(&config.decode_text(text, text_length * 8)),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ObjectLabel {
    Numeric(u16),
    Text(String),
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GraphicalRecord {
    pub record_length: u16,
    pub report_number: u16,
    pub report_year: u8,
    pub overlay_record_identifier: u8,
    pub object_label: ObjectLabel,
    pub object_element: u8,
    pub object_type: u8,
    pub object_status: u8,
    pub object_qualifier: Option<u32>,
    pub date_time_format: Option<DateTimeFormat>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub overlay_operator: u8,
    pub geometry: Option<Geometry>,
}

impl GraphicalRecord {
    pub fn decode(buffer: &mut &[u8]) -> Result<Self, DecodeError> {
        // record length, report number, report year, overlay record id, label flag
        // llllllll llnnnnnn nnnnnnnn yyyyyyy. ...iiiif
        let [header_0, header_1, header_2, header_3, header_4]: [u8; 5] =
            buffer.try_get_bytes()?;

        let object_label = if header_4 & 0b1 == 0 {
            ObjectLabel::Numeric(buffer.try_get_u16()?)
        }
        else {
            let label: [u8; 9] = buffer.try_get_bytes()?;
            ObjectLabel::Text(
                dlac::decode(&label, 72)
                    .trim_end_matches([dlac::ETX, ' '])
                    .to_owned(),
            )
        };

        // element flag, qualifier flag, parameter flag, element, type, status
        // eqpeeeee ttttssss
        //
        // the parameter flag doesn't add any fields here
        let [flags, object]: [u8; 2] = buffer.try_get_bytes()?;
        let object_qualifier = if flags & 0b01000000 != 0 {
            let [a, b, c]: [u8; 3] = buffer.try_get_bytes()?;
            Some((u32::from(a) << 16) | (u32::from(b) << 8) | u32::from(c))
        }
        else {
            None
        };

        // applicability, date/time format, geometry option, operator, vertex count
        // aaddgggg oovvvvvv
        let [options, vertices]: [u8; 2] = buffer.try_get_bytes()?;
        let applicability = options >> 6;
        let date_time_format = DateTimeFormat::from_u8((options & 0b00110000) >> 4);
        let geometry_option = options & 0b1111;
        let vertex_count = usize::from(vertices & 0b00111111) + 1;

        let mut date_time = || -> Result<Option<String>, DecodeError> {
            let field = take_slice(buffer, DATE_TIME_FIELD_BYTES)?;
            Ok(date_time_format
                .and_then(|format| format.format(field))
                .filter(|formatted| !formatted.is_empty()))
        };
        let (start, end) = match applicability {
            // until further notice
            0 => (None, None),
            1 => (date_time()?, None),
            2 => (None, date_time()?),
            _ => {
                let start = date_time()?;
                (start, date_time()?)
            }
        };

        let geometry = Geometry::decode(buffer, geometry_option, vertex_count)?;

        Ok(Self {
            record_length: (u16::from(header_0) << 2) | u16::from(header_1 >> 6),
            report_number: (u16::from(header_1 & 0b00111111) << 8) | u16::from(header_2),
            report_year: header_3 >> 1,
            overlay_record_identifier: ((header_4 & 0b00011110) >> 1) + 1,
            object_label,
            object_element: flags & 0b00011111,
            object_type: object >> 4,
            object_status: object & 0b1111,
            object_qualifier,
            date_time_format,
            start,
            end,
            overlay_operator: vertices >> 6,
            geometry,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum AltitudeReference {
    Msl,
    Agl,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Shape {
    Polygon,
    Polyline,
    Point,
    /// The vertices are the centres of the bottom and top faces.
    CircularPrism {
        bottom_altitude_code: u8,
        top_altitude_code: u8,
        radius_longitude_code: u16,
        radius_latitude_code: u16,
        orientation: u8,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Vertex {
    pub raw_latitude: i32,
    pub raw_longitude: i32,
    /// Altitude in feet, if the geometry has per vertex altitudes.
    pub altitude: Option<i32>,
}

impl Vertex {
    /// Extended range vertex with altitude.
    ///
    /// ```plain
    /// byte         0        1        2        3        4        5
    /// bit   01234567 01234567 01234567 01234567 01234567 01234567
    /// value oooooooo oooooooo oooaaaaa aaaaaaaa aaaaaahh hhhhhhhh
    /// ```
    ///
    /// - o: longitude (19 bits)
    /// - a: latitude (19 bits)
    /// - h: altitude (10 bits, 100 ft)
    fn decode<B: Buf>(buffer: &mut B) -> Result<Self, DecodeError> {
        let bytes: [u8; 6] = buffer.try_get_bytes()?;
        let [b0, b1, b2, b3, b4, b5] = bytes.map(i32::from);
        Ok(Self {
            raw_longitude: (b0 << 11) | (b1 << 3) | ((b2 & 0b11100000) >> 5),
            raw_latitude: ((b2 & 0b00011111) << 14) | (b3 << 6) | ((b4 & 0b11111100) >> 2),
            altitude: Some((((b4 & 0b11) << 8) | b5) * 100),
        })
    }

    pub fn position(&self, reduced_precision: bool) -> (f64, f64) {
        lat_lng(self.raw_latitude, self.raw_longitude, reduced_precision)
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Geometry {
    pub shape: Shape,
    pub altitude_reference: AltitudeReference,
    /// Coordinates use the 18 bit resolution.
    pub reduced_precision: bool,
    pub vertices: Vec<Vertex>,
}

impl Geometry {
    fn decode(
        buffer: &mut &[u8],
        option: u8,
        vertex_count: usize,
    ) -> Result<Option<Self>, DecodeError> {
        let vertices = |buffer: &mut &[u8], count: usize| {
            (0..count)
                .map(|_| Vertex::decode(buffer))
                .collect::<Result<Vec<_>, _>>()
        };

        let geometry = match option {
            3..=6 => {
                Self {
                    shape: if option <= 4 {
                        Shape::Polygon
                    }
                    else {
                        Shape::Polyline
                    },
                    altitude_reference: if option % 2 == 1 {
                        AltitudeReference::Msl
                    }
                    else {
                        AltitudeReference::Agl
                    },
                    reduced_precision: false,
                    vertices: vertices(buffer, vertex_count)?,
                }
            }
            7 | 8 => {
                let (shape, vertices) = decode_circular_prism(buffer)?;
                Self {
                    shape,
                    altitude_reference: if option == 7 {
                        AltitudeReference::Msl
                    }
                    else {
                        AltitudeReference::Agl
                    },
                    reduced_precision: true,
                    vertices,
                }
            }
            9 | 10 => {
                Self {
                    shape: Shape::Point,
                    altitude_reference: if option == 9 {
                        AltitudeReference::Agl
                    }
                    else {
                        AltitudeReference::Msl
                    },
                    reduced_precision: false,
                    vertices: vertices(buffer, 1)?,
                }
            }
            _ => {
                tracing::debug!(geometry_option = option, "unsupported overlay geometry");
                return Ok(None);
            }
        };

        Ok(Some(geometry))
    }

    /// Vertex positions in degrees as (latitude, longitude).
    pub fn positions(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.vertices
            .iter()
            .map(|vertex| vertex.position(self.reduced_precision))
    }
}

/// Extended range circular prism.
///
/// ```plain
/// byte         0        1        2        3        4        5        6
/// bit   01234567 01234567 01234567 01234567 01234567 01234567 01234567
/// value oooooooo oooooooo ooaaaaaa aaaaaaaa aaaaOOOO OOOOOOOO OOOOOOAA
///
/// byte         7        8        9       10       11       12       13
/// value AAAAAAAA AAAAAAAA bbbbbbbt ttttttxx xxxxxxxy yyyyyyyy rrrrrrrr
/// ```
///
/// - o, a: bottom centre longitude and latitude (18 bits)
/// - O, A: top centre longitude and latitude (18 bits)
/// - b, t: bottom and top altitude
/// - x, y: longitude and latitude radius
/// - r: orientation
fn decode_circular_prism(buffer: &mut &[u8]) -> Result<(Shape, Vec<Vertex>), DecodeError> {
    let bytes: [u8; 14] = buffer.try_get_bytes()?;
    let b = bytes.map(i32::from);

    let bottom = Vertex {
        raw_longitude: (b[0] << 10) | (b[1] << 2) | ((b[2] & 0b11000000) >> 6),
        raw_latitude: ((b[2] & 0b00111111) << 12) | (b[3] << 4) | ((b[4] & 0b11110000) >> 4),
        altitude: None,
    };
    let top = Vertex {
        raw_longitude: ((b[4] & 0b1111) << 14) | (b[5] << 6) | ((b[6] & 0b11111100) >> 2),
        raw_latitude: ((b[6] & 0b11) << 16) | (b[7] << 8) | b[8],
        altitude: None,
    };
    let shape = Shape::CircularPrism {
        bottom_altitude_code: bytes[9] >> 1,
        top_altitude_code: ((bytes[9] & 0b1) << 6) | (bytes[10] >> 2),
        radius_longitude_code: (u16::from(bytes[10] & 0b11) << 7) | u16::from(bytes[11] >> 1),
        radius_latitude_code: (u16::from(bytes[11] & 0b1) << 8) | u16::from(bytes[12]),
        orientation: bytes[13],
    };

    Ok((shape, vec![bottom, top]))
}
