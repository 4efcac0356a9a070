//! Date/time and coordinate fields of graphical overlay records.

/// Degrees per LSB of a 19 bit overlay coordinate.
pub const LAT_LNG_RESOLUTION: f64 = 360.0 / 524288.0;

/// Degrees per LSB of an 18 bit overlay coordinate.
///
/// Used by geometries that also carry altitudes, like circular prisms.
pub const LAT_LNG_RESOLUTION_REDUCED: f64 = 2.0 * LAT_LNG_RESOLUTION;

/// How a record date/time field is laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DateTimeFormat {
    None,
    MonthDayHoursMinutes,
    DayHoursMinutes,
    HoursMinutes,
}

impl DateTimeFormat {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::MonthDayHoursMinutes),
            2 => Some(Self::DayHoursMinutes),
            3 => Some(Self::HoursMinutes),
            _ => None,
        }
    }

    /// Number of bytes this format consumes.
    pub fn length(&self) -> usize {
        match self {
            DateTimeFormat::None => 0,
            DateTimeFormat::MonthDayHoursMinutes => 4,
            DateTimeFormat::DayHoursMinutes => 3,
            DateTimeFormat::HoursMinutes => 2,
        }
    }

    pub fn format(&self, bytes: &[u8]) -> Option<String> {
        let fields = bytes.get(..self.length())?;
        let formatted = match (self, fields) {
            (DateTimeFormat::None, _) => String::new(),
            (DateTimeFormat::MonthDayHoursMinutes, [month, day, hours, minutes]) => {
                format!("{month:02}-{day:02} {hours:02}:{minutes:02}")
            }
            (DateTimeFormat::DayHoursMinutes, [day, hours, minutes]) => {
                format!("{day:02} {hours:02}:{minutes:02}")
            }
            (DateTimeFormat::HoursMinutes, [hours, minutes]) => {
                format!("{hours:02}:{minutes:02}")
            }
            _ => return None,
        };
        Some(formatted)
    }
}

/// Formats a date/time field.
///
/// Returns an empty string if there is no date (`format_code` 0), the format
/// code is unknown, or `bytes` is too short.
pub fn parse_date(bytes: &[u8], format_code: u8) -> String {
    DateTimeFormat::from_u8(format_code)
        .and_then(|format| format.format(bytes))
        .unwrap_or_default()
}

/// Converts raw overlay coordinates to degrees.
///
/// The latitude is in `[-90, 90)`, the longitude in `[-180, 180)`.
pub fn lat_lng(lat_raw: i32, lng_raw: i32, is_alt_variant: bool) -> (f64, f64) {
    let resolution = if is_alt_variant {
        LAT_LNG_RESOLUTION_REDUCED
    }
    else {
        LAT_LNG_RESOLUTION
    };
    (
        wrap_degrees(f64::from(lat_raw) * resolution, 180.0),
        wrap_degrees(f64::from(lng_raw) * resolution, 360.0),
    )
}

/// Wraps `degrees` into `[-span / 2, span / 2)`.
pub(crate) fn wrap_degrees(degrees: f64, span: f64) -> f64 {
    let half = span / 2.0;
    if (-half..half).contains(&degrees) {
        return degrees;
    }

    let wrapped = (degrees + half).rem_euclid(span) - half;
    // rem_euclid may round up to `span`
    if wrapped >= half {
        wrapped - span
    }
    else {
        wrapped
    }
}
