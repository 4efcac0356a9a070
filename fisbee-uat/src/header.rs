use crate::airmet::wrap_degrees;

/// Length of the uplink header in bytes.
pub const UPLINK_HEADER_BYTES: usize = 8;

/// Degrees per LSB of the ground station position.
pub const GROUND_STATION_RESOLUTION: f64 = 360.0 / 16777216.0;

/// Ground uplink header
///
/// ```plain
/// byte         0        1        2        3        4        5        6        7
/// bit   01234567 01234567 01234567 01234567 01234567 01234567 01234567 01234567
/// value aaaaaaaa aaaaaaaa aaaaaaab bbbbbbbb bbbbbbbb bbbbbbbv u.dsssss tttt....
/// ```
///
/// - a: latitude (23 bits)
/// - b: longitude (24 bits)
/// - v: position valid
/// - u: UTC coupled
/// - d: application data valid
/// - s: slot id
/// - t: TIS-B site id
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UplinkHeader {
    pub latitude: f64,
    pub longitude: f64,
    pub position_valid: bool,
    pub utc_coupled: bool,
    pub application_data_valid: bool,
    pub slot_id: u8,
    pub tisb_site_id: u8,
}

impl UplinkHeader {
    pub fn decode(bytes: &[u8; UPLINK_HEADER_BYTES]) -> Self {
        let raw_latitude = (u32::from(bytes[0]) << 15)
            | (u32::from(bytes[1]) << 7)
            | u32::from(bytes[2] >> 1);
        let raw_longitude = (u32::from(bytes[2] & 0b1) << 23)
            | (u32::from(bytes[3]) << 15)
            | (u32::from(bytes[4]) << 7)
            | u32::from(bytes[5] >> 1);

        Self {
            latitude: wrap_degrees(f64::from(raw_latitude) * GROUND_STATION_RESOLUTION, 180.0),
            longitude: wrap_degrees(f64::from(raw_longitude) * GROUND_STATION_RESOLUTION, 360.0),
            position_valid: bytes[5] & 0b1 != 0,
            utc_coupled: bytes[6] & 0b10000000 != 0,
            application_data_valid: bytes[6] & 0b00100000 != 0,
            slot_id: bytes[6] & 0b00011111,
            tisb_site_id: bytes[7] >> 4,
        }
    }
}
