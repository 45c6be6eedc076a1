//! Value types that do not map cleanly onto a std or `chrono` type.

mod time;

pub use time::MySqlTime;

use bytes::{Buf, Bytes};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::error::Result;

// Binary-protocol temporal encodings.
//
// DATE / DATETIME / TIMESTAMP: a 1-byte length in {0, 4, 7, 11} followed by
// year(2) month(1) day(1) [hour(1) minute(1) second(1) [micros(4)]].
// Length 0 is the zero date.
//
// https://dev.mysql.com/doc/internals/en/binary-protocol-value.html

pub(crate) fn encode_datetime(buf: &mut Vec<u8>, dt: &NaiveDateTime) {
    let micros = dt.and_utc().timestamp_subsec_micros();

    let len: u8 = if micros > 0 {
        11
    } else if dt.hour() > 0 || dt.minute() > 0 || dt.second() > 0 {
        7
    } else {
        4
    };

    buf.push(len);

    // cannot truncate: chrono years fit i32, MySQL years fit u16 in practice
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        buf.extend_from_slice(&(dt.year() as u16).to_le_bytes());
        buf.push(dt.month() as u8);
        buf.push(dt.day() as u8);

        if len > 4 {
            buf.push(dt.hour() as u8);
            buf.push(dt.minute() as u8);
            buf.push(dt.second() as u8);
        }

        if len > 7 {
            buf.extend_from_slice(&micros.to_le_bytes());
        }
    }
}

/// Decode a length-prefixed DATE / DATETIME / TIMESTAMP value.
///
/// Returns `None` for the zero date, which has no `chrono` representation.
pub(crate) fn decode_datetime(mut buf: Bytes) -> Result<Option<NaiveDateTime>> {
    let len = buf.get_u8();

    if len == 0 {
        return Ok(None);
    }

    if !matches!(len, 4 | 7 | 11) || buf.remaining() < len as usize {
        return Err(err_protocol!("invalid DATETIME length {len}"));
    }

    let year = buf.get_u16_le();
    let month = buf.get_u8();
    let day = buf.get_u8();

    let (hour, minute, second) = if len > 4 {
        (buf.get_u8(), buf.get_u8(), buf.get_u8())
    } else {
        (0, 0, 0)
    };

    let micros = if len > 7 { buf.get_u32_le() } else { 0 };

    NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
        .and_then(|date| {
            date.and_hms_micro_opt(
                u32::from(hour),
                u32::from(minute),
                u32::from(second),
                micros,
            )
        })
        .map(Some)
        .ok_or_else(|| err_protocol!("server sent an out-of-range DATETIME"))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::NaiveDate;

    use super::{decode_datetime, encode_datetime};

    #[test]
    fn test_datetime_round_trip() {
        for dt in [
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            NaiveDate::from_ymd_opt(1999, 12, 31).unwrap().and_hms_opt(23, 59, 59).unwrap(),
            NaiveDate::from_ymd_opt(2021, 6, 1)
                .unwrap()
                .and_hms_micro_opt(12, 30, 45, 123_456)
                .unwrap(),
        ] {
            let mut buf = Vec::new();
            encode_datetime(&mut buf, &dt);

            // minimal length was chosen
            assert!(matches!(buf[0], 4 | 7 | 11));

            let decoded = decode_datetime(Bytes::from(buf)).unwrap();
            assert_eq!(decoded, Some(dt));
        }
    }

    #[test]
    fn test_zero_date_decodes_to_none() {
        assert_eq!(decode_datetime(Bytes::from_static(b"\x00")).unwrap(), None);
    }
}
