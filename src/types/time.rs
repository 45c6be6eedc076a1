use std::fmt::{self, Display, Formatter};

use bytes::{Buf, Bytes};

use crate::error::Result;

/// A MySQL `TIME` value.
///
/// `TIME` is an interval, not a time of day: it carries a sign and a day
/// component, so it cannot be represented by a clock-time type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MySqlTime {
    pub negative: bool,
    pub days: u32,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub microseconds: u32,
}

impl MySqlTime {
    /// Total length of the interval in whole seconds, signed.
    #[must_use]
    pub fn as_secs(&self) -> i64 {
        let magnitude = i64::from(self.days) * 86_400
            + i64::from(self.hours) * 3_600
            + i64::from(self.minutes) * 60
            + i64::from(self.seconds);

        if self.negative {
            -magnitude
        } else {
            magnitude
        }
    }

    // Binary wire format: 1-byte length in {0, 8, 12} followed by
    // sign(1) days(4) hours(1) minutes(1) seconds(1) [micros(4)].
    // Length 0 is an all-zero interval.
    pub(crate) fn decode(mut buf: Bytes) -> Result<Self> {
        let len = buf.get_u8();

        if len == 0 {
            return Ok(Self::default());
        }

        if !matches!(len, 8 | 12) || buf.remaining() < len as usize {
            return Err(err_protocol!("invalid TIME length {len}"));
        }

        let negative = buf.get_u8() == 1;
        let days = buf.get_u32_le();
        let hours = buf.get_u8();
        let minutes = buf.get_u8();
        let seconds = buf.get_u8();

        let microseconds = if len > 8 { buf.get_u32_le() } else { 0 };

        Ok(Self {
            negative,
            days,
            hours,
            minutes,
            seconds,
            microseconds,
        })
    }
}

impl Display for MySqlTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }

        write!(
            f,
            "{:02}:{:02}:{:02}",
            u32::from(self.hours) + self.days * 24,
            self.minutes,
            self.seconds
        )?;

        if self.microseconds > 0 {
            write!(f, ".{:06}", self.microseconds)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::MySqlTime;

    #[test]
    fn test_decode_negative_with_days() {
        // -(2 days, 3:04:05)
        const DATA: &[u8] = b"\x08\x01\x02\x00\x00\x00\x03\x04\x05";

        let time = MySqlTime::decode(Bytes::from_static(DATA)).unwrap();

        assert!(time.negative);
        assert_eq!(time.days, 2);
        assert_eq!(time.as_secs(), -(2 * 86_400 + 3 * 3_600 + 4 * 60 + 5));
        assert_eq!(time.to_string(), "-51:04:05");
    }

    #[test]
    fn test_decode_zero_length() {
        let time = MySqlTime::decode(Bytes::from_static(b"\x00")).unwrap();

        assert_eq!(time, MySqlTime::default());
        assert_eq!(time.as_secs(), 0);
    }

    #[test]
    fn test_decode_with_microseconds() {
        const DATA: &[u8] = b"\x0c\x00\x00\x00\x00\x00\x01\x02\x03\x40\xe2\x01\x00";

        let time = MySqlTime::decode(Bytes::from_static(DATA)).unwrap();

        assert_eq!(time.microseconds, 123_456);
        assert_eq!(time.to_string(), "01:02:03.123456");
    }
}
