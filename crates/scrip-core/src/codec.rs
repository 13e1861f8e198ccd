//! The protocol's byte codec.
//!
//! Every record on the wire is built out of four primitives: little-endian
//! `u32` and `u64`, length-prefixed byte strings, and UTF-8 strings encoded
//! as byte strings. Dates travel as the 8-character ASCII string `DDMMYYYY`.
//! Encoders append to a buffer; decoders peel a value off the front of a
//! slice and return the remainder.

use chrono::NaiveDate;

use crate::error::ScripError;

const DATE_FORMAT: &str = "%d%m%Y";

// ── Traits ────────────────────────────────────────────────────────────────────

/// A record with a canonical byte encoding.
pub trait Encode {
    fn encode(&self, buf: &mut Vec<u8>);

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }
}

/// A record that can be decoded from the front of a byte string.
pub trait Decode: Sized {
    /// Decode one record, returning it together with the unread remainder.
    fn decode(input: &[u8]) -> Result<(Self, &[u8]), ScripError>;

    /// Decode a record that must span the whole input.
    fn from_bytes(input: &[u8]) -> Result<Self, ScripError> {
        let (value, rest) = Self::decode(input)?;
        if !rest.is_empty() {
            return Err(ScripError::MalformedEncoding("trailing bytes after record"));
        }
        Ok(value)
    }
}

// ── Encoders ──────────────────────────────────────────────────────────────────

pub fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

pub fn put_u64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

pub fn put_bytes(buf: &mut Vec<u8>, value: &[u8]) {
    put_u32(buf, value.len() as u32);
    buf.extend_from_slice(value);
}

pub fn put_str(buf: &mut Vec<u8>, value: &str) {
    put_bytes(buf, value.as_bytes());
}

pub fn put_date(buf: &mut Vec<u8>, value: NaiveDate) {
    put_str(buf, &value.format(DATE_FORMAT).to_string());
}

// ── Decoders ──────────────────────────────────────────────────────────────────

fn split(input: &[u8], len: usize) -> Result<(&[u8], &[u8]), ScripError> {
    if input.len() < len {
        return Err(ScripError::MalformedEncoding("input ends early"));
    }
    Ok(input.split_at(len))
}

pub fn take_u32(input: &[u8]) -> Result<(u32, &[u8]), ScripError> {
    let (head, rest) = split(input, 4)?;
    let value = u32::from_le_bytes(head.try_into().expect("split yields exactly 4 bytes"));
    Ok((value, rest))
}

pub fn take_u64(input: &[u8]) -> Result<(u64, &[u8]), ScripError> {
    let (head, rest) = split(input, 8)?;
    let value = u64::from_le_bytes(head.try_into().expect("split yields exactly 8 bytes"));
    Ok((value, rest))
}

pub fn take_bytes(input: &[u8]) -> Result<(&[u8], &[u8]), ScripError> {
    let (len, rest) = take_u32(input)?;
    split(rest, len as usize)
}

pub fn take_str(input: &[u8]) -> Result<(String, &[u8]), ScripError> {
    let (raw, rest) = take_bytes(input)?;
    let value = std::str::from_utf8(raw)
        .map_err(|_| ScripError::MalformedEncoding("string is not valid UTF-8"))?;
    Ok((value.to_owned(), rest))
}

pub fn take_date(input: &[u8]) -> Result<(NaiveDate, &[u8]), ScripError> {
    let (raw, rest) = take_str(input)?;
    let value = NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|_| ScripError::MalformedEncoding("date is not of the form DDMMYYYY"))?;
    Ok((value, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn u32_is_little_endian() {
        let mut buf = Vec::new();
        put_u32(&mut buf, 0x0403_0201);
        assert_eq!(buf, [1, 2, 3, 4]);
    }

    #[test]
    fn u64_is_eight_bytes() {
        let mut buf = Vec::new();
        put_u64(&mut buf, 7);
        assert_eq!(buf.len(), 8);
        let (value, rest) = take_u64(&buf).unwrap();
        assert_eq!(value, 7);
        assert!(rest.is_empty());
    }

    #[test]
    fn bytes_are_length_prefixed() {
        let mut buf = Vec::new();
        put_bytes(&mut buf, b"abc");
        assert_eq!(buf, [3, 0, 0, 0, b'a', b'b', b'c']);
    }

    #[test]
    fn date_renders_as_ddmmyyyy() {
        let mut buf = Vec::new();
        put_date(&mut buf, date(2026, 8, 1));
        // 4-byte length prefix, then the ASCII date.
        assert_eq!(&buf[4..], b"01082026");
    }

    #[test]
    fn decoders_return_the_remainder() {
        let mut buf = Vec::new();
        put_u32(&mut buf, 1);
        put_str(&mut buf, "hi");
        let (first, rest) = take_u32(&buf).unwrap();
        let (second, rest) = take_str(rest).unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, "hi");
        assert!(rest.is_empty());
    }

    #[test]
    fn short_input_is_malformed() {
        assert!(matches!(
            take_u32(&[1, 2]),
            Err(ScripError::MalformedEncoding(_))
        ));
        assert!(matches!(
            take_u64(&[1, 2, 3, 4]),
            Err(ScripError::MalformedEncoding(_))
        ));
        // Length prefix promises more bytes than are present.
        assert!(matches!(
            take_bytes(&[9, 0, 0, 0, 1]),
            Err(ScripError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let mut buf = Vec::new();
        put_bytes(&mut buf, &[0xff, 0xfe]);
        assert!(matches!(
            take_str(&buf),
            Err(ScripError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn garbage_date_is_malformed() {
        let mut buf = Vec::new();
        put_str(&mut buf, "99999999");
        assert!(matches!(
            take_date(&buf),
            Err(ScripError::MalformedEncoding(_))
        ));
    }

    proptest! {
        #[test]
        fn u32_round_trip(value: u32) {
            let mut buf = Vec::new();
            put_u32(&mut buf, value);
            let (decoded, rest) = take_u32(&buf).unwrap();
            prop_assert_eq!(decoded, value);
            prop_assert!(rest.is_empty());
        }

        #[test]
        fn u64_round_trip(value: u64) {
            let mut buf = Vec::new();
            put_u64(&mut buf, value);
            let (decoded, rest) = take_u64(&buf).unwrap();
            prop_assert_eq!(decoded, value);
            prop_assert!(rest.is_empty());
        }

        #[test]
        fn string_round_trip(value: String) {
            let mut buf = Vec::new();
            put_str(&mut buf, &value);
            let (decoded, rest) = take_str(&buf).unwrap();
            prop_assert_eq!(decoded, value);
            prop_assert!(rest.is_empty());
        }

        #[test]
        fn date_round_trip(year in 1i32..9999, ordinal in 1u32..365) {
            let value = NaiveDate::from_yo_opt(year, ordinal).unwrap();
            let mut buf = Vec::new();
            put_date(&mut buf, value);
            let (decoded, rest) = take_date(&buf).unwrap();
            prop_assert_eq!(decoded, value);
            prop_assert!(rest.is_empty());
        }
    }
}
