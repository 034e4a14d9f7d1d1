//! Clear encodings of coordinates, identifiers and texts into bits.
//!
//! Bit vectors are least significant bit first, except texts which keep the byte order of the
//! string with the most significant bit of every byte first.

use crate::error::{ErrorKind, Result};

fn invalid(message: String) -> crate::error::Error {
    ErrorKind::InvalidEncoding(message).into()
}

/// The `len` low bits of `value`, least significant first
pub fn bits_of(value: u64, len: usize) -> Vec<bool> {
    (0..len)
        .map(|i| i < u64::BITS as usize && (value >> i) & 1 == 1)
        .collect()
}

fn value_of(bits: &[bool]) -> u64 {
    bits.iter()
        .rev()
        .fold(0, |acc, bit| (acc << 1) | u64::from(*bit))
}

/// Number of fractional bits of a fixed-point number of `len` bits
pub fn fractional_bits(len: usize) -> usize {
    (len / 2).saturating_sub(1)
}

/// Two's complement fixed-point encoding of `value` on `len` bits, `len / 2 - 1` of them
/// fractional.
///
/// `len` must be even and at most 64, `value` is rounded to the nearest representable number
/// and must fit in the signed range.
pub fn encode_fixed_point(value: f64, len: usize) -> Result<u64> {
    if len < 2 || len % 2 != 0 || len > 64 {
        return Err(invalid(format!(
            "fixed-point numbers need an even length between 2 and 64 bits, got {len}"
        )));
    }
    if !value.is_finite() {
        return Err(invalid(format!("{value} is not a finite number")));
    }

    let scaled = (value * (1u64 << fractional_bits(len)) as f64).round();
    let bound = 2f64.powi(len as i32 - 1);
    if scaled < -bound || scaled >= bound {
        return Err(invalid(format!(
            "{value} does not fit in a fixed-point number of {len} bits"
        )));
    }

    let mask = u64::MAX >> (64 - len);
    Ok((scaled as i64 as u64) & mask)
}

/// Inverse of [`encode_fixed_point`], reading `bits` least significant first
pub fn decode_fixed_point(bits: &[bool]) -> Result<f64> {
    let len = bits.len();
    if len < 2 || len % 2 != 0 || len > 64 {
        return Err(invalid(format!(
            "fixed-point numbers need an even length between 2 and 64 bits, got {len}"
        )));
    }

    // Sign extension to 64 bits
    let shift = 64 - len;
    let value = ((value_of(bits) << shift) as i64) >> shift;
    Ok(value as f64 / (1u64 << fractional_bits(len)) as f64)
}

/// `value` on `len` bits, least significant first
pub fn encode_unsigned(value: u64, len: usize) -> Result<Vec<bool>> {
    if len < u64::BITS as usize && value >> len != 0 {
        return Err(invalid(format!("{value} does not fit in {len} bits")));
    }
    Ok(bits_of(value, len))
}

pub fn decode_unsigned(bits: &[bool]) -> Result<u64> {
    let (low, high) = bits.split_at(bits.len().min(u64::BITS as usize));
    if high.iter().any(|bit| *bit) {
        return Err(invalid(format!(
            "a value of {} bits does not fit in 64 bits",
            bits.len()
        )));
    }
    Ok(value_of(low))
}

/// Bytes of `text` as bits, most significant bit of each byte first, padded with zeros in front
/// up to `len` bits.
///
/// Texts longer than `len / 8` bytes are cut on the last character boundary that fits, so the
/// encoded bytes always decode back to a prefix of `text`.
pub fn encode_text(text: &str, len: usize) -> Vec<bool> {
    let max_bytes = len / 8;
    let end = if text.len() <= max_bytes {
        text.len()
    } else {
        (0..=max_bytes)
            .rev()
            .find(|index| text.is_char_boundary(*index))
            .unwrap_or(0)
    };

    let mut bits = vec![false; len - 8 * end];
    bits.extend(
        text.as_bytes()[..end]
            .iter()
            .flat_map(|byte| (0..8).rev().map(move |i| (byte >> i) & 1 == 1)),
    );
    bits
}

/// Inverse of [`encode_text`], the zero bytes of the padding are dropped.
pub fn decode_text(bits: &[bool]) -> Result<String> {
    if bits.len() % 8 != 0 {
        return Err(invalid(format!(
            "a text needs a multiple of 8 bits, got {}",
            bits.len()
        )));
    }

    let bytes: Vec<u8> = bits
        .chunks_exact(8)
        .map(|byte| byte.iter().fold(0u8, |acc, bit| (acc << 1) | u8::from(*bit)))
        .skip_while(|byte| *byte == 0)
        .collect();

    String::from_utf8(bytes).map_err(|err| invalid(format!("the text is not valid UTF-8: {err}")))
}

/// Bits needed to tell `count` identifiers apart, at least one
pub fn identifier_len(count: usize) -> usize {
    if count <= 2 {
        1
    } else {
        (usize::BITS - (count - 1).leading_zeros()) as usize
    }
}

/// Bits needed to store the longest of `texts`
pub fn text_payload_len<S: AsRef<str>>(texts: &[S]) -> usize {
    texts
        .iter()
        .map(|text| 8 * text.as_ref().len())
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_point_encoding() {
        // 8 bits, 3 of them fractional
        assert_eq!(encode_fixed_point(1.0, 8).unwrap(), 0b0000_1000);
        assert_eq!(encode_fixed_point(2.5, 8).unwrap(), 0b0001_0100);
        assert_eq!(encode_fixed_point(-1.0, 8).unwrap(), 0b1111_1000);
        assert_eq!(encode_fixed_point(-16.0, 8).unwrap(), 0b1000_0000);
        assert_eq!(encode_fixed_point(0.06, 8).unwrap(), 0);

        for value in [-16.0, -3.5, -0.125, 0.0, 0.5, 2.5, 15.875] {
            let encoded = encode_fixed_point(value, 8).unwrap();
            assert_eq!(decode_fixed_point(&bits_of(encoded, 8)).unwrap(), value);
        }
    }

    #[test]
    fn test_fixed_point_rejects_bad_inputs() {
        assert!(encode_fixed_point(1.0, 7).is_err());
        assert!(encode_fixed_point(1.0, 0).is_err());
        assert!(encode_fixed_point(16.0, 8).is_err());
        assert!(encode_fixed_point(-16.5, 8).is_err());
        assert!(encode_fixed_point(f64::NAN, 8).is_err());
        assert!(decode_fixed_point(&[true; 3]).is_err());
    }

    #[test]
    fn test_unsigned_encoding() {
        assert_eq!(encode_unsigned(6, 3).unwrap(), vec![false, true, true]);
        assert!(encode_unsigned(8, 3).is_err());
        assert_eq!(decode_unsigned(&[true, false, true, false]).unwrap(), 5);
        assert_eq!(decode_unsigned(&bits_of(u64::MAX, 64)).unwrap(), u64::MAX);

        let mut too_long = vec![false; 65];
        too_long[64] = true;
        assert!(decode_unsigned(&too_long).is_err());
    }

    #[test]
    fn test_text_encoding() {
        // 'A' = 0x41
        let bits = encode_text("A", 16);
        assert_eq!(&bits[..8], &[false; 8]);
        assert_eq!(
            &bits[8..],
            &[false, true, false, false, false, false, false, true]
        );
        assert_eq!(decode_text(&bits).unwrap(), "A");

        assert_eq!(decode_text(&encode_text("Parking", 80)).unwrap(), "Parking");
        assert_eq!(decode_text(&encode_text("Parking", 32)).unwrap(), "Park");
        assert_eq!(decode_text(&vec![false; 24]).unwrap(), "");
        assert!(decode_text(&[true; 12]).is_err());
    }

    #[test]
    fn test_text_truncation_keeps_whole_characters() {
        // "café" is 5 bytes, the accented letter takes the last two
        let bits = encode_text("café", 32);
        assert_eq!(bits.len(), 32);
        assert_eq!(decode_text(&bits).unwrap(), "caf");
        assert_eq!(decode_text(&encode_text("café", 40)).unwrap(), "café");

        // 3-byte characters
        assert_eq!(decode_text(&encode_text("€€", 40)).unwrap(), "€");
        assert_eq!(decode_text(&encode_text("€", 16)).unwrap(), "");
        assert_eq!(encode_text("€", 16), vec![false; 16]);
    }

    #[test]
    fn test_lengths() {
        assert_eq!(identifier_len(1), 1);
        assert_eq!(identifier_len(2), 1);
        assert_eq!(identifier_len(3), 2);
        assert_eq!(identifier_len(4), 2);
        assert_eq!(identifier_len(5), 3);
        assert_eq!(identifier_len(1024), 10);

        assert_eq!(text_payload_len(&["bus", "metro station", ""]), 8 * 13);
        assert_eq!(text_payload_len::<&str>(&[]), 0);
    }
}
