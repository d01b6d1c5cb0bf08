//! LEB128 variable-length integers.
//!
//! Each byte carries 7 value bits, low group first; the high bit (0x80)
//! flags that more bytes follow. 300 encodes as `[0xAC, 0x02]`.

use crate::error::{Error, Result};

/// Append the LEB128 encoding of `value` to `out`.
pub(crate) fn encode(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Number of bytes `encode` produces for `value`.
#[inline]
pub(crate) fn encoded_len(value: u64) -> usize {
    let bits = (64 - value.leading_zeros()).max(1) as usize;
    bits.div_ceil(7)
}

/// Decode one value starting at `*pos`, advancing `*pos` past it.
pub(crate) fn decode(data: &[u8], pos: &mut usize) -> Result<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *data
            .get(*pos)
            .ok_or_else(|| Error::corrupt("truncated LEB128 value"))?;
        *pos += 1;
        if shift >= 64 || (shift == 63 && byte & 0x7E != 0) {
            return Err(Error::corrupt("LEB128 value exceeds 64 bits"));
        }
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_encodings() {
        let mut out = Vec::new();
        encode(300, &mut out);
        assert_eq!(out, [0xAC, 0x02]);

        out.clear();
        encode(0, &mut out);
        assert_eq!(out, [0x00]);
    }

    #[test]
    fn len_matches_encoding() {
        for v in [0u64, 1, 127, 128, 16_383, 16_384, u32::MAX as u64, u64::MAX] {
            let mut out = Vec::new();
            encode(v, &mut out);
            assert_eq!(out.len(), encoded_len(v), "value {v}");
            let mut pos = 0;
            assert_eq!(decode(&out, &mut pos).unwrap(), v);
            assert_eq!(pos, out.len());
        }
    }

    #[test]
    fn truncated_input_is_corruption() {
        let mut pos = 0;
        assert!(decode(&[0x80, 0x80], &mut pos).is_err());
        let mut pos = 0;
        assert!(decode(&[], &mut pos).is_err());
    }
}
