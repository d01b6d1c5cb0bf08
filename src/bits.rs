//! Bit-granular stream primitives.
//!
//! [`BitWriter`] appends fixed-width fields LSB-first into a growable word
//! buffer; [`BitSlice`] reads them back at arbitrary bit offsets. Fields may
//! straddle a word boundary, so a width-`w` field costs exactly `w` bits.

use crate::error::{Error, Result};

/// Mask selecting the lowest `width` bits (`width` in `0..=64`).
#[inline]
pub(crate) fn low_mask(width: usize) -> u64 {
    if width >= 64 {
        !0u64
    } else {
        (1u64 << width) - 1
    }
}

/// Number of bits needed to represent `value` (0 for 0).
#[inline]
pub(crate) fn bits_for(value: u64) -> usize {
    (64 - value.leading_zeros()) as usize
}

/// Position of the `k`-th (0-indexed) set bit of `word`.
///
/// `k` must be smaller than `word.count_ones()`.
#[inline]
pub(crate) fn select_in_word(word: u64, k: usize) -> usize {
    #[cfg(all(target_arch = "x86_64", target_feature = "bmi2"))]
    {
        // SAFETY: the `bmi2` target feature is statically enabled.
        unsafe {
            let res = core::arch::x86_64::_pdep_u64(1u64 << k, word);
            return res.trailing_zeros() as usize;
        }
    }

    let mut w = word;
    for _ in 0..k {
        w &= w - 1;
    }
    w.trailing_zeros() as usize
}

/// Append-only bit stream.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    words: Vec<u64>,
    len: usize,
}

impl BitWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Return true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn reserve_bits(&mut self, extra: usize) {
        let needed = (self.len + extra).div_ceil(64);
        if needed > self.words.len() {
            self.words.resize(needed, 0);
        }
    }

    /// Append the lowest `width` bits of `value`.
    pub fn write_bits(&mut self, value: u64, width: usize) {
        debug_assert!(width <= 64);
        if width == 0 {
            return;
        }
        self.reserve_bits(width);
        let v = value & low_mask(width);
        let idx = self.len / 64;
        let off = self.len % 64;
        self.words[idx] |= v << off;
        if off + width > 64 {
            self.words[idx + 1] |= v >> (64 - off);
        }
        self.len += width;
    }

    /// Append `n` zero bits.
    pub fn write_zeros(&mut self, n: usize) {
        self.reserve_bits(n);
        self.len += n;
    }

    /// Set an already written bit.
    pub fn set_bit(&mut self, pos: usize) {
        debug_assert!(pos < self.len);
        self.words[pos / 64] |= 1u64 << (pos % 64);
    }

    /// Finish the stream, returning its backing words.
    pub fn into_words(self) -> Vec<u64> {
        self.words
    }
}

/// Read-only view over a word buffer, addressed in bits.
#[derive(Debug, Clone, Copy)]
pub struct BitSlice<'a> {
    words: &'a [u64],
}

impl<'a> BitSlice<'a> {
    /// Wrap a word buffer.
    pub fn new(words: &'a [u64]) -> Self {
        Self { words }
    }

    /// Total number of addressable bits.
    pub fn len(&self) -> usize {
        self.words.len() * 64
    }

    /// Return true if the slice holds no bits.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Read a `width`-bit field starting at bit `pos`.
    pub fn get_bits(&self, pos: usize, width: usize) -> Result<u64> {
        debug_assert!(width <= 64);
        if width == 0 {
            return Ok(0);
        }
        if pos.checked_add(width).map_or(true, |end| end > self.len()) {
            return Err(Error::corrupt(format!(
                "bit read of {width} bits at {pos} past end of {} bit payload",
                self.len()
            )));
        }
        let idx = pos / 64;
        let off = pos % 64;
        let mut v = self.words[idx] >> off;
        if off + width > 64 {
            v |= self.words[idx + 1] << (64 - off);
        }
        Ok(v & low_mask(width))
    }

    /// Absolute position of the `k`-th set bit inside `[start, end)`.
    pub fn select1(&self, start: usize, end: usize, mut k: usize) -> Result<usize> {
        let mut pos = start;
        while pos < end {
            let chunk = (end - pos).min(64);
            let word = self.get_bits(pos, chunk)?;
            let ones = word.count_ones() as usize;
            if k < ones {
                return Ok(pos + select_in_word(word, k));
            }
            k -= ones;
            pos += chunk;
        }
        Err(Error::corrupt(format!(
            "fewer set bits than expected in [{start}, {end})"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_straddling_fields() {
        let mut w = BitWriter::new();
        w.write_bits(0b101, 3);
        w.write_bits(u64::MAX, 64);
        w.write_bits(0x1234, 13);
        assert_eq!(w.len(), 80);

        let words = w.into_words();
        let s = BitSlice::new(&words);
        assert_eq!(s.get_bits(0, 3).unwrap(), 0b101);
        assert_eq!(s.get_bits(3, 64).unwrap(), u64::MAX);
        assert_eq!(s.get_bits(67, 13).unwrap(), 0x1234 & low_mask(13));
    }

    #[test]
    fn read_past_end_is_corruption() {
        let words = vec![0u64; 1];
        let s = BitSlice::new(&words);
        assert!(s.get_bits(60, 5).is_err());
        assert!(matches!(
            s.get_bits(64, 1),
            Err(Error::StreamCorruption(_))
        ));
    }

    #[test]
    fn select_spans_words() {
        let mut w = BitWriter::new();
        w.write_zeros(200);
        for pos in [3, 70, 130, 199] {
            w.set_bit(pos);
        }
        let words = w.into_words();
        let s = BitSlice::new(&words);
        assert_eq!(s.select1(0, 200, 0).unwrap(), 3);
        assert_eq!(s.select1(0, 200, 2).unwrap(), 130);
        assert_eq!(s.select1(4, 200, 0).unwrap(), 70);
        assert_eq!(s.select1(0, 200, 3).unwrap(), 199);
        assert!(s.select1(0, 200, 4).is_err());
    }

    #[test]
    fn select_in_word_basic() {
        assert_eq!(select_in_word(0b1011, 0), 0);
        assert_eq!(select_in_word(0b1011, 1), 1);
        assert_eq!(select_in_word(0b1011, 2), 3);
        assert_eq!(select_in_word(1 << 63, 0), 63);
    }
}
