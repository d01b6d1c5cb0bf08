//! Unrestricted gap list for blocks that are not sorted.
//!
//! Stores wrapping differences between consecutive absolute values
//! (the first against 0), zigzag-mapped so small steps in either direction
//! stay small, at one fixed width: a 7-bit width header, then `count` fields.

use super::BlockList;
use crate::bits::{bits_for, BitSlice, BitWriter};
use crate::error::{Error, Result};

const WIDTH_BITS: usize = 7;

#[inline]
fn zigzag(x: i64) -> u64 {
    ((x << 1) ^ (x >> 63)) as u64
}

#[inline]
fn unzigzag(z: u64) -> i64 {
    ((z >> 1) as i64) ^ -((z & 1) as i64)
}

/// Zigzag gap list over absolute values.
#[derive(Debug, Clone, Copy, Default)]
pub struct GapList;

impl GapList {
    fn gaps(values: &[u64]) -> impl Iterator<Item = u64> + '_ {
        let mut prev = 0u64;
        values.iter().map(move |&v| {
            let g = zigzag(v.wrapping_sub(prev) as i64);
            prev = v;
            g
        })
    }

    fn width(s: &BitSlice<'_>, start: usize) -> Result<usize> {
        let width = s.get_bits(start, WIDTH_BITS)? as usize;
        if width > 64 {
            return Err(Error::corrupt(format!("gap list width {width} exceeds 64")));
        }
        Ok(width)
    }
}

impl BlockList for GapList {
    /// Worst-case size: the width depends on the gaps, not on the universe,
    /// so every field is charged the full 64 bits.
    fn estimate_size(count: usize, _universe: u64) -> u64 {
        WIDTH_BITS as u64 + count as u64 * 64
    }

    fn write(w: &mut BitWriter, values: &[u64], _universe: u64) {
        let width = Self::gaps(values).map(bits_for).max().unwrap_or(0);
        w.write_bits(width as u64, WIDTH_BITS);
        for g in Self::gaps(values) {
            w.write_bits(g, width);
        }
    }

    fn access(
        s: &BitSlice<'_>,
        start: usize,
        _count: usize,
        _universe: u64,
        idx: usize,
    ) -> Result<u64> {
        let width = Self::width(s, start)?;
        let mut pos = start + WIDTH_BITS;
        let mut value = 0u64;
        for _ in 0..=idx {
            value = value.wrapping_add(unzigzag(s.get_bits(pos, width)?) as u64);
            pos += width;
        }
        Ok(value)
    }

    fn decode(s: &BitSlice<'_>, start: usize, _universe: u64, out: &mut [u64]) -> Result<()> {
        let width = Self::width(s, start)?;
        let mut pos = start + WIDTH_BITS;
        let mut value = 0u64;
        for slot in out.iter_mut() {
            value = value.wrapping_add(unzigzag(s.get_bits(pos, width)?) as u64);
            *slot = value;
            pos += width;
        }
        Ok(())
    }
}
