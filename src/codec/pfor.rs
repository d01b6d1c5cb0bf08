//! Adaptive-width patched frame-of-reference codec.
//!
//! The block is packed at a single width `b`. Deltas needing more than `b`
//! bits are exceptions: their low `b` bits stay in the packed frame and the
//! remaining high bits are patched in from a LEB128 list. `b` is chosen by
//! exact encoded size over every width in `0..=32`, so one outlier no longer
//! forces the whole block to its width.
//!
//! # Layout
//!
//! ```text
//! width: u8 | B/32 BitPacker1x frames at `width` | LEB128 exception count
//!           | count x (LEB128 position gap, LEB128 high bits)
//! ```

use bitpacking::{BitPacker, BitPacker1x};

use super::BlockCodec;
use crate::error::{Error, Result};
use crate::leb128;

/// Patched frame-of-reference codec backing [`crate::PforVector`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Pfor;

#[inline]
fn width_of(v: u32) -> usize {
    (32 - v.leading_zeros()) as usize
}

#[inline]
fn low_mask(width: usize) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

impl Pfor {
    /// Encoded size of `deltas` at packing width `width`.
    fn cost(deltas: &[u32], width: usize) -> usize {
        let mut exceptions = 0usize;
        let mut patch_bytes = 0usize;
        let mut prev = 0usize;
        for (i, &d) in deltas.iter().enumerate() {
            if width_of(d) > width {
                patch_bytes += leb128::encoded_len((i - prev) as u64)
                    + leb128::encoded_len(u64::from(d >> width));
                prev = i;
                exceptions += 1;
            }
        }
        1 + deltas.len() * width / 8 + leb128::encoded_len(exceptions as u64) + patch_bytes
    }

    /// Cheapest packing width and its encoded size.
    fn choose_width(deltas: &[u32]) -> (usize, usize) {
        let max_width = deltas.iter().map(|&d| width_of(d)).max().unwrap_or(0);
        let mut best = (max_width, Self::cost(deltas, max_width));
        for width in 0..max_width {
            let cost = Self::cost(deltas, width);
            if cost < best.1 {
                best = (width, cost);
            }
        }
        best
    }
}

impl BlockCodec for Pfor {
    const GRANULE: usize = BitPacker1x::BLOCK_LEN;
    const DETECT_FULL_RUNS: bool = true;
    const LEADING_PADDING: usize = 1;
    const NAME: &'static str = "pfor";

    fn encode(deltas: &[u32], out: &mut Vec<u8>) {
        debug_assert!(deltas.len() % Self::GRANULE == 0);
        let (width, _) = Self::choose_width(deltas);
        tracing::trace!(width, "pfor block width");
        out.push(width as u8);

        let packer = BitPacker1x::new();
        let mask = low_mask(width);
        let frame_bytes = Self::GRANULE * width / 8;
        let mut lows = [0u32; BitPacker1x::BLOCK_LEN];
        if width > 0 {
            for frame in deltas.chunks_exact(Self::GRANULE) {
                for (slot, &d) in lows.iter_mut().zip(frame) {
                    *slot = d & mask;
                }
                let start = out.len();
                out.resize(start + frame_bytes, 0);
                packer.compress(&lows, &mut out[start..], width as u8);
            }
        }

        let exceptions = deltas.iter().filter(|&&d| width_of(d) > width).count();
        leb128::encode(exceptions as u64, out);
        let mut prev = 0usize;
        for (i, &d) in deltas.iter().enumerate() {
            if width_of(d) > width {
                leb128::encode((i - prev) as u64, out);
                leb128::encode(u64::from(d >> width), out);
                prev = i;
            }
        }
    }

    fn decode(data: &[u8], out: &mut [u32]) -> Result<usize> {
        let width = *data
            .first()
            .ok_or_else(|| Error::corrupt("truncated pfor block header"))? as usize;
        if width > 32 {
            return Err(Error::corrupt(format!("pfor width {width} exceeds 32")));
        }
        let mut pos = 1usize;

        let packer = BitPacker1x::new();
        let frame_bytes = Self::GRANULE * width / 8;
        for frame in out.chunks_exact_mut(Self::GRANULE) {
            if width == 0 {
                frame.fill(0);
                continue;
            }
            let src = data
                .get(pos..pos + frame_bytes)
                .ok_or_else(|| Error::corrupt("truncated pfor frame"))?;
            packer.decompress(src, frame, width as u8);
            pos += frame_bytes;
        }

        let exceptions = leb128::decode(data, &mut pos)?;
        if exceptions > out.len() as u64 {
            return Err(Error::corrupt(format!(
                "pfor block claims {exceptions} exceptions for {} values",
                out.len()
            )));
        }
        let mut idx = 0usize;
        for _ in 0..exceptions {
            let gap = leb128::decode(data, &mut pos)?;
            let high = leb128::decode(data, &mut pos)?;
            idx = usize::try_from(gap)
                .ok()
                .and_then(|g| idx.checked_add(g))
                .filter(|&i| i < out.len())
                .ok_or_else(|| Error::corrupt("pfor exception position out of block"))?;
            if width >= 32 || high >> (32 - width) != 0 {
                return Err(Error::corrupt("pfor exception exceeds 32 bits"));
            }
            out[idx] |= (high as u32) << width;
        }
        Ok(pos)
    }

    fn encoded_len(deltas: &[u32]) -> usize {
        Self::choose_width(deltas).1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(deltas: &[u32]) -> Vec<u8> {
        let mut out = Vec::new();
        Pfor::encode(deltas, &mut out);
        assert_eq!(out.len(), Pfor::encoded_len(deltas));
        let mut back = vec![0u32; deltas.len()];
        let used = Pfor::decode(&out, &mut back).unwrap();
        assert_eq!(used, out.len());
        assert_eq!(back, deltas);
        out
    }

    #[test]
    fn single_outlier_becomes_exception() {
        let mut deltas = vec![3u32; 128];
        deltas[77] = u32::MAX;
        let out = roundtrip(&deltas);
        // width 2 packing (32 bytes) plus a handful of patch bytes
        assert_eq!(out[0], 2);
        assert!(out.len() < 128 * 4 / 4);
    }

    #[test]
    fn uniform_block_has_no_exceptions() {
        let deltas: Vec<u32> = (0..64u32).map(|i| i % 16).collect();
        let out = roundtrip(&deltas);
        assert_eq!(out[0], 4);
        assert_eq!(*out.last().unwrap(), 0);
    }

    #[test]
    fn zero_block_is_two_bytes() {
        let out = roundtrip(&[0u32; 32]);
        assert_eq!(out, vec![0, 0]);
    }

    #[test]
    fn exception_at_position_zero() {
        let mut deltas = vec![1u32; 32];
        deltas[0] = 1 << 30;
        deltas[31] = 1 << 29;
        roundtrip(&deltas);
    }

    #[test]
    fn corrupt_exception_position_is_rejected() {
        let mut deltas = vec![1u32; 32];
        deltas[5] = 1 << 20;
        let mut out = Vec::new();
        Pfor::encode(&deltas, &mut out);
        // count sits right after the packed frame; the next byte is the gap
        let gap_at = 1 + 32 * out[0] as usize / 8 + 1;
        out[gap_at] = 100;
        let mut back = vec![0u32; 32];
        assert!(Pfor::decode(&out, &mut back).is_err());
    }
}
