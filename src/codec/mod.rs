//! Per-block codecs for the delta-coded containers.
//!
//! A [`BlockCodec`] turns one block of 32-bit forward differences into a
//! self-delimiting byte string and back. The container owns sampling and
//! pointers; the codec only ever sees a single block.

mod binary_packing;
mod pfor;

pub use binary_packing::BinaryPacking;
pub use pfor::Pfor;

use crate::error::Result;

/// Encoder/decoder for one block of deltas.
pub trait BlockCodec {
    /// Values consumed per codec call. Block sizes must be multiples of this.
    const GRANULE: usize;
    /// Store blocks of strictly consecutive integers as a zero-byte marker.
    const DETECT_FULL_RUNS: bool;
    /// Bytes reserved at the head of the payload before the first block.
    const LEADING_PADDING: usize;
    /// Short name used in log events.
    const NAME: &'static str;

    /// Append the encoding of `deltas` to `out`. `deltas.len()` is a multiple of
    /// [`Self::GRANULE`].
    fn encode(deltas: &[u32], out: &mut Vec<u8>);

    /// Decode `out.len()` deltas from the head of `data`, returning the number
    /// of bytes consumed.
    fn decode(data: &[u8], out: &mut [u32]) -> Result<usize>;

    /// Exact number of bytes [`Self::encode`] would append for `deltas`.
    fn encoded_len(deltas: &[u32]) -> usize;
}

/// Replace a block by its forward differences; `block[0]` becomes 0.
///
/// Differences wrap modulo 2^32 so non-monotone input (permutations, Ψ
/// tables) decodes exactly through [`prefix_sum`].
pub(crate) fn delta_encode(block: &mut [u32]) {
    for j in (1..block.len()).rev() {
        block[j] = block[j].wrapping_sub(block[j - 1]);
    }
    if let Some(first) = block.first_mut() {
        *first = 0;
    }
}

/// Running sum of a delta block, written as offsets from `sample`.
///
/// `out[j]` is `value_j - sample` modulo 2^64, so `out[0]` is always 0 and
/// `sample.wrapping_add(out[j])` restores the absolute value.
pub(crate) fn prefix_sum(sample: u32, deltas: &[u32], out: &mut [u64]) {
    let mut acc = sample;
    for (slot, &d) in out.iter_mut().zip(deltas) {
        acc = acc.wrapping_add(d);
        *slot = u64::from(acc).wrapping_sub(u64::from(sample));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_then_prefix_sum_restores_non_monotone_block() {
        let original = [7u32, 3, u32::MAX, 0, 12];
        let mut block = original;
        delta_encode(&mut block);
        assert_eq!(block[0], 0);
        assert_eq!(block[1], 3u32.wrapping_sub(7));

        let mut out = [0u64; 5];
        prefix_sum(original[0], &block, &mut out);
        assert_eq!(out[0], 0);
        let restored: Vec<u32> = out
            .iter()
            .map(|&r| u64::from(original[0]).wrapping_add(r) as u32)
            .collect();
        assert_eq!(restored, original);
    }

    #[test]
    fn prefix_sum_of_increasing_block_is_distance_to_sample() {
        let mut block = [10u32, 20, 30, 30];
        delta_encode(&mut block);
        let mut out = [9u64; 4];
        prefix_sum(10, &block, &mut out);
        assert_eq!(out, [0, 10, 20, 20]);
    }
}
