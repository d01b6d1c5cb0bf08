//! Fixed-width binary packing over SIMD-friendly 128-value frames.
//!
//! Each frame is one width byte followed by `16 * width` bytes of
//! `BitPacker4x` output. A block of `B` deltas is `B / 128` frames.

use bitpacking::{BitPacker, BitPacker4x};

use super::BlockCodec;
use crate::error::{Error, Result};

/// Binary-packing codec backing [`crate::BpVector`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryPacking;

impl BinaryPacking {
    #[inline]
    fn frame_bytes(num_bits: u8) -> usize {
        BitPacker4x::BLOCK_LEN * num_bits as usize / 8
    }
}

impl BlockCodec for BinaryPacking {
    const GRANULE: usize = BitPacker4x::BLOCK_LEN;
    const DETECT_FULL_RUNS: bool = false;
    const LEADING_PADDING: usize = 0;
    const NAME: &'static str = "binary-packing";

    fn encode(deltas: &[u32], out: &mut Vec<u8>) {
        debug_assert!(deltas.len() % Self::GRANULE == 0);
        let packer = BitPacker4x::new();
        for frame in deltas.chunks_exact(Self::GRANULE) {
            let num_bits = packer.num_bits(frame);
            out.push(num_bits);
            if num_bits == 0 {
                continue;
            }
            let start = out.len();
            out.resize(start + Self::frame_bytes(num_bits), 0);
            packer.compress(frame, &mut out[start..], num_bits);
        }
    }

    fn decode(data: &[u8], out: &mut [u32]) -> Result<usize> {
        let packer = BitPacker4x::new();
        let mut pos = 0usize;
        for frame in out.chunks_exact_mut(Self::GRANULE) {
            let num_bits = *data
                .get(pos)
                .ok_or_else(|| Error::corrupt("truncated binary-packed frame header"))?;
            pos += 1;
            if num_bits > 32 {
                return Err(Error::corrupt(format!(
                    "binary-packed frame width {num_bits} exceeds 32"
                )));
            }
            if num_bits == 0 {
                frame.fill(0);
                continue;
            }
            let len = Self::frame_bytes(num_bits);
            let src = data
                .get(pos..pos + len)
                .ok_or_else(|| Error::corrupt("truncated binary-packed frame"))?;
            packer.decompress(src, frame, num_bits);
            pos += len;
        }
        Ok(pos)
    }

    fn encoded_len(deltas: &[u32]) -> usize {
        let packer = BitPacker4x::new();
        deltas
            .chunks_exact(Self::GRANULE)
            .map(|frame| 1 + Self::frame_bytes(packer.num_bits(frame)))
            .sum()
    }
}
