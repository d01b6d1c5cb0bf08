//! Dense bitmap list: bit `v` is set for every stored value `v`.

use super::BlockList;
use crate::bits::{BitSlice, BitWriter};
use crate::error::{Error, Result};

/// Positional bitmap over a block universe. Values must be distinct.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitmapList;

/// End bit of a bitmap of `universe` bits starting at `start`.
fn end_bit(start: usize, universe: u64) -> Result<usize> {
    usize::try_from(universe)
        .ok()
        .and_then(|u| start.checked_add(u))
        .ok_or_else(|| Error::corrupt("bitmap universe too large"))
}

impl BlockList for BitmapList {
    fn estimate_size(_count: usize, universe: u64) -> u64 {
        universe
    }

    fn write(w: &mut BitWriter, values: &[u64], universe: u64) {
        let start = w.len();
        w.write_zeros(universe as usize);
        for &v in values {
            debug_assert!(v < universe);
            w.set_bit(start + v as usize);
        }
    }

    fn access(
        s: &BitSlice<'_>,
        start: usize,
        _count: usize,
        universe: u64,
        idx: usize,
    ) -> Result<u64> {
        let end = end_bit(start, universe)?;
        Ok((s.select1(start, end, idx)? - start) as u64)
    }

    fn decode(s: &BitSlice<'_>, start: usize, universe: u64, out: &mut [u64]) -> Result<()> {
        let end = end_bit(start, universe)?;
        let mut i = 0usize;
        let mut pos = start;
        while i < out.len() && pos < end {
            let chunk = (end - pos).min(64);
            let mut word = s.get_bits(pos, chunk)?;
            while word != 0 && i < out.len() {
                out[i] = (pos - start + word.trailing_zeros() as usize) as u64;
                word &= word - 1;
                i += 1;
            }
            pos += chunk;
        }
        if i < out.len() {
            return Err(Error::corrupt(format!(
                "bitmap block holds {i} of {} set bits",
                out.len()
            )));
        }
        Ok(())
    }
}
