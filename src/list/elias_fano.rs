//! Elias-Fano encoding for monotone blocks.
//!
//! Provides near-optimal space for sorted integers while allowing direct
//! indexed access without scanning the low bits.
//!
//! # Theory
//!
//! For $m$ sorted integers in range $[0, U)$, Elias-Fano uses:
//! - $L = \lfloor \log_2(U/m) \rfloor$ bits for each "lower" part.
//! - A unary bit vector of length $m + \lfloor U/2^L \rfloor + 1$ for "upper" parts.
//!
//! Total space is $m L + 2m + O(1)$ bits.
//!
//! # Layout
//!
//! `m * L` low bits back to back, then the upper bit vector, where value $i$
//! sets bit `(v_i >> L) + i`. `L` is derived from `(m, U)` and never stored.

use super::BlockList;
use crate::bits::{bits_for, BitSlice, BitWriter};
use crate::error::{Error, Result};

/// Elias-Fano list over a block universe.
#[derive(Debug, Clone, Copy, Default)]
pub struct EliasFanoList;

impl EliasFanoList {
    /// Low-part width: `floor(log2(U / m))`, or 0 when `U <= m`.
    pub(crate) fn low_width(count: usize, universe: u64) -> usize {
        if count == 0 || universe <= count as u64 {
            return 0;
        }
        bits_for(universe / count as u64) - 1
    }

    /// End bit of the upper bit vector starting at `high_start`.
    fn high_end(high_start: usize, count: usize, universe: u64, l: usize) -> Result<usize> {
        usize::try_from(universe >> l)
            .ok()
            .and_then(|h| h.checked_add(count + 1))
            .and_then(|len| high_start.checked_add(len))
            .ok_or_else(|| Error::corrupt("elias-fano upper part too long"))
    }
}

impl BlockList for EliasFanoList {
    fn estimate_size(count: usize, universe: u64) -> u64 {
        let m = count as u64;
        let l = Self::low_width(count, universe) as u64;
        m * l + m + (universe >> l) + 1
    }

    fn write(w: &mut BitWriter, values: &[u64], universe: u64) {
        let m = values.len();
        let l = Self::low_width(m, universe);

        for &v in values {
            w.write_bits(v, l);
        }

        let high_start = w.len();
        let high_len = (universe >> l) as usize + m + 1;
        w.write_zeros(high_len);
        for (i, &v) in values.iter().enumerate() {
            debug_assert!(v < universe);
            w.set_bit(high_start + (v >> l) as usize + i);
        }
    }

    fn access(
        s: &BitSlice<'_>,
        start: usize,
        count: usize,
        universe: u64,
        idx: usize,
    ) -> Result<u64> {
        debug_assert!(idx < count);
        let l = Self::low_width(count, universe);
        let low = s.get_bits(start + idx * l, l)?;

        let high_start = start + count * l;
        let high_end = Self::high_end(high_start, count, universe, l)?;
        let pos = s.select1(high_start, high_end, idx)?;
        let high = (pos - high_start - idx) as u64;

        Ok((high << l) | low)
    }

    fn decode(s: &BitSlice<'_>, start: usize, universe: u64, out: &mut [u64]) -> Result<()> {
        let m = out.len();
        let l = Self::low_width(m, universe);
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = s.get_bits(start + i * l, l)?;
        }

        let high_start = start + m * l;
        let high_end = Self::high_end(high_start, m, universe, l)?;
        let mut i = 0usize;
        let mut pos = high_start;
        while i < m && pos < high_end {
            let chunk = (high_end - pos).min(64);
            let mut word = s.get_bits(pos, chunk)?;
            while word != 0 && i < m {
                let bit = pos + word.trailing_zeros() as usize;
                let high = (bit - high_start - i) as u64;
                out[i] |= high << l;
                word &= word - 1;
                i += 1;
            }
            pos += chunk;
        }
        if i < m {
            return Err(Error::corrupt(format!(
                "elias-fano block holds {i} of {m} upper bits"
            )));
        }
        Ok(())
    }
}
