//! In-stream block lists for the hybrid [`crate::EfVector`].
//!
//! Every block of the hybrid vector is one of four list encodings written
//! straight into the shared bit stream behind a 2-bit tag. Lists carry no
//! headers of their own: the element count and universe come from the
//! container's block table, so a list is addressed by `(start, count,
//! universe)` alone.

mod bitmap;
mod elias_fano;
mod gap;

pub use bitmap::BitmapList;
pub use elias_fano::EliasFanoList;
pub use gap::GapList;

use crate::bits::{BitSlice, BitWriter};
use crate::error::{Error, Result};

/// Width of the per-block type tag.
pub(crate) const TAG_BITS: usize = 2;

/// Encoding chosen for a block of the hybrid vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Unsorted fallback: zigzag gaps over absolute values.
    Raw,
    /// Dense bitmap over the block universe.
    Bitmap,
    /// Elias-Fano over the block universe.
    EliasFano,
    /// The block is exactly the consecutive integers of its universe.
    Full,
}

impl BlockKind {
    pub(crate) fn tag(self) -> u64 {
        match self {
            BlockKind::Raw => 0,
            BlockKind::Bitmap => 1,
            BlockKind::EliasFano => 2,
            BlockKind::Full => 3,
        }
    }

    pub(crate) fn from_tag(tag: u64) -> Result<Self> {
        match tag {
            0 => Ok(BlockKind::Raw),
            1 => Ok(BlockKind::Bitmap),
            2 => Ok(BlockKind::EliasFano),
            3 => Ok(BlockKind::Full),
            _ => Err(Error::corrupt(format!("invalid block tag {tag}"))),
        }
    }
}

/// A list encoding over a bounded universe.
///
/// `values` passed to [`BlockList::write`] lie in `[0, universe)` for the
/// universe-relative lists; [`GapList`] ignores the universe.
pub trait BlockList {
    /// Estimated encoded size in bits of `count` values drawn from `universe`.
    fn estimate_size(count: usize, universe: u64) -> u64;

    /// Append the encoding of `values` to `w`.
    fn write(w: &mut BitWriter, values: &[u64], universe: u64);

    /// Value at `idx` of a list of `count` values starting at bit `start`.
    fn access(s: &BitSlice<'_>, start: usize, count: usize, universe: u64, idx: usize)
        -> Result<u64>;

    /// Decode all `out.len()` values of a list starting at bit `start`.
    fn decode(s: &BitSlice<'_>, start: usize, universe: u64, out: &mut [u64]) -> Result<()>;
}

/// Zero-payload list of the integers `0..count`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullList;

impl BlockList for FullList {
    fn estimate_size(_count: usize, _universe: u64) -> u64 {
        0
    }

    fn write(_w: &mut BitWriter, values: &[u64], universe: u64) {
        debug_assert_eq!(values.len() as u64, universe);
    }

    fn access(
        _s: &BitSlice<'_>,
        _start: usize,
        _count: usize,
        _universe: u64,
        idx: usize,
    ) -> Result<u64> {
        Ok(idx as u64)
    }

    fn decode(_s: &BitSlice<'_>, _start: usize, _universe: u64, out: &mut [u64]) -> Result<()> {
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = i as u64;
        }
        Ok(())
    }
}

/// Pick the encoding for a sorted block of `count` values over `universe`.
///
/// FULL wins outright when the block covers its universe; otherwise the
/// cheaper of bitmap and Elias-Fano by estimated bits. Bitmap and FULL need
/// distinct values.
pub(crate) fn choose_kind(count: usize, universe: u64, strictly_increasing: bool) -> BlockKind {
    if strictly_increasing && count as u64 == universe {
        return BlockKind::Full;
    }
    let ef_bits = EliasFanoList::estimate_size(count, universe);
    let bv_bits = BitmapList::estimate_size(count, universe);
    if strictly_increasing && bv_bits < ef_bits {
        BlockKind::Bitmap
    } else {
        BlockKind::EliasFano
    }
}
