//! Hybrid two-level Elias-Fano / bitmap / full vector.
//!
//! A coarse *top* list records a boundary value per block: `top[0] = 0` and
//! `top[k + 1]` is the last value of block `k`. For a sorted block whose first
//! value exceeds `top[k]`, every value lies in `(top[k], top[k + 1]]`, so the
//! block is stored relative to that universe and each block independently picks
//! the cheapest of:
//!
//! - FULL: the block is every integer of its universe, nothing stored;
//! - BITMAP: one bit per universe slot;
//! - ELIAS-FANO: the general case.
//!
//! Blocks that are not sorted (or start at or below their top boundary) fall
//! back to a RAW zigzag gap list over absolute values.
//!
//! # Layout
//!
//! - `blocks`: bit-compressed [`IntVector`] of `[ptr_k, top_k]` pairs for
//!   `k in 0..=num_blocks`; the final pointer is the payload bit length.
//! - `payload`: a word-addressed bit stream. Block `k` starts at bit `ptr_k`
//!   with a 2-bit [`BlockKind`] tag.

use std::fmt;
use std::io::{Read, Write};

use crate::bits::{BitSlice, BitWriter};
use crate::error::{Error, Result};
use crate::int_vector::{read_len, read_words, write_u64, IntVector};
use crate::list::{
    choose_kind, BitmapList, BlockKind, BlockList, EliasFanoList, FullList, GapList, TAG_BITS,
};
use crate::sequence::IntSequence;

/// An immutable, block-sampled sequence of 64-bit values with per-block
/// adaptive encoding.
#[derive(Clone)]
pub struct EfVector<const B: usize = 128> {
    len: usize,
    blocks: IntVector,
    payload: Vec<u64>,
}

impl<const B: usize> fmt::Debug for EfVector<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EfVector")
            .field("block_size", &B)
            .field("len", &self.len)
            .field("payload_words", &self.payload.len())
            .finish()
    }
}

/// Encode one block at the writer's position and return its kind.
fn encode_block(
    w: &mut BitWriter,
    values: &[u64],
    lo: u64,
    hi: u64,
    scratch: &mut Vec<u64>,
) -> BlockKind {
    let sorted = values.windows(2).all(|p| p[0] <= p[1]);
    if !sorted || values[0] <= lo {
        w.write_bits(BlockKind::Raw.tag(), TAG_BITS);
        GapList::write(w, values, 0);
        return BlockKind::Raw;
    }

    let strictly_increasing = values.windows(2).all(|p| p[0] < p[1]);
    let universe = hi - lo;
    scratch.clear();
    scratch.extend(values.iter().map(|&v| v - lo - 1));

    let kind = choose_kind(values.len(), universe, strictly_increasing);
    tracing::trace!(?kind, count = values.len(), universe, "hybrid block");
    w.write_bits(kind.tag(), TAG_BITS);
    match kind {
        BlockKind::Full => FullList::write(w, scratch, universe),
        BlockKind::Bitmap => BitmapList::write(w, scratch, universe),
        BlockKind::EliasFano => EliasFanoList::write(w, scratch, universe),
        BlockKind::Raw => unreachable!("raw blocks are handled above"),
    }
    kind
}

/// Single-pass accumulator for [`EfVector`] construction.
struct Builder<const B: usize> {
    block: Vec<u64>,
    scratch: Vec<u64>,
    lo: u64,
    len: usize,
    writer: BitWriter,
    entries: Vec<u64>,
    kinds: [usize; 4],
}

impl<const B: usize> Builder<B> {
    fn new(size_hint: usize) -> Self {
        Self {
            block: Vec::with_capacity(B),
            scratch: Vec::with_capacity(B),
            lo: 0,
            len: 0,
            writer: BitWriter::new(),
            entries: Vec::with_capacity(2 * size_hint.div_ceil(B) + 2),
            kinds: [0; 4],
        }
    }

    fn push(&mut self, value: u64) {
        self.block.push(value);
        self.len += 1;
        if self.block.len() == B {
            self.flush();
        }
    }

    fn flush(&mut self) {
        let hi = self.block[self.block.len() - 1];
        let ptr = self.writer.len() as u64;
        let kind = encode_block(&mut self.writer, &self.block, self.lo, hi, &mut self.scratch);
        self.kinds[kind.tag() as usize] += 1;
        self.entries.push(ptr);
        self.entries.push(self.lo);
        self.lo = hi;
        self.block.clear();
    }

    fn finish(mut self) -> EfVector<B> {
        if !self.block.is_empty() {
            self.flush();
        }
        self.entries.push(self.writer.len() as u64);
        self.entries.push(self.lo);
        let payload_bits = self.writer.len();
        let blocks = IntVector::bit_compress(&self.entries);

        tracing::debug!(
            block_size = B,
            len = self.len,
            blocks = self.len.div_ceil(B),
            raw = self.kinds[0],
            bitmap = self.kinds[1],
            elias_fano = self.kinds[2],
            full = self.kinds[3],
            payload_bits,
            "built hybrid vector"
        );

        EfVector {
            len: self.len,
            blocks,
            payload: self.writer.into_words(),
        }
    }
}

impl<const B: usize> EfVector<B> {
    const BLOCK_SIZE_OK: () = assert!(B > 1, "block size must be larger than 1");

    /// Build from a materialized sequence.
    pub fn new<T: Copy + Into<u64>>(values: &[T]) -> Result<Self> {
        #[allow(clippy::let_unit_value)]
        let () = Self::BLOCK_SIZE_OK;
        let mut builder = Builder::<B>::new(values.len());
        for &v in values {
            builder.push(v.into());
        }
        Ok(builder.finish())
    }

    /// Build from a streaming source in a single pass.
    pub fn try_from_iter<I: IntoIterator<Item = u64>>(values: I) -> Result<Self> {
        #[allow(clippy::let_unit_value)]
        let () = Self::BLOCK_SIZE_OK;
        let iter = values.into_iter();
        let mut builder = Builder::<B>::new(iter.size_hint().0);
        for v in iter {
            builder.push(v);
        }
        Ok(builder.finish())
    }

    /// Return the number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Return true if the sequence has 0 elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of blocks.
    pub fn num_blocks(&self) -> usize {
        self.len.div_ceil(B)
    }

    /// Number of payload bits in use.
    pub fn payload_bits(&self) -> Result<usize> {
        Ok(self.blocks.get(2 * self.num_blocks())? as usize)
    }

    /// Approximate heap memory usage in bytes.
    pub fn heap_bytes(&self) -> usize {
        self.payload.capacity() * 8 + self.blocks.heap_bytes()
    }

    fn check_block(&self, block_id: usize) -> Result<()> {
        if block_id >= self.num_blocks() {
            return Err(Error::IndexOutOfRange {
                index: block_id,
                len: self.num_blocks(),
            });
        }
        Ok(())
    }

    fn block_len(&self, block_id: usize) -> usize {
        (self.len - block_id * B).min(B)
    }

    fn pointer(&self, block_id: usize) -> Result<usize> {
        let ptr = self.blocks.get(2 * block_id)?;
        usize::try_from(ptr).map_err(|_| Error::corrupt(format!("block pointer {ptr} too large")))
    }

    fn top(&self, block_id: usize) -> Result<u64> {
        self.blocks.get(2 * block_id + 1)
    }

    /// Lower boundary and universe size of block `block_id`.
    fn bounds(&self, block_id: usize) -> Result<(u64, u64)> {
        let lo = self.top(block_id)?;
        let hi = self.top(block_id + 1)?;
        let universe = hi
            .checked_sub(lo)
            .ok_or_else(|| Error::corrupt(format!("block {block_id} has inverted universe")))?;
        Ok((lo, universe))
    }

    fn kind_at(&self, s: &BitSlice<'_>, ptr: usize) -> Result<BlockKind> {
        BlockKind::from_tag(s.get_bits(ptr, TAG_BITS)?)
    }

    /// Return the top boundary of block `block_id`.
    pub fn sample(&self, block_id: usize) -> Result<u64> {
        self.check_block(block_id)?;
        self.top(block_id)
    }

    /// Return the encoding chosen for block `block_id`.
    pub fn block_kind(&self, block_id: usize) -> Result<BlockKind> {
        self.check_block(block_id)?;
        let s = BitSlice::new(&self.payload);
        self.kind_at(&s, self.pointer(block_id)?)
    }

    /// Return the value at index `i`.
    pub fn get(&self, i: usize) -> Result<u64> {
        if i >= self.len {
            return Err(Error::IndexOutOfRange {
                index: i,
                len: self.len,
            });
        }
        let block_id = i / B;
        let offset = i % B;
        let count = self.block_len(block_id);
        let ptr = self.pointer(block_id)?;
        let s = BitSlice::new(&self.payload);
        let start = ptr + TAG_BITS;

        let kind = self.kind_at(&s, ptr)?;
        if kind == BlockKind::Raw {
            return GapList::access(&s, start, count, 0, offset);
        }
        let (lo, universe) = self.bounds(block_id)?;
        let rel = match kind {
            BlockKind::Full => FullList::access(&s, start, count, universe, offset)?,
            BlockKind::Bitmap => BitmapList::access(&s, start, count, universe, offset)?,
            BlockKind::EliasFano => EliasFanoList::access(&s, start, count, universe, offset)?,
            BlockKind::Raw => unreachable!("raw blocks are handled above"),
        };
        rebase(lo, rel)
    }

    /// Decode block `block_id` into `out[..B]` as offsets from its top
    /// boundary.
    ///
    /// `out[j]` is `value_j - sample(block_id)` modulo 2^64; raw blocks may
    /// hold values below the boundary and wrap. A short final block is padded
    /// with its last offset. Returns the number of real elements in the block.
    pub fn decode_block(&self, block_id: usize, out: &mut [u64]) -> Result<usize> {
        self.check_block(block_id)?;
        if out.len() < B {
            return Err(Error::BufferTooSmall {
                needed: B,
                got: out.len(),
            });
        }
        let count = self.block_len(block_id);
        let ptr = self.pointer(block_id)?;
        let s = BitSlice::new(&self.payload);
        let start = ptr + TAG_BITS;
        let values = &mut out[..count];

        match self.kind_at(&s, ptr)? {
            BlockKind::Raw => {
                let lo = self.top(block_id)?;
                GapList::decode(&s, start, 0, values)?;
                for v in values.iter_mut() {
                    *v = v.wrapping_sub(lo);
                }
            }
            kind => {
                let (lo, universe) = self.bounds(block_id)?;
                match kind {
                    BlockKind::Full => FullList::decode(&s, start, universe, values)?,
                    BlockKind::Bitmap => BitmapList::decode(&s, start, universe, values)?,
                    _ => EliasFanoList::decode(&s, start, universe, values)?,
                }
                for v in values.iter_mut() {
                    *v = rebase(lo, *v)? - lo;
                }
            }
        }
        let last = out[count - 1];
        out[count..B].fill(last);
        Ok(count)
    }

    /// Write the vector to `out`, returning the number of bytes written.
    ///
    /// Format: len (u64), payload length in words (u64), payload words, block
    /// table.
    pub fn serialize<W: Write>(&self, out: &mut W) -> Result<usize> {
        let mut written = write_u64(out, self.len as u64)?;
        written += write_u64(out, self.payload.len() as u64)?;
        for &w in &self.payload {
            written += write_u64(out, w)?;
        }
        written += self.blocks.serialize(out)?;
        Ok(written)
    }

    /// Load a vector written by [`EfVector::serialize`].
    pub fn load<R: Read>(input: &mut R) -> Result<Self> {
        #[allow(clippy::let_unit_value)]
        let () = Self::BLOCK_SIZE_OK;
        let len = read_len(input, "element count")?;
        let words = read_len(input, "payload length")?;
        let payload = read_words(input, words)?;
        let blocks = IntVector::load(input)?;

        let v = Self {
            len,
            blocks,
            payload,
        };
        v.validate()?;
        tracing::debug!(
            len = v.len,
            payload_words = v.payload.len(),
            "loaded hybrid vector"
        );
        Ok(v)
    }

    fn validate(&self) -> Result<()> {
        let blocks = self.num_blocks();
        let expected = blocks.checked_mul(2).and_then(|n| n.checked_add(2));
        if expected != Some(self.blocks.len()) {
            return Err(Error::corrupt(format!(
                "block table has {} entries for {} elements",
                self.blocks.len(),
                self.len
            )));
        }
        let end = self.pointer(blocks)?;
        if self.payload.len() != end.div_ceil(64) {
            return Err(Error::corrupt(format!(
                "payload holds {} words, recorded bit length {end} needs {}",
                self.payload.len(),
                end.div_ceil(64)
            )));
        }
        for block_id in 0..blocks {
            let ptr = self.pointer(block_id)?;
            let next = self.pointer(block_id + 1)?;
            if ptr.checked_add(TAG_BITS).map_or(true, |p| p > next) {
                return Err(Error::corrupt(format!(
                    "block {block_id} pointer {ptr} out of order"
                )));
            }
        }
        Ok(())
    }
}

/// Map a universe-relative value back to its absolute value.
#[inline]
fn rebase(lo: u64, rel: u64) -> Result<u64> {
    lo.checked_add(1)
        .and_then(|base| base.checked_add(rel))
        .ok_or_else(|| Error::corrupt("block value overflows u64"))
}

impl<const B: usize> IntSequence for EfVector<B> {
    const BLOCK_SIZE: usize = B;

    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, i: usize) -> Result<u64> {
        EfVector::get(self, i)
    }

    fn sample(&self, block_id: usize) -> Result<u64> {
        EfVector::sample(self, block_id)
    }

    fn decode_block(&self, block_id: usize, out: &mut [u64]) -> Result<usize> {
        EfVector::decode_block(self, block_id, out)
    }

    fn serialize<W: Write>(&self, out: &mut W) -> Result<usize> {
        EfVector::serialize(self, out)
    }

    fn load<R: Read>(input: &mut R) -> Result<Self> {
        EfVector::load(input)
    }

    fn heap_bytes(&self) -> usize {
        EfVector::heap_bytes(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsorted_block_falls_back_to_raw() {
        let v = EfVector::<8>::new(&[0u64, 100, 3, 250, 7]).unwrap();
        assert_eq!(v.block_kind(0).unwrap(), BlockKind::Raw);
        assert_eq!(v.get(2).unwrap(), 3);
        assert_eq!(v.get(3).unwrap(), 250);
    }

    #[test]
    fn consecutive_block_is_full() {
        // block 0 starts at 0 == top[0], so it is raw; block 1 covers (7, 15]
        let values: Vec<u64> = (0..16).collect();
        let v = EfVector::<8>::new(&values).unwrap();
        assert_eq!(v.block_kind(1).unwrap(), BlockKind::Full);
        assert_eq!(v.sample(1).unwrap(), 7);
        for (i, &x) in values.iter().enumerate() {
            assert_eq!(v.get(i).unwrap(), x);
        }
        // a full block spends only its tag
        let ptr1 = v.pointer(1).unwrap();
        assert_eq!(v.payload_bits().unwrap(), ptr1 + TAG_BITS);
    }

    #[test]
    fn dense_block_uses_bitmap_and_sparse_uses_elias_fano() {
        let mut values: Vec<u64> = (1..=140).filter(|v| v % 12 != 0).collect();
        values.truncate(128);
        let dense_last = *values.last().unwrap();
        values.extend((1..=128u64).map(|i| dense_last + i * 1000));
        let v = EfVector::<128>::new(&values).unwrap();
        assert_eq!(v.block_kind(0).unwrap(), BlockKind::Bitmap);
        assert_eq!(v.block_kind(1).unwrap(), BlockKind::EliasFano);
        for (i, &x) in values.iter().enumerate() {
            assert_eq!(v.get(i).unwrap(), x);
        }
    }

    #[test]
    fn duplicates_stay_elias_fano() {
        let values = vec![5u64, 5, 5, 6, 6, 9, 9, 9];
        let v = EfVector::<8>::new(&values).unwrap();
        assert_eq!(v.block_kind(0).unwrap(), BlockKind::EliasFano);
        for (i, &x) in values.iter().enumerate() {
            assert_eq!(v.get(i).unwrap(), x);
        }
    }

    #[test]
    fn decode_block_pads_short_block() {
        let values: Vec<u64> = vec![3, 9, 27, 81, 243, 1, 2];
        let v = EfVector::<4>::new(&values).unwrap();
        let mut out = vec![0u64; 4];
        assert_eq!(v.decode_block(0, &mut out).unwrap(), 4);
        assert_eq!(v.sample(0).unwrap(), 0);
        assert_eq!(out, vec![3, 9, 27, 81]);

        assert_eq!(v.decode_block(1, &mut out).unwrap(), 3);
        let top = v.sample(1).unwrap();
        assert_eq!(top, 81);
        let restored: Vec<u64> = out.iter().map(|&r| top.wrapping_add(r)).collect();
        assert_eq!(restored, vec![243, 1, 2, 2]);
    }

    #[test]
    fn decode_block_offsets_for_coded_kinds() {
        // block 1 covers (7, 15] as a full run; block 2 is (15, 40] as a bitmap
        let mut values: Vec<u64> = (0..16).collect();
        values.extend([17, 18, 20, 23, 29, 31, 37, 40]);
        let v = EfVector::<8>::new(&values).unwrap();
        let mut out = vec![0u64; 8];

        assert_eq!(v.block_kind(1).unwrap(), BlockKind::Full);
        v.decode_block(1, &mut out).unwrap();
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6, 7, 8]);

        v.decode_block(2, &mut out).unwrap();
        assert_eq!(v.sample(2).unwrap(), 15);
        assert_eq!(out, vec![2, 3, 5, 8, 14, 16, 22, 25]);
    }

    #[test]
    fn full_u64_range() {
        let values = vec![u64::MAX, 0, u64::MAX - 1, u64::MAX];
        let v = EfVector::<2>::new(&values).unwrap();
        for (i, &x) in values.iter().enumerate() {
            assert_eq!(v.get(i).unwrap(), x);
        }
    }

    #[test]
    fn empty_vector() {
        let v = EfVector::<128>::new::<u64>(&[]).unwrap();
        assert!(v.is_empty());
        assert_eq!(v.payload_bits().unwrap(), 0);
        assert!(matches!(
            v.get(0),
            Err(Error::IndexOutOfRange { index: 0, len: 0 })
        ));
        let back = EfVector::<128>::from_bytes(&v.to_bytes().unwrap()).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn serialize_roundtrip() {
        let values: Vec<u64> = (0..1000u64).map(|i| i * i / 3).collect();
        let v = EfVector::<64>::new(&values).unwrap();
        let mut buf = Vec::new();
        let written = v.serialize(&mut buf).unwrap();
        assert_eq!(written, buf.len());
        let back = EfVector::<64>::load(&mut buf.as_slice()).unwrap();
        for (i, &x) in values.iter().enumerate() {
            assert_eq!(back.get(i).unwrap(), x);
        }
    }

    #[test]
    fn load_rejects_truncated_stream() {
        let values: Vec<u64> = (0..300u64).map(|i| i * 7).collect();
        let bytes = EfVector::<64>::new(&values).unwrap().to_bytes().unwrap();
        for cut in [4, 20, bytes.len() - 1] {
            assert!(matches!(
                EfVector::<64>::from_bytes(&bytes[..cut]),
                Err(Error::StreamCorruption(_))
            ));
        }
    }

    #[test]
    fn load_rejects_trailing_bytes() {
        let values: Vec<u64> = (1..50u64).collect();
        let mut bytes = EfVector::<16>::new(&values).unwrap().to_bytes().unwrap();
        bytes.push(0);
        assert!(EfVector::<16>::from_bytes(&bytes).is_err());
    }

    #[test]
    fn load_rejects_oversized_payload() {
        let values: Vec<u64> = (1..50u64).collect();
        let bytes = EfVector::<16>::new(&values).unwrap().to_bytes().unwrap();
        let words = u64::from_le_bytes(bytes[8..16].try_into().unwrap());

        // claim three extra payload words and supply them
        let mut padded = bytes[..8].to_vec();
        padded.extend_from_slice(&(words + 3).to_le_bytes());
        let payload_end = 16 + 8 * words as usize;
        padded.extend_from_slice(&bytes[16..payload_end]);
        padded.extend_from_slice(&[0u8; 24]);
        padded.extend_from_slice(&bytes[payload_end..]);

        assert!(matches!(
            EfVector::<16>::from_bytes(&padded),
            Err(Error::StreamCorruption(_))
        ));
    }
}
