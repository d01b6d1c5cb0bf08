//! The sequence contract shared by every container.
//!
//! Consumers (suffix arrays, LCP arrays, Ψ tables) are written against
//! [`IntSequence`] and pick a container as a type parameter. Containers are
//! immutable once built and keep no scratch state, so `&S` can be shared
//! across threads freely. Per-caller decode buffers live in [`CachedReader`]
//! and [`Iter`].

use std::io::{Read, Write};

use crate::error::{Error, Result};

/// A block-sampled, immutable sequence of unsigned integers.
pub trait IntSequence: Sized {
    /// Elements per block (the sampling density).
    const BLOCK_SIZE: usize;

    /// Number of elements.
    fn len(&self) -> usize;

    /// Return true if the sequence has 0 elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of blocks, `ceil(len / BLOCK_SIZE)`.
    fn num_blocks(&self) -> usize {
        self.len().div_ceil(Self::BLOCK_SIZE)
    }

    /// Value at index `i`.
    fn get(&self, i: usize) -> Result<u64>;

    /// Sample value stored for block `block_id`.
    fn sample(&self, block_id: usize) -> Result<u64>;

    /// Decode block `block_id` into `out[..BLOCK_SIZE]` as offsets from
    /// [`IntSequence::sample`], modulo 2^64. Returns the number of real
    /// (non-padding) elements.
    fn decode_block(&self, block_id: usize, out: &mut [u64]) -> Result<usize>;

    /// Write the sequence to `out`, returning the number of bytes written.
    fn serialize<W: Write>(&self, out: &mut W) -> Result<usize>;

    /// Read a sequence previously written by [`IntSequence::serialize`].
    fn load<R: Read>(input: &mut R) -> Result<Self>;

    /// Approximate heap memory usage in bytes.
    fn heap_bytes(&self) -> usize;

    /// Serialize into a fresh byte vector.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.serialize(&mut out)?;
        Ok(out)
    }

    /// Deserialize from `to_bytes()` output, rejecting trailing bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut rest = bytes;
        let seq = Self::load(&mut rest)?;
        if !rest.is_empty() {
            return Err(Error::corrupt(format!(
                "{} trailing bytes after sequence",
                rest.len()
            )));
        }
        Ok(seq)
    }

    /// Iterate over all values in order, decoding each block once.
    fn iter(&self) -> Iter<'_, Self> {
        Iter {
            reader: CachedReader::new(self),
            pos: 0,
        }
    }
}

/// Random-access reader that keeps the last decoded block.
///
/// Each reader owns its buffer, so any number of readers may run against the
/// same sequence concurrently.
pub struct CachedReader<'a, S: IntSequence> {
    seq: &'a S,
    buf: Vec<u64>,
    base: u64,
    block: Option<usize>,
}

impl<'a, S: IntSequence> CachedReader<'a, S> {
    /// Create a reader over `seq`.
    pub fn new(seq: &'a S) -> Self {
        Self {
            seq,
            buf: vec![0; S::BLOCK_SIZE],
            base: 0,
            block: None,
        }
    }

    /// Block currently held in the buffer, if any.
    pub fn cached_block(&self) -> Option<usize> {
        self.block
    }

    /// Return the value at index `i`, decoding its block only on a miss.
    pub fn get(&mut self, i: usize) -> Result<u64> {
        let len = self.seq.len();
        if i >= len {
            return Err(Error::IndexOutOfRange { index: i, len });
        }
        let block_id = i / S::BLOCK_SIZE;
        if self.block != Some(block_id) {
            self.block = None;
            self.base = self.seq.sample(block_id)?;
            self.seq.decode_block(block_id, &mut self.buf)?;
            self.block = Some(block_id);
        }
        Ok(self.base.wrapping_add(self.buf[i % S::BLOCK_SIZE]))
    }
}

/// In-order iterator over a sequence. Yields an error and stops if a block
/// fails to decode.
pub struct Iter<'a, S: IntSequence> {
    reader: CachedReader<'a, S>,
    pos: usize,
}

impl<S: IntSequence> Iterator for Iter<'_, S> {
    type Item = Result<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.reader.seq.len();
        if self.pos >= len {
            return None;
        }
        let item = self.reader.get(self.pos);
        self.pos = if item.is_ok() { self.pos + 1 } else { len };
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.reader.seq.len().saturating_sub(self.pos);
        (left, Some(left))
    }
}

impl<S: IntSequence> ExactSizeIterator for Iter<'_, S> {}
