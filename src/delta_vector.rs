//! Block-sampled delta-coded vectors.
//!
//! The sequence is cut into blocks of `B` values. For every block the first
//! value is kept verbatim as the *sample*; the block itself is replaced by its
//! forward differences and handed to a [`BlockCodec`].
//!
//! # Layout
//!
//! - `samples`: bit-compressed [`IntVector`] of `2 * blocks + 2` entries,
//!   `[sample_0, ptr_0, sample_1, ptr_1, ..., 0, payload_len]`.
//! - `payload`: byte arena holding the encoded blocks back to back; `ptr_k` is
//!   the byte offset of block `k`.
//!
//! A short final block is padded by repeating its last value so the codec
//! always sees a whole frame. Codecs with [`BlockCodec::DETECT_FULL_RUNS`]
//! store blocks of strictly consecutive integers with pointer `0`
//! ([`FULL_BLOCK`]) and no payload at all; the payload then starts with
//! [`BlockCodec::LEADING_PADDING`] reserved bytes so no real block lives at
//! offset 0.
//!
//! # Access cost
//!
//! Offset 0 of a block (and any offset of a full block) is answered from the
//! sample table. Anything else decodes the whole block into a stack buffer:
//! the delta codes have no entry point mid-block. Callers touching nearby
//! positions repeatedly should go through [`crate::CachedReader`].

use std::fmt;
use std::io::{Read, Write};
use std::marker::PhantomData;

use crate::codec::{delta_encode, prefix_sum, BinaryPacking, BlockCodec, Pfor};
use crate::error::{Error, Result};
use crate::int_vector::{read_len, write_u64, IntVector};
use crate::sequence::IntSequence;

/// Block pointer marking a block of strictly consecutive integers.
pub const FULL_BLOCK: u64 = 0;

/// Delta vector packed with SIMD-friendly fixed-width binary packing.
pub type BpVector<const B: usize = 128> = DeltaVector<BinaryPacking, B>;

/// Delta vector packed with adaptive-width patched frame-of-reference and
/// zero-cost full runs.
pub type PforVector<const B: usize = 128> = DeltaVector<Pfor, B>;

/// An immutable, block-sampled, delta-coded sequence of 32-bit values.
pub struct DeltaVector<C: BlockCodec, const B: usize = 128> {
    len: usize,
    samples: IntVector,
    payload: Vec<u8>,
    _codec: PhantomData<fn() -> C>,
}

impl<C: BlockCodec, const B: usize> Clone for DeltaVector<C, B> {
    fn clone(&self) -> Self {
        Self {
            len: self.len,
            samples: self.samples.clone(),
            payload: self.payload.clone(),
            _codec: PhantomData,
        }
    }
}

impl<C: BlockCodec, const B: usize> fmt::Debug for DeltaVector<C, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeltaVector")
            .field("codec", &C::NAME)
            .field("block_size", &B)
            .field("len", &self.len)
            .field("payload_bytes", &self.payload.len())
            .finish()
    }
}

/// Single-pass accumulator for [`DeltaVector`] construction.
struct Builder<C: BlockCodec, const B: usize> {
    block: [u32; B],
    filled: usize,
    len: usize,
    samples: Vec<u64>,
    payload: Vec<u8>,
    full_blocks: usize,
    _codec: PhantomData<fn() -> C>,
}

impl<C: BlockCodec, const B: usize> Builder<C, B> {
    fn new(size_hint: usize) -> Self {
        Self {
            block: [0; B],
            filled: 0,
            len: 0,
            samples: Vec::with_capacity(2 * size_hint.div_ceil(B) + 2),
            payload: Vec::new(),
            full_blocks: 0,
            _codec: PhantomData,
        }
    }

    fn push(&mut self, value: u64) -> Result<()> {
        let v = u32::try_from(value).map_err(|_| Error::ValueDomain {
            index: self.len,
            value,
            max: u64::from(u32::MAX),
        })?;
        self.block[self.filled] = v;
        self.filled += 1;
        self.len += 1;
        if self.filled == B {
            self.flush();
        }
        Ok(())
    }

    fn flush(&mut self) {
        let sample = self.block[0];
        self.samples.push(u64::from(sample));

        let complete = self.filled == B;
        if complete && C::DETECT_FULL_RUNS && is_full_run(&self.block) {
            self.samples.push(FULL_BLOCK);
            self.full_blocks += 1;
        } else {
            if self.payload.is_empty() {
                self.payload.resize(C::LEADING_PADDING, 0);
            }
            let last = self.block[self.filled - 1];
            self.block[self.filled..].fill(last);
            self.samples.push(self.payload.len() as u64);
            delta_encode(&mut self.block);
            C::encode(&self.block, &mut self.payload);
        }
        self.filled = 0;
    }

    fn finish(mut self) -> DeltaVector<C, B> {
        if self.filled > 0 {
            self.flush();
        }
        self.samples.push(0);
        self.samples.push(self.payload.len() as u64);
        let samples = IntVector::bit_compress(&self.samples);

        tracing::debug!(
            codec = C::NAME,
            block_size = B,
            len = self.len,
            blocks = self.len.div_ceil(B),
            full_blocks = self.full_blocks,
            payload_bytes = self.payload.len(),
            sample_width = samples.width(),
            "built delta vector"
        );

        DeltaVector {
            len: self.len,
            samples,
            payload: self.payload,
            _codec: PhantomData,
        }
    }
}

fn is_full_run(block: &[u32]) -> bool {
    block.windows(2).all(|w| w[0].checked_add(1) == Some(w[1]))
}

impl<C: BlockCodec, const B: usize> DeltaVector<C, B> {
    const BLOCK_SIZE_OK: () = assert!(
        B > 1 && B % C::GRANULE == 0,
        "block size must be a multiple of the codec granule"
    );

    /// Build from a materialized sequence.
    ///
    /// Fails with [`Error::ValueDomain`] if any value exceeds `u32::MAX`.
    pub fn new<T: Copy + Into<u64>>(values: &[T]) -> Result<Self> {
        #[allow(clippy::let_unit_value)]
        let () = Self::BLOCK_SIZE_OK;
        let mut builder = Builder::<C, B>::new(values.len());
        for &v in values {
            builder.push(v.into())?;
        }
        Ok(builder.finish())
    }

    /// Build from a streaming source in a single pass.
    pub fn try_from_iter<I: IntoIterator<Item = u64>>(values: I) -> Result<Self> {
        #[allow(clippy::let_unit_value)]
        let () = Self::BLOCK_SIZE_OK;
        let iter = values.into_iter();
        let mut builder = Builder::<C, B>::new(iter.size_hint().0);
        for v in iter {
            builder.push(v)?;
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

    /// Size of the encoded payload in bytes.
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Approximate heap memory usage in bytes.
    pub fn heap_bytes(&self) -> usize {
        self.payload.capacity() + self.samples.heap_bytes()
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

    fn pointer(&self, block_id: usize) -> Result<u64> {
        self.samples.get(2 * block_id + 1)
    }

    /// Return the first value of block `block_id`.
    pub fn sample(&self, block_id: usize) -> Result<u64> {
        self.check_block(block_id)?;
        self.samples.get(2 * block_id)
    }

    /// Return true if block `block_id` is stored as a full run.
    pub fn is_full_block(&self, block_id: usize) -> Result<bool> {
        self.check_block(block_id)?;
        Ok(C::DETECT_FULL_RUNS && self.pointer(block_id)? == FULL_BLOCK)
    }

    fn decode_deltas(&self, ptr: u64, deltas: &mut [u32; B]) -> Result<()> {
        let data = usize::try_from(ptr)
            .ok()
            .and_then(|p| self.payload.get(p..))
            .ok_or_else(|| Error::corrupt(format!("block pointer {ptr} past payload")))?;
        C::decode(data, deltas)?;
        Ok(())
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
        let sample = self.samples.get(2 * block_id)?;
        if offset == 0 {
            return Ok(sample);
        }
        let ptr = self.pointer(block_id)?;
        if C::DETECT_FULL_RUNS && ptr == FULL_BLOCK {
            return Ok(sample + offset as u64);
        }

        let mut deltas = [0u32; B];
        self.decode_deltas(ptr, &mut deltas)?;
        let value = deltas[1..=offset]
            .iter()
            .fold(sample as u32, |acc, &d| acc.wrapping_add(d));
        Ok(u64::from(value))
    }

    /// Decode block `block_id` into `out[..B]` as offsets from its sample.
    ///
    /// `out[j]` is `value_j - sample(block_id)` modulo 2^64: 0 at `j = 0`,
    /// simply `j` for a full block. A short final block is padded with its
    /// last offset. Returns the number of real elements in the block.
    pub fn decode_block(&self, block_id: usize, out: &mut [u64]) -> Result<usize> {
        self.check_block(block_id)?;
        if out.len() < B {
            return Err(Error::BufferTooSmall {
                needed: B,
                got: out.len(),
            });
        }
        let count = (self.len - block_id * B).min(B);
        let sample = self.samples.get(2 * block_id)?;
        let ptr = self.pointer(block_id)?;
        if C::DETECT_FULL_RUNS && ptr == FULL_BLOCK {
            for (j, slot) in out[..B].iter_mut().enumerate() {
                *slot = j as u64;
            }
            return Ok(count);
        }

        let mut deltas = [0u32; B];
        self.decode_deltas(ptr, &mut deltas)?;
        prefix_sum(sample as u32, &deltas, &mut out[..B]);
        Ok(count)
    }

    /// Write the vector to `out`, returning the number of bytes written.
    ///
    /// Format: len (u64), payload length (u64), payload bytes, sample table.
    pub fn serialize<W: Write>(&self, out: &mut W) -> Result<usize> {
        let mut written = write_u64(out, self.len as u64)?;
        written += write_u64(out, self.payload.len() as u64)?;
        out.write_all(&self.payload)?;
        written += self.payload.len();
        written += self.samples.serialize(out)?;
        Ok(written)
    }

    /// Load a vector written by [`DeltaVector::serialize`].
    pub fn load<R: Read>(input: &mut R) -> Result<Self> {
        #[allow(clippy::let_unit_value)]
        let () = Self::BLOCK_SIZE_OK;
        let len = read_len(input, "element count")?;
        let payload_len = read_len(input, "payload length")?;
        let mut payload = Vec::new();
        input
            .take(payload_len as u64)
            .read_to_end(&mut payload)
            .map_err(Error::from_read)?;
        if payload.len() != payload_len {
            return Err(Error::corrupt(format!(
                "payload truncated: expected {payload_len} bytes, got {}",
                payload.len()
            )));
        }
        let samples = IntVector::load(input)?;

        let v = Self {
            len,
            samples,
            payload,
            _codec: PhantomData,
        };
        v.validate()?;
        tracing::debug!(
            codec = C::NAME,
            len = v.len,
            payload_bytes = v.payload.len(),
            "loaded delta vector"
        );
        Ok(v)
    }

    fn validate(&self) -> Result<()> {
        let blocks = self.num_blocks();
        if self.samples.len() != 2 * blocks + 2 {
            return Err(Error::corrupt(format!(
                "sample table has {} entries, expected {} for {} elements",
                self.samples.len(),
                2 * blocks + 2,
                self.len
            )));
        }
        let payload_len = self.payload.len() as u64;
        if self.pointer(blocks)? != payload_len {
            return Err(Error::corrupt("sentinel pointer does not match payload length"));
        }
        let mut prev = 0u64;
        for block_id in 0..blocks {
            let sample = self.samples.get(2 * block_id)?;
            let ptr = self.pointer(block_id)?;
            let max = if C::DETECT_FULL_RUNS && ptr == FULL_BLOCK {
                sample.saturating_add(B as u64 - 1)
            } else {
                sample
            };
            if max > u64::from(u32::MAX) {
                return Err(Error::corrupt(format!(
                    "block {block_id} sample {sample} exceeds the 32-bit domain"
                )));
            }
            if C::DETECT_FULL_RUNS && ptr == FULL_BLOCK {
                continue;
            }
            if ptr < prev || ptr < C::LEADING_PADDING as u64 || ptr >= payload_len {
                return Err(Error::corrupt(format!(
                    "block {block_id} pointer {ptr} out of order or past payload"
                )));
            }
            prev = ptr;
        }
        Ok(())
    }
}

impl<C: BlockCodec, const B: usize> IntSequence for DeltaVector<C, B> {
    const BLOCK_SIZE: usize = B;

    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, i: usize) -> Result<u64> {
        DeltaVector::get(self, i)
    }

    fn sample(&self, block_id: usize) -> Result<u64> {
        DeltaVector::sample(self, block_id)
    }

    fn decode_block(&self, block_id: usize, out: &mut [u64]) -> Result<usize> {
        DeltaVector::decode_block(self, block_id, out)
    }

    fn serialize<W: Write>(&self, out: &mut W) -> Result<usize> {
        DeltaVector::serialize(self, out)
    }

    fn load<R: Read>(input: &mut R) -> Result<Self> {
        DeltaVector::load(input)
    }

    fn heap_bytes(&self) -> usize {
        DeltaVector::heap_bytes(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bp_roundtrip_multiple_blocks() {
        let values: Vec<u32> = (0..1000u32).map(|i| i * 3 + (i % 7)).collect();
        let v = BpVector::<128>::new(&values).unwrap();
        assert_eq!(v.len(), 1000);
        assert_eq!(v.num_blocks(), 8);
        for (i, &x) in values.iter().enumerate() {
            assert_eq!(v.get(i).unwrap(), u64::from(x));
        }
        assert_eq!(v.sample(1).unwrap(), u64::from(values[128]));
    }

    #[test]
    fn pfor_roundtrip_permutation() {
        // a permutation is far from monotone: every delta wraps
        let n = 777u32;
        let values: Vec<u32> = (0..n).map(|i| (i * 331) % n).collect();
        let v = PforVector::<64>::new(&values).unwrap();
        for (i, &x) in values.iter().enumerate() {
            assert_eq!(v.get(i).unwrap(), u64::from(x));
        }
    }

    #[test]
    fn rejects_values_above_u32() {
        let values = vec![1u64, 2, u64::from(u32::MAX) + 1];
        match BpVector::<128>::new(&values) {
            Err(Error::ValueDomain { index, value, .. }) => {
                assert_eq!(index, 2);
                assert_eq!(value, u64::from(u32::MAX) + 1);
            }
            other => panic!("expected value domain error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_u32_max() {
        let values = vec![u32::MAX, 0, u32::MAX];
        let v = PforVector::<32>::new(&values).unwrap();
        assert_eq!(v.get(0).unwrap(), u64::from(u32::MAX));
        assert_eq!(v.get(1).unwrap(), 0);
        assert_eq!(v.get(2).unwrap(), u64::from(u32::MAX));
    }

    #[test]
    fn full_runs_take_no_payload() {
        let values: Vec<u32> = (1000..1000 + 256).collect();
        let v = PforVector::<128>::new(&values).unwrap();
        assert!(v.is_full_block(0).unwrap());
        assert!(v.is_full_block(1).unwrap());
        assert_eq!(v.payload_len(), 0);
        assert_eq!(v.get(200).unwrap(), 1200);

        let mut out = vec![0u64; 128];
        assert_eq!(v.decode_block(1, &mut out).unwrap(), 128);
        assert_eq!(v.sample(1).unwrap(), 1128);
        assert_eq!(&out[..3], &[0, 1, 2]);
        assert_eq!(out[127], 127);
    }

    #[test]
    fn run_crossing_u32_max_is_not_full() {
        // 41 values up to u32::MAX, then 0..55: three blocks of 32
        let mut values: Vec<u32> = (u32::MAX - 40..=u32::MAX).collect();
        values.extend(0..55);
        let v = PforVector::<32>::new(&values).unwrap();
        assert!(v.is_full_block(0).unwrap());
        assert!(!v.is_full_block(1).unwrap());
        for (i, &x) in values.iter().enumerate() {
            assert_eq!(v.get(i).unwrap(), u64::from(x));
        }
    }

    #[test]
    fn decode_block_yields_offsets_from_sample() {
        let v = BpVector::<128>::new(&[10u32, 20, 30]).unwrap();
        let mut out = vec![7u64; 128];
        assert_eq!(v.decode_block(0, &mut out).unwrap(), 3);
        assert_eq!(&out[..3], &[0, 10, 20]);
        assert!(out[3..].iter().all(|&x| x == 20));

        let values: Vec<u32> = (5..133).collect();
        let v = PforVector::<128>::new(&values).unwrap();
        assert!(v.is_full_block(0).unwrap());
        assert_eq!(v.decode_block(0, &mut out).unwrap(), 128);
        assert_eq!(&out[..3], &[0, 1, 2]);
    }

    #[test]
    fn short_last_block_is_padded() {
        let values: Vec<u32> = vec![10, 20, 30, 5, 1];
        let v = BpVector::<128>::new(&values).unwrap();
        let mut out = vec![0u64; 128];
        assert_eq!(v.decode_block(0, &mut out).unwrap(), 5);
        let restored: Vec<u64> = out[..5].iter().map(|&r| 10u64.wrapping_add(r)).collect();
        assert_eq!(restored, vec![10, 20, 30, 5, 1]);
        assert!(out[5..].iter().all(|&x| x == out[4]));
    }

    #[test]
    fn decode_block_needs_room() {
        let v = BpVector::<128>::new(&[1u32, 2, 3]).unwrap();
        let mut out = vec![0u64; 127];
        assert!(matches!(
            v.decode_block(0, &mut out),
            Err(Error::BufferTooSmall { needed: 128, got: 127 })
        ));
    }

    #[test]
    fn empty_vector() {
        let v = PforVector::<128>::new::<u32>(&[]).unwrap();
        assert!(v.is_empty());
        assert_eq!(v.payload_len(), 0);
        assert_eq!(v.num_blocks(), 0);
        assert!(matches!(
            v.get(0),
            Err(Error::IndexOutOfRange { index: 0, len: 0 })
        ));
        assert!(v.sample(0).is_err());
    }

    #[test]
    fn streaming_matches_slice_build() {
        let values: Vec<u64> = (0..300u64).map(|i| (i * i) % 4099).collect();
        let a = PforVector::<64>::new(&values).unwrap();
        let b = PforVector::<64>::try_from_iter(values.iter().copied()).unwrap();
        assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());
    }

    #[test]
    fn serialize_roundtrip() {
        let values: Vec<u32> = (0..500u32).map(|i| i ^ 0x55).collect();
        let v = PforVector::<32>::new(&values).unwrap();
        let mut buf = Vec::new();
        let written = v.serialize(&mut buf).unwrap();
        assert_eq!(written, buf.len());

        let back = PforVector::<32>::load(&mut buf.as_slice()).unwrap();
        assert_eq!(back.len(), v.len());
        for i in 0..values.len() {
            assert_eq!(back.get(i).unwrap(), v.get(i).unwrap());
        }
    }

    #[test]
    fn load_rejects_truncated_payload() {
        let values: Vec<u32> = (0..300u32).map(|i| i * 17).collect();
        let v = BpVector::<128>::new(&values).unwrap();
        let bytes = v.to_bytes().unwrap();
        assert!(matches!(
            BpVector::<128>::from_bytes(&bytes[..40]),
            Err(Error::StreamCorruption(_))
        ));
    }

    #[test]
    fn load_rejects_mismatched_block_size() {
        let values: Vec<u32> = (0..300u32).collect();
        let bytes = BpVector::<128>::new(&values).unwrap().to_bytes().unwrap();
        assert!(BpVector::<256>::from_bytes(&bytes).is_err());
    }

    #[test]
    fn load_rejects_wrong_length() {
        let values: Vec<u32> = (0..300u32).map(|i| i * 5).collect();
        let mut bytes = PforVector::<32>::new(&values).unwrap().to_bytes().unwrap();
        bytes[0..8].copy_from_slice(&10_000u64.to_le_bytes());
        assert!(matches!(
            PforVector::<32>::from_bytes(&bytes),
            Err(Error::StreamCorruption(_))
        ));
    }
}
