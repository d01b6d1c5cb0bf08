//! Fixed-width packed integer array.
//!
//! Every value occupies exactly `width` bits, where `width` is the smallest
//! width able to hold the largest value ("bit compression"). Used for the
//! sample tables of every container in this crate.
//!
//! # Format
//!
//! - width: u8
//! - len: u64
//! - `ceil(len * width / 64)` u64 words, little-endian

use std::io::{Read, Write};

use crate::bits::{bits_for, BitSlice, BitWriter};
use crate::error::{Error, Result};

/// Upper bound on speculative pre-allocation while loading.
const MAX_PREALLOC: usize = 1 << 20;

pub(crate) fn write_u64<W: Write>(out: &mut W, v: u64) -> Result<usize> {
    out.write_all(&v.to_le_bytes())?;
    Ok(8)
}

pub(crate) fn read_u64<R: Read>(input: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf).map_err(Error::from_read)?;
    Ok(u64::from_le_bytes(buf))
}

pub(crate) fn read_len<R: Read>(input: &mut R, what: &str) -> Result<usize> {
    let v = read_u64(input)?;
    usize::try_from(v).map_err(|_| Error::corrupt(format!("{what} {v} does not fit in memory")))
}

pub(crate) fn read_words<R: Read>(input: &mut R, n: usize) -> Result<Vec<u64>> {
    let mut words = Vec::with_capacity(n.min(MAX_PREALLOC));
    for _ in 0..n {
        words.push(read_u64(input)?);
    }
    Ok(words)
}

/// A packed array of unsigned integers sharing one bit width.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct IntVector {
    words: Vec<u64>,
    width: usize,
    len: usize,
}

impl std::fmt::Debug for IntVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntVector")
            .field("len", &self.len)
            .field("width", &self.width)
            .finish()
    }
}

impl IntVector {
    /// Pack `values` using the minimal width that fits their maximum.
    pub fn bit_compress(values: &[u64]) -> Self {
        let max = values.iter().copied().max().unwrap_or(0);
        let width = bits_for(max);
        let mut w = BitWriter::new();
        for &v in values {
            w.write_bits(v, width);
        }
        Self {
            words: w.into_words(),
            width,
            len: values.len(),
        }
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Return true if no values are stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bits used per value.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Approximate heap memory usage in bytes.
    pub fn heap_bytes(&self) -> usize {
        self.words.capacity() * 8
    }

    /// Return the value at index `i`.
    pub fn get(&self, i: usize) -> Result<u64> {
        if i >= self.len {
            return Err(Error::IndexOutOfRange {
                index: i,
                len: self.len,
            });
        }
        BitSlice::new(&self.words).get_bits(i * self.width, self.width)
    }

    /// Write the array to `out`, returning the number of bytes written.
    pub fn serialize<W: Write>(&self, out: &mut W) -> Result<usize> {
        out.write_all(&[self.width as u8])?;
        let mut written = 1;
        written += write_u64(out, self.len as u64)?;
        for &w in &self.words {
            written += write_u64(out, w)?;
        }
        Ok(written)
    }

    /// Read an array previously written by [`IntVector::serialize`].
    pub fn load<R: Read>(input: &mut R) -> Result<Self> {
        let mut width = [0u8; 1];
        input.read_exact(&mut width).map_err(Error::from_read)?;
        let width = width[0] as usize;
        if width > 64 {
            return Err(Error::corrupt(format!("int vector width {width} exceeds 64")));
        }
        let len = read_len(input, "int vector length")?;
        let total_bits = len
            .checked_mul(width)
            .ok_or_else(|| Error::corrupt("int vector bit length overflows"))?;
        let words = read_words(input, total_bits.div_ceil(64))?;
        Ok(Self { words, width, len })
    }
}
