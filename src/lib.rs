//! # Block-Sampled Compressed Integer Sequences
//!
//! *Suffix arrays, LCP arrays and Ψ tables in a fraction of their plain size,
//! with near-constant random access.*
//!
//! ## Intuition First
//!
//! Picture a long ledger of numbers cut into pages of 128 lines. On the spine
//! of each page you write its first number in full. Inside the page you write
//! only how much each line differs from the one above, squeezed as tightly as
//! the page allows. To read line 77 you open one page and add up at most 127
//! small numbers; you never touch the other pages.
//!
//! That is the whole trick: a **sample table** for jumping, and independently
//! **coded blocks** for compression.
//!
//! ## The Problem
//!
//! The arrays behind compressed suffix arrays hold $n$ integers of
//! $\log n$ bits each, yet they are highly regular: Ψ is increasing inside
//! each character range, suffix-array neighbours are close, long runs of
//! consecutive values are common. A plain array spends $n \log n$ bits anyway.
//! General-purpose compression recovers the space but loses random access.
//!
//! ## Historical Context
//!
//! ```text
//! 1974  Elias       Static storage of monotone sequences (Elias-Fano)
//! 2000  Grossi      Compressed suffix arrays and the Ψ function
//! 2005  Zukowski    Patched frame-of-reference (PFor) for column stores
//! 2008  Sadakane    Sampled delta-coded Ψ in practical CSAs
//! 2014  Ottaviano   Partitioned Elias-Fano: per-block universes
//! 2015  Lemire      SIMD binary packing of 128-integer frames
//! ```
//!
//! ## The Containers
//!
//! | Type | Values | Block encoding |
//! |------|--------|----------------|
//! | [`BpVector`] | 32-bit | forward deltas, fixed-width SIMD binary packing |
//! | [`PforVector`] | 32-bit | forward deltas, adaptive-width patched frame-of-reference; runs of consecutive integers cost nothing |
//! | [`EfVector`] | 64-bit | per-block choice of Elias-Fano, bitmap, full run, or raw gap list |
//!
//! All three implement [`IntSequence`], so a consumer picks one as a type
//! parameter and never looks inside.
//!
//! ## Complexity Analysis
//!
//! - **Access**: $O(1)$ for the first value of a block and for full runs;
//!   otherwise one block decode, $O(B)$ with small constants.
//! - **Space**: the sample table costs $2 \lceil n/B \rceil$ bit-compressed
//!   entries; everything else is codec output.
//!
//! ## What Could Go Wrong
//!
//! 1. **Repeated decodes**: a scan that calls `get` for every index decodes each
//!    block $B$ times. Use [`IntSequence::iter`] or a [`CachedReader`].
//! 2. **Value domain**: the delta containers hold 32-bit values only; wider
//!    input is rejected at construction with [`Error::ValueDomain`].
//!
//! ## References
//!
//! - Elias, P. (1974). "Efficient storage and retrieval by content and address of static files."
//! - Zukowski, M., et al. (2006). "Super-scalar RAM-CPU cache compression."
//! - Lemire, D., & Boytsov, L. (2015). "Decoding billions of integers per second through vectorization."
//! - Ottaviano, G., & Venturini, R. (2014). "Partitioned Elias-Fano indexes."

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bits;
pub mod codec;
pub mod delta_vector;
pub mod ef_vector;
pub mod error;
pub mod int_vector;
mod leb128;
pub mod list;
pub mod sequence;

pub use delta_vector::{BpVector, DeltaVector, PforVector};
pub use ef_vector::EfVector;
pub use error::{Error, Result};
pub use list::BlockKind;
pub use sequence::{CachedReader, IntSequence, Iter};
