//! Drawing questions from a bank.
//!
//! `n <= len`: `n` distinct entries, uniformly, without replacement.
//! `n > len`: every entry once, then uniform draws with replacement until `n`.
//! The second case repeats entries when the bank is small; that is accepted.

use rand::seq::{index, SliceRandom};
use rand::Rng;

/// Indices into a bank of `len` entries. Empty when the bank is empty.
pub fn sample_indices<R: Rng + ?Sized>(len: usize, n: usize, rng: &mut R) -> Vec<usize> {
  if len == 0 || n == 0 {
    return Vec::new();
  }
  if n <= len {
    return index::sample(rng, len, n).into_vec();
  }

  let mut out: Vec<usize> = (0..len).collect();
  out.shuffle(rng);
  while out.len() < n {
    out.push(rng.gen_range(0..len));
  }
  out
}

/// Borrowing form of [`sample_indices`]; callers clone what they keep.
pub fn sample<'a, T, R: Rng + ?Sized>(bank: &'a [T], n: usize, rng: &mut R) -> Vec<&'a T> {
  sample_indices(bank.len(), n, rng)
    .into_iter()
    .map(|i| &bank[i])
    .collect()
}
