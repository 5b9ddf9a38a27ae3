//! Helpers for building input generators.
//!
//! A generator is any `FnMut() -> String`; campaigns call it once per trial.
//! These helpers cover the two common shapes: a closure that writes into a
//! buffer, and a seeded stream of random integers.

use crate::program::{Program, RunError};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use std::fmt::Write;
use std::io;

/// Adapts a closure that writes into a `String` into a generator.
///
/// ```
/// use std::fmt::Write;
///
/// let mut next_input = gauntlet_core::generator::buffered(|out| {
///     writeln!(out, "2").unwrap();
///     writeln!(out, "10 20").unwrap();
/// });
/// assert_eq!(next_input(), "2\n10 20\n");
/// ```
pub fn buffered<F>(mut body: F) -> impl FnMut() -> String
where
    F: FnMut(&mut String),
{
    move || {
        let mut out = String::new();
        body(&mut out);
        out
    }
}

/// A deterministic generator of `count` integers in `[low, high]`, one per
/// line. The same seed always yields the same trial sequence, so a failing
/// campaign can be replayed.
pub fn random_ints(count: usize, low: i64, high: i64, seed: u64) -> impl FnMut() -> String {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    move || {
        let mut out = String::new();
        for _ in 0..count {
            let value = rng.random_range(low..=high);
            let _ = writeln!(out, "{value}");
        }
        out
    }
}

/// Wraps a generator executable: each call runs it with empty input and
/// yields its captured stdout as the trial input.
///
/// A generator that cannot be launched or exits unsuccessfully is an error,
/// never an empty input: a campaign cannot proceed without a working
/// generator, so callers must stop rather than keep running on fabricated
/// trials.
pub fn from_program(generator: Program) -> impl FnMut() -> Result<String, RunError> {
    move || {
        generator.batch_run("")?.ok_or_else(|| RunError::Io {
            program: generator.path().display().to_string(),
            source: io::Error::other("input generator exited unsuccessfully"),
        })
    }
}
