//! Time-ordered unique identifiers used as message payloads.
//!
//! An [`Identifier`] is a ULID: a 48-bit millisecond timestamp followed by
//! 80 bits from the entropy source, rendered as 26 Crockford base32
//! characters. Identifiers from later milliseconds sort after earlier ones.

use crate::error::EntropyError;
use rand::TryRngCore;
use rand::rngs::OsRng;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use ulid::Ulid;

const RANDOM_BYTES: usize = 10;

/// A source of random bytes for identifier generation.
pub trait Entropy: Send {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError>;
}

impl<E: Entropy + ?Sized> Entropy for Box<E> {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
        (**self).fill(dest)
    }
}

/// The operating system's cryptographically secure randomness source.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl Entropy for OsEntropy {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| EntropyError::new(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(Ulid);

impl Identifier {
    /// Milliseconds since the Unix epoch encoded in the identifier.
    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generates identifiers from a timestamp and an entropy source.
pub struct IdGenerator<E = OsEntropy> {
    entropy: E,
}

impl IdGenerator<OsEntropy> {
    pub fn new() -> Self {
        Self {
            entropy: OsEntropy,
        }
    }
}

impl Default for IdGenerator<OsEntropy> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entropy> IdGenerator<E> {
    pub fn with_entropy(entropy: E) -> Self {
        Self { entropy }
    }

    /// Generate an identifier for `timestamp`.
    ///
    /// Timestamps before the epoch are clamped to zero. Fails only when the
    /// entropy source does.
    pub fn generate(&mut self, timestamp: SystemTime) -> Result<Identifier, EntropyError> {
        let millis = timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let mut bytes = [0u8; RANDOM_BYTES];
        self.entropy.fill(&mut bytes)?;
        let random = bytes
            .iter()
            .fold(0u128, |acc, byte| (acc << 8) | u128::from(*byte));

        Ok(Identifier(Ulid::from_parts(millis, random)))
    }

    pub fn now(&mut self) -> Result<Identifier, EntropyError> {
        self.generate(SystemTime::now())
    }
}
