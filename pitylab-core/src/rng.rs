//! Deterministic random source.
//!
//! A 32-bit linear congruential generator (multiplier 1664525, increment
//! 1013904223, modulus 2^32). The exact recurrence is part of the contract:
//! the same seed must produce a bit-identical stream on every platform so that
//! batch results and the self-test goldens are reproducible.

const MULTIPLIER: u64 = 1_664_525;
const INCREMENT: u64 = 1_013_904_223;
const MODULUS: u64 = 1 << 32;
const DIVISOR: f64 = (MODULUS - 1) as f64;

/// A source of uniform draws consumed by the simulator.
///
/// The simulator is generic over this trait so tests can script exact
/// success/failure sequences. Production code uses [`Lcg`].
pub trait UniformSource {
    /// Next uniform draw.
    fn next_unit(&mut self) -> f64;
}

/// Seeded linear congruential generator.
///
/// Restartable only by reconstruction: there is no rewind. One instance is
/// consumed strictly sequentially by one logical run stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    /// Create a generator from any integer seed.
    ///
    /// The seed is reduced modulo 2^32 (negative seeds wrap, two's complement);
    /// a reduced seed of zero becomes 1.
    pub fn new(seed: i64) -> Self {
        let reduced = (seed as u64 & (MODULUS - 1)) as u32;
        Self {
            state: if reduced == 0 { 1 } else { reduced },
        }
    }

    /// Current internal state (the last value produced, or the coerced seed).
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Advance the recurrence and return the new raw state.
    pub fn next_u32(&mut self) -> u32 {
        let next = (MULTIPLIER * u64::from(self.state) + INCREMENT) % MODULUS;
        self.state = next as u32;
        self.state
    }

    /// Advance and return `state / (2^32 - 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / DIVISOR
    }
}

impl UniformSource for Lcg {
    fn next_unit(&mut self) -> f64 {
        self.next_f64()
    }
}
