//! Sample sources
//!
//! The producer asks its `SourceFactory` for a fresh `SampleSource` on every
//! subscription, so no generator state is shared between subscribers.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::Sample;

/// Something that produces one sample per tick
pub trait SampleSource: Send {
    /// Generate the sample for the current tick
    fn next_sample(&mut self) -> Sample;
}

/// Creates an independent `SampleSource` per subscription
pub trait SourceFactory: Send + Sync {
    fn create(&self) -> Box<dyn SampleSource>;
}

impl<F> SourceFactory for F
where
    F: Fn() -> Box<dyn SampleSource> + Send + Sync,
{
    fn create(&self) -> Box<dyn SampleSource> {
        self()
    }
}

/// Uniformly distributed values in `[0, 100)` stamped with the wall clock
#[derive(Debug)]
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic source for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleSource for RandomSource {
    fn next_sample(&mut self) -> Sample {
        let value = self.rng.gen_range(Sample::MIN_VALUE..Sample::MAX_VALUE);
        Sample::new(value, Utc::now())
    }
}

/// Factory handing out entropy-seeded `RandomSource`s
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSourceFactory;

impl SourceFactory for RandomSourceFactory {
    fn create(&self) -> Box<dyn SampleSource> {
        Box::new(RandomSource::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SampleKind;

    #[test]
    fn test_random_values_in_range() {
        let mut source = RandomSource::seeded(7);
        for _ in 0..10_000 {
            let sample = source.next_sample();
            assert!(sample.is_in_range(), "value {} out of range", sample.value);
            assert_eq!(sample.kind, SampleKind::Random);
        }
    }

    #[test]
    fn test_seeded_sources_repeat() {
        let mut a = RandomSource::seeded(42);
        let mut b = RandomSource::seeded(42);
        for _ in 0..16 {
            assert_eq!(a.next_sample().value, b.next_sample().value);
        }
    }

    #[test]
    fn test_closure_factory() {
        let factory = || Box::new(RandomSource::seeded(1)) as Box<dyn SampleSource>;
        let mut first = factory.create();
        let mut second = factory.create();
        assert_eq!(first.next_sample().value, second.next_sample().value);
    }

    #[test]
    fn test_random_factory_sources_are_independent() {
        let factory = RandomSourceFactory;
        let mut source = factory.create();
        assert!(source.next_sample().encode().is_ok());
    }
}
