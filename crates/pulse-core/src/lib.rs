//! pulse-core - Core types for pulse sample streams
//!
//! This crate provides the `Sample` record that travels over the event stream,
//! its wire encoding, and the `SampleSource` abstraction the producer draws from.

pub mod error;
pub mod models;
pub mod source;

pub use error::{SampleError, SampleResult};
pub use models::*;
pub use source::{RandomSource, RandomSourceFactory, SampleSource, SourceFactory};
