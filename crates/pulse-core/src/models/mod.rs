//! Data models shared by producer and consumer

mod sample;

pub use sample::{Sample, SampleKind};
