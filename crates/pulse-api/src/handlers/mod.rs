//! HTTP request handlers for the stream producer

pub mod stream;
