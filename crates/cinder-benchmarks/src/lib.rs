//! Cinder benchmarking suite
//!
//! Benchmarks for the hot paths of the resolution engine: pack and
//! component resolution over a synthetic index, and the combinatorial
//! layer-connection solver at growing problem sizes.

pub mod common;

pub use common::*;
