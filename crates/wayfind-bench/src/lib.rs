#![deny(clippy::all)]
#![warn(clippy::pedantic)]

//! Criterion benchmarks for wayfind.
//!
//! Run with: `cargo bench -p wayfind-bench`
//!
//! Covers the path helpers on their own and whole resolutions against
//! a warm cache.
