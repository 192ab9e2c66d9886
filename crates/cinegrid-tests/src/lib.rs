//! Integration test crate for CineGrid.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on the core, gpu, and engine crates to verify they work
//! together.

#[cfg(test)]
mod cache;

#[cfg(test)]
mod engine;

#[cfg(test)]
mod sync;
