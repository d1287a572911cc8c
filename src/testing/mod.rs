//! Testing utilities and mock implementations
//!
//! Mocks for exercising the broker without a live vacancy API.

pub mod mocks;

pub use mocks::*;
