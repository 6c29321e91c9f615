//! Core data models for claimcheck.
//!
//! Epistemic mapping:
//! - K_i (Knowledge): Concrete types with compile-time guarantees (tagged unions, label enums)
//! - B_i (Beliefs): Wrapped in Result/Option
//! - I^R (Resolvable): Config parameters
//! - I^B (Bounded): Error variants with fallback strategies

mod config;
mod error;
mod evidence;
mod verdict;

pub use config::*;
pub use error::*;
pub use evidence::*;
pub use verdict::*;
