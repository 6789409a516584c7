//! Stemforge - multi-pass stem separation and tempo-synchronized fusion
//!
//! [`separation`] drives an external separation engine through one or two
//! passes and assembles 4, 6 or 8 stems per track. [`fusion`] stretches
//! stems from different tracks to a common tempo and mixes them.

pub mod config;
pub mod fusion;
pub mod separation;

#[cfg(all(test, unix))]
mod test_support;
