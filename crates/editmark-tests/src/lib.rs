//! Integration test crate for EditMark.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on every editmark library crate to verify they work together.

#[cfg(test)]
mod naming;

#[cfg(test)]
mod lifecycle;

#[cfg(test)]
mod interchange;
