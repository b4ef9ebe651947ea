//! Monitoring plugin common types.
//!
//! This crate provides the vocabulary shared by every other crate in the
//! workspace:
//! - The service [`State`] a check reports (OK, WARNING, CRITICAL, UNKNOWN, DEPENDENT)
//! - State precedence helpers used when several results are combined
//! - A common error type with stable numeric codes

pub mod error;
pub mod state;

pub use error::{Error, Result};
pub use state::{max_state, max_state_alt, ParseStateError, State};
