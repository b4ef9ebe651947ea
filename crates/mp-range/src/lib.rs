//! Threshold ranges for monitoring plugins.
//!
//! A threshold is written on the command line as a range such as `10`,
//! `10:`, `~:10`, `10:20` or `@10:20`. This crate parses that text into a
//! [`Range`], decides whether a sample should raise an alert, and folds a
//! warning/critical pair into a [`State`](mp_common::State).

pub mod range;
pub mod thresholds;

pub use range::{check_range, leading_number, parse_range_string, AlertOn, Range, RangeError};
pub use thresholds::{get_status, Thresholds};
