//! Range parsing and matching.
//!
//! # Grammar
//!
//! ```text
//! range  := ["@"] body
//! body   := end
//!         | ["~" | start] ":" [end]
//! ```
//!
//! | text     | meaning                         |
//! |----------|---------------------------------|
//! | `10`     | alert if < 0 or > 10            |
//! | `10:`    | alert if < 10                   |
//! | `~:10`   | alert if > 10                   |
//! | `:10`    | same as `~:10`                  |
//! | `10:20`  | alert if < 10 or > 20           |
//! | `@10:20` | alert if >= 10 and <= 20        |
//!
//! Numbers are read the way `strtod` reads them: as much of a leading
//! number as possible, ignoring whatever follows. `1:12%` is therefore the
//! range `1:12`. Text with no number reads as 0, so `x:5` is `0:5`. Hex
//! (`0x10`) and `inf` are accepted. The only rejected input is a range
//! whose finite start lies above its finite end.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from range parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RangeError {
    #[error("range '{text}' has start {start} greater than end {end}")]
    Inverted { text: String, start: f64, end: f64 },
}

/// Which side of the range raises an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertOn {
    /// Alert when the value falls outside `[start, end]`.
    #[default]
    Outside,
    /// Alert when the value falls inside `[start, end]`.
    Inside,
}

/// A parsed threshold range.
///
/// When neither bound is infinite, `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub start: f64,
    /// Start is negative infinity; `start` is ignored.
    pub start_infinity: bool,
    pub end: f64,
    /// End is positive infinity; `end` is ignored.
    pub end_infinity: bool,
    pub alert_on: AlertOn,
}

impl Default for Range {
    /// `0:` with OUTSIDE semantics, i.e. alert on negative values.
    fn default() -> Self {
        Self {
            start: 0.0,
            start_infinity: false,
            end: 0.0,
            end_infinity: true,
            alert_on: AlertOn::Outside,
        }
    }
}

impl Range {
    /// Parse threshold text into a range.
    pub fn parse(text: &str) -> Result<Self, RangeError> {
        let mut range = Range::default();
        let mut body = text;

        if let Some(rest) = body.strip_prefix('@') {
            range.alert_on = AlertOn::Inside;
            body = rest;
        }

        let end_text = match body.split_once(':') {
            Some((start_text, end_text)) => {
                if start_text.starts_with('~') || start_text.is_empty() {
                    range.start_infinity = true;
                } else {
                    range.set_start(number_or_zero(start_text));
                }
                end_text
            }
            None => body,
        };

        if !end_text.is_empty() {
            range.set_end(number_or_zero(end_text));
        }

        if !range.start_infinity && !range.end_infinity && range.start > range.end {
            return Err(RangeError::Inverted {
                text: text.to_string(),
                start: range.start,
                end: range.end,
            });
        }
        Ok(range)
    }

    fn set_start(&mut self, value: f64) {
        self.start = value;
        self.start_infinity = false;
    }

    fn set_end(&mut self, value: f64) {
        self.end = value;
        self.end_infinity = false;
    }

    /// Returns `true` if `value` should raise an alert.
    pub fn check(&self, value: f64) -> bool {
        let inside = match (self.start_infinity, self.end_infinity) {
            (false, false) => self.start <= value && value <= self.end,
            (false, true) => self.start <= value,
            (true, false) => value <= self.end,
            // The whole real line: every value is inside.
            // TODO: confirm `@~:` should alert on every value rather than none.
            (true, true) => true,
        };
        match self.alert_on {
            AlertOn::Outside => !inside,
            AlertOn::Inside => inside,
        }
    }
}

impl FromStr for Range {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Range::parse(s)
    }
}

impl fmt::Display for Range {
    /// Canonical text for this range; parsing it yields the same fields.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alert_on == AlertOn::Inside {
            f.write_str("@")?;
        }
        if self.start_infinity {
            f.write_str("~:")?;
        } else if self.start != 0.0 || self.end_infinity {
            write!(f, "{}:", self.start)?;
        }
        if !self.end_infinity {
            write!(f, "{}", self.end)?;
        }
        Ok(())
    }
}

/// Parse threshold text into a range.
pub fn parse_range_string(text: &str) -> Result<Range, RangeError> {
    Range::parse(text)
}

/// Returns `true` if `value` should raise an alert under `range`.
pub fn check_range(value: f64, range: &Range) -> bool {
    range.check(value)
}

/// Read the longest leading number, `strtod` style.
///
/// Leading whitespace and one sign are skipped. Decimal (with exponent),
/// hex (`0x1f`, `0x1.8p3`) and `inf`/`infinity` in any case are read.
/// Returns `None` when no number is found.
pub fn leading_number(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let (negative, unsigned) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let magnitude = infinity(unsigned)
        .or_else(|| hex_magnitude(unsigned))
        .or_else(|| decimal_magnitude(unsigned))?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Range bounds read as 0 when they hold no number.
fn number_or_zero(text: &str) -> f64 {
    leading_number(text).unwrap_or(0.0)
}

fn infinity(s: &str) -> Option<f64> {
    // "infinity" starts with "inf"; the value is the same either way.
    let head = s.get(..3)?;
    head.eq_ignore_ascii_case("inf").then_some(f64::INFINITY)
}

fn hex_magnitude(s: &str) -> Option<f64> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    let bytes = digits.as_bytes();
    let hex_digit = |i: usize| bytes.get(i).and_then(|b| char::from(*b).to_digit(16));

    let mut value = 0.0f64;
    let mut scale = 0i32;
    let mut seen = false;
    let mut i = 0;
    while let Some(d) = hex_digit(i) {
        value = value * 16.0 + f64::from(d);
        seen = true;
        i += 1;
    }
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        while let Some(d) = hex_digit(i) {
            value = value * 16.0 + f64::from(d);
            scale -= 4;
            seen = true;
            i += 1;
        }
    }
    // A bare "0x" is the number 0 followed by junk.
    if !seen {
        return None;
    }

    // Binary exponent only counts if at least one digit follows it.
    if matches!(bytes.get(i), Some(b'p' | b'P')) {
        let mut j = i + 1;
        let negative = match bytes.get(j) {
            Some(b'-') => {
                j += 1;
                true
            }
            Some(b'+') => {
                j += 1;
                false
            }
            _ => false,
        };
        let exp_start = j;
        let mut exp = 0i32;
        while let Some(d) = bytes.get(j).filter(|b| b.is_ascii_digit()) {
            exp = exp.saturating_mul(10).saturating_add(i32::from(*d - b'0'));
            j += 1;
        }
        if j > exp_start {
            scale = scale.saturating_add(if negative { -exp } else { exp });
        }
    }

    Some(value * 2f64.powi(scale))
}

fn decimal_magnitude(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }
    if digits == 0 {
        return None;
    }

    // Exponent only counts if at least one digit follows it.
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }

    s[..i].parse::<f64>().ok()
}
