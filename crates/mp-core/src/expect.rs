//! Match a server response line against expected strings.
//!
//! Used by line-oriented network checks: after each read the client asks
//! whether what it has so far satisfies the expectations, definitely cannot,
//! or might once more data arrives.

use tracing::trace;

/// Matching policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchFlags {
    /// Every expected string must match (otherwise any one suffices).
    pub all: bool,
    /// Expected strings must be a prefix of the status line (otherwise they
    /// may occur anywhere in it).
    pub exact: bool,
}

impl MatchFlags {
    pub const ANY: MatchFlags = MatchFlags {
        all: false,
        exact: false,
    };

    pub fn all(mut self) -> Self {
        self.all = true;
        self
    }

    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    Success,
    /// Not matched yet; a longer status line might still match.
    Retry,
    Failure,
}

/// Test `status` against `expected` under `flags`.
///
/// In exact mode an expected string that `status` is a strict prefix of
/// counts as a partial match and turns a miss into [`MatchResult::Retry`].
/// In substring mode a miss is always a retry, since appended data could
/// contain any expected string.
///
/// With no expected strings, all-mode succeeds vacuously and any-mode
/// never does.
pub fn expect_match<S: AsRef<str>>(
    status: &str,
    expected: &[S],
    flags: MatchFlags,
) -> MatchResult {
    let mode = if flags.exact { "prefix" } else { "substring" };
    let mut matched = 0usize;
    let mut partial = 0usize;

    for want in expected {
        let want = want.as_ref();
        trace!(expect = want, status, mode, "looking for expected string");

        let hit = if flags.exact {
            status.starts_with(want)
        } else {
            status.contains(want)
        };

        if hit {
            trace!(expect = want, "found it");
            matched += 1;
        } else if flags.exact && status.len() < want.len() && want.starts_with(status) {
            trace!(expect = want, "partial match");
            partial += 1;
        } else {
            trace!(expect = want, "couldn't find it");
        }
    }

    let satisfied = if flags.all {
        matched == expected.len()
    } else {
        matched >= 1
    };

    let result = if satisfied {
        MatchResult::Success
    } else if partial > 0 || !flags.exact {
        MatchResult::Retry
    } else {
        MatchResult::Failure
    };
    trace!(matched, partial, ?result, "expect verdict");
    result
}
