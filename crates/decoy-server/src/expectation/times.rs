//! Usage limits for expectations.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Observable state of a [`Times`] counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimesState {
    Unlimited,
    Remaining(u64),
    Exhausted,
}

/// A lock-free usage counter.
///
/// `consume` is a linearizable compare-and-decrement: when two callers race
/// for the last remaining use, exactly one of them wins.
pub struct Times {
    remaining: AtomicU64,
    unlimited: bool,
}

impl Times {
    /// Allow exactly `count` uses. `exactly(0)` starts exhausted.
    #[must_use]
    pub const fn exactly(count: u64) -> Self {
        Self {
            remaining: AtomicU64::new(count),
            unlimited: false,
        }
    }

    #[must_use]
    pub const fn once() -> Self {
        Self::exactly(1)
    }

    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            remaining: AtomicU64::new(0),
            unlimited: true,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.unlimited
    }

    /// Take one use. Returns `false` if none were left.
    pub fn consume(&self) -> bool {
        if self.unlimited {
            return true;
        }
        self.remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    pub fn is_expired(&self) -> bool {
        !self.unlimited && self.remaining.load(Ordering::Acquire) == 0
    }

    /// Remaining uses, `None` when unlimited.
    pub fn remaining(&self) -> Option<u64> {
        if self.unlimited {
            None
        } else {
            Some(self.remaining.load(Ordering::Acquire))
        }
    }

    pub fn state(&self) -> TimesState {
        match self.remaining() {
            None => TimesState::Unlimited,
            Some(0) => TimesState::Exhausted,
            Some(n) => TimesState::Remaining(n),
        }
    }
}

impl Default for Times {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl Clone for Times {
    fn clone(&self) -> Self {
        Self {
            remaining: AtomicU64::new(self.remaining.load(Ordering::Acquire)),
            unlimited: self.unlimited,
        }
    }
}

impl PartialEq for Times {
    fn eq(&self, other: &Self) -> bool {
        self.state() == other.state()
    }
}

impl fmt::Debug for Times {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.state() {
            TimesState::Unlimited => f.write_str("Times(unlimited)"),
            TimesState::Remaining(n) => write!(f, "Times({n} remaining)"),
            TimesState::Exhausted => f.write_str("Times(exhausted)"),
        }
    }
}
