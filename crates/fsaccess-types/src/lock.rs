//! File entry lock state machine.
//!
//! A cooperative single-writer / multi-reader lock. It has no holder
//! identity and no timeout; contention always fails closed.
//!
//! ```text
//!             take(shared)                take(shared)
//!   Open ───────────────────▶ TakenShared(1) ─────────▶ TakenShared(n+1)
//!    ▲ │                          │   ▲                      │
//!    │ │ take(exclusive)          │   └──── release ─────────┘
//!    │ ▼                          │ release (count → 0)
//!  TakenExclusive ── release ──▶ Open ◀┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::EnumString;

/// Lock state of a file entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum LockState {
    #[default]
    Open,
    TakenExclusive,
    TakenShared,
}

impl LockState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockState::Open => "open",
            LockState::TakenExclusive => "taken-exclusive",
            LockState::TakenShared => "taken-shared",
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lock mode requested by [`take_lock`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LockKind {
    /// Exactly one holder, excludes all others.
    Exclusive,
    /// Any number of shared holders.
    Shared,
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKind::Exclusive => f.write_str("exclusive"),
            LockKind::Shared => f.write_str("shared"),
        }
    }
}

/// Outcome of [`take_lock`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockResult {
    Success,
    Failure,
}

impl LockResult {
    pub fn is_success(&self) -> bool {
        matches!(self, LockResult::Success)
    }
}

/// The lock carried by a file entry.
///
/// `shared_count` is only meaningful while `state` is
/// [`LockState::TakenShared`], where it is at least 1.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLock {
    pub state: LockState,
    pub shared_count: u32,
}

impl FileLock {
    /// An open lock.
    pub fn open() -> Self {
        Self::default()
    }

    /// A lock held exclusively.
    pub fn exclusive() -> Self {
        Self {
            state: LockState::TakenExclusive,
            shared_count: 0,
        }
    }

    /// A lock held by `count` shared holders.
    pub fn shared(count: u32) -> Self {
        Self {
            state: LockState::TakenShared,
            shared_count: count,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == LockState::Open
    }
}

/// Try to take a lock of kind `value` on `file`.
///
/// Mutates `file` only on success.
pub fn take_lock(value: LockKind, file: &mut FileLock) -> LockResult {
    match (value, file.state) {
        (LockKind::Exclusive, LockState::Open) => {
            file.state = LockState::TakenExclusive;
            LockResult::Success
        }
        (LockKind::Shared, LockState::Open) => {
            file.state = LockState::TakenShared;
            file.shared_count = 1;
            LockResult::Success
        }
        (LockKind::Shared, LockState::TakenShared) => match file.shared_count.checked_add(1) {
            Some(count) => {
                file.shared_count = count;
                LockResult::Success
            }
            None => LockResult::Failure,
        },
        _ => LockResult::Failure,
    }
}

/// Release one hold on `file`.
///
/// Shared locks open once the last holder releases; any other state opens
/// unconditionally, so releasing an open lock is a no-op.
pub fn release_lock(file: &mut FileLock) {
    if file.state == LockState::TakenShared {
        file.shared_count = file.shared_count.saturating_sub(1);
        if file.shared_count == 0 {
            file.state = LockState::Open;
        }
    } else {
        file.state = LockState::Open;
        file.shared_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_table() {
        let cases = [
            (LockKind::Exclusive, FileLock::open(), LockResult::Success, FileLock::exclusive()),
            (LockKind::Exclusive, FileLock::exclusive(), LockResult::Failure, FileLock::exclusive()),
            (LockKind::Exclusive, FileLock::shared(1), LockResult::Failure, FileLock::shared(1)),
            (LockKind::Exclusive, FileLock::shared(3), LockResult::Failure, FileLock::shared(3)),
            (LockKind::Shared, FileLock::open(), LockResult::Success, FileLock::shared(1)),
            (LockKind::Shared, FileLock::shared(1), LockResult::Success, FileLock::shared(2)),
            (LockKind::Shared, FileLock::exclusive(), LockResult::Failure, FileLock::exclusive()),
            (LockKind::Shared, FileLock::shared(u32::MAX), LockResult::Failure, FileLock::shared(u32::MAX)),
        ];

        for (kind, before, expected, after) in cases {
            let mut lock = before;
            let result = take_lock(kind, &mut lock);
            assert_eq!(result, expected, "take {kind} on {before:?}");
            assert_eq!(lock, after, "state after take {kind} on {before:?}");
        }
    }

    #[test]
    fn test_release_table() {
        let cases = [
            (FileLock::shared(1), FileLock::open()),
            (FileLock::shared(2), FileLock::shared(1)),
            (FileLock::exclusive(), FileLock::open()),
            (FileLock::open(), FileLock::open()),
        ];

        for (before, after) in cases {
            let mut lock = before;
            release_lock(&mut lock);
            assert_eq!(lock, after, "release on {before:?}");
        }
    }

    #[test]
    fn test_shared_round_trip_reopens() {
        let mut lock = FileLock::open();
        for _ in 0..3 {
            assert!(take_lock(LockKind::Shared, &mut lock).is_success());
        }
        assert_eq!(lock.shared_count, 3);
        assert!(!take_lock(LockKind::Exclusive, &mut lock).is_success());

        for _ in 0..3 {
            release_lock(&mut lock);
        }
        assert!(lock.is_open());
        assert!(take_lock(LockKind::Exclusive, &mut lock).is_success());
    }

    #[test]
    fn test_state_strings() {
        assert_eq!(LockState::TakenShared.to_string(), "taken-shared");
        assert_eq!("taken-exclusive".parse::<LockState>().ok(), Some(LockState::TakenExclusive));
    }
}
