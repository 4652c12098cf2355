//! Process-wide FSM lock arbitration.
//!
//! The daemon configuration file and its control sockets are singleton
//! per-radio resources, so only one state machine — this crate's reconf
//! FSM or the host's own generic FSM — may be in its executing phase at a
//! time.  [`FsmLocker`] arbitrates between them with a single bitmap: one
//! bit marks "locked", the remaining bits identify the holder as a
//! (FSM kind × radio index) pair.  A parallel bitmap records radios that
//! attempted and failed to acquire, for diagnostics.
//!
//! The locker is **not** a thread-safety primitive.  Everything runs on
//! the host's single event-loop thread; the lock only serializes
//! interleavings of cooperative FSM passes.
//!
//! Lock misuse (unlock by a non-holder, re-entrant lock by the holder) is
//! logged loudly but never panics: the host daemon must keep running in a
//! detectable-but-degraded state rather than crash.

use core::fmt;
use log::{debug, error};

use crate::model::MAX_RADIOS;

/// Which state machine is asking for the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsmKind {
    /// The host's generic per-radio FSM.
    Generic,
    /// This crate's reconfiguration FSM.
    Reconf,
}

/// Identity of a lock holder: one FSM kind operating on one radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockKey {
    pub kind: FsmKind,
    pub radio: u8,
}

impl LockKey {
    pub fn generic(radio: u8) -> Self {
        Self {
            kind: FsmKind::Generic,
            radio,
        }
    }

    pub fn reconf(radio: u8) -> Self {
        Self {
            kind: FsmKind::Reconf,
            radio,
        }
    }

    /// Holder-identity bitmask.  Bit 0 is the locked flag; generic keys
    /// occupy bits 1..=4, reconf keys bits 5..=8 (radio 0..4 each).
    fn mask(self) -> u16 {
        let offset = match self.kind {
            FsmKind::Generic => 1,
            FsmKind::Reconf => 1 + MAX_RADIOS as u16,
        };
        1 << (offset + u16::from(self.radio))
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/radio{}", self.kind, self.radio)
    }
}

// ---------------------------------------------------------------------------
// FsmLocker
// ---------------------------------------------------------------------------

/// Bit 0 of the lock word: something is locked.
const LOCKED: u16 = 1;

/// The arbitration object.  One instance exists per process, owned by the
/// service layer and passed by reference into every FSM pass.
#[derive(Debug, Default)]
pub struct FsmLocker {
    /// `LOCKED | holder-mask` while held, `0` while free.
    lock: u16,
    /// Radios that attempted `try_lock` and lost, one bit per radio index.
    waiting: u16,
}

impl FsmLocker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to acquire the lock for `key`.
    ///
    /// Fails (no side effect beyond the waiting bit) if any other key
    /// holds the lock.  Re-acquiring with the *same* key logs an error and
    /// reports success — the caller already holds it.
    pub fn try_lock(&mut self, key: LockKey) -> bool {
        if self.lock & LOCKED != 0 {
            if self.lock & key.mask() != 0 {
                error!("fsm lock: {key} is locking twice");
                return true;
            }
            debug!("fsm lock: {key} must wait (holder {:#06x})", self.lock);
            self.waiting |= 1 << u16::from(key.radio);
            return false;
        }
        self.lock = LOCKED | key.mask();
        self.waiting &= !(1 << u16::from(key.radio));
        debug!("fsm lock: acquired by {key}");
        true
    }

    /// Release the lock if currently held by exactly `key`.
    ///
    /// A mismatched unlock is a bug signal: it is logged and the lock is
    /// left untouched rather than force-cleared under the real holder.
    /// Unlocking while nothing is held is a quiet no-op so that the ERROR
    /// recovery path can call this unconditionally.
    pub fn unlock(&mut self, key: LockKey) {
        if self.lock & LOCKED == 0 {
            debug!("fsm lock: unlock by {key} while free");
            return;
        }
        if self.lock & key.mask() == 0 {
            error!(
                "fsm lock: unlock by {key} but holder is {:#06x}",
                self.lock
            );
            return;
        }
        self.lock = 0;
        debug!("fsm lock: released by {key}");
    }

    /// Defensive check that `key` currently holds the lock.  Logs (only)
    /// when it does not; used inside states that assume the lock is held.
    pub fn ensure_held(&self, key: LockKey) -> bool {
        let held = self.lock & LOCKED != 0 && self.lock & key.mask() != 0;
        if !held {
            error!(
                "fsm lock: {key} expected to hold the lock, state {:#06x}",
                self.lock
            );
        }
        held
    }

    /// Whether anything holds the lock.
    pub fn is_locked(&self) -> bool {
        self.lock & LOCKED != 0
    }

    /// Whether exactly `key` holds the lock.
    pub fn is_held_by(&self, key: LockKey) -> bool {
        self.lock & LOCKED != 0 && self.lock & key.mask() != 0
    }

    /// Whether `radio` is recorded as waiting for the lock.
    pub fn is_waiting(&self, radio: u8) -> bool {
        self.waiting & (1 << u16::from(radio)) != 0
    }
}
