//! Commit debounce scheduler.
//!
//! Parameter writes arrive in bursts — a management session pushing a new
//! security profile touches dozens of fields in one transaction.  Each
//! write raises action bits and notifies this scheduler; the scheduler
//! coalesces the burst into a single delayed FSM trigger per radio.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Trigger Sources                          │
//! │                                                              │
//! │  ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌──────────┐   │
//! │  │ Radio     │  │ AP param  │  │ Debug     │  │ Boot     │   │
//! │  │ param set │  │ set       │  │ command   │  │ loading  │   │
//! │  └─────┬─────┘  └─────┬─────┘  └─────┬─────┘  └─────┬────┘   │
//! │        │              │              │              │        │
//! │        ▼              ▼              ▼              ▼        │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │        CommitScheduler (per-radio debounce timer)      │  │
//! │  └───────────────────────┬────────────────────────────────┘  │
//! │                          │ delay elapsed                     │
//! │                          ▼                                   │
//! │                ReconfService::do_commit()                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The scheduled delay is `max(steady-state delay, remaining boot quiet
//! period)`: during the initial bring-up the data model replays every
//! stored parameter, and a reconfiguration storm there would restart the
//! daemons over and over.
//!
//! This struct only owns the timers.  What happens when one fires —
//! the idle fast path, the deferred-commit counter, the stuck-FSM
//! breaker — lives in [`ReconfService`](crate::app::service::ReconfService),
//! which also holds the FSMs the decision depends on.

use log::debug;

use crate::config::ReconfConfig;
use crate::model::MAX_RADIOS;

/// Per-radio debounce timers, measured in milliseconds since process
/// start (the same injected clock the whole engine runs on).
#[derive(Debug, Default)]
pub struct CommitScheduler {
    deadlines: [Option<u64>; MAX_RADIOS],
}

impl CommitScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consider arming the debounce timer for `radio`.
    ///
    /// Nothing happens when the scheduler is disabled, when there is no
    /// requested work, when a timer is already running, or when commits
    /// are already pending (a run is then guaranteed by the FSM's own
    /// COMPEND/FINISH re-entry).  Returns the armed delay.
    pub fn schedule(
        &mut self,
        radio: usize,
        has_requested: bool,
        commits_pending: u32,
        cfg: &ReconfConfig,
        now_ms: u64,
    ) -> Option<u64> {
        if !cfg.commit_enabled || !has_requested {
            return None;
        }
        let slot = self.deadlines.get_mut(radio)?;
        if slot.is_some() {
            return None;
        }
        if commits_pending > 0 {
            return None;
        }

        let quiet_remaining = cfg.boot_quiet_ms.saturating_sub(now_ms);
        let delay = quiet_remaining.max(u64::from(cfg.commit_delay_ms));
        *slot = Some(now_ms + delay);
        debug!("radio {radio}: commit debounce armed for {delay} ms");
        Some(delay)
    }

    /// Take one expired timer, if any.  Callers loop until `None`.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<usize> {
        for (radio, slot) in self.deadlines.iter_mut().enumerate() {
            match slot {
                Some(deadline) if *deadline <= now_ms => {
                    *slot = None;
                    return Some(radio);
                }
                _ => {}
            }
        }
        None
    }

    /// Disarm one radio's timer.
    pub fn cancel(&mut self, radio: usize) {
        if let Some(slot) = self.deadlines.get_mut(radio) {
            *slot = None;
        }
    }

    /// Disarm everything (stuck-FSM breaker path).
    pub fn cancel_all(&mut self) {
        self.deadlines = [None; MAX_RADIOS];
    }

    /// Whether `radio` has a timer armed.
    pub fn is_armed(&self, radio: usize) -> bool {
        self.deadlines.get(radio).is_some_and(Option::is_some)
    }

    /// Earliest armed deadline across all radios.
    pub fn next_deadline(&self) -> Option<u64> {
        self.deadlines.iter().flatten().copied().min()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
