//! Shared mutable context threaded through every FSM handler.
//!
//! One `FsmContext` exists per radio.  It is the single struct that state
//! handlers and action executors read from and write to: the radio's
//! vendor-private data (action bitsets, AP list), the WAIT/RUN budgets,
//! the retrigger-timer delay request, and the commit bookkeeping.  The
//! FSM driver is the only mutator while a pass is in flight.

use crate::actions::ActionId;
use crate::config::ReconfConfig;
use crate::locker::LockKey;
use crate::model::Radio;

/// Per-radio FSM state.
///
/// Created with the radio, reset to a blank slate on every normal
/// completion and on ERROR recovery, destroyed with the radio.
pub struct FsmContext {
    /// The radio this FSM drives, including all per-scope bitsets.
    pub radio: Radio,

    // -- Budgets --
    /// Remaining WAIT-state lock acquisition attempts.
    pub retry_budget: u32,
    /// Remaining RUN-state iterations; negative means runaway.
    pub loop_budget: i32,

    // -- Commit bookkeeping --
    /// Commits that arrived while the FSM was busy; claimed (zeroed) by
    /// each DEPENDENCY pass and re-checked at COMPEND/FINISH.
    pub commit_pending: u32,
    /// When the oldest still-pending commit was deferred (ms since
    /// process start); feeds the stuck-FSM breaker.
    pub first_pending_ms: Option<u64>,

    // -- Pass-local flags --
    /// Raised by the DEPENDENCY precondition hook to abort the pass.
    pub dep_error: bool,

    // -- Timing --
    /// Requested delay until the next driver invocation.  `None` means
    /// the retrigger timer is deleted (only ever true in IDLE).
    pub next_delay_ms: Option<u32>,
    /// Total driver invocations, for diagnostics.
    pub ticks: u64,

    /// Engine configuration snapshot (cadences, budgets).
    pub config: ReconfConfig,
}

impl FsmContext {
    pub fn new(radio: Radio, config: ReconfConfig) -> Self {
        Self {
            radio,
            retry_budget: 0,
            loop_budget: 0,
            commit_pending: 0,
            first_pending_ms: None,
            dep_error: false,
            next_delay_ms: None,
            ticks: 0,
            config,
        }
    }

    /// Lock key identifying this radio's reconf FSM.
    pub fn lock_key(&self) -> LockKey {
        LockKey::reconf(self.radio.index)
    }

    /// RUN-state budget for the current AP count: one full drain of every
    /// scope, `(1 + vaps) × action kinds`.
    pub fn run_budget(&self) -> i32 {
        ((1 + self.radio.vaps.len()) * ActionId::COUNT) as i32
    }

    // -- Cadence helpers (handlers request, the service arms) --

    pub fn tick_fast(&mut self) {
        self.next_delay_ms = Some(self.config.fast_interval_ms);
    }

    pub fn tick_trylock(&mut self) {
        self.next_delay_ms = Some(self.config.trylock_interval_ms);
    }

    pub fn tick_settle(&mut self) {
        self.next_delay_ms = Some(self.config.settle_interval_ms);
    }

    pub fn tick_cmd_wait(&mut self) {
        self.next_delay_ms = Some(self.config.cmd_wait_ms);
    }

    /// The universal recovery/cleanup: drop every pending and in-flight
    /// bit, zero all budgets and counters, delete the retrigger timer.
    pub fn full_reset(&mut self) {
        self.radio.clear_all_sets();
        self.radio.sync_needed = false;
        self.retry_budget = 0;
        self.loop_budget = 0;
        self.commit_pending = 0;
        self.first_pending_ms = None;
        self.dep_error = false;
        self.next_delay_ms = None;
    }
}
