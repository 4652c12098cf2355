//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers — no closures, no heap.
//! The driver is invoked by the per-radio retrigger timer; every wait is
//! "stay in the state and ask for another tick", never blocking I/O.
//!
//! ```text
//!  IDLE ──[driven]──▶ WAIT ──[lock acquired]──▶ DEPENDENCY ──▶ RUN
//!                      │                            │           │
//!               [retries exhausted]          [precondition   [bits
//!                      │                        failed]      drained]
//!                      ▼                            ▼           ▼
//!                    ERROR ◀──[budget blown / cmd failed]── COMPEND
//!                      │                            ┌───────────┤
//!                      ▼                     [commits pending]  │
//!                    IDLE ◀────────────── FINISH ◀──────────────┘
//! ```
//!
//! ERROR unconditionally unlocks, drops every pending action, and falls
//! through to IDLE — the universal recovery path.  Work lost this way is
//! only re-done if its original trigger fires again.

use log::{debug, error, info, warn};

use super::context::FsmContext;
use super::{StateDescriptor, StateId};
use crate::app::ports::HostOps;
use crate::locker::FsmLocker;
use crate::manager;

// ═══════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════

/// Build the static state table.  Called once per FSM construction.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0 — Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1 — Wait
        StateDescriptor {
            id: StateId::Wait,
            name: "Wait",
            on_enter: None,
            on_exit: None,
            on_update: wait_update,
        },
        // Index 2 — Dependency
        StateDescriptor {
            id: StateId::Dependency,
            name: "Dependency",
            on_enter: None,
            on_exit: None,
            on_update: dependency_update,
        },
        // Index 3 — Run
        StateDescriptor {
            id: StateId::Run,
            name: "Run",
            on_enter: None,
            on_exit: None,
            on_update: run_update,
        },
        // Index 4 — Compend
        StateDescriptor {
            id: StateId::Compend,
            name: "Compend",
            on_enter: None,
            on_exit: None,
            on_update: compend_update,
        },
        // Index 5 — Finish
        StateDescriptor {
            id: StateId::Finish,
            name: "Finish",
            on_enter: None,
            on_exit: None,
            on_update: finish_update,
        },
        // Index 6 — Error
        StateDescriptor {
            id: StateId::Error,
            name: "Error",
            on_enter: Some(error_enter),
            on_exit: None,
            on_update: error_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext, _locker: &mut FsmLocker) {
    // Terminal cleanup: no budgets, no timer.
    ctx.retry_budget = 0;
    ctx.loop_budget = 0;
    ctx.dep_error = false;
    ctx.next_delay_ms = None;
}

fn idle_update(
    ctx: &mut FsmContext,
    _locker: &mut FsmLocker,
    _ops: &mut dyn HostOps,
) -> Option<StateId> {
    // Driven while idle means a commit wants processing: arm the
    // retrigger timer and open a lock acquisition round.
    ctx.retry_budget = ctx.config.wait_retry_max;
    ctx.dep_error = false;
    ctx.tick_trylock();
    debug!("{}: reconf cycle starting", ctx.radio.name);
    Some(StateId::Wait)
}

// ═══════════════════════════════════════════════════════════════
//  WAIT state — radio settle + global lock acquisition
// ═══════════════════════════════════════════════════════════════

fn wait_update(
    ctx: &mut FsmContext,
    locker: &mut FsmLocker,
    ops: &mut dyn HostOps,
) -> Option<StateId> {
    if ctx.retry_budget == 0 {
        warn!(
            "{}: gave up waiting for the FSM lock after {} attempts",
            ctx.radio.name, ctx.config.wait_retry_max
        );
        ctx.tick_fast();
        return Some(StateId::Error);
    }
    ctx.retry_budget -= 1;

    // Hold off while APs are still inside their own host FSM cycles.
    if !ops.vaps_done(ctx.radio.name.as_str()) {
        ctx.tick_settle();
        return None;
    }

    ctx.tick_trylock();
    if locker.try_lock(ctx.lock_key()) {
        ctx.tick_fast();
        Some(StateId::Dependency)
    } else {
        None
    }
}

// ═══════════════════════════════════════════════════════════════
//  DEPENDENCY state — claim commits, snapshot work, expand implications
// ═══════════════════════════════════════════════════════════════

fn dependency_update(
    ctx: &mut FsmContext,
    locker: &mut FsmLocker,
    ops: &mut dyn HostOps,
) -> Option<StateId> {
    locker.ensure_held(ctx.lock_key());

    ctx.dep_error = false;
    manager::check_radio_preconditions(ctx, ops);

    // This pass claims every commit accumulated so far.
    ctx.commit_pending = 0;
    ctx.first_pending_ms = None;

    let next = if ctx.dep_error {
        locker.unlock(ctx.lock_key());
        StateId::Finish
    } else {
        let requested = ctx.radio.requested;
        ctx.radio.executing.copy_from(&requested);
        for i in 0..ctx.radio.vaps.len() {
            if ctx.radio.vaps[i].dummy {
                continue;
            }
            let vap_requested = ctx.radio.vaps[i].requested;
            ctx.radio.vaps[i].executing.copy_from(&vap_requested);
            manager::vap_check_dependency(ctx, i);
        }
        manager::radio_check_dependency(ctx);
        ctx.loop_budget = ctx.run_budget();
        StateId::Run
    };

    // Commits from here on start a fresh accumulation.
    ctx.radio.clear_requested();
    ctx.tick_fast();
    Some(next)
}

// ═══════════════════════════════════════════════════════════════
//  RUN state — drain one executing bit per scope per tick
// ═══════════════════════════════════════════════════════════════

fn run_update(
    ctx: &mut FsmContext,
    _locker: &mut FsmLocker,
    ops: &mut dyn HostOps,
) -> Option<StateId> {
    if !ctx.radio.any_executing() {
        ctx.tick_fast();
        return Some(StateId::Compend);
    }

    // Executors override this with their own cadence.
    ctx.tick_fast();

    // Radio-scope action first, then every AP makes independent progress
    // within the same tick.
    if let Some(id) = ctx.radio.executing.lowest() {
        ctx.radio.executing.clear(id);
        let entry = manager::descriptor(id);
        if let Some(exec) = entry.radio_exec {
            debug!("{}: running {}", ctx.radio.name, entry.name);
            if let Err(e) = exec(ctx, ops) {
                error!("{}: {} failed: {e}", ctx.radio.name, entry.name);
                ctx.tick_fast();
                return Some(StateId::Error);
            }
        }
    }

    for i in 0..ctx.radio.vaps.len() {
        let id = match ctx.radio.vaps[i].executing.lowest() {
            Some(id) => id,
            None => continue,
        };
        ctx.radio.vaps[i].executing.clear(id);
        let entry = manager::descriptor(id);
        if let Some(exec) = entry.vap_exec {
            debug!(
                "{}: running {} on {}",
                ctx.radio.name, entry.name, ctx.radio.vaps[i].name
            );
            if let Err(e) = exec(ctx, i, ops) {
                if e.is_fatal() {
                    error!(
                        "{}: {} failed on {}: {e}",
                        ctx.radio.name, entry.name, ctx.radio.vaps[i].name
                    );
                    ctx.tick_fast();
                    return Some(StateId::Error);
                }
                warn!(
                    "{}: {} skipped on {}: {e}",
                    ctx.radio.name, entry.name, ctx.radio.vaps[i].name
                );
            }
        }
    }

    ctx.loop_budget -= 1;
    if ctx.loop_budget < 0 {
        error!("{}: RUN loop budget exhausted, resetting", ctx.radio.name);
        ctx.tick_fast();
        return Some(StateId::Error);
    }
    None
}

// ═══════════════════════════════════════════════════════════════
//  COMPEND state — commits that arrived mid-pass re-enter immediately
// ═══════════════════════════════════════════════════════════════

fn compend_update(
    ctx: &mut FsmContext,
    locker: &mut FsmLocker,
    _ops: &mut dyn HostOps,
) -> Option<StateId> {
    if ctx.commit_pending > 0 {
        info!(
            "{}: {} commits arrived during the pass, re-entering",
            ctx.radio.name, ctx.commit_pending
        );
        ctx.tick_fast();
        return Some(StateId::Dependency);
    }
    locker.unlock(ctx.lock_key());
    ctx.tick_fast();
    Some(StateId::Finish)
}

// ═══════════════════════════════════════════════════════════════
//  FINISH state — re-arm for late commits or wind down
// ═══════════════════════════════════════════════════════════════

fn finish_update(
    ctx: &mut FsmContext,
    _locker: &mut FsmLocker,
    _ops: &mut dyn HostOps,
) -> Option<StateId> {
    if ctx.commit_pending > 0 {
        // The lock is already released; start a fresh acquisition round
        // without tearing the timer down.
        ctx.retry_budget = ctx.config.wait_retry_max;
        ctx.tick_trylock();
        return Some(StateId::Wait);
    }
    Some(StateId::Idle)
}

// ═══════════════════════════════════════════════════════════════
//  ERROR state — unconditional unlock + full reset, falls through
// ═══════════════════════════════════════════════════════════════

fn error_enter(ctx: &mut FsmContext, locker: &mut FsmLocker) {
    // Defensive: the FSM may not actually hold the lock (WAIT timeout);
    // unlock is documented safe-if-mismatched.
    locker.unlock(ctx.lock_key());
    warn!(
        "{}: reconf FSM error, dropping {} radio + {} AP pending bits",
        ctx.radio.name,
        ctx.radio.requested.len() + ctx.radio.executing.len(),
        ctx.radio
            .vaps
            .iter()
            .map(|v| v.requested.len() + v.executing.len())
            .sum::<usize>()
    );
    ctx.full_reset();
}

fn error_update(
    _ctx: &mut FsmContext,
    _locker: &mut FsmLocker,
    _ops: &mut dyn HostOps,
) -> Option<StateId> {
    // Everything was reset on entry; park the machine.
    Some(StateId::Idle)
}

/// The ERROR cleanup as a free function, shared with out-of-band resets
/// (stuck-FSM breaker, debug command).
pub fn reset_fsm(ctx: &mut FsmContext, locker: &mut FsmLocker) {
    error_enter(ctx, locker);
}
