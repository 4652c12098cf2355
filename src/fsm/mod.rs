//! Function-pointer reconfiguration state machine engine.
//!
//! Classic cooperative FSM pattern: a static table of state descriptors,
//! one driver invocation per timer tick, no blocking anywhere.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  StateTable                                                   │
//! │  ┌────────────┬───────────┬──────────┬──────────────────────┐ │
//! │  │ StateId     │ on_enter  │ on_exit  │ on_update            │ │
//! │  ├────────────┼───────────┼──────────┼──────────────────────┤ │
//! │  │ Idle        │ fn(ctx)   │ —        │ fn(ctx,…)->Option<>  │ │
//! │  │ Wait        │ —         │ —        │ fn(ctx,…)->Option<>  │ │
//! │  │ Dependency  │ —         │ —        │ fn(ctx,…)->Option<>  │ │
//! │  │ Run         │ —         │ —        │ fn(ctx,…)->Option<>  │ │
//! │  │ Compend     │ —         │ —        │ fn(ctx,…)->Option<>  │ │
//! │  │ Finish      │ —         │ —        │ fn(ctx,…)->Option<>  │ │
//! │  │ Error       │ fn(ctx)   │ —        │ fn(ctx,…)->Option<>  │ │
//! │  └────────────┴───────────┴──────────┴──────────────────────┘ │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each invocation of [`ReconfFsm::drive`] calls `on_update` for the
//! **current** state.  If it returns `Some(next)`, the engine runs
//! `on_exit`, updates the pointer, and runs `on_enter` for the next
//! state.  Handlers receive the per-radio [`FsmContext`], the shared
//! [`FsmLocker`], and the host port bundle.
//!
//! ERROR is transient: its entry hook performs the unconditional unlock
//! and full reset, and the machine falls straight through to Idle within
//! the same driver invocation — ERROR is never observable between ticks.

pub mod context;
pub mod states;

use log::info;

use crate::app::ports::HostOps;
use crate::locker::FsmLocker;
use context::FsmContext;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all reconfiguration FSM states.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    /// Terminal/initial: no work, no retrigger timer.
    Idle = 0,
    /// Waiting for the radio to settle and the global lock to free up.
    Wait = 1,
    /// Snapshot requested → executing, expand implied actions.
    Dependency = 2,
    /// Drain executing bits, one per scope per tick.
    Run = 3,
    /// Commit-pending check before releasing the lock.
    Compend = 4,
    /// Re-arm for accumulated commits or wind down to Idle.
    Finish = 5,
    /// Transient failure state: full reset, falls through to Idle.
    Error = 6,
}

impl StateId {
    /// Total number of states — used to size the table array.
    pub const COUNT: usize = 7;

    /// Convert a `u8` index back to `StateId`.  Panics on out-of-range in
    /// debug builds; returns `Error` in release (safe fallback).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Wait,
            2 => Self::Dependency,
            3 => Self::Run,
            4 => Self::Compend,
            5 => Self::Finish,
            6 => Self::Error,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Error
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once per state transition.
pub type StateActionFn = fn(&mut FsmContext, &mut FsmLocker);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn =
    fn(&mut FsmContext, &mut FsmLocker, &mut dyn HostOps) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array — no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// One reconfiguration state machine, one per radio.
///
/// Owns the state table and the current-state pointer; all mutable pass
/// state lives in the [`FsmContext`] handed to every call.
pub struct ReconfFsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
}

impl Default for ReconfFsm {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconfFsm {
    /// Construct a new FSM, starting in Idle.
    pub fn new() -> Self {
        Self {
            table: states::build_state_table(),
            current: StateId::Idle as usize,
        }
    }

    /// One invocation of the driver function — one cooperative step.
    ///
    /// 1. Call `on_update` for the current state.
    /// 2. If it returns `Some(next)`, execute the transition:
    ///    `on_exit(current)` → update pointer → `on_enter(next)`.
    /// 3. If the transition landed in Error, run its update immediately so
    ///    the reset falls through to Idle within this same invocation.
    pub fn drive(&mut self, ctx: &mut FsmContext, locker: &mut FsmLocker, ops: &mut dyn HostOps) {
        ctx.ticks += 1;

        let next = (self.table[self.current].on_update)(ctx, locker, ops);

        if let Some(next_id) = next {
            self.transition(next_id, ctx, locker);
            if next_id == StateId::Error {
                if let Some(after) = (self.table[self.current].on_update)(ctx, locker, ops) {
                    self.transition(after, ctx, locker);
                }
            }
        }
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    /// The current state's symbolic name (for logs and status dumps).
    pub fn state_name(&self) -> &'static str {
        self.table[self.current].name
    }

    /// Whether the machine is parked in Idle.
    pub fn is_idle(&self) -> bool {
        self.current == StateId::Idle as usize
    }

    /// Out-of-band reset: the ERROR cleanup without going through a tick.
    /// Used by the stuck-FSM breaker and the debug reset command.
    pub fn force_reset(&mut self, ctx: &mut FsmContext, locker: &mut FsmLocker) {
        info!("{}: forcing reconf FSM reset", ctx.radio.name);
        states::reset_fsm(ctx, locker);
        self.current = StateId::Idle as usize;
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut FsmContext, locker: &mut FsmLocker) {
        let next_idx = next_id as usize;

        info!(
            "{}: reconf FSM {} -> {}",
            ctx.radio.name, self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx, locker);
        }

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx, locker);
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
