//! Reconfiguration service — the engine's public face.
//!
//! [`ReconfService`] owns the per-radio FSMs and contexts, the shared
//! [`FsmLocker`], the commit debounce scheduler, and the configuration.
//! All I/O flows through port traits injected at call sites, making the
//! entire service testable with mock adapters.
//!
//! ```text
//!  requestAction ──▶ ┌─────────────────────────────┐ ──▶ CtrlPort
//!  notifyCommit  ──▶ │        ReconfService        │ ──▶ ConfPort
//!  poll(now_ms)  ──▶ │  FSMs · Locker · Debounce   │ ──▶ HostPort
//!                    └──────────────┬──────────────┘
//!                                   └──────────────────▶ EventSink
//! ```
//!
//! Time is injected: every entry point takes `now_ms`, milliseconds on
//! the host's monotonic clock with process start at zero.  The service
//! never reads a clock, which keeps every timing path deterministic
//! under test.  The host arms one real timer for the deadline `poll`
//! returns and calls back in; there is no thread and no blocking here.

use anyhow::{anyhow, bail};
use log::{error, warn};

use crate::actions::ActionId;
use crate::commit::CommitScheduler;
use crate::config::ReconfConfig;
use crate::error::{CommitError, Error, ModelError};
use crate::fsm::context::FsmContext;
use crate::fsm::{ReconfFsm, StateId};
use crate::locker::FsmLocker;
use crate::model::{ifname, AccessPoint, Band, Radio, MAX_RADIOS};

use super::commands::DebugCommand;
use super::events::ReconfEvent;
use super::ports::{EventSink, HostOps};

/// Which scope a [`request_action`](ReconfService::request_action)
/// targets.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    /// The radio itself.
    Radio(u8),
    /// One AP on the radio, addressed by interface name.
    Vap(u8, &'a str),
}

/// What `do_commit` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The FSM was idle; the driver ran synchronously.
    Driven,
    /// The FSM was busy; the commit was queued for its own re-entry.
    Deferred,
}

// ───────────────────────────────────────────────────────────────
// ReconfService
// ───────────────────────────────────────────────────────────────

struct RadioSlot {
    fsm: ReconfFsm,
    ctx: FsmContext,
    /// Absolute deadline of the armed retrigger timer, if any.
    fire_at_ms: Option<u64>,
}

/// The reconfiguration service orchestrates all engine logic.
pub struct ReconfService {
    slots: [Option<RadioSlot>; MAX_RADIOS],
    locker: FsmLocker,
    commits: CommitScheduler,
    config: ReconfConfig,
}

impl ReconfService {
    /// Construct the service from configuration.  Radios are registered
    /// afterwards as the host data model materialises them.
    pub fn new(config: ReconfConfig) -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
            locker: FsmLocker::new(),
            commits: CommitScheduler::new(),
            config,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Register a radio.  Returns its index, the handle for every other
    /// call.
    pub fn add_radio(&mut self, name: &str, band: Band) -> Result<u8, Error> {
        let name = ifname(name).ok_or(ModelError::NameTooLong)?;
        let idx = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(ModelError::RadioTableFull)?;
        let radio = Radio::new(idx as u8, name, band);
        let ctx = FsmContext::new(radio, self.config.clone());
        self.slots[idx] = Some(RadioSlot {
            fsm: ReconfFsm::new(),
            ctx,
            fire_at_ms: None,
        });
        Ok(idx as u8)
    }

    /// Register an AP on a radio.  The first AP becomes the master BSS.
    pub fn add_vap(&mut self, radio: u8, name: &str, dummy: bool) -> Result<(), Error> {
        let name = ifname(name).ok_or(ModelError::NameTooLong)?;
        let slot = self.slot_mut(radio)?;
        slot.ctx
            .radio
            .vaps
            .push(AccessPoint::new(name, dummy))
            .map_err(|_| ModelError::VapTableFull)?;
        Ok(())
    }

    /// Tear down a radio: release the lock if its FSM holds it, drop all
    /// pending work, free the slot.
    pub fn remove_radio(&mut self, radio: u8) {
        let idx = radio as usize;
        if let Some(mut slot) = self.slots.get_mut(idx).and_then(Option::take) {
            slot.fsm.force_reset(&mut slot.ctx, &mut self.locker);
            self.commits.cancel(idx);
        }
    }

    // ── Inbound triggers ──────────────────────────────────────

    /// Raise an action bit in a scope's requested set.  Idempotent; safe
    /// at any time regardless of FSM state.
    pub fn request_action(&mut self, scope: Scope<'_>, id: ActionId) -> Result<(), Error> {
        match scope {
            Scope::Radio(radio) => {
                self.slot_mut(radio)?.ctx.radio.requested.set(id);
            }
            Scope::Vap(radio, ap) => {
                let slot = self.slot_mut(radio)?;
                let vap = slot
                    .ctx
                    .radio
                    .vap_mut(ap)
                    .ok_or(ModelError::NoSuchVap)?;
                vap.requested.set(id);
            }
        }
        Ok(())
    }

    /// A radio-level parameter change wants processing: debounce it.
    pub fn notify_commit(
        &mut self,
        radio: u8,
        now_ms: u64,
        sink: &mut dyn EventSink,
    ) -> Result<(), Error> {
        let slot = self.slot(radio)?;
        let has_requested = slot.ctx.radio.requested.any();
        let pending = slot.ctx.commit_pending;
        self.schedule(radio, has_requested, pending, now_ms, sink);
        Ok(())
    }

    /// An AP-level parameter change wants processing: debounce it on the
    /// owning radio.
    pub fn notify_vap_commit(
        &mut self,
        radio: u8,
        ap: &str,
        now_ms: u64,
        sink: &mut dyn EventSink,
    ) -> Result<(), Error> {
        let slot = self.slot(radio)?;
        let has_requested = slot
            .ctx
            .radio
            .vap(ap)
            .ok_or(ModelError::NoSuchVap)?
            .requested
            .any();
        let pending = slot.ctx.commit_pending;
        self.schedule(radio, has_requested, pending, now_ms, sink);
        Ok(())
    }

    fn schedule(
        &mut self,
        radio: u8,
        has_requested: bool,
        pending: u32,
        now_ms: u64,
        sink: &mut dyn EventSink,
    ) {
        if let Some(delay_ms) =
            self.commits
                .schedule(radio as usize, has_requested, pending, &self.config, now_ms)
        {
            sink.emit(&ReconfEvent::CommitScheduled { radio, delay_ms });
        }
    }

    // ── Commit execution ──────────────────────────────────────

    /// Process a commit now.
    ///
    /// Fast path: an idle FSM with no timer is driven synchronously.
    /// Otherwise the commit is queued for the FSM's own COMPEND/FINISH
    /// re-entry — unless the backlog has crossed the count **and** age
    /// thresholds, in which case every radio's FSM is force-reset (the
    /// last-resort breaker against a wedged lock holder) and the commit
    /// reports failure.
    pub fn do_commit(
        &mut self,
        radio: u8,
        now_ms: u64,
        ops: &mut dyn HostOps,
        sink: &mut dyn EventSink,
    ) -> Result<CommitOutcome, Error> {
        let idx = radio as usize;
        let (pending, age_ms) = {
            let slot = self
                .slots
                .get_mut(idx)
                .and_then(Option::as_mut)
                .ok_or(ModelError::NoSuchRadio)?;

            if slot.fsm.is_idle() && slot.fire_at_ms.is_none() {
                Self::drive_slot(slot, &mut self.locker, ops, sink, now_ms);
                return Ok(CommitOutcome::Driven);
            }

            slot.ctx.commit_pending += 1;
            if slot.ctx.first_pending_ms.is_none() {
                slot.ctx.first_pending_ms = Some(now_ms);
            }
            let age = now_ms.saturating_sub(slot.ctx.first_pending_ms.unwrap_or(now_ms));
            (slot.ctx.commit_pending, age)
        };

        if pending > self.config.max_pending_commits && age_ms >= self.config.max_pending_wait_ms {
            error!(
                "radio {radio}: {pending} commits pending for {age_ms} ms, \
                 forcing FSM reset in all radios"
            );
            self.reset_all(sink);
            return Err(CommitError::FsmStuck.into());
        }

        sink.emit(&ReconfEvent::CommitDeferred { radio, pending });
        Ok(CommitOutcome::Deferred)
    }

    // ── Timer pump ────────────────────────────────────────────

    /// Fire everything due at `now_ms` and report the next deadline.
    ///
    /// The host calls this from its event loop whenever the previously
    /// returned deadline elapses (or sooner; early calls are harmless).
    pub fn poll(
        &mut self,
        now_ms: u64,
        ops: &mut dyn HostOps,
        sink: &mut dyn EventSink,
    ) -> Option<u64> {
        while let Some(radio) = self.commits.pop_due(now_ms) {
            if let Err(e) = self.do_commit(radio as u8, now_ms, ops, sink) {
                warn!("radio {radio}: commit failed: {e}");
            }
        }

        for idx in 0..self.slots.len() {
            let due = match self.slots[idx].as_ref() {
                Some(slot) => slot.fire_at_ms.is_some_and(|t| t <= now_ms),
                None => false,
            };
            if due {
                if let Some(slot) = self.slots[idx].as_mut() {
                    Self::drive_slot(slot, &mut self.locker, ops, sink, now_ms);
                }
            }
        }

        let fsm_next = self
            .slots
            .iter()
            .flatten()
            .filter_map(|s| s.fire_at_ms)
            .min();
        match (self.commits.next_deadline(), fsm_next) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn drive_slot(
        slot: &mut RadioSlot,
        locker: &mut FsmLocker,
        ops: &mut dyn HostOps,
        sink: &mut dyn EventSink,
        now_ms: u64,
    ) {
        let before = slot.fsm.current_state();
        slot.fsm.drive(&mut slot.ctx, locker, ops);
        let after = slot.fsm.current_state();
        if before != after {
            sink.emit(&ReconfEvent::StateChanged {
                radio: slot.ctx.radio.index,
                from: before,
                to: after,
            });
        }
        slot.fire_at_ms = slot.ctx.next_delay_ms.map(|d| now_ms + u64::from(d));
    }

    /// The breaker: reset every radio's FSM and drop all queued work.
    fn reset_all(&mut self, sink: &mut dyn EventSink) {
        for slot in self.slots.iter_mut().flatten() {
            slot.fsm.force_reset(&mut slot.ctx, &mut self.locker);
            slot.fire_at_ms = None;
        }
        self.commits.cancel_all();
        sink.emit(&ReconfEvent::AllFsmsReset);
    }

    // ── Debug surface ─────────────────────────────────────────

    /// Dispatch an operation name from the host's debug channel.
    pub fn handle_command(
        &mut self,
        op: &str,
        radio: u8,
        now_ms: u64,
        ops: &mut dyn HostOps,
        sink: &mut dyn EventSink,
    ) -> anyhow::Result<String> {
        match DebugCommand::parse(op) {
            None => bail!("unknown operation: {op}"),
            Some(DebugCommand::Commit) => {
                let outcome = self.do_commit(radio, now_ms, ops, sink)?;
                Ok(format!("{outcome:?}"))
            }
            Some(DebugCommand::Status) => {
                let status = self.status(radio)?;
                serde_json::to_string_pretty(&status).map_err(|e| anyhow!(e))
            }
            Some(DebugCommand::Reset) => {
                let slot = self
                    .slots
                    .get_mut(radio as usize)
                    .and_then(Option::as_mut)
                    .ok_or_else(|| anyhow!("no such radio: {radio}"))?;
                slot.fsm.force_reset(&mut slot.ctx, &mut self.locker);
                slot.fire_at_ms = None;
                self.commits.cancel(radio as usize);
                sink.emit(&ReconfEvent::FsmReset { radio });
                Ok("OK".to_string())
            }
        }
    }

    /// FSM state, budgets, and bitsets for one radio as JSON.
    pub fn status(&self, radio: u8) -> Result<serde_json::Value, Error> {
        let slot = self.slot(radio)?;
        let ctx = &slot.ctx;
        let vaps: Vec<serde_json::Value> = ctx
            .radio
            .vaps
            .iter()
            .map(|v| {
                serde_json::json!({
                    "name": v.name.as_str(),
                    "ifindex": v.ifindex,
                    "dummy": v.dummy,
                    "requested": v.requested.to_string(),
                    "executing": v.executing.to_string(),
                })
            })
            .collect();
        Ok(serde_json::json!({
            "radio": ctx.radio.name.as_str(),
            "band": format!("{:?}", ctx.radio.band),
            "state": slot.fsm.state_name(),
            "retryBudget": ctx.retry_budget,
            "loopBudget": ctx.loop_budget,
            "commitPending": ctx.commit_pending,
            "syncNeeded": ctx.radio.sync_needed,
            "requested": ctx.radio.requested.to_string(),
            "executing": ctx.radio.executing.to_string(),
            "timerArmed": slot.fire_at_ms.is_some(),
            "ticks": ctx.ticks,
            "holdsLock": self.locker.is_held_by(ctx.lock_key()),
            "vaps": vaps,
        }))
    }

    // ── Configuration ─────────────────────────────────────────

    /// Replace the engine configuration, propagating it to every radio.
    pub fn set_config(&mut self, config: ReconfConfig) {
        for slot in self.slots.iter_mut().flatten() {
            slot.ctx.config = config.clone();
        }
        self.config = config;
    }

    pub fn config(&self) -> &ReconfConfig {
        &self.config
    }

    // ── Introspection ─────────────────────────────────────────

    /// The shared lock arbiter; the host's generic FSM locks through the
    /// same object with its own key kind.
    pub fn locker_mut(&mut self) -> &mut FsmLocker {
        &mut self.locker
    }

    pub fn locker(&self) -> &FsmLocker {
        &self.locker
    }

    /// Current FSM state of a radio.
    pub fn fsm_state(&self, radio: u8) -> Result<StateId, Error> {
        Ok(self.slot(radio)?.fsm.current_state())
    }

    /// Read access to a radio's FSM context (bitsets, budgets).
    pub fn context(&self, radio: u8) -> Result<&FsmContext, Error> {
        Ok(&self.slot(radio)?.ctx)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn slot(&self, radio: u8) -> Result<&RadioSlot, Error> {
        self.slots
            .get(radio as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| ModelError::NoSuchRadio.into())
    }

    fn slot_mut(&mut self, radio: u8) -> Result<&mut RadioSlot, Error> {
        self.slots
            .get_mut(radio as usize)
            .and_then(Option::as_mut)
            .ok_or_else(|| ModelError::NoSuchRadio.into())
    }
}
