//! Action table, dependency rules, and executors.
//!
//! Maps each [`ActionId`] to the side-effecting operation that realises
//! it, in the same static-table-of-`fn`-pointers shape as the FSM state
//! table: no closures, no heap, one row per action.  Every action runs at
//! exactly one scope — radio or per-AP — so each row populates exactly
//! one of the two executor slots.
//!
//! The dependency rules live here too: a live reconfiguration (one BSS or
//! all changed BSSes) is never valid without a freshly written daemon
//! configuration file and a post-reconf socket resync, so requesting
//! either reconf action implies raising both radio-level companions.

use log::{debug, info, warn};

use crate::actions::{ActionId, ActionSet};
use crate::app::ports::HostOps;
use crate::error::ExecError;
use crate::fsm::context::FsmContext;

// ═══════════════════════════════════════════════════════════════
//  Action descriptors
// ═══════════════════════════════════════════════════════════════

/// Signature for a radio-scoped executor.
pub type RadioExecFn = fn(&mut FsmContext, &mut dyn HostOps) -> Result<(), ExecError>;

/// Signature for a per-AP executor.  The AP is addressed by its position
/// in the radio's VAP table.
pub type VapExecFn = fn(&mut FsmContext, usize, &mut dyn HostOps) -> Result<(), ExecError>;

/// Static descriptor for a single action.
pub struct ActionDescriptor {
    pub id: ActionId,
    pub name: &'static str,
    pub radio_exec: Option<RadioExecFn>,
    pub vap_exec: Option<VapExecFn>,
}

/// The action table, indexed by `ActionId as usize`.
pub static ACTION_TABLE: [ActionDescriptor; ActionId::COUNT] = [
    ActionDescriptor {
        id: ActionId::WriteConfig,
        name: "write-config",
        radio_exec: Some(exec_write_config),
        vap_exec: None,
    },
    ActionDescriptor {
        id: ActionId::ReloadBss,
        name: "reload-bss",
        radio_exec: None,
        vap_exec: Some(exec_reload_bss),
    },
    ActionDescriptor {
        id: ActionId::ReconfBss,
        name: "reconf-bss",
        radio_exec: None,
        vap_exec: Some(exec_reconf_bss),
    },
    ActionDescriptor {
        id: ActionId::ReconfRadio,
        name: "reconf-radio",
        radio_exec: Some(exec_reconf_radio),
        vap_exec: None,
    },
    ActionDescriptor {
        id: ActionId::ResyncReconf,
        name: "resync-reconf",
        radio_exec: Some(exec_resync_reconf),
        vap_exec: None,
    },
    ActionDescriptor {
        id: ActionId::Resync,
        name: "resync",
        radio_exec: Some(exec_resync),
        vap_exec: None,
    },
];

/// Descriptor lookup.
pub fn descriptor(id: ActionId) -> &'static ActionDescriptor {
    &ACTION_TABLE[id as usize]
}

// ═══════════════════════════════════════════════════════════════
//  Dependency rules
// ═══════════════════════════════════════════════════════════════

/// Radio-level precondition gate, evaluated before anything executes.
///
/// A whole-radio reconfiguration is only meaningful on an enabled,
/// initialised radio whose daemon is alive; otherwise the pass aborts via
/// the context's error flag and is silently re-evaluated on the next
/// commit.
pub fn check_radio_preconditions(ctx: &mut FsmContext, ops: &mut dyn HostOps) {
    if !ctx.radio.requested.contains(ActionId::ReconfRadio) {
        return;
    }
    let name = ctx.radio.name.as_str();
    if !ops.radio_enabled(name) || !ops.radio_initialized(name) || !ops.daemon_running(name) {
        warn!("{name}: reconf requested but radio not ready, aborting pass");
        ctx.dep_error = true;
    }
}

/// Raise the radio-level companions a live reconf implies.
fn imply_reconf_companions(executing: &mut ActionSet) {
    executing.set(ActionId::WriteConfig);
    executing.set(ActionId::ResyncReconf);
}

/// Per-AP dependency hook, run after the AP's requested set was copied
/// into its executing set.
pub fn vap_check_dependency(ctx: &mut FsmContext, vap_idx: usize) {
    if ctx.radio.vaps[vap_idx].executing.contains(ActionId::ReconfBss) {
        debug!(
            "{}: BSS reconf on {} implies config rewrite + resync",
            ctx.radio.name, ctx.radio.vaps[vap_idx].name
        );
        imply_reconf_companions(&mut ctx.radio.executing);
    }
}

/// Radio-level dependency hook, run after all per-AP hooks.
pub fn radio_check_dependency(ctx: &mut FsmContext) {
    if ctx.radio.executing.contains(ActionId::ReconfRadio) {
        imply_reconf_companions(&mut ctx.radio.executing);
    }
}

// ═══════════════════════════════════════════════════════════════
//  Executors — radio scope
// ═══════════════════════════════════════════════════════════════

/// Regenerate the daemon configuration file.  Local and quick; the
/// outcome is not consulted.
fn exec_write_config(ctx: &mut FsmContext, ops: &mut dyn HostOps) -> Result<(), ExecError> {
    ops.write_config(ctx.radio.name.as_str());
    ctx.tick_fast();
    Ok(())
}

/// Apply the freshly written configuration to every changed BSS at once.
fn exec_reconf_radio(ctx: &mut FsmContext, ops: &mut dyn HostOps) -> Result<(), ExecError> {
    let radio_name = ctx.radio.name.clone();
    match ctx.radio.master_vap().map(|v| v.name.clone()) {
        Some(master) => {
            if !ops.ctrl_ready(master.as_str()) {
                ops.open_ctrl(master.as_str())?;
                // Daemon state may have moved while the socket was down.
                ctx.radio.sync_needed = true;
                ctx.radio.executing.set(ActionId::Resync);
            }
            ops.send_cmd(master.as_str(), "BSS_RECONF", Some("OK"))?;
        }
        // No BSS yet: the daemon still answers on its global socket.
        None => ops.send_any(radio_name.as_str(), "BSS_RECONF", Some("OK"))?,
    }
    // The daemon applies the reconf asynchronously.
    ctx.tick_cmd_wait();
    Ok(())
}

/// Post-reconf resynchronisation: refresh kernel interface indexes (the
/// reconf may have recreated netdevs), reconnect dropped sockets, and on
/// 6 GHz refresh beacons across co-located radios.
fn exec_resync_reconf(ctx: &mut FsmContext, ops: &mut dyn HostOps) -> Result<(), ExecError> {
    let radio_name = ctx.radio.name.clone();

    for i in 0..ctx.radio.vaps.len() {
        if ctx.radio.vaps[i].dummy {
            continue;
        }
        let vap_name = ctx.radio.vaps[i].name.clone();
        if let Some(idx) = ops.resolve_ifindex(vap_name.as_str()) {
            if idx != ctx.radio.vaps[i].ifindex {
                info!("{vap_name}: interface index {} -> {idx}", ctx.radio.vaps[i].ifindex);
                ctx.radio.vaps[i].ifindex = idx;
            }
        }
        if !ops.ctrl_ready(vap_name.as_str()) {
            ops.open_ctrl(vap_name.as_str())?;
            // Events were lost while disconnected; re-read the AP state.
            ops.refresh_vap_state(vap_name.as_str());
        }
    }

    if ctx.radio.band.needs_colocated_beacon_sync() {
        for i in 0..ctx.radio.vaps.len() {
            if ctx.radio.vaps[i].dummy {
                continue;
            }
            let vap_name = ctx.radio.vaps[i].name.clone();
            if let Err(e) = ops.send_cmd(vap_name.as_str(), "UPDATE_BEACON", None) {
                warn!("{vap_name}: beacon refresh failed: {e}");
            }
        }
        for ap in ops.colocated_aps(radio_name.as_str()) {
            if let Err(e) = ops.send_cmd(ap.as_str(), "UPDATE_BEACON", None) {
                warn!("{ap}: co-located beacon refresh failed: {e}");
            }
        }
    }

    ctx.tick_fast();
    Ok(())
}

/// Generic control-socket and state resync.
fn exec_resync(ctx: &mut FsmContext, ops: &mut dyn HostOps) -> Result<(), ExecError> {
    let radio_name = ctx.radio.name.clone();

    if ctx.radio.sync_needed {
        ctx.radio.sync_needed = false;
        if ops.daemon_running(radio_name.as_str()) {
            let any_down = ctx
                .radio
                .real_vaps()
                .any(|v| !ops.ctrl_ready(v.name.as_str()));
            if any_down {
                ops.reconnect_all(radio_name.as_str())?;
                // Sockets just came back; defer the state refresh to a
                // fresh pass over the reconnected daemon.
                ctx.radio.executing.set(ActionId::Resync);
            } else {
                ops.refresh_radio_state(radio_name.as_str());
            }
        } else {
            debug!("{radio_name}: daemon not running, skipping state refresh");
        }
    } else {
        ops.refresh_radio_state(radio_name.as_str());
    }

    ctx.tick_fast();
    Ok(())
}

// ═══════════════════════════════════════════════════════════════
//  Executors — AP scope
// ═══════════════════════════════════════════════════════════════

/// Reload one BSS from the written configuration file.
fn exec_reload_bss(
    ctx: &mut FsmContext,
    vap_idx: usize,
    ops: &mut dyn HostOps,
) -> Result<(), ExecError> {
    let vap = &ctx.radio.vaps[vap_idx];
    if vap.dummy {
        return Ok(());
    }
    let vap_name = vap.name.clone();
    if !ops.ctrl_ready(vap_name.as_str()) {
        debug!("{vap_name}: no control socket, skipping BSS reload");
        return Ok(());
    }
    ops.send_cmd(vap_name.as_str(), "RELOAD_BSS", Some("OK"))?;
    Ok(())
}

/// Live-reconfigure a single BSS.
fn exec_reconf_bss(
    ctx: &mut FsmContext,
    vap_idx: usize,
    ops: &mut dyn HostOps,
) -> Result<(), ExecError> {
    let vap = &ctx.radio.vaps[vap_idx];
    if vap.dummy {
        return Err(ExecError::DummyVap);
    }
    let vap_name = vap.name.clone();
    let radio_name = ctx.radio.name.clone();
    if !ops.daemon_running(radio_name.as_str()) || !ops.radio_enabled(radio_name.as_str()) {
        return Err(ExecError::RadioNotReady);
    }

    let cmd = format!("RECONF {vap_name}");
    let master = ctx.radio.master_vap().map(|v| v.name.clone());
    match master {
        Some(m) if ops.ctrl_ready(m.as_str()) => {
            ops.send_cmd(m.as_str(), cmd.as_str(), Some("OK"))?;
        }
        _ => {
            // Fallback socket: the command went out but nothing confirms
            // it end-to-end, so force a socket resync afterwards.
            ops.send_any(radio_name.as_str(), cmd.as_str(), Some("OK"))?;
            ctx.radio.sync_needed = true;
            ctx.radio.executing.set(ActionId::Resync);
        }
    }

    ctx.tick_cmd_wait();
    Ok(())
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
