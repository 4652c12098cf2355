//! Port traits — the hexagonal boundary between the engine and the host.
//!
//! ```text
//!   Host adapter ──▶ Port trait ──▶ ReconfService / FSM (domain)
//! ```
//!
//! The host daemon implements these traits around its own process manager,
//! control-socket manager, and data model.  The engine consumes them via
//! trait objects, so the domain core never touches a socket, a file, or
//! the host object tree directly — which is also what makes every FSM
//! pass testable with a recording mock.

use heapless::Vec;

use crate::error::CtrlError;
use crate::model::IfName;

/// Upper bound on co-located APs returned for beacon refresh.
pub const COLOCATED_MAX: usize = 32;

// ───────────────────────────────────────────────────────────────
// Control-socket port (engine → daemon IPC)
// ───────────────────────────────────────────────────────────────

/// Live command channel to the hostapd-like daemon.
///
/// Radios and APs are addressed by kernel interface name; the adapter
/// owns the mapping to actual sockets.
pub trait CtrlPort {
    /// Send `cmd` on the AP's own control socket.  When `expect` is set,
    /// anything but that literal reply is [`CtrlError::UnexpectedReply`].
    fn send_cmd(&mut self, ap: &str, cmd: &str, expect: Option<&str>) -> Result<(), CtrlError>;

    /// Send `cmd` on any connected socket of the radio's daemon — the
    /// fallback path when the preferred socket is down.
    fn send_any(&mut self, radio: &str, cmd: &str, expect: Option<&str>) -> Result<(), CtrlError>;

    /// Whether the AP's control socket is connected and usable.
    fn ctrl_ready(&self, ap: &str) -> bool;

    /// Open (or re-open) and enable the AP's control socket.
    fn open_ctrl(&mut self, ap: &str) -> Result<(), CtrlError>;

    /// Tear down and reconnect every control socket of the radio's
    /// daemon in one sweep.
    fn reconnect_all(&mut self, radio: &str) -> Result<(), CtrlError>;
}

// ───────────────────────────────────────────────────────────────
// Configuration-file port (engine → daemon config)
// ───────────────────────────────────────────────────────────────

/// Regenerates the daemon configuration file.  The host owns the file
/// format; the engine only decides *when* a rewrite must happen.
pub trait ConfPort {
    /// Rewrite the radio's daemon configuration file from the current
    /// data model.  The engine does not consult an outcome — a failed
    /// write surfaces later through the daemon itself.
    fn write_config(&mut self, radio: &str);
}

// ───────────────────────────────────────────────────────────────
// Host state port (engine ↔ host data model facts)
// ───────────────────────────────────────────────────────────────

/// Read-mostly facts about the host's view of a radio, plus the state
/// refresh hooks the resync actions trigger.
pub trait HostPort {
    /// Whether the radio's daemon process is confirmed running.
    fn daemon_running(&self, radio: &str) -> bool;

    /// Whether the radio is administratively enabled.
    fn radio_enabled(&self, radio: &str) -> bool;

    /// Whether the radio has completed its initialisation.
    fn radio_initialized(&self, radio: &str) -> bool;

    /// Whether every AP on the radio has finished its own host FSM cycle.
    fn vaps_done(&self, radio: &str) -> bool;

    /// Current kernel interface index for `ap`, if the netdev exists.
    fn resolve_ifindex(&self, ap: &str) -> Option<u32>;

    /// Force a state re-read for one AP after its socket was reopened.
    fn refresh_vap_state(&mut self, ap: &str);

    /// Full host-level refresh of the radio's observable state.
    fn refresh_radio_state(&mut self, radio: &str);

    /// Active APs on co-located radios whose beacons must be refreshed
    /// together with `except_radio`'s (6 GHz in-band discovery).
    fn colocated_aps(&self, except_radio: &str) -> Vec<IfName, COLOCATED_MAX>;
}

// ───────────────────────────────────────────────────────────────
// Combined bound for FSM handlers
// ───────────────────────────────────────────────────────────────

/// Everything a state handler or action executor may reach for.  Blanket
/// impl so any host adapter implementing the three ports qualifies.
pub trait HostOps: CtrlPort + ConfPort + HostPort {}

impl<T: CtrlPort + ConfPort + HostPort> HostOps for T {}

// ───────────────────────────────────────────────────────────────
// Event sink port (engine → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The engine emits structured [`ReconfEvent`](super::events::ReconfEvent)s
/// through this port.  Adapters decide where they go (log, data model
/// notifications, debug sockets).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::ReconfEvent);
}
