//! Vendor-private radio and access-point data.
//!
//! This is the slice of state the reconfiguration engine owns for each
//! radio: identity, the per-scope action bitsets, and the AP list.  The
//! host daemon owns the full data model; it mirrors the pieces the engine
//! needs through [`ReconfService`](crate::app::service::ReconfService)
//! lifecycle calls.

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::actions::ActionSet;

/// Upper bound on radios per process (typical tri-band hardware plus one).
pub const MAX_RADIOS: usize = 4;

/// Upper bound on access points per radio.
pub const MAX_VAPS: usize = 8;

/// Kernel interface name, `IFNAMSIZ`-bounded.
pub type IfName = String<16>;

/// Frequency band the radio operates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Band {
    Band2G,
    Band5G,
    Band6G,
}

impl Band {
    /// 6 GHz radios advertise co-located BSSes of every band in their
    /// beacons, so reconfiguration must refresh beacons across radios.
    pub fn needs_colocated_beacon_sync(self) -> bool {
        matches!(self, Self::Band6G)
    }
}

// ---------------------------------------------------------------------------
// AccessPoint
// ---------------------------------------------------------------------------

/// One BSS on a radio.
///
/// `dummy` marks the placeholder VAP the host creates for bookkeeping; the
/// engine must never send commands to it.
#[derive(Debug, Clone, Default)]
pub struct AccessPoint {
    pub name: IfName,
    /// Cached kernel interface index; refreshed after reconf recreates
    /// the netdev.
    pub ifindex: u32,
    pub dummy: bool,
    /// Actions raised by external triggers, drained at DEPENDENCY.
    pub requested: ActionSet,
    /// Snapshot being drained by the RUN state.
    pub executing: ActionSet,
}

impl AccessPoint {
    pub fn new(name: IfName, dummy: bool) -> Self {
        Self {
            name,
            ifindex: 0,
            dummy,
            requested: ActionSet::new(),
            executing: ActionSet::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Radio
// ---------------------------------------------------------------------------

/// One physical radio and the daemon process behind it.
#[derive(Debug, Clone)]
pub struct Radio {
    /// Small process-wide index, also the lock-key radio id.
    pub index: u8,
    pub name: IfName,
    pub band: Band,
    pub requested: ActionSet,
    pub executing: ActionSet,
    /// Raised when a command went out on a path that was not confirmed
    /// end-to-end; consumed by the generic resync action.
    pub sync_needed: bool,
    pub vaps: Vec<AccessPoint, MAX_VAPS>,
}

impl Radio {
    pub fn new(index: u8, name: IfName, band: Band) -> Self {
        Self {
            index,
            name,
            band,
            requested: ActionSet::new(),
            executing: ActionSet::new(),
            sync_needed: false,
            vaps: Vec::new(),
        }
    }

    /// The first AP is the daemon's master BSS; its control socket is the
    /// preferred command path.
    pub fn master_vap(&self) -> Option<&AccessPoint> {
        self.vaps.first()
    }

    /// Look up an AP by interface name.
    pub fn vap(&self, name: &str) -> Option<&AccessPoint> {
        self.vaps.iter().find(|v| v.name.as_str() == name)
    }

    /// Mutable lookup by interface name.
    pub fn vap_mut(&mut self, name: &str) -> Option<&mut AccessPoint> {
        self.vaps.iter_mut().find(|v| v.name.as_str() == name)
    }

    /// Non-placeholder APs.
    pub fn real_vaps(&self) -> impl Iterator<Item = &AccessPoint> {
        self.vaps.iter().filter(|v| !v.dummy)
    }

    /// Whether any executing bit remains at radio or AP scope.
    pub fn any_executing(&self) -> bool {
        self.executing.any() || self.vaps.iter().any(|v| v.executing.any())
    }

    /// Whether any requested bit is raised at radio or AP scope.
    pub fn any_requested(&self) -> bool {
        self.requested.any() || self.vaps.iter().any(|v| v.requested.any())
    }

    /// Drop every requested bit, radio and APs alike.
    pub fn clear_requested(&mut self) {
        self.requested.clear_all();
        for vap in &mut self.vaps {
            vap.requested.clear_all();
        }
    }

    /// Drop every bit in every set.
    pub fn clear_all_sets(&mut self) {
        self.requested.clear_all();
        self.executing.clear_all();
        for vap in &mut self.vaps {
            vap.requested.clear_all();
            vap.executing.clear_all();
        }
    }
}

/// Build an [`IfName`] from a `&str`, rejecting over-long names.
pub fn ifname(name: &str) -> Option<IfName> {
    IfName::try_from(name).ok()
}
