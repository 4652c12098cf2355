//! Fuzz target: reconfiguration FSM driver
//!
//! Drives a two-AP radio with arbitrary interleavings of action
//! requests, commit notifications, and timer wake-ups, and verifies:
//! - No panics under arbitrary byte inputs
//! - A trailing drain always parks the FSM in Idle
//! - No executing bits or held lock survive the drain
//!
//! cargo fuzz run fuzz_reconf_fsm

#![no_main]

use libfuzzer_sys::fuzz_target;

use wld_mxl::actions::ActionId;
use wld_mxl::app::events::ReconfEvent;
use wld_mxl::app::ports::{ConfPort, CtrlPort, EventSink, HostPort, COLOCATED_MAX};
use wld_mxl::app::service::{ReconfService, Scope};
use wld_mxl::config::ReconfConfig;
use wld_mxl::error::CtrlError;
use wld_mxl::fsm::StateId;
use wld_mxl::model::{Band, IfName};

// ── Permissive in-memory host ─────────────────────────────────

#[derive(Default)]
struct FuzzHost {
    ready: std::collections::HashSet<String>,
    /// Every Nth command fails, derived from fuzz input.
    fail_mod: u8,
    sends: u8,
}

impl FuzzHost {
    fn maybe_fail(&mut self) -> Result<(), CtrlError> {
        self.sends = self.sends.wrapping_add(1);
        if self.fail_mod != 0 && self.sends % self.fail_mod == 0 {
            Err(CtrlError::SendFailed)
        } else {
            Ok(())
        }
    }
}

impl CtrlPort for FuzzHost {
    fn send_cmd(&mut self, _ap: &str, _cmd: &str, _expect: Option<&str>) -> Result<(), CtrlError> {
        self.maybe_fail()
    }
    fn send_any(
        &mut self,
        _radio: &str,
        _cmd: &str,
        _expect: Option<&str>,
    ) -> Result<(), CtrlError> {
        self.maybe_fail()
    }
    fn ctrl_ready(&self, ap: &str) -> bool {
        self.ready.contains(ap)
    }
    fn open_ctrl(&mut self, ap: &str) -> Result<(), CtrlError> {
        self.ready.insert(ap.to_string());
        Ok(())
    }
    fn reconnect_all(&mut self, _radio: &str) -> Result<(), CtrlError> {
        Ok(())
    }
}

impl ConfPort for FuzzHost {
    fn write_config(&mut self, _radio: &str) {}
}

impl HostPort for FuzzHost {
    fn daemon_running(&self, _radio: &str) -> bool {
        true
    }
    fn radio_enabled(&self, _radio: &str) -> bool {
        true
    }
    fn radio_initialized(&self, _radio: &str) -> bool {
        true
    }
    fn vaps_done(&self, _radio: &str) -> bool {
        true
    }
    fn resolve_ifindex(&self, _ap: &str) -> Option<u32> {
        None
    }
    fn refresh_vap_state(&mut self, _ap: &str) {}
    fn refresh_radio_state(&mut self, _radio: &str) {}
    fn colocated_aps(&self, _except_radio: &str) -> heapless::Vec<IfName, COLOCATED_MAX> {
        heapless::Vec::new()
    }
}

struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &ReconfEvent) {}
}

// ── Target ────────────────────────────────────────────────────

fuzz_target!(|data: &[u8]| {
    let mut bytes = data.iter().copied();

    let cfg = ReconfConfig {
        boot_quiet_ms: 0,
        ..ReconfConfig::default()
    };
    let mut svc = ReconfService::new(cfg);
    let Ok(radio) = svc.add_radio("wlan0", Band::Band6G) else { return };
    let _ = svc.add_vap(radio, "wlan0.0", false);
    let _ = svc.add_vap(radio, "wlan0.1", true);

    let mut host = FuzzHost {
        fail_mod: bytes.next().unwrap_or(0) % 8,
        ..FuzzHost::default()
    };
    let mut sink = NullSink;
    let mut now: u64 = 0;

    while let Some(op) = bytes.next() {
        match op % 4 {
            0 => {
                if let Some(id) = ActionId::from_index(usize::from(op / 4) % ActionId::COUNT) {
                    let _ = svc.request_action(Scope::Radio(radio), id);
                }
            }
            1 => {
                if let Some(id) = ActionId::from_index(usize::from(op / 4) % ActionId::COUNT) {
                    let ap = if op & 0x40 != 0 { "wlan0.1" } else { "wlan0.0" };
                    let _ = svc.request_action(Scope::Vap(radio, ap), id);
                }
            }
            2 => {
                let _ = svc.notify_commit(radio, now, &mut sink);
            }
            _ => {
                now += u64::from(bytes.next().unwrap_or(1)) * 100 + 1;
                svc.poll(now, &mut host, &mut sink);
            }
        }
    }

    // Drain and check the machine parks cleanly.
    host.fail_mod = 0;
    let _ = svc.notify_commit(radio, now, &mut sink);
    for _ in 0..500 {
        match svc.poll(now, &mut host, &mut sink) {
            Some(deadline) => now = deadline.max(now + 1),
            None => break,
        }
    }
    assert_eq!(svc.fsm_state(radio).unwrap(), StateId::Idle);
    let ctx = svc.context(radio).unwrap();
    assert!(!ctx.radio.any_executing());
    assert!(!svc.locker().is_locked());
});
