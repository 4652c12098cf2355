//! Mock host adapter for integration tests.
//!
//! Records every port call so tests can assert on the full command
//! history without a live daemon, plus a recording event sink and a
//! timer pump that plays the host event loop.

use std::collections::{HashMap, HashSet};

use heapless::Vec as HVec;

use wld_mxl::app::events::ReconfEvent;
use wld_mxl::app::ports::{ConfPort, CtrlPort, EventSink, HostPort, COLOCATED_MAX};
use wld_mxl::app::service::ReconfService;
use wld_mxl::error::CtrlError;
use wld_mxl::model::IfName;

// ── Host call record ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    WriteConfig(String),
    SendCmd { ap: String, cmd: String },
    SendAny { radio: String, cmd: String },
    OpenCtrl(String),
    ReconnectAll(String),
    RefreshVap(String),
    RefreshRadio(String),
}

// ── MockHost ──────────────────────────────────────────────────

pub struct MockHost {
    pub calls: Vec<HostCall>,
    /// APs with a connected control socket.
    pub ready: HashSet<String>,
    pub daemon_up: bool,
    pub enabled: bool,
    pub initialized: bool,
    pub vaps_done: bool,
    /// Commands forced to fail at the socket level.
    pub fail_cmds: HashSet<String>,
    pub ifindexes: HashMap<String, u32>,
    pub colocated: Vec<String>,
}

#[allow(dead_code)]
impl MockHost {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            ready: HashSet::new(),
            daemon_up: true,
            enabled: true,
            initialized: true,
            vaps_done: true,
            fail_cmds: HashSet::new(),
            ifindexes: HashMap::new(),
            colocated: Vec::new(),
        }
    }

    pub fn with_ready(aps: &[&str]) -> Self {
        let mut host = Self::new();
        for ap in aps {
            host.ready.insert((*ap).to_string());
        }
        host
    }

    pub fn cmds_sent(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HostCall::SendCmd { cmd, .. } | HostCall::SendAny { cmd, .. } => {
                    Some(cmd.as_str())
                }
                _ => None,
            })
            .collect()
    }

    pub fn config_writes(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, HostCall::WriteConfig(_)))
            .count()
    }

    fn check(&self, cmd: &str) -> Result<(), CtrlError> {
        if self.fail_cmds.contains(cmd) {
            Err(CtrlError::SendFailed)
        } else {
            Ok(())
        }
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl CtrlPort for MockHost {
    fn send_cmd(&mut self, ap: &str, cmd: &str, _expect: Option<&str>) -> Result<(), CtrlError> {
        self.calls.push(HostCall::SendCmd {
            ap: ap.to_string(),
            cmd: cmd.to_string(),
        });
        self.check(cmd)
    }

    fn send_any(
        &mut self,
        radio: &str,
        cmd: &str,
        _expect: Option<&str>,
    ) -> Result<(), CtrlError> {
        self.calls.push(HostCall::SendAny {
            radio: radio.to_string(),
            cmd: cmd.to_string(),
        });
        self.check(cmd)
    }

    fn ctrl_ready(&self, ap: &str) -> bool {
        self.ready.contains(ap)
    }

    fn open_ctrl(&mut self, ap: &str) -> Result<(), CtrlError> {
        self.calls.push(HostCall::OpenCtrl(ap.to_string()));
        self.ready.insert(ap.to_string());
        Ok(())
    }

    fn reconnect_all(&mut self, radio: &str) -> Result<(), CtrlError> {
        self.calls.push(HostCall::ReconnectAll(radio.to_string()));
        Ok(())
    }
}

impl ConfPort for MockHost {
    fn write_config(&mut self, radio: &str) {
        self.calls.push(HostCall::WriteConfig(radio.to_string()));
    }
}

impl HostPort for MockHost {
    fn daemon_running(&self, _radio: &str) -> bool {
        self.daemon_up
    }

    fn radio_enabled(&self, _radio: &str) -> bool {
        self.enabled
    }

    fn radio_initialized(&self, _radio: &str) -> bool {
        self.initialized
    }

    fn vaps_done(&self, _radio: &str) -> bool {
        self.vaps_done
    }

    fn resolve_ifindex(&self, ap: &str) -> Option<u32> {
        self.ifindexes.get(ap).copied()
    }

    fn refresh_vap_state(&mut self, ap: &str) {
        self.calls.push(HostCall::RefreshVap(ap.to_string()));
    }

    fn refresh_radio_state(&mut self, radio: &str) {
        self.calls.push(HostCall::RefreshRadio(radio.to_string()));
    }

    fn colocated_aps(&self, _except_radio: &str) -> HVec<IfName, COLOCATED_MAX> {
        let mut out = HVec::new();
        for ap in &self.colocated {
            if let Ok(name) = IfName::try_from(ap.as_str()) {
                let _ = out.push(name);
            }
        }
        out
    }
}

// ── RecordingSink ─────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<ReconfEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count<F: Fn(&ReconfEvent) -> bool>(&self, pred: F) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &ReconfEvent) {
        self.events.push(event.clone());
    }
}

// ── Timer pump ────────────────────────────────────────────────

/// Play the host event loop: follow the deadlines `poll` returns until
/// the engine has nothing more scheduled.  Panics if it fails to settle
/// within `limit` wake-ups (a wedged FSM would otherwise hang the test).
#[allow(dead_code)]
pub fn pump(
    svc: &mut ReconfService,
    host: &mut MockHost,
    sink: &mut RecordingSink,
    now_ms: &mut u64,
    limit: u32,
) {
    for _ in 0..limit {
        match svc.poll(*now_ms, host, sink) {
            Some(deadline) => *now_ms = deadline.max(*now_ms + 1),
            None => return,
        }
    }
    panic!("engine did not settle within {limit} wake-ups");
}
