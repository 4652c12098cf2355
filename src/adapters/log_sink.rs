//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured engine events to the
//! `log` facade (the host routes them to syslog in production).  A data
//! model notification adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::ReconfEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`ReconfEvent`].
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &ReconfEvent) {
        match event {
            ReconfEvent::StateChanged { radio, from, to } => {
                info!("RECONF | radio{radio} | {from:?} -> {to:?}");
            }
            ReconfEvent::CommitScheduled { radio, delay_ms } => {
                info!("RECONF | radio{radio} | commit in {delay_ms} ms");
            }
            ReconfEvent::CommitDeferred { radio, pending } => {
                info!("RECONF | radio{radio} | commit deferred ({pending} pending)");
            }
            ReconfEvent::FsmReset { radio } => {
                warn!("RECONF | radio{radio} | FSM reset");
            }
            ReconfEvent::AllFsmsReset => {
                warn!("RECONF | breaker tripped, all FSMs reset");
            }
        }
    }
}
