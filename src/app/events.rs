//! Outbound engine events.
//!
//! The [`ReconfService`](super::service::ReconfService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them — log them, raise data
//! model notifications, feed a debug socket.

use crate::fsm::StateId;

/// Structured events emitted by the reconfiguration engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconfEvent {
    /// A radio's FSM moved between states (transient states collapse:
    /// an ERROR pass reports the state it recovered into).
    StateChanged { radio: u8, from: StateId, to: StateId },

    /// The debounce timer was armed for a radio.
    CommitScheduled { radio: u8, delay_ms: u64 },

    /// A commit arrived while the FSM was busy and was queued for the
    /// COMPEND/FINISH re-entry check.
    CommitDeferred { radio: u8, pending: u32 },

    /// One radio's FSM was reset out-of-band (debug command, teardown).
    FsmReset { radio: u8 },

    /// The stuck-FSM breaker tripped: every radio was reset and all
    /// queued reconfiguration intents were dropped.
    AllFsmsReset,
}
