//! Unified error types for the reconfiguration engine.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! the service layer's error handling uniform.  All variants are `Copy`
//! so they can be cheaply passed through the FSM without allocation.
//! Failures never propagate beyond their immediate caller as anything but
//! a `Result`: each caller branches locally (continue vs. abort the pass).

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level engine error
// ---------------------------------------------------------------------------

/// Every fallible operation in the engine funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A control-socket operation failed.
    Ctrl(CtrlError),
    /// An action executor failed or refused to run.
    Exec(ExecError),
    /// The commit scheduler gave up.
    Commit(CommitError),
    /// The radio/AP bookkeeping rejected an operation.
    Model(ModelError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ctrl(e) => write!(f, "ctrl: {e}"),
            Self::Exec(e) => write!(f, "exec: {e}"),
            Self::Commit(e) => write!(f, "commit: {e}"),
            Self::Model(e) => write!(f, "model: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Control-socket errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlError {
    /// The AP has no connected control socket.
    NotConnected,
    /// The daemon exposes no usable socket at all.
    NoSocket,
    /// Connecting or reconnecting the socket failed.
    OpenFailed,
    /// The command could not be written or the reply never arrived.
    SendFailed,
    /// The daemon answered, but not with the expected literal.
    UnexpectedReply,
}

impl fmt::Display for CtrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "control socket not connected"),
            Self::NoSocket => write!(f, "no control socket available"),
            Self::OpenFailed => write!(f, "control socket open failed"),
            Self::SendFailed => write!(f, "command send failed"),
            Self::UnexpectedReply => write!(f, "unexpected reply"),
        }
    }
}

impl From<CtrlError> for Error {
    fn from(e: CtrlError) -> Self {
        Self::Ctrl(e)
    }
}

// ---------------------------------------------------------------------------
// Executor errors
// ---------------------------------------------------------------------------

/// Why an action executor did not complete.
///
/// `DummyVap` and `RadioNotReady` are refusals — the precondition for the
/// action is simply absent, the pass continues.  `Ctrl` wraps a real
/// command failure; at radio scope it aborts the whole pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecError {
    /// The target AP is a non-functional placeholder.
    DummyVap,
    /// The radio is disabled, uninitialised, or its daemon is down.
    RadioNotReady,
    /// The underlying control-socket exchange failed.
    Ctrl(CtrlError),
}

impl ExecError {
    /// Whether this failure must abort the pass when it occurs at a scope
    /// whose failures are fatal.  Refusals never are.
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::Ctrl(_))
    }
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DummyVap => write!(f, "placeholder VAP"),
            Self::RadioNotReady => write!(f, "radio not ready"),
            Self::Ctrl(e) => write!(f, "{e}"),
        }
    }
}

impl From<CtrlError> for ExecError {
    fn from(e: CtrlError) -> Self {
        Self::Ctrl(e)
    }
}

impl From<ExecError> for Error {
    fn from(e: ExecError) -> Self {
        Self::Exec(e)
    }
}

// ---------------------------------------------------------------------------
// Commit scheduler errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitError {
    /// Commits piled up past the count-and-age thresholds; every radio's
    /// FSM was force-reset and the queued work was dropped.
    FsmStuck,
}

impl fmt::Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FsmStuck => write!(f, "FSM stuck, forced reset of all radios"),
        }
    }
}

impl From<CommitError> for Error {
    fn from(e: CommitError) -> Self {
        Self::Commit(e)
    }
}

// ---------------------------------------------------------------------------
// Model errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelError {
    /// The radio table is full.
    RadioTableFull,
    /// The radio's AP table is full.
    VapTableFull,
    /// No radio with that index exists.
    NoSuchRadio,
    /// No AP with that name exists on the radio.
    NoSuchVap,
    /// The interface name exceeds the kernel limit.
    NameTooLong,
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RadioTableFull => write!(f, "radio table full"),
            Self::VapTableFull => write!(f, "VAP table full"),
            Self::NoSuchRadio => write!(f, "no such radio"),
            Self::NoSuchVap => write!(f, "no such VAP"),
            Self::NameTooLong => write!(f, "interface name too long"),
        }
    }
}

impl From<ModelError> for Error {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Engine-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
