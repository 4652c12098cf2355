//! hostapd control-interface client.
//!
//! Implements [`CtrlPort`] over the daemon's Unix datagram control
//! sockets (one per BSS under e.g. `/var/run/hostapd/`).  The protocol
//! is plain request/reply text: the client binds its own datagram
//! socket, connects to the BSS socket, writes the command, and reads a
//! single reply datagram — `"OK"` for most imperative commands.
//!
//! The client also keeps the radio → BSS registry the fallback path
//! (`send_any`) needs: when an AP's own socket is gone, any connected
//! socket of the same daemon still accepts commands.

use std::collections::HashMap;
use std::io;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};

use crate::app::ports::CtrlPort;
use crate::error::CtrlError;

/// How long to wait for the daemon's reply before declaring the send
/// failed.  hostapd answers control commands synchronously.
const REPLY_TIMEOUT: Duration = Duration::from_secs(1);

/// Reply buffer size; control replies are short.
const REPLY_BUF: usize = 4096;

/// One connected control socket.
struct CtrlConn {
    sock: UnixDatagram,
    /// Our bound endpoint, unlinked on drop.
    local_path: PathBuf,
}

impl Drop for CtrlConn {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.local_path);
    }
}

/// Control-socket client for every daemon this process manages.
pub struct CtrlSocketClient {
    /// Directory the daemon publishes its sockets in.
    ctrl_dir: PathBuf,
    /// Directory for our local (client-side) endpoints.
    local_dir: PathBuf,
    conns: HashMap<String, CtrlConn>,
    /// radio name → BSS names, for the `send_any` fallback.
    radios: HashMap<String, Vec<String>>,
}

impl CtrlSocketClient {
    pub fn new(ctrl_dir: impl Into<PathBuf>, local_dir: impl Into<PathBuf>) -> Self {
        Self {
            ctrl_dir: ctrl_dir.into(),
            local_dir: local_dir.into(),
            conns: HashMap::new(),
            radios: HashMap::new(),
        }
    }

    /// Record that `ap` belongs to `radio`'s daemon.
    pub fn register_vap(&mut self, radio: &str, ap: &str) {
        let aps = self.radios.entry(radio.to_string()).or_default();
        if !aps.iter().any(|a| a == ap) {
            aps.push(ap.to_string());
        }
    }

    /// Forget `ap` and close its socket.
    pub fn unregister_vap(&mut self, radio: &str, ap: &str) {
        if let Some(aps) = self.radios.get_mut(radio) {
            aps.retain(|a| a != ap);
        }
        self.conns.remove(ap);
    }

    fn connect(&self, ap: &str) -> io::Result<CtrlConn> {
        let local_path = self
            .local_dir
            .join(format!("wld_mxl_{}_{ap}", std::process::id()));
        // A stale endpoint from a crashed predecessor would fail the bind.
        let _ = std::fs::remove_file(&local_path);

        let sock = UnixDatagram::bind(&local_path)?;
        sock.connect(self.ctrl_dir.join(ap))?;
        sock.set_read_timeout(Some(REPLY_TIMEOUT))?;
        sock.set_write_timeout(Some(REPLY_TIMEOUT))?;
        Ok(CtrlConn { sock, local_path })
    }

    fn request(conn: &CtrlConn, ap: &str, cmd: &str) -> Result<String, CtrlError> {
        conn.sock.send(cmd.as_bytes()).map_err(|e| {
            warn!("{ap}: ctrl send failed: {e}");
            CtrlError::SendFailed
        })?;
        let mut buf = [0u8; REPLY_BUF];
        let n = conn.sock.recv(&mut buf).map_err(|e| {
            warn!("{ap}: ctrl reply timed out: {e}");
            CtrlError::SendFailed
        })?;
        let reply = String::from_utf8_lossy(&buf[..n]).trim_end().to_string();
        debug!("{ap}: '{cmd}' -> '{reply}'");
        Ok(reply)
    }

    fn exchange(conn: &CtrlConn, ap: &str, cmd: &str, expect: Option<&str>) -> Result<(), CtrlError> {
        let reply = Self::request(conn, ap, cmd)?;
        match expect {
            Some(want) if reply != want => {
                warn!("{ap}: '{cmd}' answered '{reply}', wanted '{want}'");
                Err(CtrlError::UnexpectedReply)
            }
            _ => Ok(()),
        }
    }
}

impl CtrlPort for CtrlSocketClient {
    fn send_cmd(&mut self, ap: &str, cmd: &str, expect: Option<&str>) -> Result<(), CtrlError> {
        let conn = self.conns.get(ap).ok_or(CtrlError::NotConnected)?;
        Self::exchange(conn, ap, cmd, expect)
    }

    fn send_any(&mut self, radio: &str, cmd: &str, expect: Option<&str>) -> Result<(), CtrlError> {
        let aps = self.radios.get(radio).ok_or(CtrlError::NoSocket)?;
        for ap in aps {
            if let Some(conn) = self.conns.get(ap) {
                debug!("{radio}: sending '{cmd}' via fallback socket {ap}");
                return Self::exchange(conn, ap, cmd, expect);
            }
        }
        Err(CtrlError::NoSocket)
    }

    fn ctrl_ready(&self, ap: &str) -> bool {
        self.conns.contains_key(ap)
    }

    fn open_ctrl(&mut self, ap: &str) -> Result<(), CtrlError> {
        match self.connect(ap) {
            Ok(conn) => {
                self.conns.insert(ap.to_string(), conn);
                Ok(())
            }
            Err(e) => {
                warn!("{ap}: ctrl socket open failed: {e}");
                Err(CtrlError::OpenFailed)
            }
        }
    }

    fn reconnect_all(&mut self, radio: &str) -> Result<(), CtrlError> {
        let aps = self
            .radios
            .get(radio)
            .cloned()
            .ok_or(CtrlError::NoSocket)?;
        for ap in &aps {
            self.conns.remove(ap);
            self.open_ctrl(ap)?;
        }
        Ok(())
    }
}

/// Path of the control socket the daemon publishes for `ap`.
pub fn ctrl_path(ctrl_dir: &Path, ap: &str) -> PathBuf {
    ctrl_dir.join(ap)
}
