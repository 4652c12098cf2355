//! Kernel interface-index lookup via sysfs.
//!
//! A live reconf can tear down and recreate a BSS netdev, invalidating
//! any cached interface index.  The resync action re-resolves indexes
//! through this helper; the host's full `HostPort` implementation wraps
//! it.

use std::path::Path;

/// Resolve the current interface index of `ifname`, or `None` if the
/// netdev does not exist (mid-recreation, or torn down for good).
pub fn resolve_ifindex(ifname: &str) -> Option<u32> {
    resolve_ifindex_in(Path::new("/sys/class/net"), ifname)
}

/// Testable variant with an explicit sysfs root.
pub fn resolve_ifindex_in(sysfs_net: &Path, ifname: &str) -> Option<u32> {
    // Interface names never contain a path separator; anything else is a
    // traversal attempt, not an interface.
    if ifname.is_empty() || ifname.contains('/') || ifname.contains("..") {
        return None;
    }
    let raw = std::fs::read_to_string(sysfs_net.join(ifname).join("ifindex")).ok()?;
    raw.trim().parse().ok()
}
