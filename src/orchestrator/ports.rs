use std::collections::HashSet;

/// First debug port handed out (inclusive).
pub const MIN_DEBUG_PORT: u16 = 5001;
/// End of the debug port range (exclusive).
pub const MAX_DEBUG_PORT: u16 = 15000;

/// Pick the lowest debug port in `[MIN_DEBUG_PORT, MAX_DEBUG_PORT)` that no
/// other tracked project uses.
///
/// Pure function: the caller persists the result together with the project's
/// metadata. Two projects launched for the first time at the same moment can
/// both read the same `used` set and pick the same port; that race is
/// accepted rather than guarded with a global lock.
pub fn allocate_debug_port(used: &HashSet<u16>) -> Option<u16> {
    (MIN_DEBUG_PORT..MAX_DEBUG_PORT).find(|port| !used.contains(port))
}
