//! Utility functions shared by fabric crates

use std::sync::LazyLock;

use if_addrs::IfAddr;

/// Pattern for dataset instance and service names
static VALID_NAME_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new("^[a-zA-Z0-9_.-]+$").expect("Invalid regex pattern"));

/// Validate a dataset or service name
///
/// Allowed characters: alphanumeric, underscore, dot, hyphen. Empty names are
/// rejected.
///
/// # Examples
///
/// ```
/// use fabric_common::is_valid_name;
///
/// assert!(is_valid_name("fabric.user.bob"));
/// assert!(!is_valid_name("invalid/path"));
/// assert!(!is_valid_name(""));
/// ```
pub fn is_valid_name(name: &str) -> bool {
    VALID_NAME_PATTERN.is_match(name)
}

/// Get the local IP address
///
/// Returns the first non-loopback IPv4 address found,
/// or "127.0.0.1" as fallback.
pub fn local_ip() -> String {
    if_addrs::get_if_addrs()
        .ok()
        .and_then(|addrs| {
            addrs
                .into_iter()
                .find(|iface| !iface.is_loopback() && matches!(iface.addr, IfAddr::V4(_)))
                .and_then(|iface| match iface.addr {
                    IfAddr::V4(addr) => Some(addr.ip.to_string()),
                    _ => None,
                })
        })
        .unwrap_or_else(|| "127.0.0.1".to_string())
}
