//! Input validation and sanitization
//!
//! Everything here guards values that end up in plugin environment
//! variables or filesystem lookups, so the checks reject path separators,
//! control characters, and shell metacharacters up front.

use crate::error::{NetplugError, NetplugResult};

/// Maximum length for interface names (Linux kernel limit is 15)
const MAX_INTERFACE_NAME_LEN: usize = 15;

/// Maximum length for network names and container ids
const MAX_NAME_LEN: usize = 256;

/// Validate a network configuration name.
///
/// The name is a lookup key into the configuration directory, never a
/// path, so path separators and control characters are rejected.
pub fn validate_network_name(name: &str) -> NetplugResult<()> {
    if name.is_empty() {
        return Err(NetplugError::InvalidParameter(
            "Network name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(NetplugError::InvalidParameter(format!(
            "Network name too long (max {} characters)",
            MAX_NAME_LEN
        )));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(NetplugError::InvalidParameter(
            "Network name cannot contain path separators".to_string(),
        ));
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(NetplugError::InvalidParameter(
            "Network name cannot contain control characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate an interface name.
///
/// Interface names must be alphanumeric with optional dashes, underscores
/// and dots, and no longer than 15 characters (Linux kernel limit)
pub fn validate_interface_name(name: &str) -> NetplugResult<()> {
    if name.is_empty() {
        return Err(NetplugError::InvalidParameter(
            "Interface name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_INTERFACE_NAME_LEN {
        return Err(NetplugError::InvalidParameter(format!(
            "Interface name too long (max {} characters)",
            MAX_INTERFACE_NAME_LEN
        )));
    }

    for c in name.chars() {
        if !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '.' {
            return Err(NetplugError::InvalidParameter(format!(
                "Invalid interface name '{}': contains invalid character '{}'",
                name, c
            )));
        }
    }

    // Don't allow names starting with dash (could be interpreted as option)
    if name.starts_with('-') {
        return Err(NetplugError::InvalidParameter(
            "Interface name cannot start with dash".to_string(),
        ));
    }

    Ok(())
}

/// Validate a container identifier.
pub fn validate_container_id(id: &str) -> NetplugResult<()> {
    if id.is_empty() {
        return Err(NetplugError::InvalidParameter(
            "Container id cannot be empty".to_string(),
        ));
    }

    if id.len() > MAX_NAME_LEN {
        return Err(NetplugError::InvalidParameter(format!(
            "Container id too long (max {} characters)",
            MAX_NAME_LEN
        )));
    }

    for c in id.chars() {
        if !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '.' {
            return Err(NetplugError::InvalidParameter(format!(
                "Invalid container id '{}': contains invalid character '{}'",
                id, c
            )));
        }
    }

    Ok(())
}
