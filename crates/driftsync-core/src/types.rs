//! Core identifier types for the driftsync engine
//!
//! This module defines the fundamental identifiers used throughout the
//! engine, using newtype patterns for semantic validation and type safety.

use core::fmt;
use core::ops::Deref;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Device Identifier
// ----------------------------------------------------------------------------

/// Unique identifier for a device participating in folder synchronization
/// (32 bytes, derived from the device certificate by the outer engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId([u8; 32]);

impl DeviceId {
    /// Create a new DeviceId from 32 bytes
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a DeviceId from a byte slice, truncating or zero-padding to 32
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut id = [0u8; 32];
        let len = core::cmp::min(bytes.len(), 32);
        id[..len].copy_from_slice(&bytes[..len]);
        Self(id)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The device's own row in sequence bookkeeping (all 0xFF)
    pub const LOCAL: Self = Self([0xFF; 32]);

    /// The aggregate "global" row in sequence bookkeeping (all 0x7F)
    pub const GLOBAL: Self = Self([0x7F; 32]);
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for DeviceId {
    type Err = crate::DriftsyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let clean_str = s.strip_prefix("0x").unwrap_or(s);

        let bytes = hex::decode(clean_str)
            .map_err(|_| crate::DriftsyncError::invalid_device_id("invalid hex in DeviceId"))?;

        if bytes.len() != 32 {
            return Err(crate::DriftsyncError::invalid_device_id(
                "DeviceId must be exactly 32 bytes",
            ));
        }

        let mut id = [0u8; 32];
        id.copy_from_slice(&bytes);
        Ok(Self(id))
    }
}

impl Deref for DeviceId {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_from_bytes() {
        let mut bytes = [0u8; 32];
        bytes[0] = 1;
        bytes[1] = 2;
        let id = DeviceId::new(bytes);
        assert_eq!(id.as_bytes(), &bytes);

        let from_short = DeviceId::from_bytes(&[1, 2]);
        assert_eq!(from_short, id);

        let mut long = [0u8; 40];
        long[..32].copy_from_slice(&bytes);
        let from_long = DeviceId::from_bytes(&long);
        assert_eq!(from_long, id);
    }

    #[test]
    fn test_device_id_display_roundtrip() {
        let id = DeviceId::from_bytes(&[0xAB; 32]);
        let text = id.to_string();
        assert_eq!(text.len(), 64);
        assert_eq!(text.parse::<DeviceId>().unwrap(), id);
    }

    #[test]
    fn test_device_id_rejects_wrong_length() {
        assert!("abcd".parse::<DeviceId>().is_err());
        assert!("zz".repeat(32).parse::<DeviceId>().is_err());
    }

    #[test]
    fn test_sentinel_devices_distinct() {
        assert_ne!(DeviceId::LOCAL, DeviceId::GLOBAL);
        assert_ne!(DeviceId::LOCAL, DeviceId::from_bytes(&[]));
    }
}
