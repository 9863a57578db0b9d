//! Hierarchical key derivation
//!
//! BIP-32 over secp256k1 for the EVM family and Bitcoin, SLIP-0010 over
//! ed25519 for Solana. Both share the same `m/…` path notation.

pub mod bip32;
pub mod ed25519;

use crate::error::{Error, Result};

/// Offset marking a hardened derivation path component
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Parse a BIP-32 style derivation path into its numeric components
pub fn parse_derivation_path(path: &str) -> Result<Vec<u32>> {
    let rest = path
        .strip_prefix("m/")
        .ok_or_else(|| Error::KeyDerivation(format!("Invalid derivation path: {}", path)))?;

    let mut components = Vec::new();
    for component in rest.split('/') {
        if component.is_empty() {
            continue;
        }

        let (digits, hardened) = match component.strip_suffix('\'') {
            Some(digits) => (digits, true),
            None => (component, false),
        };
        let index = digits.parse::<u32>().map_err(|_| {
            Error::KeyDerivation(format!("Invalid derivation path component: {}", component))
        })?;
        if index >= HARDENED_OFFSET {
            return Err(Error::KeyDerivation(format!(
                "Derivation index out of range: {}",
                component
            )));
        }

        components.push(if hardened { HARDENED_OFFSET + index } else { index });
    }

    Ok(components)
}
