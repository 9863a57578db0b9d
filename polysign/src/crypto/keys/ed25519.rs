//! SLIP-0010 ed25519 key derivation, used by Solana

use ed25519_dalek::{SigningKey, VerifyingKey};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::error::{Error, Result};

use super::{parse_derivation_path, HARDENED_OFFSET};

/// Derive an ed25519 signing key from a seed and derivation path.
///
/// SLIP-0010 defines only hardened derivation for ed25519; a path with a
/// non-hardened component is rejected.
pub fn derive_signing_key(seed: &[u8], path: &str) -> Result<SigningKey> {
    let components = parse_derivation_path(path)?;
    let (mut secret_key, mut chain_code) = derive_master_key(seed)?;

    for component in components {
        if component < HARDENED_OFFSET {
            return Err(Error::KeyDerivation(
                "ed25519 derivation supports hardened components only".to_string(),
            ));
        }
        (secret_key, chain_code) = derive_child_key(&secret_key, &chain_code, component)?;
    }

    Ok(SigningKey::from_bytes(&secret_key))
}

/// Public half of a derived signing key
pub fn verifying_key(signing_key: &SigningKey) -> VerifyingKey {
    VerifyingKey::from(signing_key)
}

/// Derive the master key from a seed
fn derive_master_key(seed: &[u8]) -> Result<([u8; 32], [u8; 32])> {
    let hmac = hmac_sha512(b"ed25519 seed", seed)?;

    let mut secret_key = [0u8; 32];
    let mut chain_code = [0u8; 32];
    secret_key.copy_from_slice(&hmac[0..32]);
    chain_code.copy_from_slice(&hmac[32..64]);

    Ok((secret_key, chain_code))
}

/// Derive a hardened child key from a parent key
fn derive_child_key(
    parent_key: &[u8; 32],
    parent_chain_code: &[u8; 32],
    index: u32,
) -> Result<([u8; 32], [u8; 32])> {
    let mut data = Vec::with_capacity(37);
    data.push(0);
    data.extend_from_slice(parent_key);
    data.extend_from_slice(&index.to_be_bytes());

    let hmac = hmac_sha512(parent_chain_code, &data)?;

    let mut child_key = [0u8; 32];
    let mut child_chain_code = [0u8; 32];
    child_key.copy_from_slice(&hmac[0..32]);
    child_chain_code.copy_from_slice(&hmac[32..64]);

    Ok((child_key, child_chain_code))
}

fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<[u8; 64]> {
    let mut hmac = <Hmac<Sha512> as KeyInit>::new_from_slice(key)
        .map_err(|_| Error::KeyDerivation("HMAC error".to_string()))?;
    hmac.update(data);

    let mut out = [0u8; 64];
    out.copy_from_slice(&hmac.finalize().into_bytes());
    Ok(out)
}
