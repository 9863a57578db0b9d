//! BIP-32 secp256k1 key derivation, shared by the EVM family and Bitcoin

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use sha2::Sha512;

use crate::error::{Error, Result};

use super::{parse_derivation_path, HARDENED_OFFSET};

/// Derive a secp256k1 secret key from a seed and derivation path
pub fn derive_secret_key(seed: &[u8], path: &str) -> Result<SecretKey> {
    let components = parse_derivation_path(path)?;
    let (mut secret_key, mut chain_code) = derive_master_key(seed)?;

    for component in components {
        (secret_key, chain_code) = derive_child_key(secret_key, chain_code, component)?;
    }

    SecretKey::from_slice(&secret_key)
        .map_err(|e| Error::KeyDerivation(format!("Invalid derived key: {}", e)))
}

/// Derive the master key from a seed
fn derive_master_key(seed: &[u8]) -> Result<([u8; 32], [u8; 32])> {
    let hmac = hmac_sha512(b"Bitcoin seed", seed)?;

    let mut secret_key = [0u8; 32];
    let mut chain_code = [0u8; 32];
    secret_key.copy_from_slice(&hmac[0..32]);
    chain_code.copy_from_slice(&hmac[32..64]);

    Ok((secret_key, chain_code))
}

/// Derive a child key from a parent key
fn derive_child_key(
    parent_key: [u8; 32],
    parent_chain_code: [u8; 32],
    index: u32,
) -> Result<([u8; 32], [u8; 32])> {
    let secp = Secp256k1::new();
    let parent_secret_key = SecretKey::from_slice(&parent_key)
        .map_err(|e| Error::KeyDerivation(format!("Invalid parent key: {}", e)))?;

    let mut data = Vec::with_capacity(37);
    if index >= HARDENED_OFFSET {
        data.push(0);
        data.extend_from_slice(&parent_key);
    } else {
        let parent_public_key = PublicKey::from_secret_key(&secp, &parent_secret_key);
        data.extend_from_slice(&parent_public_key.serialize());
    }
    data.extend_from_slice(&index.to_be_bytes());

    let hmac = hmac_sha512(&parent_chain_code, &data)?;

    let mut child_key = [0u8; 32];
    let mut child_chain_code = [0u8; 32];
    child_key.copy_from_slice(&hmac[0..32]);
    child_chain_code.copy_from_slice(&hmac[32..64]);

    // child = IL + parent (mod n)
    let child_secret_key = SecretKey::from_slice(&child_key)
        .map_err(|e| Error::KeyDerivation(format!("Invalid child key: {}", e)))?
        .add_tweak(&parent_secret_key.into())
        .map_err(|e| Error::KeyDerivation(format!("Key addition error: {}", e)))?;

    Ok((child_secret_key.secret_bytes(), child_chain_code))
}

fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<[u8; 64]> {
    let mut hmac = <Hmac<Sha512> as KeyInit>::new_from_slice(key)
        .map_err(|_| Error::KeyDerivation("HMAC error".to_string()))?;
    hmac.update(data);

    let mut out = [0u8; 64];
    out.copy_from_slice(&hmac.finalize().into_bytes());
    Ok(out)
}
