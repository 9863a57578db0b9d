//! Per-chain wallet generation and key material formatting
//!
//! Derivation follows BIP-44 with per-chain coin types; every EVM-family and
//! Bitcoin testnet shares coin type 1 per the standard.

use bitcoin::Network;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::crypto::keys::{bip32, ed25519};
use crate::crypto::mnemonic::{self, MnemonicStrength};
use crate::error::{Error, Result};
use crate::model::Chain;

/// A freshly generated or imported wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedWallet {
    pub chain: Chain,
    pub mnemonic: String,
    /// Address at derivation index 0
    pub address: String,
}

/// Derivation path for a chain at a specific index
pub fn derivation_path(chain: Chain, index: u32, testnet: bool) -> String {
    match chain {
        // SLIP-0010 hardened-only scheme
        Chain::Sol => format!("m/44'/501'/{}'/0'", index),
        Chain::Btc if testnet => format!("m/44'/1'/0'/0/{}", index),
        Chain::Btc => format!("m/44'/0'/0'/0/{}", index),
        _ if testnet => format!("m/44'/1'/0'/0/{}", index),
        Chain::Eth => format!("m/44'/60'/0'/0/{}", index),
        Chain::One => format!("m/44'/1023'/0'/0/{}", index),
        Chain::Matic => format!("m/44'/966'/0'/0/{}", index),
        Chain::Bsc => format!("m/44'/9006'/0'/0/{}", index),
    }
}

/// Generate a wallet, creating a new 24-word mnemonic unless one is supplied
pub fn generate_wallet(
    chain: Chain,
    mnemonic_phrase: Option<&str>,
    testnet: bool,
) -> Result<GeneratedWallet> {
    let phrase = match mnemonic_phrase {
        Some(phrase) => {
            mnemonic::validate_mnemonic(phrase)?;
            phrase.to_string()
        }
        None => mnemonic::generate_mnemonic(MnemonicStrength::Words24)?,
    };

    let address = address_from_mnemonic(chain, &phrase, 0, testnet)?;
    Ok(GeneratedWallet {
        chain,
        mnemonic: phrase,
        address,
    })
}

/// Derive the private key for an account index from a mnemonic.
///
/// EVM chains return `0x`-prefixed hex, Bitcoin a WIF string, Solana the
/// hex-encoded 64-byte keypair (secret followed by public key).
pub fn private_key_from_mnemonic(
    chain: Chain,
    mnemonic_phrase: &str,
    index: u32,
    testnet: bool,
) -> Result<String> {
    let seed = mnemonic::mnemonic_to_seed(mnemonic_phrase, None)?;
    let path = derivation_path(chain, index, testnet);

    match chain {
        Chain::Sol => {
            let signing_key = ed25519::derive_signing_key(&seed, &path)?;
            let verifying_key = ed25519::verifying_key(&signing_key);
            let mut keypair = signing_key.to_bytes().to_vec();
            keypair.extend_from_slice(&verifying_key.to_bytes());
            Ok(hex::encode(keypair))
        }
        Chain::Btc => {
            let secret = bip32::derive_secret_key(&seed, &path)?;
            let network = bitcoin_network(testnet);
            let private_key = bitcoin::PrivateKey::new(secret, network);
            Ok(private_key.to_wif())
        }
        _ => {
            let secret = bip32::derive_secret_key(&seed, &path)?;
            Ok(format!("0x{}", hex::encode(secret.secret_bytes())))
        }
    }
}

/// Derive the address for an account index from a mnemonic
pub fn address_from_mnemonic(
    chain: Chain,
    mnemonic_phrase: &str,
    index: u32,
    testnet: bool,
) -> Result<String> {
    let private_key = private_key_from_mnemonic(chain, mnemonic_phrase, index, testnet)?;
    address_from_private_key(chain, &private_key, testnet)
}

/// Compute the address controlled by a private key
pub fn address_from_private_key(chain: Chain, private_key: &str, testnet: bool) -> Result<String> {
    match chain {
        Chain::Sol => solana_address(private_key),
        Chain::Btc => bitcoin_address(private_key, testnet),
        _ => evm_address(private_key),
    }
}

fn evm_address(private_key: &str) -> Result<String> {
    let bytes = hex::decode(private_key.trim_start_matches("0x"))
        .map_err(|e| Error::KeyDerivation(format!("Invalid private key: {}", e)))?;
    let secret = SecretKey::from_slice(&bytes)
        .map_err(|e| Error::KeyDerivation(format!("Invalid private key: {}", e)))?;

    let secp = Secp256k1::new();
    let public = PublicKey::from_secret_key(&secp, &secret).serialize_uncompressed();

    // Keccak-256 of the uncompressed key without the 0x04 tag; address is the
    // last 20 bytes
    let mut hasher = Keccak256::new();
    hasher.update(&public[1..]);
    let hash = hasher.finalize();

    Ok(format!("0x{}", hex::encode(&hash[12..])))
}

fn bitcoin_address(private_key: &str, testnet: bool) -> Result<String> {
    let private_key = bitcoin::PrivateKey::from_wif(private_key)
        .map_err(|e| Error::KeyDerivation(format!("Invalid WIF private key: {}", e)))?;

    let secp = bitcoin::secp256k1::Secp256k1::new();
    let public_key = private_key.public_key(&secp);
    let address = bitcoin::Address::p2pkh(&public_key, bitcoin_network(testnet));
    Ok(address.to_string())
}

fn solana_address(private_key: &str) -> Result<String> {
    let bytes = hex::decode(private_key)
        .map_err(|e| Error::KeyDerivation(format!("Invalid private key: {}", e)))?;

    let public = match bytes.len() {
        // 64-byte keypair, public key in the second half
        64 => bytes[32..].to_vec(),
        32 => {
            let mut secret = [0u8; 32];
            secret.copy_from_slice(&bytes);
            let signing_key = ed25519_dalek::SigningKey::from_bytes(&secret);
            ed25519::verifying_key(&signing_key).to_bytes().to_vec()
        }
        other => {
            return Err(Error::KeyDerivation(format!(
                "Invalid Solana private key length: {}",
                other
            )))
        }
    };

    Ok(bs58::encode(public).into_string())
}

fn bitcoin_network(testnet: bool) -> Network {
    if testnet {
        Network::Testnet
    } else {
        Network::Bitcoin
    }
}
