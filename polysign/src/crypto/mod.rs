//! Mnemonic handling and deterministic key derivation

pub mod keys;
pub mod mnemonic;
