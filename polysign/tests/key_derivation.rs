//! Cross-chain wallet derivation tests

use polysign::model::Chain;
use polysign::wallet;

const TEST_MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

#[test]
fn test_evm_derivation_vector() {
    let key = wallet::private_key_from_mnemonic(Chain::Eth, TEST_MNEMONIC, 0, false).unwrap();
    assert_eq!(
        key,
        "0x1ab42cc412b618bdea3a599e3c9bae199ebf030895b039e9db1e30dafb12b727"
    );

    let address = wallet::address_from_mnemonic(Chain::Eth, TEST_MNEMONIC, 0, false).unwrap();
    assert_eq!(address, "0x9858effd232b4033e47d90003d41ec34ecaeda94");
}

#[test]
fn test_indexes_yield_distinct_accounts() {
    let first = wallet::address_from_mnemonic(Chain::Eth, TEST_MNEMONIC, 0, false).unwrap();
    let second = wallet::address_from_mnemonic(Chain::Eth, TEST_MNEMONIC, 1, false).unwrap();
    assert_ne!(first, second);
}

#[test]
fn test_derivation_is_repeatable_per_chain() {
    for chain in [Chain::Eth, Chain::One, Chain::Matic, Chain::Bsc, Chain::Sol, Chain::Btc] {
        let first = wallet::private_key_from_mnemonic(chain, TEST_MNEMONIC, 4, false).unwrap();
        let second = wallet::private_key_from_mnemonic(chain, TEST_MNEMONIC, 4, false).unwrap();
        assert_eq!(first, second, "derivation must be deterministic for {}", chain);
    }
}

#[test]
fn test_bitcoin_testnet_addresses_differ_from_mainnet() {
    let mainnet = wallet::address_from_mnemonic(Chain::Btc, TEST_MNEMONIC, 0, false).unwrap();
    let testnet = wallet::address_from_mnemonic(Chain::Btc, TEST_MNEMONIC, 0, true).unwrap();
    assert_ne!(mainnet, testnet);
    assert!(mainnet.starts_with('1'));
}

#[test]
fn test_invalid_mnemonic_is_rejected() {
    let err = wallet::generate_wallet(Chain::Eth, Some("not a mnemonic"), false).unwrap_err();
    assert!(matches!(err, polysign::Error::Mnemonic(_)));
}
