// std
use std::str::FromStr;
// crates.io
use bitcoin::{address::NetworkUnchecked, bip32::DerivationPath, Address, Network, Txid};
// self
use crate::prelude::*;

pub fn addr_from_str(s: &str, network: Network) -> Result<Address> {
	Ok(s.parse::<Address<NetworkUnchecked>>()
		.map_err(BitcoinError::Parse)?
		.require_network(network)
		.map_err(BitcoinError::Parse)?)
}
#[test]
fn addr_from_str_should_work() {
	assert!(addr_from_str("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy", Network::Bitcoin).is_ok());
	assert!(addr_from_str("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq", Network::Bitcoin).is_ok());
	assert!(addr_from_str("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq", Network::Testnet).is_err());
	assert!(addr_from_str("not-an-address", Network::Bitcoin).is_err());
}

/// Parse a BIP-32 path such as `m/49'/0'/0'/0/0` into its raw child indexes.
pub fn parse_path(s: &str) -> Result<Vec<u32>> {
	let path = DerivationPath::from_str(s).map_err(BitcoinError::Bip32)?;

	Ok(path.into_iter().map(|c| u32::from(*c)).collect())
}
#[test]
fn parse_path_should_work() {
	const H: u32 = 0x8000_0000;

	assert_eq!(parse_path("m/49'/0'/0'/0/0").unwrap(), [H + 49, H, H, 0, 0]);
	assert_eq!(parse_path("m/84h/0h/1h/1/7").unwrap(), [H + 84, H, H + 1, 1, 7]);
	assert!(parse_path("m/x").is_err());
}

/// Normalize a txid to lower-case hex, rejecting anything that is not a 32-byte hash.
pub fn normalize_txid(s: &str) -> Result<String> {
	Ok(Txid::from_str(s).map_err(BitcoinError::HexToArray)?.to_string())
}
#[test]
fn normalize_txid_should_work() {
	let txid = "C3B2F0E9C4FE2E1B0A7AB5EAC1E1C2F6D0D4F6E9A7E3D5C1B0A9F8E7D6C5B4A3";

	assert_eq!(normalize_txid(txid).unwrap(), txid.to_lowercase());
	assert!(normalize_txid("aa").is_err());
}
