// std
use std::collections::{BTreeMap, HashMap};
// crates.io
use bitcoin::{amount::Denomination, Amount};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
// self
use crate::prelude::*;

pub type Satoshi = u64;
#[test]
fn max_btc_in_u64_should_work() {
	let max_u64 = Satoshi::MAX;
	let max_btc = 21_000_000_u64 * 100_000_000;

	assert!(max_u64 > max_btc);
}

pub type Index = u32;

pub const SEQUENCE: u32 = 0xFFFF_FFFD;

/// An unspent output of the consolidated address.
///
/// Unique by `(txid, output_n)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Utxo {
	pub address: String,
	pub txid: String,
	pub confirmations: u64,
	pub output_n: Index,
	pub block_height: Option<u64>,
	pub value: Satoshi,
	pub script: String,
}
#[cfg(test)]
impl Utxo {
	pub fn new<S>(txid: S, output_n: Index, value: Satoshi) -> Self
	where
		S: Into<String>,
	{
		Self {
			address: "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy".into(),
			txid: txid.into(),
			confirmations: 6,
			output_n,
			block_height: Some(800_000),
			value,
			script: "a914748284390f9e263a4b766a75d0633c50426eb87587".into(),
		}
	}
}

/// A UTXO paired with the full transaction that created it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UtxoTx {
	pub utxo_id: Utxo,
	pub utxo_tx: Value,
}

// Only valid for single-sig UTXOs.
static INPUT_SCRIPT_TYPES: Lazy<HashMap<&'static str, InputScriptType>> = Lazy::new(|| {
	HashMap::from([
		("pubkeyhash", InputScriptType::SpendAddress),
		("scripthash", InputScriptType::SpendP2shWitness),
		("witness_v0_keyhash", InputScriptType::SpendWitness),
		("witness_v1_taproot", InputScriptType::SpendTaproot),
	])
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputScriptType {
	#[serde(rename = "SPENDADDRESS")]
	SpendAddress,
	#[serde(rename = "SPENDP2SHWITNESS")]
	SpendP2shWitness,
	#[serde(rename = "SPENDWITNESS")]
	SpendWitness,
	#[serde(rename = "SPENDTAPROOT")]
	SpendTaproot,
}
impl InputScriptType {
	/// Resolve the signing script type from a node-reported `scriptPubKey.type`.
	pub fn from_reported(reported: &str) -> Option<Self> {
		INPUT_SCRIPT_TYPES.get(reported).copied()
	}
}
#[test]
fn input_script_type_should_work() {
	assert_eq!(InputScriptType::from_reported("scripthash"), Some(InputScriptType::SpendP2shWitness));
	assert_eq!(InputScriptType::from_reported("witness_v1_taproot"), Some(InputScriptType::SpendTaproot));
	assert_eq!(InputScriptType::from_reported("multisig"), None);
	assert_eq!(InputScriptType::from_reported("nulldata"), None);
	assert_eq!(serde_json::to_string(&InputScriptType::SpendWitness).unwrap(), r#""SPENDWITNESS""#);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputScriptType {
	#[serde(rename = "PAYTOADDRESS")]
	PayToAddress,
}

/// Everything the external signer needs to sign a consolidation transaction.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct SignerRequest {
	pub coin_name: String,
	pub inputs: Vec<TxInput>,
	pub outputs: Vec<TxOutput>,
	pub details: TxDetails,
	pub prev_txes: BTreeMap<String, PrevTx>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct TxInput {
	pub address_n: Vec<u32>,
	pub prev_hash: String,
	pub prev_index: Index,
	pub amount: Satoshi,
	pub script_type: InputScriptType,
	pub sequence: u32,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct TxOutput {
	pub address: String,
	pub amount: Satoshi,
	pub script_type: OutputScriptType,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct TxDetails {
	pub version: u32,
	pub lock_time: u32,
}

/// Previous transaction in the shape expected by the signer.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct PrevTx {
	pub version: u32,
	pub lock_time: u32,
	pub inputs: Vec<PrevInput>,
	pub bin_outputs: Vec<PrevOutput>,
}
impl PrevTx {
	pub fn from_raw(txid: &str, raw: &RawTx) -> Result<Self> {
		let inputs = raw.vin.iter().map(|i| PrevInput::from_raw(txid, i)).collect::<Result<_>>()?;
		let bin_outputs = raw
			.vout
			.iter()
			.map(|o| {
				Ok(PrevOutput {
					amount: btc_to_sat(txid, &o.value)?,
					script_pubkey: o.script_pub_key.hex.clone(),
				})
			})
			.collect::<Result<_>>()?;

		Ok(Self { version: raw.version, lock_time: raw.locktime, inputs, bin_outputs })
	}
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct PrevInput {
	pub prev_hash: String,
	pub prev_index: u32,
	pub script_sig: String,
	pub sequence: u32,
}
impl PrevInput {
	/// Convert an input of the transaction `txid`.
	pub fn from_raw(txid: &str, vin: &RawVin) -> Result<Self> {
		if let Some(coinbase) = &vin.coinbase {
			return Ok(Self {
				prev_hash: "00".repeat(32),
				prev_index: u32::MAX,
				script_sig: coinbase.clone(),
				sequence: vin.sequence,
			});
		}

		let (Some(prev_hash), Some(prev_index)) = (&vin.txid, vin.vout) else {
			return Err(ChainError::MalformedTx {
				txid: txid.into(),
				reason: "input without coinbase, txid or vout".into(),
			}
			.into());
		};

		Ok(Self {
			prev_hash: prev_hash.clone(),
			prev_index,
			script_sig: vin.script_sig.as_ref().map(|s| s.hex.clone()).unwrap_or_default(),
			sequence: vin.sequence,
		})
	}
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct PrevOutput {
	pub amount: Satoshi,
	pub script_pubkey: String,
}

/// The part of a node-style transaction JSON the signer cares about.
#[derive(Debug, Deserialize)]
pub struct RawTx {
	pub version: u32,
	#[serde(default)]
	pub locktime: u32,
	pub vin: Vec<RawVin>,
	pub vout: Vec<RawVout>,
}
#[derive(Debug, Deserialize)]
pub struct RawVin {
	pub coinbase: Option<String>,
	pub txid: Option<String>,
	pub vout: Option<u32>,
	#[serde(rename = "scriptSig")]
	pub script_sig: Option<RawScriptSig>,
	pub sequence: u32,
}
#[derive(Debug, Deserialize)]
pub struct RawScriptSig {
	pub hex: String,
}
#[derive(Debug, Deserialize)]
pub struct RawVout {
	// Decimal BTC, either as a JSON number or a string.
	pub value: Value,
	#[serde(rename = "scriptPubKey")]
	pub script_pub_key: RawScriptPubKey,
}
#[derive(Debug, Deserialize)]
pub struct RawScriptPubKey {
	pub hex: String,
	#[serde(rename = "type")]
	pub kind: Option<String>,
	pub asm: Option<String>,
}

fn btc_to_sat(txid: &str, value: &Value) -> Result<Satoshi> {
	let malformed = |reason: String| ChainError::MalformedTx { txid: txid.into(), reason };
	let amount = match value {
		Value::String(s) => Amount::from_str_in(s, Denomination::Bitcoin),
		Value::Number(n) => Amount::from_str_in(&n.to_string(), Denomination::Bitcoin).or_else(|e| {
			n.as_f64().ok_or(e).and_then(Amount::from_btc)
		}),
		v => Err(malformed(format!("output value {v} is not a number")))?,
	};

	Ok(amount.map_err(|e| malformed(format!("invalid output value {value}: {e}")))?.to_sat())
}
#[test]
fn btc_to_sat_should_work() {
	let n = serde_json::from_str::<Value>("0.00012345").unwrap();

	assert_eq!(btc_to_sat("aa", &n).unwrap(), 12_345);
	assert_eq!(btc_to_sat("aa", &Value::String("1.5".into())).unwrap(), 150_000_000);
	assert_eq!(btc_to_sat("aa", &serde_json::json!(21)).unwrap(), 2_100_000_000);
	assert!(btc_to_sat("aa", &Value::Null).is_err());
	assert!(btc_to_sat("aa", &Value::String("0.000000001".into())).is_err());
}

#[test]
fn prev_tx_should_work() {
	let raw = serde_json::from_value::<RawTx>(serde_json::json!({
		"txid": "bb",
		"version": 1,
		"vin": [
			{ "coinbase": "03a0bb0d", "sequence": 4294967295_u32 },
			{
				"txid": "aa",
				"vout": 3,
				"scriptSig": { "asm": "", "hex": "160014ab" },
				"sequence": 4294967293_u32
			}
		],
		"vout": [
			{ "value": 0.5, "n": 0, "scriptPubKey": { "hex": "a914", "type": "scripthash" } },
			{ "value": "0.00001000", "n": 1, "scriptPubKey": { "hex": "0014", "type": "witness_v0_keyhash" } }
		]
	}))
	.unwrap();
	let prev = PrevTx::from_raw("bb", &raw).unwrap();

	assert_eq!(prev.version, 1);
	assert_eq!(prev.lock_time, 0);
	assert_eq!(
		prev.inputs[0],
		PrevInput {
			prev_hash: "00".repeat(32),
			prev_index: u32::MAX,
			script_sig: "03a0bb0d".into(),
			sequence: u32::MAX,
		}
	);
	assert_eq!(
		prev.inputs[1],
		PrevInput {
			prev_hash: "aa".into(),
			prev_index: 3,
			script_sig: "160014ab".into(),
			sequence: SEQUENCE,
		}
	);
	assert_eq!(
		prev.bin_outputs,
		[
			PrevOutput { amount: 50_000_000, script_pubkey: "a914".into() },
			PrevOutput { amount: 1_000, script_pubkey: "0014".into() },
		]
	);
}

#[test]
fn prev_tx_should_reject_incomplete_input() {
	for vin in [
		serde_json::json!({ "vout": 0, "sequence": 0 }),
		serde_json::json!({ "txid": "aa", "sequence": 0 }),
	] {
		let raw = serde_json::from_value::<RawTx>(serde_json::json!({
			"version": 2,
			"vin": [vin],
			"vout": []
		}))
		.unwrap();

		assert!(matches!(
			PrevTx::from_raw("bb", &raw),
			Err(Error::Chain(ChainError::MalformedTx { ref txid, .. })) if txid == "bb"
		));
	}
}
