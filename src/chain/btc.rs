pub mod api;

pub mod types;
use types::*;

pub mod util;

// std
use std::collections::{btree_map::Entry, BTreeMap};
// crates.io
use bitcoin::Network;
// self
use crate::prelude::*;

/// Builds the signer request of a transaction spending every given UTXO into a single output.
#[derive(Debug)]
pub struct ConsolidationTxBuilder<'a> {
	pub coin_name: &'a str,
	pub network: Network,
	pub fee_rate: Satoshi,
	pub input_path: &'a str,
	pub recipient: &'a str,
	pub utxos: &'a [UtxoTx],
}
impl ConsolidationTxBuilder<'_> {
	// Flat size allowance per input, in virtual bytes.
	const INPUT_VBYTES: Satoshi = 100;
	const LOCK_TIME: u32 = 0;
	const VERSION: u32 = 2;

	pub fn build(self) -> Result<SignerRequest> {
		let Self { coin_name, network, fee_rate, input_path, recipient, utxos } = self;

		if utxos.is_empty() {
			Err(ChainError::NoInputs)?;
		}

		let recipient_addr = util::addr_from_str(recipient, network)?;
		let address_n = util::parse_path(input_path)?;
		let mut inputs = Vec::with_capacity(utxos.len());
		let mut prev_txes = BTreeMap::new();

		for UtxoTx { utxo_id, utxo_tx } in utxos {
			let txid = util::normalize_txid(&utxo_id.txid)?;
			let index = utxo_id.output_n;
			let raw = serde_json::from_value::<RawTx>(utxo_tx.clone())
				.map_err(|e| ChainError::MalformedTx { txid: txid.clone(), reason: e.to_string() })?;
			let script_pub_key = &raw
				.vout
				.get(index as usize)
				.ok_or_else(|| ChainError::MissingOutput { txid: txid.clone(), index })?
				.script_pub_key;
			let reported = script_pub_key.kind.as_deref().unwrap_or_default();
			let script_type = InputScriptType::from_reported(reported).ok_or_else(|| {
				ChainError::UnsupportedScriptType {
					script_type: reported.into(),
					txid: txid.clone(),
					index,
				}
			})?;

			tracing::debug!(
				"input {txid}:{index} {reported} {}",
				script_pub_key.asm.as_deref().unwrap_or_default()
			);

			inputs.push(TxInput {
				address_n: address_n.clone(),
				prev_hash: txid.clone(),
				prev_index: index,
				amount: utxo_id.value,
				script_type,
				sequence: SEQUENCE,
			});

			if let Entry::Vacant(e) = prev_txes.entry(txid) {
				let prev_tx = PrevTx::from_raw(e.key(), &raw)?;

				e.insert(prev_tx);
			}
		}

		let inputs_amount = inputs.iter().map(|i| i.amount as u128).sum::<u128>();

		tracing::info!(
			"created {} consolidation transaction inputs with total amount {inputs_amount} sats",
			inputs.len()
		);

		// A deliberately coarse estimate, not a vsize calculation.
		let fee = fee_rate as u128 * Self::INPUT_VBYTES as u128 * inputs.len() as u128;
		let amount = inputs_amount
			.checked_sub(fee)
			.filter(|a| *a > 0)
			.and_then(|a| Satoshi::try_from(a).ok())
			.ok_or(ChainError::InsufficientFunds { required: fee + 1, available: inputs_amount })?;

		tracing::info!(
			"created the consolidation transaction output with total amount {amount} sats and total \
			fee {fee} sats"
		);

		Ok(SignerRequest {
			coin_name: coin_name.into(),
			inputs,
			outputs: vec![TxOutput {
				address: recipient_addr.to_string(),
				amount,
				script_type: OutputScriptType::PayToAddress,
			}],
			details: TxDetails { version: Self::VERSION, lock_time: Self::LOCK_TIME },
			prev_txes,
		})
	}
}

#[cfg(test)]
mod test {
	// crates.io
	use serde_json::{json, Value};
	// self
	use super::*;

	const RECIPIENT: &str = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";

	fn parent_tx(kinds: &[&str]) -> Value {
		json!({
			"version": 2,
			"locktime": 801_234,
			"vin": [{
				"txid": "11".repeat(32),
				"vout": 0,
				"scriptSig": { "hex": "" },
				"sequence": 4294967293_u32
			}],
			"vout": kinds
				.iter()
				.map(|k| json!({
					"value": "0.0005",
					"scriptPubKey": { "hex": "a914", "asm": "OP_HASH160", "type": k }
				}))
				.collect::<Vec<_>>()
		})
	}

	fn utxo_tx(txid: &str, output_n: u32, value: Satoshi, kinds: &[&str]) -> UtxoTx {
		UtxoTx { utxo_id: Utxo::new(txid, output_n, value), utxo_tx: parent_tx(kinds) }
	}

	fn builder(utxos: &[UtxoTx]) -> ConsolidationTxBuilder {
		ConsolidationTxBuilder {
			coin_name: "Bitcoin",
			network: Network::Bitcoin,
			fee_rate: 10,
			input_path: "m/49'/0'/0'/0/0",
			recipient: RECIPIENT,
			utxos,
		}
	}

	#[test]
	fn build_should_work() {
		let aa = "aa".repeat(32);
		let bb = "bb".repeat(32);
		let utxos = [
			utxo_tx(&aa, 1, 60_000, &["pubkeyhash", "scripthash"]),
			utxo_tx(&bb, 0, 40_000, &["witness_v0_keyhash"]),
		];
		let req = builder(&utxos).build().unwrap();

		assert_eq!(req.coin_name, "Bitcoin");
		assert_eq!(req.details, TxDetails { version: 2, lock_time: 0 });
		assert_eq!(req.inputs.len(), 2);
		assert_eq!(req.inputs[0].prev_hash, aa);
		assert_eq!(req.inputs[0].prev_index, 1);
		assert_eq!(req.inputs[0].script_type, InputScriptType::SpendP2shWitness);
		assert_eq!(req.inputs[0].sequence, 0xFFFF_FFFD);
		assert_eq!(req.inputs[0].address_n, [0x8000_0031, 0x8000_0000, 0x8000_0000, 0, 0]);
		assert_eq!(req.inputs[1].script_type, InputScriptType::SpendWitness);
		assert_eq!(
			req.outputs,
			[TxOutput {
				address: RECIPIENT.into(),
				amount: 98_000,
				script_type: OutputScriptType::PayToAddress
			}]
		);
		assert_eq!(req.prev_txes.keys().collect::<Vec<_>>(), [&aa, &bb]);
		assert_eq!(req.prev_txes[&aa].lock_time, 801_234);
		assert_eq!(req.prev_txes[&aa].bin_outputs[1].amount, 50_000);
	}

	#[test]
	fn build_should_share_prev_tx_of_sibling_outputs() {
		let aa = "aa".repeat(32);
		let utxos = [
			utxo_tx(&aa, 0, 50_000, &["scripthash", "scripthash"]),
			utxo_tx(&aa, 1, 50_000, &["scripthash", "scripthash"]),
		];
		let req = builder(&utxos).build().unwrap();

		assert_eq!(req.inputs.len(), 2);
		assert_eq!(req.prev_txes.len(), 1);
	}

	#[test]
	fn build_should_reject_unsupported_script_type() {
		let utxos = [
			utxo_tx(&"aa".repeat(32), 0, 60_000, &["scripthash"]),
			utxo_tx(&"bb".repeat(32), 0, 40_000, &["multisig"]),
		];
		let e = builder(&utxos).build().unwrap_err();

		assert!(matches!(
			e,
			Error::Chain(ChainError::UnsupportedScriptType { ref script_type, .. })
				if script_type == "multisig"
		));
		assert!(e.to_string().contains("multisig"));
	}

	#[test]
	fn build_should_reject_missing_output() {
		let utxos = [utxo_tx(&"aa".repeat(32), 2, 60_000, &["scripthash"])];

		assert!(matches!(
			builder(&utxos).build(),
			Err(Error::Chain(ChainError::MissingOutput { index: 2, .. }))
		));
	}

	#[test]
	fn build_should_reject_fee_above_inputs() {
		let utxos = [utxo_tx(&"aa".repeat(32), 0, 1_000, &["scripthash"])];

		assert!(matches!(
			builder(&utxos).build(),
			Err(Error::Chain(ChainError::InsufficientFunds { required: 1_001, available: 1_000 }))
		));
		assert!(matches!(builder(&[]).build(), Err(Error::Chain(ChainError::NoInputs))));
	}

	#[test]
	fn build_should_reject_bad_recipient() {
		let utxos = [utxo_tx(&"aa".repeat(32), 0, 60_000, &["scripthash"])];
		let mut b = builder(&utxos);

		b.network = Network::Testnet;

		assert!(matches!(b.build(), Err(Error::Bitcoin(BitcoinError::Parse(_)))));
	}
}
