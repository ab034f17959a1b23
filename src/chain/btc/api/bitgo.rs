//! Rust bindings for the BitGo v1 address unspents listing.

// crates.io
use serde::{de::Error as _, Deserialize, Deserializer};
use serde_json::Value;
// self
use super::super::types::*;
use crate::{discovery::UnspentSource, http::*, prelude::*};

#[derive(Debug)]
pub struct Api<H>
where
	H: Http,
{
	pub http: H,
	pub base_uri: String,
}
impl<H> UnspentSource for Api<H>
where
	H: Http,
{
	// List at most `limit` unspents of the address starting from the `skip`th one.
	async fn get_unspents(&self, address: &str, limit: u32, skip: u64) -> Result<UnspentPage> {
		let page = self
			.http
			.get(&format!(
				"{}/address/{address}/unspents?limit={limit}&skip={skip}",
				self.base_uri.trim_end_matches('/')
			))
			.await?
			.json::<UnspentPage>()?;

		tracing::debug!("get_unspents start={} count={}", page.start, page.count);

		Ok(page)
	}
}

#[derive(Debug, Deserialize)]
pub struct UnspentPage {
	pub start: u64,
	pub count: u64,
	pub unspents: Vec<Unspent>,
}

#[derive(Debug, Deserialize)]
pub struct Unspent {
	pub address: String,
	pub tx_hash: String,
	pub confirmations: u64,
	pub tx_output_n: Index,
	#[serde(rename = "blockHeight", default, deserialize_with = "block_height")]
	pub block_height: Option<u64>,
	pub value: Satoshi,
	pub script: String,
}
impl From<Unspent> for Utxo {
	fn from(u: Unspent) -> Self {
		Self {
			address: u.address,
			txid: u.tx_hash,
			confirmations: u.confirmations,
			output_n: u.tx_output_n,
			block_height: u.block_height,
			value: u.value,
			script: u.script,
		}
	}
}

// Unconfirmed unspents report a null, zero or empty height.
fn block_height<'de, D>(d: D) -> std::result::Result<Option<u64>, D::Error>
where
	D: Deserializer<'de>,
{
	let h = match Value::deserialize(d)? {
		Value::Null => None,
		Value::Number(n) => n.as_u64(),
		Value::String(s) if s.is_empty() => None,
		Value::String(s) => Some(s.parse().map_err(D::Error::custom)?),
		v => Err(D::Error::custom(format!("invalid block height {v}")))?,
	};

	Ok(h.filter(|h| *h != 0))
}

#[test]
fn unspent_page_should_work() {
	let page = serde_json::from_str::<UnspentPage>(
		r#"{
			"start": 5000,
			"count": 3,
			"total": 5003,
			"unspents": [
				{ "address": "3A", "tx_hash": "aa", "confirmations": 10, "tx_output_n": 1, "blockHeight": 800000, "value": 1000, "script": "a9" },
				{ "address": "3A", "tx_hash": "bb", "confirmations": 0, "tx_output_n": 0, "blockHeight": null, "value": 2000, "script": "a9" },
				{ "address": "3A", "tx_hash": "cc", "confirmations": 2, "tx_output_n": 7, "blockHeight": "799999", "value": 3000, "script": "a9" }
			]
		}"#,
	)
	.unwrap();

	assert_eq!((page.start, page.count), (5000, 3));

	let utxos = page.unspents.into_iter().map(Utxo::from).collect::<Vec<_>>();

	assert_eq!(utxos[0].block_height, Some(800_000));
	assert_eq!(utxos[1].block_height, None);
	assert_eq!(utxos[2].block_height, Some(799_999));
	assert_eq!(utxos[2].output_n, 7);
	assert_eq!(utxos[2].txid, "cc");
}
