//! Rust bindings for the Trezor Blockbook transaction lookup.

// crates.io
use serde_json::Value;
// self
use super::super::util;
use crate::{http::*, pipeline::TxSource, prelude::*};

#[derive(Debug)]
pub struct Api<H>
where
	H: Http,
{
	pub http: H,
	// Workers are spread over these backends, round robin.
	pub base_uris: Vec<String>,
}
impl<H> Api<H>
where
	H: Http,
{
	fn base_uri(&self, worker: usize) -> &str {
		self.base_uris.get(worker % self.base_uris.len().max(1)).map_or("", |u| u.trim_end_matches('/'))
	}
}
impl<H> TxSource for Api<H>
where
	H: 'static + Http,
{
	// Get the transaction as reported by the backend node, with amounts in BTC.
	async fn get_tx(&self, worker: usize, txid: &str) -> Result<Value> {
		let txid = util::normalize_txid(txid)?;

		self.http.get(&format!("{}/tx-specific/{txid}", self.base_uri(worker))).await?.json()
	}
}

#[cfg(test)]
mod test {
	// std
	use std::sync::Mutex;
	// crates.io
	use bytes::Bytes;
	// self
	use super::*;

	#[derive(Debug, Default)]
	struct Recorder(Mutex<Vec<String>>);
	impl Http for Recorder {
		async fn get(&self, uri: &str) -> Result<Bytes> {
			self.0.lock().unwrap().push(uri.into());

			Ok(Bytes::from_static(br#"{"txid":"aa","version":2,"vin":[],"vout":[]}"#))
		}

		async fn post(&self, _: &str, _: Vec<u8>) -> Result<Bytes> {
			unreachable!()
		}
	}

	#[tokio::test]
	async fn get_tx_should_spread_workers() {
		let api = Api {
			http: Recorder::default(),
			base_uris: vec!["https://btc1.trezor.io/api/".into(), "https://btc2.trezor.io/api".into()],
		};

		let txid = "aa".repeat(32);

		for worker in 1..=3 {
			let tx = api.get_tx(worker, &txid).await.unwrap();

			assert_eq!(tx["version"], 2);
		}

		assert_eq!(
			*api.http.0.lock().unwrap(),
			[
				format!("https://btc2.trezor.io/api/tx-specific/{txid}"),
				format!("https://btc1.trezor.io/api/tx-specific/{txid}"),
				format!("https://btc2.trezor.io/api/tx-specific/{txid}"),
			]
		);
	}

	#[tokio::test]
	async fn get_tx_should_normalize_txid() {
		let api = Api { http: Recorder::default(), base_uris: vec!["https://btc1.trezor.io/api".into()] };

		api.get_tx(0, &"AB".repeat(32)).await.unwrap();

		assert_eq!(
			*api.http.0.lock().unwrap(),
			[format!("https://btc1.trezor.io/api/tx-specific/{}", "ab".repeat(32))]
		);
		assert!(api.get_tx(0, "not-a-txid").await.is_err());
		assert_eq!(api.http.0.lock().unwrap().len(), 1);
	}
}
