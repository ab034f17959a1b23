// std
use std::{future::Future, time::Duration};
// crates.io
use bytes::Bytes;
use reqwest::{header::CONTENT_TYPE, Client as RClient, ClientBuilder};
use serde::de::DeserializeOwned;
// self
use crate::prelude::*;

/// Minimal HTTP surface used by the remote APIs.
///
/// Any non-2xx status is reported as an error.
pub trait Http
where
	Self: Send + Sync,
{
	fn get(&self, uri: &str) -> impl Future<Output = Result<Bytes>> + Send;

	fn post(&self, uri: &str, body: Vec<u8>) -> impl Future<Output = Result<Bytes>> + Send;
}

pub trait Response
where
	Self: AsRef<[u8]>,
{
	fn json<D>(&self) -> Result<D>
	where
		D: DeserializeOwned,
	{
		let s = self.as_ref();

		match serde_json::from_slice(s) {
			Ok(d) => Ok(d),
			Err(e) => {
				tracing::error!("{}", String::from_utf8_lossy(s));

				Err(e)?
			},
		}
	}

	fn text(&self) -> String {
		String::from_utf8_lossy(self.as_ref()).into()
	}
}
impl Response for Bytes {}

#[derive(Debug)]
pub struct Client(pub RClient);
impl Client {
	pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
		let mut builder = ClientBuilder::new().user_agent(user_agent);

		if let Some(t) = timeout {
			builder = builder.timeout(t);
		}

		Ok(Self(builder.build()?))
	}
}
impl Http for Client {
	async fn get(&self, uri: &str) -> Result<Bytes> {
		Ok(self.0.get(uri).send().await?.error_for_status()?.bytes().await?)
	}

	async fn post(&self, uri: &str, body: Vec<u8>) -> Result<Bytes> {
		Ok(self
			.0
			.post(uri)
			.header(CONTENT_TYPE, "application/json")
			.body(body)
			.send()
			.await?
			.error_for_status()?
			.bytes()
			.await?)
	}
}

#[test]
fn response_should_work() {
	#[derive(Debug, PartialEq, serde::Deserialize)]
	struct Page {
		start: u64,
		count: u64,
	}

	let b = Bytes::from_static(br#"{"start":10,"count":2}"#);

	assert_eq!(b.json::<Page>().unwrap(), Page { start: 10, count: 2 });
	assert_eq!(b.text(), r#"{"start":10,"count":2}"#);
	assert!(Bytes::from_static(b"<html>rate limited</html>").json::<Page>().is_err());
}
