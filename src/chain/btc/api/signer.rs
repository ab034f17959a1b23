// std
use std::future::Future;
// self
use super::super::types::SignerRequest;
use crate::{http::*, prelude::*};

/// An external device or service turning a [`SignerRequest`] into a serialized signed
/// transaction.
pub trait Signer {
	fn sign(&self, request: &SignerRequest) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Signing service reached over HTTP.
///
/// The request document is posted as JSON and the service answers with the signed transaction in
/// hex.
#[derive(Debug)]
pub struct Api<H>
where
	H: Http,
{
	pub http: H,
	pub uri: String,
}
impl<H> Signer for Api<H>
where
	H: Http,
{
	async fn sign(&self, request: &SignerRequest) -> Result<Vec<u8>> {
		let body = serde_json::to_vec(request)?;
		let tx_hex = self.http.post(&self.uri, body).await?.text();

		array_bytes::hex2bytes(tx_hex.trim()).map_err(Error::ArrayBytes)
	}
}
