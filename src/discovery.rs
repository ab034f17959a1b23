//! Paginated UTXO discovery with adaptive page size.

// std
use std::future::Future;
// crates.io
use tokio_util::sync::CancellationToken;
// self
use crate::{
	chain::btc::{
		api::bitgo::UnspentPage,
		types::{Satoshi, Utxo},
	},
	prelude::*,
};

pub const MAX_PAGE_SIZE: u32 = 5_000;

/// Remote listing of the unspent outputs of an address.
pub trait UnspentSource {
	fn get_unspents(
		&self,
		address: &str,
		limit: u32,
		skip: u64,
	) -> impl Future<Output = Result<UnspentPage>> + Send;
}

/// Collects up to `fetch_limit` UTXOs of `address`.
///
/// A failed page is requested again with half the page size, until a page size of one fails too.
/// Cancelling `shutdown` abandons the pending request.
#[derive(Debug)]
pub struct Discovery<'a, S> {
	pub source: &'a S,
	pub address: &'a str,
	pub fetch_limit: usize,
	pub page_size: u32,
	pub shutdown: &'a CancellationToken,
}
impl<S> Discovery<'_, S>
where
	S: UnspentSource,
{
	pub async fn run(self) -> Result<Vec<Utxo>> {
		let Self { source, address, fetch_limit, page_size, shutdown } = self;
		let mut utxos = Vec::new();
		let mut amount: Satoshi = 0;
		let mut skip = 0;
		let mut limit = page_size.clamp(1, MAX_PAGE_SIZE).min(fetch_limit.try_into().unwrap_or(u32::MAX));

		if fetch_limit == 0 {
			return Ok(utxos);
		}

		loop {
			let r = tokio::select! {
				_ = shutdown.cancelled() => {
					tracing::warn!("interrupted while listing unspents at skip {skip}");

					return Err(ServiceError::Interrupted.into());
				},
				r = source.get_unspents(address, limit, skip) => r,
			};
			let r = r.and_then(|p| {
				let next = p
					.start
					.checked_add(p.count)
					.ok_or(ApiError::InvalidPage { start: p.start, count: p.count })?;

				Ok((p, next))
			});
			let (page, next) = match r {
				Ok(p) => p,
				Err(e) if limit > 1 => {
					tracing::warn!(
						"failed to list unspents at skip {skip} with limit {limit}: {e}, \
						retrying with limit {}",
						limit / 2
					);

					limit /= 2;

					continue;
				},
				Err(e) => Err(ApiError::PageSizeExhausted { skip, reason: e.to_string() })?,
			};
			let count = utxos.len();

			skip = next;

			for u in page.unspents {
				amount = amount.saturating_add(u.value);
				utxos.push(Utxo::from(u));
			}

			let done = utxos.len() >= fetch_limit || page.count < limit as u64;

			if done || utxos.len() > count {
				tracing::info!("fetched {} UTXOs with total {amount} sats", utxos.len());
			}
			if done {
				break;
			}
		}

		utxos.truncate(fetch_limit);

		Ok(utxos)
	}
}
