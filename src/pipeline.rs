//! Parallel retrieval of the parent transaction of every UTXO.
//!
//! A fixed pool of workers pops UTXOs from a shared [`WorkQueue`], fetches their parent
//! transactions and requeues whatever failed. The pipeline completes once the queue drains, that
//! is when every UTXO has been fetched exactly once.

mod backoff;
pub use backoff::Backoff;

mod progress;
use progress::Progress;

mod queue;
use queue::WorkQueue;

mod worker;
pub use worker::{ErrorRecord, TxSource};
use worker::{FetchRequest, Shared, Worker};

// std
use std::{sync::Arc, time::Duration};
// crates.io
use tokio_util::sync::CancellationToken;
// self
use crate::{
	chain::btc::types::{Utxo, UtxoTx},
	prelude::*,
};

#[derive(Clone, Debug)]
pub struct PipelineConf {
	pub workers: usize,
	pub backoff: Backoff,
	/// Give up on an item after this many failed attempts. Unbounded if `None`.
	pub max_attempts: Option<u32>,
	pub progress_interval: Duration,
}
impl Default for PipelineConf {
	fn default() -> Self {
		Self {
			workers: 5,
			backoff: Backoff::default(),
			max_attempts: None,
			progress_interval: Duration::from_millis(100),
		}
	}
}

#[derive(Debug)]
pub struct Fetched {
	/// One entry per requested UTXO, in completion order.
	pub results: Vec<UtxoTx>,
	pub errors: Vec<ErrorRecord>,
}

#[derive(Debug)]
pub struct Pipeline<S> {
	pub source: Arc<S>,
	pub conf: PipelineConf,
}
impl<S> Pipeline<S>
where
	S: TxSource,
{
	/// Fetch the parent transaction of every UTXO in `utxos`.
	///
	/// Cancelling `shutdown` aborts the run and discards the partial results.
	pub async fn run(&self, utxos: Vec<Utxo>, shutdown: &CancellationToken) -> Result<Fetched> {
		let total = utxos.len();

		if total == 0 {
			return Ok(Fetched { results: Vec::new(), errors: Vec::new() });
		}

		let workers = self.conf.workers.max(1);

		tracing::info!("fetching {total} transactions with {workers} workers");

		let mut queue = WorkQueue::new();

		queue.extend(utxos.into_iter().map(FetchRequest::from));

		let queue = Arc::new(queue);
		let shared = Arc::new(Shared::default());
		let bar = progress::progress_bar(total)?;
		let token = shutdown.child_token();
		// Stop the workers even if this future is dropped halfway.
		let _stop = token.clone().drop_guard();
		let handles = (1..=workers)
			.map(|id| {
				let worker = Worker {
					id,
					source: self.source.clone(),
					queue: queue.clone(),
					shared: shared.clone(),
					backoff: self.conf.backoff,
					max_attempts: self.conf.max_attempts,
					token: token.clone(),
				};
				let token = token.clone();

				tokio::spawn(async move {
					let r = worker.run().await;

					if let Err(e) = &r {
						tracing::error!("worker {id} exited with error: {e}");

						token.cancel();
					}

					r
				})
			})
			.collect::<Vec<_>>();
		let reporter = tokio::spawn(progress::report(
			Progress::new(total),
			bar,
			shared.clone(),
			queue.clone(),
			self.conf.progress_interval,
			token.clone(),
		));

		tokio::select! {
			_ = queue.wait_drained() => {},
			_ = token.cancelled() => {},
		}

		if queue.drained() {
			// Let the reporter emit the final status before it gets cancelled.
			reporter.await?;
		}

		token.cancel();
		queue.close();

		let mut failure = None;

		for h in handles {
			if let Err(e) = h.await? {
				failure.get_or_insert(e);
			}
		}

		if let Some(e) = failure {
			return Err(e);
		}
		if shutdown.is_cancelled() || !queue.drained() {
			tracing::warn!("interrupted, discarding the partial results");

			Err(ServiceError::Interrupted)?;
		}

		let (results, errors) = shared.take();

		tracing::info!("fetched {} transactions (error retries: {})", results.len(), errors.len());

		if let Some(e) = errors.last() {
			tracing::debug!("last error, worker {} on {}: {}", e.worker, e.txid, e.reason);
		}

		Ok(Fetched { results, errors })
	}
}
