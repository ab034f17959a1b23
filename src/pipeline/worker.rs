// std
use std::{
	future::Future,
	mem,
	sync::{Arc, Mutex, PoisonError},
};
// crates.io
use serde_json::Value;
use tokio::time;
use tokio_util::sync::CancellationToken;
// self
use super::{backoff::Backoff, queue::WorkQueue};
use crate::{
	chain::btc::types::{Utxo, UtxoTx},
	prelude::*,
};

/// Remote transaction lookup used by the fetch workers.
pub trait TxSource
where
	Self: 'static + Send + Sync,
{
	/// Fetch the full transaction `txid` on behalf of the `worker`th worker.
	fn get_tx(&self, worker: usize, txid: &str) -> impl Future<Output = Result<Value>> + Send;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
	pub utxo: Utxo,
	pub attempts: u32,
}
impl From<Utxo> for FetchRequest {
	fn from(utxo: Utxo) -> Self {
		Self { utxo, attempts: 0 }
	}
}

/// A single failed attempt.
#[derive(Debug)]
pub struct ErrorRecord {
	pub worker: usize,
	pub txid: String,
	pub reason: String,
}

/// Collections every worker appends to.
#[derive(Debug, Default)]
pub struct Shared {
	results: Mutex<Vec<UtxoTx>>,
	errors: Mutex<Vec<ErrorRecord>>,
}
impl Shared {
	pub fn counts(&self) -> (usize, usize) {
		let fetched = self.results.lock().unwrap_or_else(PoisonError::into_inner).len();
		let failed = self.errors.lock().unwrap_or_else(PoisonError::into_inner).len();

		(fetched, failed)
	}

	pub fn take(&self) -> (Vec<UtxoTx>, Vec<ErrorRecord>) {
		(
			mem::take(&mut *self.results.lock().unwrap_or_else(PoisonError::into_inner)),
			mem::take(&mut *self.errors.lock().unwrap_or_else(PoisonError::into_inner)),
		)
	}

	pub(super) fn push_result(&self, result: UtxoTx) {
		self.results.lock().unwrap_or_else(PoisonError::into_inner).push(result);
	}

	pub(super) fn push_error(&self, error: ErrorRecord) {
		self.errors.lock().unwrap_or_else(PoisonError::into_inner).push(error);
	}
}

#[derive(Debug)]
pub struct Worker<S> {
	pub id: usize,
	pub source: Arc<S>,
	pub queue: Arc<WorkQueue<FetchRequest>>,
	pub shared: Arc<Shared>,
	pub backoff: Backoff,
	pub max_attempts: Option<u32>,
	pub token: CancellationToken,
}
impl<S> Worker<S>
where
	S: TxSource,
{
	/// Fetch queued transactions until cancelled.
	///
	/// A failed request goes back to the queue. The worker then sleeps according to its own
	/// consecutive-failure streak, which any success resets.
	pub async fn run(self) -> Result<()> {
		let Worker { id, source, queue, shared, backoff, max_attempts, token } = self;
		let mut failures = 0_u32;

		loop {
			let mut request = tokio::select! {
				_ = token.cancelled() => break,
				r = queue.pop() => match r {
					Some(r) => r,
					None => break,
				},
			};
			let outcome = tokio::select! {
				_ = token.cancelled() => {
					queue.requeue(request);

					break;
				},
				o = source.get_tx(id, &request.utxo.txid) => o,
			};

			match outcome {
				Ok(utxo_tx) => {
					tracing::debug!("worker {id} fetched {}", request.utxo.txid);

					shared.push_result(UtxoTx { utxo_id: request.utxo, utxo_tx });
					queue.done();

					failures = 0;
				},
				Err(e) => {
					request.attempts += 1;
					failures = failures.saturating_add(1);

					let txid = request.utxo.txid.clone();
					let attempts = request.attempts;

					tracing::debug!("worker {id} failed to fetch {txid} (attempt {attempts}): {e}");

					shared.push_error(ErrorRecord { worker: id, txid: txid.clone(), reason: e.to_string() });

					if max_attempts.is_some_and(|m| attempts >= m) {
						queue.done();

						Err(ApiError::ExceededMaxRetries { txid, retries: attempts })?;
					}

					queue.requeue(request);

					tokio::select! {
						_ = token.cancelled() => break,
						_ = time::sleep(backoff.delay(failures)) => {},
					}
				},
			}
		}

		tracing::debug!("worker {id} stopped");

		Ok(())
	}
}

#[cfg(test)]
mod test {
	// std
	use std::{collections::VecDeque, time::Duration};
	// crates.io
	use serde_json::json;
	use tokio::time::Instant;
	// self
	use super::*;

	/// Answers with a fixed sequence of outcomes and records when each call happened.
	#[derive(Debug)]
	struct Scripted {
		outcomes: Mutex<VecDeque<bool>>,
		calls: Mutex<Vec<(Instant, String)>>,
	}
	impl TxSource for Scripted {
		async fn get_tx(&self, _: usize, txid: &str) -> Result<Value> {
			self.calls.lock().unwrap().push((Instant::now(), txid.into()));

			let ok = self.outcomes.lock().unwrap().pop_front().unwrap_or(true);

			if ok {
				Ok(json!({ "txid": txid }))
			} else {
				Err(std::io::Error::other("HTTP 429"))?
			}
		}
	}

	#[tokio::test(start_paused = true)]
	async fn run_should_back_off_by_failure_streak() {
		let source = Arc::new(Scripted {
			outcomes: Mutex::new(VecDeque::from([false, false, true, false, true, true])),
			calls: Mutex::new(Vec::new()),
		});
		let mut queue = WorkQueue::new();

		queue.extend(["a", "b", "c"].map(|t| FetchRequest::from(Utxo::new(t, 0, 1))));

		let queue = Arc::new(queue);
		let shared = Arc::new(Shared::default());
		let token = CancellationToken::new();
		let worker = Worker {
			id: 1,
			source: source.clone(),
			queue: queue.clone(),
			shared: shared.clone(),
			backoff: Backoff { min: Duration::from_millis(100), max: Duration::from_secs(10) },
			max_attempts: None,
			token: token.clone(),
		};
		let start = Instant::now();
		let handle = tokio::spawn(worker.run());

		queue.wait_drained().await;
		token.cancel();
		handle.await.unwrap().unwrap();

		let calls = source.calls.lock().unwrap();
		let txids = calls.iter().map(|(_, t)| t.as_str()).collect::<Vec<_>>();
		let offsets =
			calls.iter().map(|(at, _)| at.duration_since(start).as_millis()).collect::<Vec<_>>();

		// Failed requests go to the back of the queue.
		assert_eq!(txids, ["a", "b", "c", "a", "b", "a"]);
		// Sleeps of delay(1) and delay(2) after the first two failures. The success resets the
		// streak, so the next request goes out at once and the following failure waits delay(1).
		assert_eq!(offsets, [0, 200, 600, 600, 800, 800]);
		assert_eq!(shared.counts(), (3, 3));
	}

	#[tokio::test(start_paused = true)]
	async fn run_should_give_up_at_max_attempts() {
		let source = Arc::new(Scripted {
			outcomes: Mutex::new(VecDeque::from([false, false])),
			calls: Mutex::new(Vec::new()),
		});
		let queue = Arc::new(WorkQueue::new());

		queue.push(FetchRequest::from(Utxo::new("a", 0, 1)));

		let worker = Worker {
			id: 1,
			source: source.clone(),
			queue: queue.clone(),
			shared: Arc::new(Shared::default()),
			backoff: Backoff::default(),
			max_attempts: Some(2),
			token: CancellationToken::new(),
		};
		let r = worker.run().await;

		assert!(matches!(
			r,
			Err(Error::Api(ApiError::ExceededMaxRetries { ref txid, retries: 2 })) if txid == "a"
		));
		assert!(queue.drained());
		assert_eq!(source.calls.lock().unwrap().len(), 2);
	}
}
