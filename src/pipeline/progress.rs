// std
use std::{sync::Arc, time::Duration};
// crates.io
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
// self
use super::{
	queue::WorkQueue,
	worker::{FetchRequest, Shared},
};
use crate::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Status {
	pub total: usize,
	pub fetched: usize,
	pub errors: usize,
	pub drained: bool,
}

/// Remembers the last reported counts so that only changes are reported.
#[derive(Debug)]
pub struct Progress {
	total: usize,
	fetched: usize,
	errors: usize,
}
impl Progress {
	pub fn new(total: usize) -> Self {
		Self { total, fetched: 0, errors: 0 }
	}

	pub fn observe(&mut self, fetched: usize, errors: usize, drained: bool) -> Option<Status> {
		if !drained && fetched <= self.fetched && errors <= self.errors {
			return None;
		}

		self.fetched = fetched;
		self.errors = errors;

		Some(Status { total: self.total, fetched, errors, drained })
	}
}
#[test]
fn observe_should_only_report_changes() {
	let mut p = Progress::new(3);

	assert_eq!(p.observe(0, 0, false), None);
	assert_eq!(
		p.observe(1, 0, false),
		Some(Status { total: 3, fetched: 1, errors: 0, drained: false })
	);
	assert_eq!(p.observe(1, 0, false), None);
	assert_eq!(
		p.observe(1, 2, false),
		Some(Status { total: 3, fetched: 1, errors: 2, drained: false })
	);
	assert_eq!(p.observe(1, 2, false), None);
	assert_eq!(
		p.observe(3, 2, true),
		Some(Status { total: 3, fetched: 3, errors: 2, drained: true })
	);
}

/// Live counter on stderr, hidden when stderr is not a terminal.
pub fn progress_bar(total: usize) -> Result<ProgressBar> {
	let bar = ProgressBar::with_draw_target(Some(total as _), ProgressDrawTarget::stderr_with_hz(12));
	let style = ProgressStyle::with_template(
		"{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} transactions {msg}",
	)?
	.progress_chars("=>-");

	bar.set_style(style);

	Ok(bar)
}

/// Drive `bar` with the pipeline progress until the queue drains or `token` is cancelled.
///
/// Returns the final status if the queue drained.
pub async fn report(
	mut progress: Progress,
	bar: ProgressBar,
	shared: Arc<Shared>,
	queue: Arc<WorkQueue<FetchRequest>>,
	interval: Duration,
	token: CancellationToken,
) -> Option<Status> {
	let mut ticker = time::interval(interval);

	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		tokio::select! {
			_ = token.cancelled() => {
				bar.abandon_with_message("interrupted");

				return None;
			},
			_ = queue.wait_drained() => {},
			_ = ticker.tick() => {},
		}

		let drained = queue.drained();
		let (fetched, errors) = shared.counts();

		if let Some(s) = progress.observe(fetched, errors, drained) {
			let pending = queue.len();

			bar.set_position(s.fetched as _);
			bar.set_message(format!("(error retries: {}, pending: {pending})", s.errors));

			if s.drained {
				bar.finish();
				tracing::info!(
					"fetched {}/{} transactions (error retries: {})",
					s.fetched,
					s.total,
					s.errors
				);

				return Some(s);
			}

			tracing::debug!(
				"fetched {}/{} transactions (error retries: {}, pending: {pending})",
				s.fetched,
				s.total,
				s.errors
			);
		}
	}
}

#[cfg(test)]
mod test {
	// crates.io
	use serde_json::Value;
	// self
	use super::*;
	use crate::{
		chain::btc::types::{Utxo, UtxoTx},
		pipeline::ErrorRecord,
	};

	fn setup(n: usize) -> (Arc<Shared>, Arc<WorkQueue<FetchRequest>>) {
		let mut queue = WorkQueue::new();

		queue.extend((0..n).map(|i| FetchRequest::from(Utxo::new(format!("{i:064x}"), 0, 1))));

		(Arc::new(Shared::default()), Arc::new(queue))
	}

	#[tokio::test]
	async fn report_should_return_final_status_once_drained() {
		let (shared, queue) = setup(2);
		let reporter = tokio::spawn(report(
			Progress::new(2),
			ProgressBar::hidden(),
			shared.clone(),
			queue.clone(),
			Duration::from_millis(5),
			CancellationToken::new(),
		));

		for _ in 0..2 {
			let r = queue.pop().await.unwrap();

			time::sleep(Duration::from_millis(10)).await;
			shared.push_error(ErrorRecord { worker: 1, txid: r.utxo.txid.clone(), reason: "HTTP 429".into() });
			shared.push_result(UtxoTx { utxo_id: r.utxo, utxo_tx: Value::Null });
			queue.done();
		}

		let status = time::timeout(Duration::from_secs(5), reporter).await.unwrap().unwrap();

		assert_eq!(status, Some(Status { total: 2, fetched: 2, errors: 2, drained: true }));
	}

	#[tokio::test]
	async fn report_should_stop_on_cancel() {
		let (shared, queue) = setup(1);
		let token = CancellationToken::new();
		let reporter = tokio::spawn(report(
			Progress::new(1),
			ProgressBar::hidden(),
			shared,
			queue,
			Duration::from_millis(5),
			token.clone(),
		));

		time::sleep(Duration::from_millis(20)).await;
		token.cancel();

		assert_eq!(time::timeout(Duration::from_secs(5), reporter).await.unwrap().unwrap(), None);
	}
}
