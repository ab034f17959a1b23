//! Multi-producer multi-consumer work queue with in-flight accounting.
//!
//! An item popped from the queue stays in flight until it is either marked as [`WorkQueue::done`]
//! or pushed back with [`WorkQueue::requeue`]. The queue is drained once nothing is pending and
//! nothing is in flight.

// std
use std::{
	collections::VecDeque,
	sync::{Mutex, MutexGuard, PoisonError},
};
// crates.io
use tokio::sync::{watch, Notify};

#[derive(Debug)]
struct State<T> {
	items: VecDeque<T>,
	in_flight: usize,
	closed: bool,
}
impl<T> State<T> {
	fn is_drained(&self) -> bool {
		self.items.is_empty() && self.in_flight == 0
	}
}

#[derive(Debug)]
pub struct WorkQueue<T> {
	state: Mutex<State<T>>,
	available: Notify,
	drained: watch::Sender<bool>,
}
impl<T> WorkQueue<T> {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(State { items: VecDeque::new(), in_flight: 0, closed: false }),
			available: Notify::new(),
			drained: watch::channel(true).0,
		}
	}

	pub fn push(&self, item: T) {
		let mut s = self.lock();

		s.items.push_back(item);
		self.publish(&s);
		drop(s);
		self.available.notify_one();
	}

	/// Take the next item, waiting for one if the queue is empty.
	///
	/// Returns `None` once the queue is closed.
	pub async fn pop(&self) -> Option<T> {
		loop {
			let notified = self.available.notified();

			tokio::pin!(notified);
			notified.as_mut().enable();

			{
				let mut s = self.lock();

				if s.closed {
					return None;
				}
				if let Some(item) = s.items.pop_front() {
					s.in_flight += 1;

					let more = !s.items.is_empty();

					self.publish(&s);
					drop(s);

					if more {
						self.available.notify_one();
					}

					return Some(item);
				}
			}

			notified.await;
		}
	}

	/// Settle an in-flight item which completed.
	pub fn done(&self) {
		let mut s = self.lock();

		debug_assert!(s.in_flight > 0, "`done` without a matching `pop`");

		s.in_flight = s.in_flight.saturating_sub(1);
		self.publish(&s);
	}

	/// Settle an in-flight item by putting it back at the end of the queue.
	pub fn requeue(&self, item: T) {
		let mut s = self.lock();

		debug_assert!(s.in_flight > 0, "`requeue` without a matching `pop`");

		s.items.push_back(item);
		s.in_flight = s.in_flight.saturating_sub(1);
		self.publish(&s);
		drop(s);
		self.available.notify_one();
	}

	pub fn drained(&self) -> bool {
		self.lock().is_drained()
	}

	pub async fn wait_drained(&self) {
		let mut rx = self.drained.subscribe();

		// The sender lives as long as `self`.
		let _ = rx.wait_for(|d| *d).await;
	}

	/// Wake every waiting consumer and make further pops return `None`.
	pub fn close(&self) {
		self.lock().closed = true;
		self.available.notify_waiters();
	}

	pub fn len(&self) -> usize {
		self.lock().items.len()
	}

	fn lock(&self) -> MutexGuard<State<T>> {
		// Critical sections never panic halfway through a mutation.
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn publish(&self, s: &State<T>) {
		let drained = s.is_drained();

		self.drained.send_if_modified(|d| {
			let modified = *d != drained;

			*d = drained;

			modified
		});
	}
}
impl<T> Extend<T> for WorkQueue<T> {
	fn extend<I>(&mut self, iter: I)
	where
		I: IntoIterator<Item = T>,
	{
		for item in iter {
			self.push(item);
		}
	}
}

#[cfg(test)]
mod test {
	// std
	use std::{collections::HashSet, sync::Arc, time::Duration};
	// crates.io
	use tokio::time;
	// self
	use super::*;

	#[test]
	fn drained_should_track_in_flight_items() {
		let q = WorkQueue::new();

		assert!(q.drained());

		q.push(1);
		q.push(2);

		assert!(!q.drained());
		assert_eq!(q.len(), 2);

		let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
		let a = rt.block_on(q.pop()).unwrap();
		let b = rt.block_on(q.pop()).unwrap();

		assert_eq!((a, b), (1, 2));
		// Both items are in flight.
		assert!(!q.drained());

		q.requeue(a);
		q.done();

		assert!(!q.drained());
		assert_eq!(rt.block_on(q.pop()), Some(1));

		q.done();

		assert!(q.drained());
	}

	#[tokio::test]
	async fn pop_should_wait_for_push() {
		let q = Arc::new(WorkQueue::new());
		let popper = tokio::spawn({
			let q = q.clone();

			async move { q.pop().await }
		});

		time::sleep(Duration::from_millis(20)).await;

		assert!(!popper.is_finished());

		q.push("aa");

		assert_eq!(time::timeout(Duration::from_secs(5), popper).await.unwrap().unwrap(), Some("aa"));
	}

	#[tokio::test]
	async fn close_should_release_waiters() {
		let q = Arc::new(WorkQueue::<u32>::new());
		let poppers = (0..3)
			.map(|_| {
				let q = q.clone();

				tokio::spawn(async move { q.pop().await })
			})
			.collect::<Vec<_>>();

		time::sleep(Duration::from_millis(20)).await;
		q.close();

		for p in poppers {
			assert_eq!(time::timeout(Duration::from_secs(5), p).await.unwrap().unwrap(), None);
		}
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_pop_should_deliver_each_item_once() {
		let q = Arc::new(WorkQueue::new());
		let seen = Arc::new(Mutex::new(Vec::new()));
		let consumers = (0..8)
			.map(|_| {
				let q = q.clone();
				let seen = seen.clone();

				tokio::spawn(async move {
					while let Some(i) = q.pop().await {
						// Requeue every odd item once to exercise the settle paths.
						if i % 2 == 1 && i < 1_000 {
							q.requeue(i + 1_000);
						} else {
							seen.lock().unwrap().push(i);
							q.done();
						}
					}
				})
			})
			.collect::<Vec<_>>();

		for i in 0..500 {
			q.push(i);
		}

		time::timeout(Duration::from_secs(10), q.wait_drained()).await.unwrap();
		q.close();

		for c in consumers {
			c.await.unwrap();
		}

		let seen = seen.lock().unwrap();
		let unique = seen.iter().collect::<HashSet<_>>();

		assert_eq!(seen.len(), 500);
		assert_eq!(unique.len(), 500);
	}
}
