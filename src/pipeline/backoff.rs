// std
use std::time::Duration;

/// Exponential backoff keyed by a consecutive-failure count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backoff {
	pub min: Duration,
	pub max: Duration,
}
impl Backoff {
	/// `min(max, min * 2^consecutive_failures)`.
	pub fn delay(&self, consecutive_failures: u32) -> Duration {
		let factor = 1_u32.checked_shl(consecutive_failures).unwrap_or(u32::MAX);

		self.min.saturating_mul(factor).min(self.max)
	}
}
impl Default for Backoff {
	fn default() -> Self {
		Self { min: Duration::from_millis(500), max: Duration::from_millis(500) }
	}
}

#[test]
fn delay_should_work() {
	let b = Backoff::default();

	assert!((0..64).all(|n| b.delay(n) == Duration::from_millis(500)));

	let b = Backoff { min: Duration::from_millis(100), max: Duration::from_secs(2) };

	assert_eq!(b.delay(0), Duration::from_millis(100));
	assert_eq!(b.delay(1), Duration::from_millis(200));
	assert_eq!(b.delay(3), Duration::from_millis(800));
	assert_eq!(b.delay(5), Duration::from_secs(2));
	assert_eq!(b.delay(u32::MAX), Duration::from_secs(2));
}

#[test]
fn delay_should_be_monotonic_and_bounded() {
	for (min, max) in [(1, 1), (1, 1_000), (250, 30_000), (7, 3), (0, 10)] {
		let b = Backoff { min: Duration::from_millis(min), max: Duration::from_millis(max) };
		let delays = (0..100).map(|n| b.delay(n)).collect::<Vec<_>>();

		assert!(delays.windows(2).all(|w| w[0] <= w[1]), "{b:?}");
		assert!(delays.iter().all(|d| *d <= b.max), "{b:?}");
	}
}
