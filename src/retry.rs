use std::time::Duration;

use crate::result::Result;
use crate::traits::Clock;
use crate::types::RetryPolicy;

impl RetryPolicy {
	pub const fn attempts(max_attempts: u32) -> Self {
		RetryPolicy {
			interval: Duration::ZERO,
			timeout: None,
			max_attempts: Some(max_attempts),
		}
	}

	pub const fn every(interval: Duration, timeout: Duration) -> Self {
		RetryPolicy {
			interval,
			timeout: Some(timeout),
			max_attempts: None,
		}
	}

	/// Calls `f` until it yields a value.
	///
	/// Gives up with `Ok(None)` once `max_attempts` calls were made, or when the deadline
	/// has passed after a call. The deadline is checked against `clock` after every attempt,
	/// so the last attempt happens at (or just after) the deadline itself.
	/// Errors returned by `f` stop the polling and are propagated.
	pub fn poll<T, F>(&self, clock: &dyn Clock, mut f: F) -> Result<Option<T>>
	where
		F: FnMut(u32) -> Result<Option<T>>,
	{
		let deadline = self.timeout.map(|t| clock.now() + t);
		let mut attempt = 0u32;

		loop {
			if let Some(value) = f(attempt)? {
				return Ok(Some(value));
			}
			attempt += 1;

			if self.max_attempts.is_some_and(|max| attempt >= max) {
				return Ok(None);
			}

			if deadline.is_some_and(|d| clock.now() >= d) {
				return Ok(None);
			}

			if !self.interval.is_zero() {
				clock.sleep(self.interval);
			}
		}
	}
}
