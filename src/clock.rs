use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Source of the current time for timer operations.
pub trait Clock: Send + Sync {
	fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
	now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
	pub fn new(now: DateTime<Utc>) -> Self {
		Self { now: Mutex::new(now) }
	}

	pub fn set(&self, now: DateTime<Utc>) {
		*self.lock() = now;
	}

	pub fn advance(&self, by: chrono::Duration) {
		let mut now = self.lock();
		*now += by;
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
		// A poisoned clock still holds a valid timestamp.
		self.now.lock().unwrap_or_else(|e| e.into_inner())
	}
}

impl Clock for ManualClock {
	fn now(&self) -> DateTime<Utc> {
		*self.lock()
	}
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
	fn now(&self) -> DateTime<Utc> {
		(**self).now()
	}
}
