//! Time tracking state embedded in a task.

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mapping::serialize_timestamp;

/// Accumulated time, the running timer and the completed intervals of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeTracking {
	/// Total tracked time in milliseconds.
	#[serde(default)]
	pub total_time: u64,

	#[serde(default)]
	pub active_timer: Option<ActiveTimer>,

	/// Completed intervals, oldest first.
	#[serde(default)]
	pub time_logs: Vec<TimeLog>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTimer {
	#[serde(alias = "Id")]
	pub task_id: u64,
	#[serde(serialize_with = "serialize_timestamp")]
	pub start_time: DateTime<Utc>,
}

/// A completed interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLog {
	#[serde(alias = "Id")]
	pub id: u64,
	#[serde(serialize_with = "serialize_timestamp")]
	pub start_time: DateTime<Utc>,
	#[serde(serialize_with = "serialize_timestamp")]
	pub end_time: DateTime<Utc>,
	/// Length of the interval in milliseconds.
	pub duration: u64,
	/// UTC calendar date of the start time.
	pub date: NaiveDate,
}

impl TimeTracking {
	/// Start a timer for the task.
	///
	/// The start time is kept with millisecond precision.
	/// Fails if a timer is already running.
	pub fn start(&mut self, task_id: u64, now: DateTime<Utc>) -> Result<ActiveTimer> {
		if self.active_timer.is_some() {
			return Err(Error::invalid_state("Timer already running for this task"));
		}

		let timer = ActiveTimer {
			task_id,
			start_time: now.trunc_subsecs(3),
		};
		self.active_timer = Some(timer.clone());
		Ok(timer)
	}

	/// Stop the running timer and record the interval.
	///
	/// Nothing is modified if this fails.
	pub fn stop(&mut self, now: DateTime<Utc>) -> Result<TimeLog> {
		let timer = self.active_timer.as_ref()
			.ok_or_else(|| Error::invalid_state("No active timer for this task"))?;

		let start_time = timer.start_time.trunc_subsecs(3);
		let end_time = now.trunc_subsecs(3);
		let duration = (end_time - start_time).num_milliseconds();
		let duration = u64::try_from(duration)
			.map_err(|_| Error::invalid_state("Timer start time is in the future"))?;

		let log = TimeLog {
			id: self.next_log_id(end_time),
			start_time,
			end_time,
			duration,
			date: start_time.date_naive(),
		};

		self.total_time += duration;
		self.active_timer = None;
		self.time_logs.push(log.clone());
		Ok(log)
	}

	/// Sum of the durations of all completed intervals.
	pub fn logged_time(&self) -> u64 {
		self.time_logs.iter().map(|x| x.duration).sum()
	}

	fn next_log_id(&self, now: DateTime<Utc>) -> u64 {
		let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
		match self.time_logs.iter().map(|x| x.id).max() {
			Some(last) => millis.max(last.saturating_add(1)),
			None => millis,
		}
	}
}
