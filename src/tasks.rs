use serde::{Deserialize, Deserializer, Serialize};

use crate::api_client::ApiClient;
use crate::error::{Error, Result};
use crate::gateway::{fields, FieldSpec, Record, RecordGateway};
use crate::mapping::{from_record, non_empty, to_record, Entity, Reference};
use crate::time_tracking::{ActiveTimer, TimeLog, TimeTracking};
use crate::types::{NewTask, Task, TaskPatch};

pub const DEFAULT_STATUS: &str = "todo";
pub const DEFAULT_PRIORITY: &str = "medium";

#[derive(Deserialize)]
struct TaskRecord {
	#[serde(rename = "Id")]
	id: u64,
	#[serde(rename = "Name", default)]
	name: Option<String>,
	#[serde(default)]
	title: Option<String>,
	#[serde(default)]
	priority: Option<String>,
	#[serde(default)]
	status: Option<String>,
	#[serde(default)]
	due_date: Option<String>,
	#[serde(default)]
	project_id: Option<Reference>,
	#[serde(default, deserialize_with = "embedded_time_tracking")]
	time_tracking: TimeTracking,
}

#[derive(Serialize)]
struct TaskFields<'a> {
	#[serde(rename = "Name", skip_serializing_if = "Option::is_none")]
	name: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	title: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	priority: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	status: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	due_date: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	time_tracking: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	project_id: Option<u64>,
}

/// Decode the time tracking field.
///
/// The backend stores it as a JSON encoded string, but an already decoded object is accepted too.
/// A missing, null or empty field, or an encoded `null`, means no time has been tracked yet.
fn embedded_time_tracking<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<TimeTracking, D::Error> {
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Embedded {
		Encoded(String),
		Decoded(TimeTracking),
	}

	match Option::<Embedded>::deserialize(deserializer)? {
		None => Ok(TimeTracking::default()),
		Some(Embedded::Encoded(data)) if matches!(data.trim(), "" | "null") => Ok(TimeTracking::default()),
		Some(Embedded::Encoded(data)) => serde_json::from_str(&data).map_err(serde::de::Error::custom),
		Some(Embedded::Decoded(tracking)) => Ok(tracking),
	}
}

/// Encode time tracking data for storage in the task record.
pub fn encode_time_tracking(tracking: &TimeTracking) -> Result<String> {
	serde_json::to_string(tracking).map_err(|e| Error::Encode { entity: Task::NAME, source: e })
}

impl Entity for Task {
	const TABLE: &'static str = "task";
	const NAME: &'static str = "task";

	fn fields() -> Vec<FieldSpec> {
		fields(&["Name", "title", "priority", "status", "due_date", "time_tracking", "project_id"])
	}

	fn decode(record: Record) -> Result<Self> {
		let record: TaskRecord = from_record(record, Self::NAME)?;
		Ok(Self {
			id: record.id,
			title: non_empty(record.title, record.name).unwrap_or_default(),
			priority: record.priority,
			status: record.status.unwrap_or_default(),
			due_date: record.due_date,
			project_id: record.project_id.as_ref().map(Reference::id),
			time_tracking: record.time_tracking,
		})
	}
}

impl NewTask {
	/// Encode the task for creation with empty time tracking data.
	pub fn encode(&self) -> Result<Record> {
		to_record(&TaskFields {
			name: Some(&self.title),
			title: Some(&self.title),
			priority: Some(self.priority.as_deref().unwrap_or(DEFAULT_PRIORITY)),
			status: Some(self.status.as_deref().unwrap_or(DEFAULT_STATUS)),
			due_date: self.due_date.as_deref(),
			time_tracking: Some(encode_time_tracking(&TimeTracking::default())?),
			project_id: self.project_id,
		}, Task::NAME)
	}
}

impl TaskPatch {
	pub fn encode(&self) -> Result<Record> {
		to_record(&TaskFields {
			name: self.title.as_deref(),
			title: self.title.as_deref(),
			priority: self.priority.as_deref(),
			status: self.status.as_deref(),
			due_date: self.due_date.as_deref(),
			time_tracking: self.time_tracking.as_ref().map(encode_time_tracking).transpose()?,
			project_id: self.project_id,
		}, Task::NAME)
	}
}

impl<G: RecordGateway> ApiClient<G> {
	pub async fn get_tasks(&self) -> Result<Vec<Task>> {
		self.list().await
	}

	pub async fn get_task(&self, id: u64) -> Result<Task> {
		self.get(id).await
	}

	pub async fn create_task(&self, task: &NewTask) -> Result<Task> {
		self.create(task.encode()?).await
	}

	pub async fn update_task(&self, id: u64, patch: &TaskPatch) -> Result<Task> {
		self.update(id, patch.encode()?).await
	}

	pub async fn update_task_status(&self, id: u64, status: &str) -> Result<Task> {
		self.update_task(id, &TaskPatch {
			status: Some(status.into()),
			..TaskPatch::default()
		}).await
	}

	pub async fn delete_task(&self, id: u64) -> Result<bool> {
		self.delete::<Task>(id).await
	}

	/// Start the timer of a task.
	///
	/// This reads the task and writes back the complete time tracking data.
	/// The two steps are not atomic: concurrent timer operations on the same task can overwrite each other.
	pub async fn start_task_timer(&self, id: u64) -> Result<ActiveTimer> {
		let result: Result<ActiveTimer> = async {
			let task = self.get_task(id).await?;
			let mut tracking = task.time_tracking;
			let timer = tracking.start(task.id, self.now())?;
			self.save_time_tracking(id, tracking).await?;
			Ok(timer)
		}.await;
		result.inspect_err(|e| log::error!("Error starting timer of task {}: {}", id, e))
	}

	/// Stop the timer of a task and append the interval to its time logs.
	///
	/// Subject to the same race as [`Self::start_task_timer`].
	pub async fn stop_task_timer(&self, id: u64) -> Result<TimeLog> {
		let result: Result<TimeLog> = async {
			let task = self.get_task(id).await?;
			let mut tracking = task.time_tracking;
			let log = tracking.stop(self.now())?;
			self.save_time_tracking(id, tracking).await?;
			Ok(log)
		}.await;
		result.inspect_err(|e| log::error!("Error stopping timer of task {}: {}", id, e))
	}

	pub async fn get_task_time_logs(&self, id: u64) -> Result<Vec<TimeLog>> {
		let task = self.get_task(id).await
			.inspect_err(|e| log::error!("Error getting time logs of task {}: {}", id, e))?;
		Ok(task.time_tracking.time_logs)
	}

	async fn save_time_tracking(&self, id: u64, tracking: TimeTracking) -> Result<Task> {
		self.update_task(id, &TaskPatch {
			time_tracking: Some(tracking),
			..TaskPatch::default()
		}).await
	}
}
