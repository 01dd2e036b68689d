use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{
	AggregateFunction,
	AggregateValue,
	Aggregator,
	Condition,
	DeleteParams,
	FetchParams,
	FetchResponse,
	GetResponse,
	MutationResponse,
	Record,
	RecordGateway,
	RecordResult,
	RecordsParams,
};
use crate::error::{Error, Result};

/// A record gateway that keeps all tables in memory.
///
/// Useful for running the entity services without a backend.
/// Tables can be made to fail on every call to exercise error paths.
#[derive(Default)]
pub struct MemoryGateway {
	state: Mutex<State>,
}

#[derive(Default)]
struct State {
	tables: BTreeMap<String, BTreeMap<u64, Record>>,
	failing: BTreeMap<String, String>,
	last_id: u64,
}

impl State {
	fn check(&self, table: &str) -> Result<()> {
		match self.failing.get(table) {
			Some(message) => Err(Error::gateway(message.clone())),
			None => Ok(()),
		}
	}

	fn insert(&mut self, table: &str, mut record: Record) -> Record {
		self.last_id += 1;
		record.insert("Id".into(), Value::from(self.last_id));
		self.tables.entry(table.into()).or_default().insert(self.last_id, record.clone());
		record
	}
}

impl MemoryGateway {
	pub fn new() -> Self {
		Self::default()
	}

	/// Store a record directly, returning the assigned ID.
	pub fn insert(&self, table: &str, record: Value) -> u64 {
		let record = match record {
			Value::Object(x) => x,
			_ => Record::new(),
		};
		let stored = self.lock().insert(table, record);
		stored["Id"].as_u64().unwrap_or_default()
	}

	/// Get a copy of a stored record.
	pub fn get(&self, table: &str, id: u64) -> Option<Record> {
		self.lock().tables.get(table)?.get(&id).cloned()
	}

	/// Make every call against `table` fail with `message`.
	pub fn fail_table(&self, table: &str, message: &str) {
		self.lock().failing.insert(table.into(), message.into());
	}

	fn lock(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(|e| e.into_inner())
	}
}

fn project(record: &Record, params: &FetchParams) -> Record {
	if params.fields.is_empty() {
		return record.clone();
	}
	record
		.iter()
		.filter(|(name, _)| *name == "Id" || params.fields.iter().any(|x| &x.field.name == *name))
		.map(|(name, value)| (name.clone(), value.clone()))
		.collect()
}

fn matches_all(record: &Record, conditions: &[Condition]) -> bool {
	conditions.iter().all(|x| x.matches(record))
}

fn aggregate<'a>(records: impl Iterator<Item = &'a Record> + Clone, aggregator: &Aggregator) -> AggregateValue {
	let records = records.filter(|x| matches_all(x, &aggregator.conditions));
	let value = aggregator.fields.first().map(|field| {
		let name = &field.field.name;
		match field.function {
			AggregateFunction::Count => records.filter(|x| x.contains_key(name)).count() as f64,
			AggregateFunction::Sum => records.filter_map(|x| x.get(name)?.as_f64()).sum(),
		}
	});
	AggregateValue {
		id: aggregator.id.clone(),
		value,
	}
}

fn failure(message: String) -> RecordResult {
	RecordResult {
		success: false,
		data: None,
		message: Some(message),
	}
}

#[async_trait::async_trait]
impl RecordGateway for MemoryGateway {
	async fn fetch_records(&self, table: &str, params: &FetchParams) -> Result<FetchResponse> {
		let state = self.lock();
		state.check(table)?;

		let empty = BTreeMap::new();
		let records = state.tables.get(table).unwrap_or(&empty);
		let selected = records.values().filter(|x| matches_all(x, &params.conditions));

		Ok(FetchResponse {
			success: true,
			message: None,
			data: selected.clone().map(|x| project(x, params)).collect(),
			aggregators: params.aggregators.iter().map(|x| aggregate(selected.clone(), x)).collect(),
		})
	}

	async fn get_record_by_id(&self, table: &str, id: u64, params: &FetchParams) -> Result<GetResponse> {
		let state = self.lock();
		state.check(table)?;

		match state.tables.get(table).and_then(|x| x.get(&id)) {
			Some(record) => Ok(GetResponse {
				success: true,
				message: None,
				data: Some(project(record, params)),
			}),
			None => Ok(GetResponse {
				success: false,
				message: Some(format!("Record with Id {} does not exist", id)),
				data: None,
			}),
		}
	}

	async fn create_record(&self, table: &str, params: &RecordsParams) -> Result<MutationResponse> {
		let mut state = self.lock();
		state.check(table)?;

		let results = params.records.iter()
			.map(|record| RecordResult {
				success: true,
				data: Some(state.insert(table, record.clone())),
				message: None,
			})
			.collect();

		Ok(MutationResponse {
			success: true,
			message: None,
			results: Some(results),
		})
	}

	async fn update_record(&self, table: &str, params: &RecordsParams) -> Result<MutationResponse> {
		let mut state = self.lock();
		state.check(table)?;

		let rows = state.tables.entry(table.into()).or_default();
		let results = params.records.iter()
			.map(|record| {
				let id = match record.get("Id").and_then(Value::as_u64) {
					Some(x) => x,
					None => return failure("Record is missing an Id".into()),
				};
				match rows.get_mut(&id) {
					Some(stored) => {
						stored.extend(record.iter().map(|(name, value)| (name.clone(), value.clone())));
						RecordResult {
							success: true,
							data: Some(stored.clone()),
							message: None,
						}
					},
					None => failure(format!("Record with Id {} does not exist", id)),
				}
			})
			.collect();

		Ok(MutationResponse {
			success: true,
			message: None,
			results: Some(results),
		})
	}

	async fn delete_record(&self, table: &str, params: &DeleteParams) -> Result<MutationResponse> {
		let mut state = self.lock();
		state.check(table)?;

		let rows = state.tables.entry(table.into()).or_default();
		let results = params.record_ids.iter()
			.map(|id| match rows.remove(id) {
				Some(_) => RecordResult {
					success: true,
					data: None,
					message: None,
				},
				None => failure(format!("Record with Id {} does not exist", id)),
			})
			.collect();

		Ok(MutationResponse {
			success: true,
			message: None,
			results: Some(results),
		})
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::gateway::{fields, Operator};
	use serde_json::json;

	#[tokio::test]
	async fn aggregates_respect_conditions() {
		let gateway = MemoryGateway::new();
		gateway.insert("app_invoice", json!({ "amount": 100.0, "status": "paid" }));
		gateway.insert("app_invoice", json!({ "amount": 250.5, "status": "paid" }));
		gateway.insert("app_invoice", json!({ "amount": 999.0, "status": "draft" }));

		let params = FetchParams::aggregate(
			Aggregator::new("revenue", "amount", AggregateFunction::Sum)
				.filter(Condition::new("status", Operator::EqualTo, &["paid"])),
		);
		let response = gateway.fetch_records("app_invoice", &params).await.unwrap();
		assert_eq!(response.aggregate("revenue"), 350.5);

		let params = FetchParams::aggregate(Aggregator::new("count", "Id", AggregateFunction::Count));
		let response = gateway.fetch_records("app_invoice", &params).await.unwrap();
		assert_eq!(response.aggregate("count"), 3.0);
	}

	#[tokio::test]
	async fn fetch_projects_requested_fields() {
		let gateway = MemoryGateway::new();
		gateway.insert("client", json!({ "Name": "Acme", "secret": "x" }));

		let response = gateway.fetch_records("client", &FetchParams::fields(fields(&["Name"]))).await.unwrap();
		assert_eq!(response.data[0], *json!({ "Id": 1, "Name": "Acme" }).as_object().unwrap());
	}

	#[tokio::test]
	async fn update_of_missing_record_fails_per_record() {
		let gateway = MemoryGateway::new();
		let mut record = Record::new();
		record.insert("Id".into(), json!(12));
		let response = gateway.update_record("task", &RecordsParams::single(record)).await.unwrap();
		assert!(response.success);
		let results = response.results.unwrap();
		assert!(!results[0].success);
	}

	#[tokio::test]
	async fn failing_table_rejects_calls() {
		let gateway = MemoryGateway::new();
		gateway.fail_table("task", "connection reset");
		let result = gateway.fetch_records("task", &FetchParams::default()).await;
		assert!(matches!(result, Err(Error::Gateway(ref x)) if x == "connection reset"));
		assert!(gateway.fetch_records("client", &FetchParams::default()).await.is_ok());
	}
}
