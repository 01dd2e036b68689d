//! The record gateway: CRUD and aggregate queries against named backend tables.
//!
//! Everything in this module speaks the backend's generic record schema.
//! Translation to application types happens in the entity modules.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

pub mod http;
pub mod memory;

pub use http::{GatewayConfig, HttpGateway};
pub use memory::MemoryGateway;

/// A raw backend record.
pub type Record = serde_json::Map<String, Value>;

/// The operations offered by the hosted backend.
///
/// Implementations only report transport problems as `Err`.
/// A request the backend refused comes back as a response with `success == false`,
/// which the entity services turn into [`Error::Gateway`].
#[async_trait::async_trait]
pub trait RecordGateway: Send + Sync {
	async fn fetch_records(&self, table: &str, params: &FetchParams) -> Result<FetchResponse>;

	async fn get_record_by_id(&self, table: &str, id: u64, params: &FetchParams) -> Result<GetResponse>;

	async fn create_record(&self, table: &str, params: &RecordsParams) -> Result<MutationResponse>;

	async fn update_record(&self, table: &str, params: &RecordsParams) -> Result<MutationResponse>;

	async fn delete_record(&self, table: &str, params: &DeleteParams) -> Result<MutationResponse>;
}

#[async_trait::async_trait]
impl<G: RecordGateway + ?Sized> RecordGateway for std::sync::Arc<G> {
	async fn fetch_records(&self, table: &str, params: &FetchParams) -> Result<FetchResponse> {
		(**self).fetch_records(table, params).await
	}

	async fn get_record_by_id(&self, table: &str, id: u64, params: &FetchParams) -> Result<GetResponse> {
		(**self).get_record_by_id(table, id, params).await
	}

	async fn create_record(&self, table: &str, params: &RecordsParams) -> Result<MutationResponse> {
		(**self).create_record(table, params).await
	}

	async fn update_record(&self, table: &str, params: &RecordsParams) -> Result<MutationResponse> {
		(**self).update_record(table, params).await
	}

	async fn delete_record(&self, table: &str, params: &DeleteParams) -> Result<MutationResponse> {
		(**self).delete_record(table, params).await
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldName {
	#[serde(rename = "Name")]
	pub name: String,
}

/// A field to return from a query, optionally resolving a reference to another table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
	pub field: FieldName,
	#[serde(rename = "referenceField", default, skip_serializing_if = "Option::is_none")]
	pub reference_field: Option<ReferenceField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceField {
	pub field: FieldName,
}

impl FieldSpec {
	pub fn new(name: &str) -> Self {
		Self {
			field: FieldName { name: name.into() },
			reference_field: None,
		}
	}

	pub fn reference(name: &str, referenced: &str) -> Self {
		Self {
			field: FieldName { name: name.into() },
			reference_field: Some(ReferenceField {
				field: FieldName { name: referenced.into() },
			}),
		}
	}
}

/// Build a field list from plain field names.
pub fn fields(names: &[&str]) -> Vec<FieldSpec> {
	names.iter().map(|name| FieldSpec::new(name)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
	EqualTo,
	ExactMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
	#[serde(rename = "FieldName")]
	pub field_name: String,
	#[serde(rename = "Operator")]
	pub operator: Operator,
	#[serde(rename = "Values")]
	pub values: Vec<Value>,
}

impl Condition {
	pub fn new(field_name: &str, operator: Operator, values: &[&str]) -> Self {
		Self {
			field_name: field_name.into(),
			operator,
			values: values.iter().map(|&value| Value::from(value)).collect(),
		}
	}

	/// Check if a record satisfies the condition.
	///
	/// Both operators match when the field equals any of the listed values.
	pub fn matches(&self, record: &Record) -> bool {
		match record.get(&self.field_name) {
			Some(value) => self.values.iter().any(|x| x == value),
			None => false,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunction {
	Count,
	Sum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateField {
	pub field: FieldName,
	#[serde(rename = "Function")]
	pub function: AggregateFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregator {
	pub id: String,
	pub fields: Vec<AggregateField>,
	#[serde(rename = "where", default, skip_serializing_if = "Vec::is_empty")]
	pub conditions: Vec<Condition>,
}

impl Aggregator {
	pub fn new(id: &str, field: &str, function: AggregateFunction) -> Self {
		Self {
			id: id.into(),
			fields: vec![AggregateField {
				field: FieldName { name: field.into() },
				function,
			}],
			conditions: Vec::new(),
		}
	}

	pub fn filter(mut self, condition: Condition) -> Self {
		self.conditions.push(condition);
		self
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchParams {
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub fields: Vec<FieldSpec>,
	#[serde(rename = "where", default, skip_serializing_if = "Vec::is_empty")]
	pub conditions: Vec<Condition>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub aggregators: Vec<Aggregator>,
}

impl FetchParams {
	pub fn fields(fields: Vec<FieldSpec>) -> Self {
		Self {
			fields,
			..Self::default()
		}
	}

	pub fn aggregate(aggregator: Aggregator) -> Self {
		Self {
			aggregators: vec![aggregator],
			..Self::default()
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordsParams {
	pub records: Vec<Record>,
}

impl RecordsParams {
	pub fn single(record: Record) -> Self {
		Self { records: vec![record] }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteParams {
	#[serde(rename = "RecordIds")]
	pub record_ids: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateValue {
	pub id: String,
	#[serde(default)]
	pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse {
	pub success: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(default, deserialize_with = "null_as_default")]
	pub data: Vec<Record>,
	#[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
	pub aggregators: Vec<AggregateValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetResponse {
	pub success: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(default)]
	pub data: Option<Record>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationResponse {
	pub success: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub results: Option<Vec<RecordResult>>,
}

/// Outcome for a single record of a create, update or delete request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordResult {
	pub success: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Record>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de> + Default,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn rejected(message: Option<String>) -> Error {
	Error::gateway(message.unwrap_or_else(|| "request rejected by server".into()))
}

impl FetchResponse {
	pub fn into_records(self) -> Result<Vec<Record>> {
		if !self.success {
			return Err(rejected(self.message));
		}
		Ok(self.data)
	}

	/// Get the value of an aggregator, treating a missing aggregator as zero.
	pub fn aggregate(&self, id: &str) -> f64 {
		self.aggregators
			.iter()
			.find(|x| x.id == id)
			.and_then(|x| x.value)
			.unwrap_or(0.0)
	}
}

impl GetResponse {
	pub fn into_record(self) -> Result<Record> {
		if !self.success {
			return Err(rejected(self.message));
		}
		self.data.ok_or_else(|| Error::gateway("No record returned from server"))
	}
}

impl MutationResponse {
	/// Check the top-level and per-record success flags.
	///
	/// `verb` and `entity` only serve to build the fallback error message.
	pub fn into_results(self, verb: &str, entity: &str) -> Result<Option<Vec<RecordResult>>> {
		if !self.success {
			return Err(rejected(self.message));
		}

		let results = match self.results {
			Some(x) => x,
			None => return Ok(None),
		};

		let failed: Vec<&RecordResult> = results.iter().filter(|x| !x.success).collect();
		if let Some(first) = failed.first() {
			log::error!(
				"Failed to {} {} {} records: {}",
				verb,
				failed.len(),
				entity,
				serde_json::to_string(&failed).unwrap_or_default(),
			);
			return Err(Error::gateway(first.message.clone().unwrap_or_else(|| format!("Failed to {} {}", verb, entity))));
		}

		Ok(Some(results))
	}

	/// Get the first record returned by a successful create or update.
	pub fn into_first_record(self, verb: &str, entity: &str) -> Result<Record> {
		self.into_results(verb, entity)?
			.and_then(|results| results.into_iter().next())
			.and_then(|result| result.data)
			.ok_or_else(|| Error::gateway("No results returned from server"))
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use serde_json::json;

	fn response(value: Value) -> MutationResponse {
		serde_json::from_value(value).unwrap()
	}

	#[test]
	fn top_level_failure_carries_server_message() {
		let err = response(json!({ "success": false, "message": "table not found" }))
			.into_results("create", "task")
			.unwrap_err();
		assert!(matches!(err, Error::Gateway(ref x) if x == "table not found"));
	}

	#[test]
	fn first_failed_record_wins() {
		let err = response(json!({
			"success": true,
			"results": [
				{ "success": true, "data": { "Id": 1 } },
				{ "success": false, "message": "first" },
				{ "success": false, "message": "second" },
			],
		}))
		.into_results("update", "client")
		.unwrap_err();
		assert!(matches!(err, Error::Gateway(ref x) if x == "first"));
	}

	#[test]
	fn failed_record_without_message_uses_fallback() {
		let err = response(json!({ "success": true, "results": [{ "success": false }] }))
			.into_results("delete", "project")
			.unwrap_err();
		assert_eq!(err.to_string(), "Failed to delete project");
	}

	#[test]
	fn missing_results_on_create_is_an_error() {
		let err = response(json!({ "success": true })).into_first_record("create", "task").unwrap_err();
		assert_eq!(err.to_string(), "No results returned from server");
	}

	#[test]
	fn fetch_tolerates_null_data_and_missing_aggregators() {
		let response: FetchResponse = serde_json::from_value(json!({ "success": true, "data": null })).unwrap();
		assert_eq!(response.aggregate("totalClients"), 0.0);
		assert!(response.into_records().unwrap().is_empty());
	}

	#[test]
	fn conditions_match_any_listed_value() {
		let condition = Condition::new("status", Operator::ExactMatch, &["todo", "in-progress"]);
		let record = |status: &str| json!({ "status": status }).as_object().unwrap().clone();
		assert!(condition.matches(&record("todo")));
		assert!(condition.matches(&record("in-progress")));
		assert!(!condition.matches(&record("done")));
		assert!(!condition.matches(&Record::new()));
	}

	#[test]
	fn fetch_params_use_backend_names() {
		let params = FetchParams {
			fields: vec![FieldSpec::reference("client_id", "Name")],
			..FetchParams::default()
		};
		assert_eq!(
			serde_json::to_value(&params).unwrap(),
			json!({ "fields": [{ "field": { "Name": "client_id" }, "referenceField": { "field": { "Name": "Name" } } }] }),
		);

		let aggregator = Aggregator::new("activeProjects", "Id", AggregateFunction::Count)
			.filter(Condition::new("status", Operator::EqualTo, &["active"]));
		assert_eq!(
			serde_json::to_value(&aggregator).unwrap(),
			json!({
				"id": "activeProjects",
				"fields": [{ "field": { "Name": "Id" }, "Function": "Count" }],
				"where": [{ "FieldName": "status", "Operator": "EqualTo", "Values": ["active"] }],
			}),
		);
	}
}
