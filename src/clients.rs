use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api_client::ApiClient;
use crate::error::Result;
use crate::gateway::{fields, FieldSpec, Record, RecordGateway};
use crate::mapping::{format_timestamp, from_record, to_record, Entity};
use crate::types::{Client, ClientPatch, NewClient};

pub const DEFAULT_STATUS: &str = "active";

/// A client as stored by the backend.
#[derive(Deserialize)]
struct ClientRecord {
	#[serde(rename = "Id")]
	id: u64,
	#[serde(rename = "Name", default)]
	name: Option<String>,
	#[serde(default)]
	email: Option<String>,
	#[serde(default)]
	company: Option<String>,
	#[serde(default)]
	status: Option<String>,
	#[serde(default)]
	created_at: Option<String>,
	#[serde(default)]
	notes: Option<String>,
}

#[derive(Serialize)]
struct ClientFields<'a> {
	#[serde(rename = "Name", skip_serializing_if = "Option::is_none")]
	name: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	email: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	company: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	status: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	created_at: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	notes: Option<&'a str>,
}

impl Entity for Client {
	const TABLE: &'static str = "client";
	const NAME: &'static str = "client";

	fn fields() -> Vec<FieldSpec> {
		fields(&["Name", "email", "company", "status", "created_at", "notes"])
	}

	fn decode(record: Record) -> Result<Self> {
		let record: ClientRecord = from_record(record, Self::NAME)?;
		Ok(Self {
			id: record.id,
			name: record.name.unwrap_or_default(),
			email: record.email,
			company: record.company,
			status: record.status.unwrap_or_default(),
			created_at: record.created_at,
			notes: record.notes,
		})
	}
}

impl NewClient {
	/// Encode the client for creation, stamping it with `now`.
	pub fn encode(&self, now: DateTime<Utc>) -> Result<Record> {
		to_record(&ClientFields {
			name: Some(&self.name),
			email: self.email.as_deref(),
			company: self.company.as_deref(),
			status: Some(self.status.as_deref().unwrap_or(DEFAULT_STATUS)),
			created_at: Some(format_timestamp(now)),
			notes: Some(self.notes.as_deref().unwrap_or("")),
		}, Client::NAME)
	}
}

impl ClientPatch {
	pub fn encode(&self) -> Result<Record> {
		to_record(&ClientFields {
			name: self.name.as_deref(),
			email: self.email.as_deref(),
			company: self.company.as_deref(),
			status: self.status.as_deref(),
			created_at: None,
			notes: self.notes.as_deref(),
		}, Client::NAME)
	}
}

impl<G: RecordGateway> ApiClient<G> {
	pub async fn get_clients(&self) -> Result<Vec<Client>> {
		self.list().await
	}

	pub async fn get_client(&self, id: u64) -> Result<Client> {
		self.get(id).await
	}

	pub async fn create_client(&self, client: &NewClient) -> Result<Client> {
		self.create(client.encode(self.now())?).await
	}

	pub async fn update_client(&self, id: u64, patch: &ClientPatch) -> Result<Client> {
		self.update(id, patch.encode()?).await
	}

	pub async fn delete_client(&self, id: u64) -> Result<bool> {
		self.delete::<Client>(id).await
	}
}
