use serde::{Deserialize, Serialize};

use crate::api_client::ApiClient;
use crate::error::Result;
use crate::gateway::{FieldSpec, Record, RecordGateway};
use crate::mapping::{from_record, to_record, Entity, Reference};
use crate::types::{NewProject, Project, ProjectPatch};

pub const DEFAULT_STATUS: &str = "planning";

#[derive(Deserialize)]
struct ProjectRecord {
	#[serde(rename = "Id")]
	id: u64,
	#[serde(rename = "Name", default)]
	name: Option<String>,
	#[serde(default)]
	status: Option<String>,
	#[serde(default)]
	budget: Option<f64>,
	#[serde(default)]
	start_date: Option<String>,
	#[serde(default)]
	end_date: Option<String>,
	#[serde(default)]
	client_id: Option<Reference>,
}

#[derive(Serialize)]
struct ProjectFields<'a> {
	#[serde(rename = "Name", skip_serializing_if = "Option::is_none")]
	name: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	status: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	budget: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	start_date: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	end_date: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	client_id: Option<u64>,
}

impl Entity for Project {
	const TABLE: &'static str = "project";
	const NAME: &'static str = "project";

	fn fields() -> Vec<FieldSpec> {
		vec![
			FieldSpec::new("Name"),
			FieldSpec::new("status"),
			FieldSpec::new("budget"),
			FieldSpec::new("start_date"),
			FieldSpec::new("end_date"),
			FieldSpec::reference("client_id", "Name"),
		]
	}

	fn decode(record: Record) -> Result<Self> {
		let record: ProjectRecord = from_record(record, Self::NAME)?;
		Ok(Self {
			id: record.id,
			name: record.name.unwrap_or_default(),
			status: record.status.unwrap_or_default(),
			budget: record.budget,
			start_date: record.start_date,
			end_date: record.end_date,
			client_id: record.client_id.as_ref().map(Reference::id),
			client_name: record.client_id.as_ref().and_then(Reference::name).map(String::from),
		})
	}
}

impl NewProject {
	pub fn encode(&self) -> Result<Record> {
		to_record(&ProjectFields {
			name: Some(&self.name),
			status: Some(self.status.as_deref().unwrap_or(DEFAULT_STATUS)),
			budget: self.budget,
			start_date: self.start_date.as_deref(),
			end_date: self.end_date.as_deref(),
			client_id: self.client_id,
		}, Project::NAME)
	}
}

impl ProjectPatch {
	pub fn encode(&self) -> Result<Record> {
		to_record(&ProjectFields {
			name: self.name.as_deref(),
			status: self.status.as_deref(),
			budget: self.budget,
			start_date: self.start_date.as_deref(),
			end_date: self.end_date.as_deref(),
			client_id: self.client_id,
		}, Project::NAME)
	}
}

impl<G: RecordGateway> ApiClient<G> {
	pub async fn get_projects(&self) -> Result<Vec<Project>> {
		self.list().await
	}

	pub async fn get_project(&self, id: u64) -> Result<Project> {
		self.get(id).await
	}

	pub async fn create_project(&self, project: &NewProject) -> Result<Project> {
		self.create(project.encode()?).await
	}

	pub async fn update_project(&self, id: u64, patch: &ProjectPatch) -> Result<Project> {
		self.update(id, patch.encode()?).await
	}

	pub async fn delete_project(&self, id: u64) -> Result<bool> {
		self.delete::<Project>(id).await
	}
}
