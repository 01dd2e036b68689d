//! Helpers shared by the entity mappers.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::gateway::{FieldSpec, Record};

/// A backend entity with a table of its own.
pub trait Entity: Sized {
	/// The backend table holding the entity.
	const TABLE: &'static str;

	/// Singular name used in log and error messages.
	const NAME: &'static str;

	/// The fields to request when reading the entity.
	fn fields() -> Vec<FieldSpec>;

	/// Translate a backend record into the application shape.
	fn decode(record: Record) -> Result<Self>;
}

/// Deserialize a backend record into one of the `*Record` structs of the entity modules.
pub fn from_record<T: DeserializeOwned>(record: Record, entity: &'static str) -> Result<T> {
	serde_json::from_value(Value::Object(record)).map_err(|e| Error::Decode { entity, source: e })
}

/// Serialize one of the `*Fields` structs of the entity modules into a backend record.
pub fn to_record<T: Serialize>(fields: &T, entity: &'static str) -> Result<Record> {
	match serde_json::to_value(fields).map_err(|e| Error::Encode { entity, source: e })? {
		Value::Object(record) => Ok(record),
		other => Err(Error::Encode {
			entity,
			source: serde::ser::Error::custom(format!("expected an object, got {}", other)),
		}),
	}
}

/// Add the record ID to an update payload.
pub fn with_id(mut record: Record, id: u64) -> Record {
	record.insert("Id".into(), Value::from(id));
	record
}

/// A reference to a record in another table.
///
/// Depending on the requested fields the backend returns either the bare ID
/// or an object with the ID and the referenced fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Reference {
	Id(u64),
	Record {
		#[serde(rename = "Id")]
		id: u64,
		#[serde(rename = "Name", default)]
		name: Option<String>,
	},
}

impl Reference {
	pub fn id(&self) -> u64 {
		match self {
			Self::Id(id) => *id,
			Self::Record { id, .. } => *id,
		}
	}

	pub fn name(&self) -> Option<&str> {
		match self {
			Self::Id(_) => None,
			Self::Record { name, .. } => name.as_deref(),
		}
	}
}

/// Format a timestamp the way the backend stores them: millisecond precision, `Z` suffix.
pub fn format_timestamp(time: DateTime<Utc>) -> String {
	time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serialize a timestamp with [`format_timestamp`].
pub fn serialize_timestamp<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
	serializer.serialize_str(&format_timestamp(*time))
}

/// Pick the first non-empty string.
pub fn non_empty(first: Option<String>, second: Option<String>) -> Option<String> {
	first.filter(|x| !x.is_empty()).or_else(|| second.filter(|x| !x.is_empty()))
}

/// Parse a user supplied record ID.
pub fn parse_record_id(input: &str, entity: &str) -> Result<u64> {
	input.trim()
		.parse()
		.map_err(|_| Error::validation(format!("Invalid {} ID", entity)))
}
