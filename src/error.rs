use reqwest::StatusCode;

/// Errors returned by the record gateway and the entity services built on top of it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The backend rejected the request, or one of the records in it.
	///
	/// Lookups of records that do not exist also end up here.
	#[error("{0}")]
	Gateway(String),

	/// Required input was missing or invalid.
	#[error("{0}")]
	Validation(String),

	/// The operation is not allowed in the current state of the record.
	#[error("{0}")]
	InvalidState(String),

	#[error("failed to create HTTP client: {source}")]
	Client {
		source: reqwest::Error,
	},

	#[error("failed to {action}: error sending request: {source}")]
	Request {
		action: String,
		source: reqwest::Error,
	},

	#[error("failed to {action}: server responded with status code {status}")]
	Status {
		action: String,
		status: StatusCode,
	},

	#[error("failed to {action}: error parsing response: {source}")]
	Response {
		action: String,
		source: reqwest::Error,
	},

	#[error("failed to decode {entity} record: {source}")]
	Decode {
		entity: &'static str,
		source: serde_json::Error,
	},

	#[error("failed to encode {entity} record: {source}")]
	Encode {
		entity: &'static str,
		source: serde_json::Error,
	},
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
	pub fn gateway(message: impl Into<String>) -> Self {
		Self::Gateway(message.into())
	}

	pub fn validation(message: impl Into<String>) -> Self {
		Self::Validation(message.into())
	}

	pub fn invalid_state(message: impl Into<String>) -> Self {
		Self::InvalidState(message.into())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn client_errors_do_not_mention_requests() {
		let source = reqwest::Client::new().get("not a url").build().unwrap_err();
		let message = Error::Client { source }.to_string();
		assert!(message.starts_with("failed to create HTTP client: "), "{}", message);
		assert!(!message.contains("sending request"), "{}", message);
	}
}
