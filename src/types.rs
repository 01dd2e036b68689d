use serde::{Deserialize, Serialize};

use crate::time_tracking::TimeTracking;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
	pub id: u64,
	pub name: String,
	pub email: Option<String>,
	pub company: Option<String>,
	pub status: String,
	pub created_at: Option<String>,
	pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewClient {
	pub name: String,
	pub email: Option<String>,
	pub company: Option<String>,
	/// Defaults to `active`.
	pub status: Option<String>,
	pub notes: Option<String>,
}

/// Changes to a client. Fields left at `None` are not touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientPatch {
	pub name: Option<String>,
	pub email: Option<String>,
	pub company: Option<String>,
	pub status: Option<String>,
	pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
	pub id: u64,
	pub name: String,
	pub status: String,
	pub budget: Option<f64>,
	pub start_date: Option<String>,
	pub end_date: Option<String>,
	pub client_id: Option<u64>,
	pub client_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewProject {
	pub name: String,
	/// Defaults to `planning`.
	pub status: Option<String>,
	pub budget: Option<f64>,
	pub start_date: Option<String>,
	pub end_date: Option<String>,
	pub client_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
	pub name: Option<String>,
	pub status: Option<String>,
	pub budget: Option<f64>,
	pub start_date: Option<String>,
	pub end_date: Option<String>,
	pub client_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
	pub id: u64,
	pub title: String,
	pub priority: Option<String>,
	pub status: String,
	pub due_date: Option<String>,
	pub project_id: Option<u64>,
	pub time_tracking: TimeTracking,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTask {
	pub title: String,
	/// Defaults to `medium`.
	pub priority: Option<String>,
	/// Defaults to `todo`.
	pub status: Option<String>,
	pub due_date: Option<String>,
	pub project_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
	pub title: Option<String>,
	pub priority: Option<String>,
	pub status: Option<String>,
	pub due_date: Option<String>,
	pub project_id: Option<u64>,
	pub time_tracking: Option<TimeTracking>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
	#[default]
	Draft,
	Sent,
	Paid,
}

impl std::fmt::Display for InvoiceStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::Draft => f.write_str("draft"),
			Self::Sent => f.write_str("sent"),
			Self::Paid => f.write_str("paid"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
	pub id: u64,
	pub name: Option<String>,
	pub amount: f64,
	pub status: InvoiceStatus,
	pub due_date: Option<String>,
	/// Set once the invoice is paid.
	pub payment_date: Option<String>,
	pub client_id: Option<u64>,
	pub project_id: Option<u64>,
}

/// A new invoice. Invoices always start out as draft.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewInvoice {
	/// Required.
	pub project_id: Option<u64>,
	/// Must be greater than zero.
	pub amount: f64,
	/// Required.
	pub due_date: Option<String>,
	pub client_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoicePatch {
	pub amount: Option<f64>,
	/// Only draft to sent and draft or sent to paid are accepted.
	pub status: Option<InvoiceStatus>,
	pub due_date: Option<String>,
	/// Only allowed when the invoice is or becomes paid.
	pub payment_date: Option<String>,
	/// `Some(None)` clears the client.
	pub client_id: Option<Option<u64>>,
	pub project_id: Option<u64>,
}
