use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api_client::ApiClient;
use crate::error::{Error, Result};
use crate::gateway::{fields, FieldSpec, Record, RecordGateway};
use crate::mapping::{format_timestamp, from_record, to_record, Entity, Reference};
use crate::types::{Invoice, InvoicePatch, InvoiceStatus, NewInvoice};

#[derive(Deserialize)]
struct InvoiceRecord {
	#[serde(rename = "Id")]
	id: u64,
	#[serde(rename = "Name", default)]
	name: Option<String>,
	#[serde(default)]
	amount: Option<f64>,
	#[serde(default)]
	status: Option<InvoiceStatus>,
	#[serde(default)]
	due_date: Option<String>,
	#[serde(default)]
	payment_date: Option<String>,
	#[serde(default)]
	client_id: Option<Reference>,
	#[serde(default)]
	project_id: Option<Reference>,
}

#[derive(Serialize)]
struct InvoiceFields<'a> {
	#[serde(rename = "Name", skip_serializing_if = "Option::is_none")]
	name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	amount: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	status: Option<InvoiceStatus>,
	#[serde(skip_serializing_if = "Option::is_none")]
	due_date: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	payment_date: Option<String>,
	/// `Some(None)` is written as `null`.
	#[serde(skip_serializing_if = "Option::is_none")]
	client_id: Option<Option<u64>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	project_id: Option<u64>,
}

impl Entity for Invoice {
	const TABLE: &'static str = "app_invoice";
	const NAME: &'static str = "invoice";

	fn fields() -> Vec<FieldSpec> {
		fields(&["Name", "amount", "status", "due_date", "payment_date", "client_id", "project_id"])
	}

	fn decode(record: Record) -> Result<Self> {
		let record: InvoiceRecord = from_record(record, Self::NAME)?;
		Ok(Self {
			id: record.id,
			name: record.name,
			amount: record.amount.unwrap_or_default(),
			status: record.status.unwrap_or_default(),
			due_date: record.due_date,
			payment_date: record.payment_date,
			client_id: record.client_id.as_ref().map(Reference::id),
			project_id: record.project_id.as_ref().map(Reference::id),
		})
	}
}

fn check_amount(amount: f64) -> Result<()> {
	// Also rejects NaN.
	if amount > 0.0 {
		Ok(())
	} else {
		Err(Error::validation("Amount must be greater than 0"))
	}
}

impl NewInvoice {
	pub fn validate(&self) -> Result<()> {
		if self.project_id.is_none() {
			return Err(Error::validation("Project ID is required"));
		}
		check_amount(self.amount)?;
		if self.due_date.as_deref().map_or(true, str::is_empty) {
			return Err(Error::validation("Due date is required"));
		}
		Ok(())
	}

	/// Validate and encode the invoice, naming it after the creation time.
	pub fn encode(&self, now: DateTime<Utc>) -> Result<Record> {
		self.validate()?;
		to_record(&InvoiceFields {
			name: Some(format!("Invoice {}", now.timestamp_millis())),
			amount: Some(self.amount),
			status: Some(InvoiceStatus::Draft),
			due_date: self.due_date.as_deref(),
			payment_date: None,
			client_id: Some(self.client_id),
			project_id: self.project_id,
		}, Invoice::NAME)
	}
}

impl InvoicePatch {
	/// Validate and encode the patch.
	///
	/// Payment dates are normalized to UTC timestamps.
	pub fn encode(&self) -> Result<Record> {
		if let Some(amount) = self.amount {
			check_amount(amount)?;
		}
		let payment_date = self.payment_date.as_deref()
			.map(parse_payment_date)
			.transpose()?
			.map(format_timestamp);
		to_record(&InvoiceFields {
			name: None,
			amount: self.amount,
			status: self.status,
			due_date: self.due_date.as_deref(),
			payment_date,
			client_id: self.client_id,
			project_id: self.project_id,
		}, Invoice::NAME)
	}

	fn touches_status(&self) -> bool {
		self.status.is_some() || self.payment_date.is_some()
	}

	/// Check that applying the patch to `current` keeps the status rules.
	///
	/// Paid is final and only paid invoices carry a payment date.
	pub fn check_transition(&self, current: &Invoice) -> Result<()> {
		use InvoiceStatus::*;

		let next = self.status.unwrap_or(current.status);
		if next != current.status && !matches!((current.status, next), (Draft, Sent) | (Draft, Paid) | (Sent, Paid)) {
			return Err(Error::invalid_state(format!(
				"Cannot change invoice status from {} to {}",
				current.status, next,
			)));
		}

		if next == Paid {
			if current.status != Paid && self.payment_date.is_none() {
				return Err(Error::validation("Payment date is required"));
			}
		} else if self.payment_date.is_some() {
			return Err(Error::invalid_state("Only paid invoices can have a payment date"));
		}
		Ok(())
	}
}

/// Parse a payment date into an absolute UTC timestamp.
///
/// Accepts RFC 3339 timestamps, timestamps without offset (taken as UTC) and plain dates (UTC midnight).
pub fn parse_payment_date(input: &str) -> Result<DateTime<Utc>> {
	let input = input.trim();
	if input.is_empty() {
		return Err(Error::validation("Payment date is required"));
	}

	if let Ok(time) = DateTime::parse_from_rfc3339(input) {
		return Ok(time.with_timezone(&Utc));
	}
	if let Ok(time) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f") {
		return Ok(time.and_utc());
	}
	if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
		return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
	}
	Err(Error::validation(format!("Invalid payment date: {}", input)))
}

impl<G: RecordGateway> ApiClient<G> {
	pub async fn get_invoices(&self) -> Result<Vec<Invoice>> {
		self.list().await
	}

	pub async fn get_invoice(&self, id: u64) -> Result<Invoice> {
		self.get(id).await
	}

	pub async fn create_invoice(&self, invoice: &NewInvoice) -> Result<Invoice> {
		let record = invoice.encode(self.now())
			.inspect_err(|e| log::error!("Error creating invoice: {}", e))?;
		self.create(record).await
	}

	/// Update an invoice.
	///
	/// Status and payment date changes are checked against the stored invoice first.
	pub async fn update_invoice(&self, id: u64, patch: &InvoicePatch) -> Result<Invoice> {
		let result: Result<Record> = async {
			let record = patch.encode()?;
			if patch.touches_status() {
				let current = self.get_invoice(id).await?;
				patch.check_transition(&current)?;
			}
			Ok(record)
		}.await;
		let record = result.inspect_err(|e| log::error!("Error updating invoice with ID {}: {}", id, e))?;
		self.update(id, record).await
	}

	/// Mark a draft invoice as sent.
	pub async fn mark_invoice_as_sent(&self, id: u64) -> Result<Invoice> {
		let result: Result<Invoice> = async {
			let current = self.get_invoice(id).await?;
			if current.status != InvoiceStatus::Draft {
				return Err(Error::invalid_state("Only draft invoices can be marked as sent"));
			}
			let record = InvoicePatch {
				status: Some(InvoiceStatus::Sent),
				..InvoicePatch::default()
			}.encode()?;
			self.update(id, record).await
		}.await;
		result.inspect_err(|e| log::error!("Error marking invoice {} as sent: {}", id, e))
	}

	/// Mark an invoice as paid.
	///
	/// Draft invoices can be paid directly, without being sent first.
	pub async fn mark_invoice_as_paid(&self, id: u64, payment_date: &str) -> Result<Invoice> {
		let result: Result<Invoice> = async {
			let payment_date = parse_payment_date(payment_date)?;
			let current = self.get_invoice(id).await?;
			if current.status == InvoiceStatus::Paid {
				return Err(Error::invalid_state("Invoice is already marked as paid"));
			}
			let record = InvoicePatch {
				status: Some(InvoiceStatus::Paid),
				payment_date: Some(format_timestamp(payment_date)),
				..InvoicePatch::default()
			}.encode()?;
			self.update(id, record).await
		}.await;
		result.inspect_err(|e| log::error!("Error marking invoice {} as paid: {}", id, e))
	}

	pub async fn delete_invoice(&self, id: u64) -> Result<bool> {
		self.delete::<Invoice>(id).await
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::clock::ManualClock;
	use crate::gateway::MemoryGateway;
	use chrono::TimeZone;
	use serde_json::json;
	use std::sync::Arc;

	fn record(value: serde_json::Value) -> Record {
		value.as_object().unwrap().clone()
	}

	fn new_invoice() -> NewInvoice {
		NewInvoice {
			project_id: Some(7),
			amount: 500.0,
			due_date: Some("2024-01-01".into()),
			..NewInvoice::default()
		}
	}

	fn now() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
	}

	#[test]
	fn validation_order_and_messages() {
		let cases = [
			(NewInvoice { project_id: None, ..new_invoice() }, "Project ID is required"),
			(NewInvoice { amount: 0.0, ..new_invoice() }, "Amount must be greater than 0"),
			(NewInvoice { amount: -3.0, ..new_invoice() }, "Amount must be greater than 0"),
			(NewInvoice { amount: f64::NAN, ..new_invoice() }, "Amount must be greater than 0"),
			(NewInvoice { due_date: None, ..new_invoice() }, "Due date is required"),
			(NewInvoice { due_date: Some("".into()), ..new_invoice() }, "Due date is required"),
			(NewInvoice::default(), "Project ID is required"),
		];
		for (invoice, message) in cases {
			let err = invoice.validate().unwrap_err();
			assert!(matches!(err, Error::Validation(ref x) if x == message), "{:?}: {}", invoice, err);
		}
		assert!(new_invoice().validate().is_ok());
	}

	#[test]
	fn new_invoice_encoding() {
		let encoded = NewInvoice { client_id: Some(2), ..new_invoice() }.encode(now()).unwrap();
		assert_eq!(encoded, record(json!({
			"Name": "Invoice 1704067200000",
			"amount": 500.0,
			"status": "draft",
			"due_date": "2024-01-01",
			"client_id": 2,
			"project_id": 7,
		})));

		let encoded = new_invoice().encode(now()).unwrap();
		assert_eq!(encoded["client_id"], json!(null));
	}

	#[test]
	fn patch_can_clear_client() {
		let patch = InvoicePatch { client_id: Some(None), ..InvoicePatch::default() };
		assert_eq!(patch.encode().unwrap(), record(json!({ "client_id": null })));
		assert_eq!(InvoicePatch::default().encode().unwrap(), Record::new());
	}

	#[test]
	fn patch_rejects_non_positive_amount() {
		let patch = InvoicePatch { amount: Some(0.0), ..InvoicePatch::default() };
		assert!(matches!(patch.encode(), Err(Error::Validation(_))));
	}

	#[test]
	fn decode_invoice() {
		let invoice = Invoice::decode(record(json!({
			"Id": 11,
			"Name": "Invoice 1",
			"amount": 120.5,
			"status": "paid",
			"due_date": "2024-02-01",
			"payment_date": "2024-02-03T00:00:00.000Z",
			"client_id": { "Id": 4, "Name": "Acme" },
			"project_id": 9,
		}))).unwrap();
		assert_eq!(invoice, Invoice {
			id: 11,
			name: Some("Invoice 1".into()),
			amount: 120.5,
			status: InvoiceStatus::Paid,
			due_date: Some("2024-02-01".into()),
			payment_date: Some("2024-02-03T00:00:00.000Z".into()),
			client_id: Some(4),
			project_id: Some(9),
		});
	}

	#[test]
	fn unknown_status_is_a_decode_error() {
		let err = Invoice::decode(record(json!({ "Id": 1, "status": "overdue" }))).unwrap_err();
		assert!(matches!(err, Error::Decode { entity: "invoice", .. }));
	}

	#[test]
	fn payment_dates_are_normalized() {
		let expected = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
		assert_eq!(parse_payment_date("2024-03-01").unwrap(), expected);
		assert_eq!(parse_payment_date("2024-03-01T00:00:00").unwrap(), expected);
		assert_eq!(parse_payment_date("2024-03-01T02:00:00+02:00").unwrap(), expected);
		assert!(matches!(parse_payment_date(""), Err(Error::Validation(ref x)) if x == "Payment date is required"));
		assert!(matches!(parse_payment_date("yesterday"), Err(Error::Validation(_))));
	}

	#[tokio::test]
	async fn status_transitions() {
		let api = ApiClient::new(MemoryGateway::new()).with_clock(ManualClock::new(now()));

		let invoice = api.create_invoice(&new_invoice()).await.unwrap();
		assert_eq!(invoice.status, InvoiceStatus::Draft);

		let sent = api.mark_invoice_as_sent(invoice.id).await.unwrap();
		assert_eq!(sent.status, InvoiceStatus::Sent);
		assert!(matches!(api.mark_invoice_as_sent(invoice.id).await, Err(Error::InvalidState(_))));

		let paid = api.mark_invoice_as_paid(invoice.id, "2024-01-15").await.unwrap();
		assert_eq!(paid.status, InvoiceStatus::Paid);
		assert_eq!(paid.payment_date.as_deref(), Some("2024-01-15T00:00:00.000Z"));

		assert!(matches!(api.mark_invoice_as_sent(invoice.id).await, Err(Error::InvalidState(_))));
		let err = api.mark_invoice_as_paid(invoice.id, "2024-01-16").await.unwrap_err();
		assert!(matches!(err, Error::InvalidState(ref x) if x == "Invoice is already marked as paid"));
		assert_eq!(api.get_invoice(invoice.id).await.unwrap(), paid);
	}

	#[tokio::test]
	async fn generic_updates_keep_status_rules() {
		let api = ApiClient::new(MemoryGateway::new());
		let invoice = api.create_invoice(&new_invoice()).await.unwrap();
		let patch = |status, payment_date: Option<&str>| InvoicePatch {
			status,
			payment_date: payment_date.map(String::from),
			..InvoicePatch::default()
		};

		let err = api.update_invoice(invoice.id, &patch(Some(InvoiceStatus::Paid), None)).await.unwrap_err();
		assert!(matches!(err, Error::Validation(ref x) if x == "Payment date is required"));
		let err = api.update_invoice(invoice.id, &patch(None, Some("2024-02-01"))).await.unwrap_err();
		assert!(matches!(err, Error::InvalidState(_)));

		let sent = api.update_invoice(invoice.id, &patch(Some(InvoiceStatus::Sent), None)).await.unwrap();
		assert_eq!(sent.status, InvoiceStatus::Sent);
		let err = api.update_invoice(invoice.id, &patch(Some(InvoiceStatus::Draft), None)).await.unwrap_err();
		assert!(matches!(err, Error::InvalidState(ref x) if x == "Cannot change invoice status from sent to draft"));

		let paid = api.update_invoice(invoice.id, &patch(Some(InvoiceStatus::Paid), Some("2024-02-01"))).await.unwrap();
		assert_eq!(paid.status, InvoiceStatus::Paid);
		assert_eq!(paid.payment_date.as_deref(), Some("2024-02-01T00:00:00.000Z"));

		for status in [InvoiceStatus::Draft, InvoiceStatus::Sent] {
			let err = api.update_invoice(invoice.id, &patch(Some(status), None)).await.unwrap_err();
			assert!(matches!(err, Error::InvalidState(_)));
		}
		assert_eq!(api.get_invoice(invoice.id).await.unwrap(), paid);

		let amended = api.update_invoice(invoice.id, &InvoicePatch { amount: Some(750.0), ..InvoicePatch::default() }).await.unwrap();
		assert_eq!(amended.status, InvoiceStatus::Paid);
		assert_eq!(amended.amount, 750.0);
	}

	#[test]
	fn transition_rules() {
		use InvoiceStatus::*;
		let invoice = |status| Invoice {
			id: 1,
			name: None,
			amount: 1.0,
			status,
			due_date: None,
			payment_date: None,
			client_id: None,
			project_id: None,
		};
		let to = |status| InvoicePatch { status: Some(status), payment_date: Some("2024-01-01".into()), ..InvoicePatch::default() };

		assert!(to(Paid).check_transition(&invoice(Draft)).is_ok());
		assert!(to(Paid).check_transition(&invoice(Sent)).is_ok());
		assert!(InvoicePatch { status: Some(Sent), ..InvoicePatch::default() }.check_transition(&invoice(Draft)).is_ok());
		assert!(InvoicePatch { status: Some(Draft), ..InvoicePatch::default() }.check_transition(&invoice(Paid)).is_err());
		assert!(to(Sent).check_transition(&invoice(Draft)).is_err());
	}

	#[tokio::test]
	async fn draft_can_be_paid_directly() {
		let api = ApiClient::new(MemoryGateway::new());
		let invoice = api.create_invoice(&new_invoice()).await.unwrap();
		let paid = api.mark_invoice_as_paid(invoice.id, "2024-01-02T10:30:00Z").await.unwrap();
		assert_eq!(paid.status, InvoiceStatus::Paid);
		assert_eq!(paid.payment_date.as_deref(), Some("2024-01-02T10:30:00.000Z"));
	}

	#[tokio::test]
	async fn missing_payment_date_skips_the_backend() {
		let gateway = Arc::new(MemoryGateway::new());
		gateway.fail_table("app_invoice", "should not be called");
		let api = ApiClient::new(gateway);
		assert!(matches!(api.mark_invoice_as_paid(1, " ").await, Err(Error::Validation(_))));
	}

	#[tokio::test]
	async fn invalid_invoice_is_not_sent_to_backend() {
		let gateway = Arc::new(MemoryGateway::new());
		let api = ApiClient::new(gateway.clone());
		let err = api.create_invoice(&NewInvoice { amount: 0.0, ..new_invoice() }).await.unwrap_err();
		assert_eq!(err.to_string(), "Amount must be greater than 0");
		assert!(api.get_invoices().await.unwrap().is_empty());
		assert!(gateway.get("app_invoice", 1).is_none());
	}
}
