use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;

use pmdesk::clock::ManualClock;
use pmdesk::dashboard::DashboardData;
use pmdesk::gateway::MemoryGateway;
use pmdesk::types::{InvoiceStatus, NewInvoice, NewProject, NewTask};
use pmdesk::{ApiClient, Error};

#[tokio::test]
async fn five_second_timer_on_task_42() {
	let gateway = Arc::new(MemoryGateway::new());
	// Fill IDs up to 41 so the task gets ID 42.
	for _ in 0..41 {
		gateway.insert("filler", json!({}));
	}
	let t0 = Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap();
	let clock = Arc::new(ManualClock::new(t0));
	let api = ApiClient::new(gateway.clone()).with_clock(clock.clone());

	let task = api.create_task(&NewTask { title: "Timed".into(), ..NewTask::default() }).await.unwrap();
	assert_eq!(task.id, 42);

	api.start_task_timer(42).await.unwrap();
	clock.advance(Duration::milliseconds(5000));
	let log = api.stop_task_timer(42).await.unwrap();

	assert_eq!(log.duration, 5000);
	let tracking = api.get_task(42).await.unwrap().time_tracking;
	assert_eq!(tracking.total_time, 5000);
	assert_eq!(tracking.time_logs, vec![log]);

	// The backend keeps the structure as an encoded string.
	let stored = gateway.get("task", 42).unwrap();
	assert!(stored["time_tracking"].is_string());
}

#[tokio::test]
async fn invoice_creation_and_payment() {
	let api = ApiClient::new(MemoryGateway::new());
	let project = api.create_project(&NewProject { name: "Website".into(), ..NewProject::default() }).await.unwrap();

	let err = api.create_invoice(&NewInvoice {
		project_id: Some(project.id),
		amount: 0.0,
		due_date: Some("2024-01-01".into()),
		..NewInvoice::default()
	}).await.unwrap_err();
	assert!(matches!(err, Error::Validation(ref x) if x == "Amount must be greater than 0"));

	let invoice = api.create_invoice(&NewInvoice {
		project_id: Some(7),
		amount: 500.0,
		due_date: Some("2024-01-01".into()),
		..NewInvoice::default()
	}).await.unwrap();
	assert_eq!(invoice.status, InvoiceStatus::Draft);
	assert_eq!(invoice.project_id, Some(7));
	assert_eq!(invoice.payment_date, None);

	let paid = api.mark_invoice_as_paid(invoice.id, "2024-01-20").await.unwrap();
	assert_eq!(paid.status, InvoiceStatus::Paid);
	assert!(paid.payment_date.is_some());
	assert!(matches!(api.mark_invoice_as_sent(invoice.id).await, Err(Error::InvalidState(_))));
}

#[tokio::test]
async fn dashboard_falls_back_when_tasks_query_fails() {
	let gateway = Arc::new(MemoryGateway::new());
	gateway.insert("client", json!({ "Name": "Acme" }));
	gateway.insert("project", json!({ "Name": "Site", "status": "active" }));
	gateway.insert("app_invoice", json!({ "amount": 900.0, "status": "paid" }));
	gateway.fail_table("task", "service unavailable");

	let api = ApiClient::new(gateway);
	let data = api.get_dashboard_data().await;
	assert_eq!(data, DashboardData::default());
	assert!(data.recent_activity.is_empty());
}

#[tokio::test]
async fn gateway_failures_propagate_from_timer_operations() {
	let gateway = Arc::new(MemoryGateway::new());
	gateway.fail_table("task", "offline");
	let api = ApiClient::new(gateway);
	assert!(matches!(api.start_task_timer(1).await, Err(Error::Gateway(ref x)) if x == "offline"));
	assert!(matches!(api.get_task_time_logs(1).await, Err(Error::Gateway(_))));
}
