use serde::Serialize;

use crate::api_client::ApiClient;
use crate::error::{Error, Result};
use crate::gateway::{AggregateFunction, Aggregator, Condition, FetchParams, Operator, RecordGateway};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
	pub summary: Summary,
	pub recent_activity: Vec<Activity>,
	pub quick_stats: QuickStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
	pub total_clients: u64,
	pub active_projects: u64,
	pub pending_tasks: u64,
	pub monthly_revenue: f64,
	/// Not queried yet, always zero.
	pub completed_tasks: u64,
	/// Not queried yet, always zero.
	pub overdue_items: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
	pub id: u64,
	#[serde(rename = "type")]
	pub kind: String,
	pub title: String,
	pub client: String,
	pub time: String,
	pub icon: String,
}

/// Rough estimates derived from the summary counts.
///
/// These are placeholder heuristics, not measurements.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickStats {
	pub projects_this_week: u64,
	pub tasks_completed: u64,
	pub hours_tracked: u64,
	pub invoices_sent: u64,
}

impl QuickStats {
	pub fn estimate(summary: &Summary) -> Self {
		Self {
			projects_this_week: (summary.active_projects as f64 * 0.3).floor() as u64,
			tasks_completed: summary.pending_tasks / 2,
			hours_tracked: summary.pending_tasks.saturating_mul(8),
			invoices_sent: (summary.monthly_revenue / 5000.0).floor() as u64,
		}
	}
}

impl DashboardData {
	fn from_summary(summary: Summary) -> Self {
		Self {
			quick_stats: QuickStats::estimate(&summary),
			summary,
			recent_activity: vec![Activity {
				id: 1,
				kind: "system".into(),
				title: "Dashboard loaded successfully".into(),
				client: "System".into(),
				time: "Just now".into(),
				icon: "BarChart3".into(),
			}],
		}
	}
}

fn count(value: f64) -> u64 {
	value.max(0.0) as u64
}

impl<G: RecordGateway> ApiClient<G> {
	/// Collect the dashboard summary.
	///
	/// The four aggregate queries run concurrently.
	/// If any of them fails the whole dashboard falls back to zeros.
	pub async fn get_dashboard_data(&self) -> DashboardData {
		match self.dashboard_summary().await {
			Ok(summary) => DashboardData::from_summary(summary),
			Err(e) => {
				log::warn!("Error fetching dashboard data, showing empty dashboard: {}", e);
				DashboardData::default()
			},
		}
	}

	async fn dashboard_summary(&self) -> Result<Summary> {
		let (total_clients, active_projects, pending_tasks, monthly_revenue) = tokio::try_join!(
			self.aggregate("client", Aggregator::new("totalClients", "Id", AggregateFunction::Count)),
			self.aggregate(
				"project",
				Aggregator::new("activeProjects", "Id", AggregateFunction::Count)
					.filter(Condition::new("status", Operator::EqualTo, &["active"])),
			),
			self.aggregate(
				"task",
				Aggregator::new("pendingTasks", "Id", AggregateFunction::Count)
					.filter(Condition::new("status", Operator::ExactMatch, &["todo", "in-progress"])),
			),
			self.aggregate(
				"app_invoice",
				Aggregator::new("monthlyRevenue", "amount", AggregateFunction::Sum)
					.filter(Condition::new("status", Operator::EqualTo, &["paid"])),
			),
		)?;

		Ok(Summary {
			total_clients: count(total_clients),
			active_projects: count(active_projects),
			pending_tasks: count(pending_tasks),
			monthly_revenue,
			completed_tasks: 0,
			overdue_items: 0,
		})
	}

	async fn aggregate(&self, table: &str, aggregator: Aggregator) -> Result<f64> {
		let id = aggregator.id.clone();
		let response = self.gateway().fetch_records(table, &FetchParams::aggregate(aggregator)).await?;
		if !response.success {
			return Err(Error::gateway(response.message.unwrap_or_else(|| format!("aggregate {} failed", id))));
		}
		Ok(response.aggregate(&id))
	}
}
