use chrono::{DateTime, Utc};

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::gateway::{DeleteParams, FetchParams, Record, RecordGateway, RecordsParams};
use crate::mapping::{with_id, Entity};

/// Client for the project management backend.
///
/// The entity operations live in the `clients`, `projects`, `tasks`, `invoices` and `dashboard` modules.
/// Every call goes straight to the gateway: nothing is cached between calls.
pub struct ApiClient<G> {
	gateway: G,
	clock: Box<dyn Clock>,
}

impl<G: RecordGateway> ApiClient<G> {
	pub fn new(gateway: G) -> Self {
		Self {
			gateway,
			clock: Box::new(SystemClock),
		}
	}

	/// Use a different clock for timers and generated timestamps.
	pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
		self.clock = Box::new(clock);
		self
	}

	pub fn gateway(&self) -> &G {
		&self.gateway
	}

	pub(crate) fn now(&self) -> DateTime<Utc> {
		self.clock.now()
	}

	pub(crate) async fn list<E: Entity>(&self) -> Result<Vec<E>> {
		let result: Result<Vec<E>> = async {
			let response = self.gateway.fetch_records(E::TABLE, &FetchParams::fields(E::fields())).await?;
			response.into_records()?
				.into_iter()
				.map(E::decode)
				.collect::<Result<Vec<E>>>()
		}.await;
		result.inspect_err(|e| log::error!("Error fetching {}s: {}", E::NAME, e))
	}

	pub(crate) async fn get<E: Entity>(&self, id: u64) -> Result<E> {
		let result: Result<E> = async {
			let response = self.gateway.get_record_by_id(E::TABLE, id, &FetchParams::fields(E::fields())).await?;
			E::decode(response.into_record()?)
		}.await;
		result.inspect_err(|e| log::error!("Error fetching {} with ID {}: {}", E::NAME, id, e))
	}

	pub(crate) async fn create<E: Entity>(&self, record: Record) -> Result<E> {
		let result: Result<E> = async {
			let response = self.gateway.create_record(E::TABLE, &RecordsParams::single(record)).await?;
			E::decode(response.into_first_record("create", E::NAME)?)
		}.await;
		result.inspect_err(|e| log::error!("Error creating {}: {}", E::NAME, e))
	}

	pub(crate) async fn update<E: Entity>(&self, id: u64, record: Record) -> Result<E> {
		let result: Result<E> = async {
			let params = RecordsParams::single(with_id(record, id));
			let response = self.gateway.update_record(E::TABLE, &params).await?;
			E::decode(response.into_first_record("update", E::NAME)?)
		}.await;
		result.inspect_err(|e| log::error!("Error updating {} with ID {}: {}", E::NAME, id, e))
	}

	pub(crate) async fn delete<E: Entity>(&self, id: u64) -> Result<bool> {
		let result: Result<bool> = async {
			let params = DeleteParams { record_ids: vec![id] };
			let response = self.gateway.delete_record(E::TABLE, &params).await?;
			response.into_results("delete", E::NAME)?;
			Ok(true)
		}.await;
		result.inspect_err(|e| log::error!("Error deleting {} with ID {}: {}", E::NAME, id, e))
	}
}
