use reqwest::Method;
use std::time::Duration;

use super::{DeleteParams, FetchParams, FetchResponse, GetResponse, MutationResponse, RecordGateway, RecordsParams};
use crate::error::{Error, Result};

/// Connection parameters for the hosted backend.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct GatewayConfig {
	pub api_root: String,
	pub project_id: String,
	pub public_key: String,
	#[serde(default = "default_timeout_secs")]
	pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
	30
}

/// Record gateway talking JSON over HTTP.
pub struct HttpGateway {
	client: reqwest::Client,
	config: GatewayConfig,
}

impl HttpGateway {
	pub fn new(config: GatewayConfig) -> Result<Self> {
		let client = reqwest::Client::builder()
			.timeout(Duration::from_secs(config.timeout_secs))
			.build()
			.map_err(|e| Error::Client { source: e })?;
		Ok(Self { client, config })
	}

	fn table_url(&self, table: &str, rest: &str) -> String {
		format!(
			"{}/tables/{}/{}",
			self.config.api_root.trim_end_matches('/'),
			urlencoding::encode(table),
			rest,
		)
	}

	async fn send<B, T>(&self, method: Method, url: String, body: &B, action: String) -> Result<T>
	where
		B: serde::Serialize + ?Sized,
		T: serde::de::DeserializeOwned,
	{
		log::debug!("{} {}", method, url);
		let response = self.client.request(method, &url)
			.header("X-Project-Id", &self.config.project_id)
			.bearer_auth(&self.config.public_key)
			.json(body)
			.send()
			.await
			.map_err(|e| Error::Request { action: action.clone(), source: e })?;

		if !response.status().is_success() {
			Err(Error::Status { action, status: response.status() })
		} else {
			response.json().await.map_err(|e| Error::Response { action, source: e })
		}
	}
}

#[async_trait::async_trait]
impl RecordGateway for HttpGateway {
	async fn fetch_records(&self, table: &str, params: &FetchParams) -> Result<FetchResponse> {
		let url = self.table_url(table, "fetch");
		self.send(Method::POST, url, params, format!("fetch {} records", table)).await
	}

	async fn get_record_by_id(&self, table: &str, id: u64, params: &FetchParams) -> Result<GetResponse> {
		let url = self.table_url(table, &format!("get/{}", id));
		self.send(Method::POST, url, params, format!("get {} record {}", table, id)).await
	}

	async fn create_record(&self, table: &str, params: &RecordsParams) -> Result<MutationResponse> {
		let url = self.table_url(table, "records");
		self.send(Method::POST, url, params, format!("create {} records", table)).await
	}

	async fn update_record(&self, table: &str, params: &RecordsParams) -> Result<MutationResponse> {
		let url = self.table_url(table, "records");
		self.send(Method::PUT, url, params, format!("update {} records", table)).await
	}

	async fn delete_record(&self, table: &str, params: &DeleteParams) -> Result<MutationResponse> {
		let url = self.table_url(table, "records");
		self.send(Method::DELETE, url, params, format!("delete {} records", table)).await
	}
}
