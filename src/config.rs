use std::path::Path;

use crate::gateway::GatewayConfig;

#[derive(serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
	pub gateway: GatewayConfig,
}

impl Config {
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ()> {
		let path = path.as_ref();
		let data = std::fs::read_to_string(path)
			.map_err(|e| log::error!("Failed to read configuration file: {}: {e}", path.display()))?;
		Self::parse(&data)
			.map_err(|e| log::error!("Failed to parse configuration file: {}: {e}", path.display()))
	}

	pub fn parse(data: &str) -> Result<Self, toml::de::Error> {
		toml::from_str(data)
	}
}
