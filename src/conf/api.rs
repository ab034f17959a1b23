// std
use std::time::Duration;
// crates.io
use serde::{Deserialize, Serialize};
// self
use crate::pipeline::{Backoff, PipelineConf};

#[derive(Debug, Serialize, Deserialize)]
pub struct Conf {
	pub listing: ListingConf,
	pub lookup: LookupConf,
	pub signer: SignerConf,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ListingConf {
	pub uri: String,
	pub page_size: u32,
	pub timeout_ms: u64,
}
impl ListingConf {
	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LookupConf {
	pub uris: Vec<String>,
	pub user_agent: String,
	pub timeout_ms: u64,
	pub workers: usize,
	pub min_backoff_ms: u64,
	pub max_backoff_ms: u64,
	pub max_attempts: Option<u32>,
	pub progress_interval_ms: u64,
}
impl LookupConf {
	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}

	pub fn pipeline_conf(&self, workers: Option<usize>) -> PipelineConf {
		PipelineConf {
			workers: workers.unwrap_or(self.workers),
			backoff: Backoff {
				min: Duration::from_millis(self.min_backoff_ms),
				max: Duration::from_millis(self.max_backoff_ms),
			},
			max_attempts: self.max_attempts,
			progress_interval: Duration::from_millis(self.progress_interval_ms),
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SignerConf {
	pub uri: String,
	pub user_agent: String,
}
