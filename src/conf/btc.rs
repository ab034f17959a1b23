// crates.io
use bitcoin::Network;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Conf {
	pub network: Network,
	pub coin_name: String,
	pub input_path: String,
}
