pub mod api;
pub mod btc;

// std
use std::{fs, path::{Path, PathBuf}};
// crates.io
use app_dirs2::{AppDataType, AppInfo};
use serde::{Deserialize, Serialize};
// self
use crate::prelude::*;

const APP_INFO: AppInfo = AppInfo { name: "btc-utxo-consolidator", author: "btc-utxo-consolidator" };
const DEFAULT_CONF: &str = r#"[btc]
# Network configuration.
# Possible values: "bitcoin", "testnet", "signet", "regtest".
network = "bitcoin"

# Coin name reported to the signer.
coin-name = "Bitcoin"

# BIP-32 path of the consolidated address, used to sign every input.
input-path = "m/49'/0'/0'/0/0"

[api.listing]
# BitGo v1 API.
uri = "https://www.bitgo.com/api/v1"

# Initial number of unspents per page, halved on every failed page (at most 5000).
page-size = 5000

# A full page of 5000 unspents can take a while.
timeout-ms = 60000

[api.lookup]
# Blockbook backends, spread over the workers round robin.
uris = [
	"https://btc1.trezor.io/api",
	"https://btc2.trezor.io/api",
	"https://btc3.trezor.io/api",
	"https://btc4.trezor.io/api",
	"https://btc5.trezor.io/api",
]
user-agent = "trezorlib"
timeout-ms = 1000

workers = 5

# Delay after the nth consecutive failure of a worker: min(max, min * 2^n).
min-backoff-ms = 500
max-backoff-ms = 500

# Give up after this many failed attempts on a single transaction.
# Retry forever if unset.
# max-attempts = 100

progress-interval-ms = 100

[api.signer]
# Receives the signer request as JSON and answers with the signed transaction in hex.
uri = "http://127.0.0.1:8080/sign"
user-agent = "btc-utxo-consolidator"
"#;

#[derive(Debug, Serialize, Deserialize)]
pub struct Conf {
	pub btc: btc::Conf,
	pub api: api::Conf,
}
impl Conf {
	pub fn default_path() -> Result<PathBuf> {
		Ok(app_dirs2::app_root(AppDataType::UserConfig, &APP_INFO)?.join("conf.toml"))
	}

	pub fn load_from(path: &Path) -> Result<Self> {
		if path.is_file() {
			Ok(toml::from_str(&fs::read_to_string(path)?)?)
		} else {
			tracing::info!(
				"no configuration file found at {path:?}, \
				use the default one, \
				save the template there to customize it"
			);

			Self::template()
		}
	}

	pub fn template() -> Result<Self> {
		Ok(toml::from_str(DEFAULT_CONF)?)
	}
}

#[test]
fn template_should_work() {
	let c = Conf::template().unwrap();

	assert_eq!(c.btc.network, bitcoin::Network::Bitcoin);
	assert_eq!(c.btc.input_path, "m/49'/0'/0'/0/0");
	assert_eq!(c.api.listing.page_size, 5_000);
	assert_eq!(c.api.listing.timeout(), std::time::Duration::from_secs(60));
	assert_eq!(c.api.lookup.uris.len(), 5);
	assert_eq!(c.api.lookup.max_attempts, None);

	let p = c.api.lookup.pipeline_conf(None);

	assert_eq!(p.workers, 5);
	assert_eq!(p.backoff, crate::pipeline::Backoff::default());
	assert_eq!(p.progress_interval, std::time::Duration::from_millis(100));
	assert_eq!(c.api.lookup.pipeline_conf(Some(9)).workers, 9);
}

#[test]
fn load_from_should_work() {
	let dir = std::env::temp_dir().join(format!("btc-utxo-consolidator-conf-{}", std::process::id()));

	fs::create_dir_all(&dir).unwrap();

	let p = dir.join("conf.toml");

	assert_eq!(Conf::load_from(&p).unwrap().api.lookup.workers, 5);

	fs::write(&p, DEFAULT_CONF.replace("workers = 5", "workers = 2").replace("# max-attempts", "max-attempts"))
		.unwrap();

	let c = Conf::load_from(&p).unwrap();

	assert_eq!(c.api.lookup.workers, 2);
	assert_eq!(c.api.lookup.max_attempts, Some(100));

	fs::remove_dir_all(dir).unwrap();
}
