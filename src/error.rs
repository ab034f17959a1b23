pub mod api;
pub use api::*;

pub mod chain;
pub use chain::*;

pub mod service;
pub use service::*;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	AppDirs2(#[from] app_dirs2::AppDirsError),
	#[error("{0:?}")]
	ArrayBytes(array_bytes::Error),
	#[error(transparent)]
	Bitcoin(#[from] BitcoinError),
	#[error(transparent)]
	Indicatif(#[from] indicatif::style::TemplateError),
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	TokioJoin(#[from] tokio::task::JoinError),
	#[error(transparent)]
	Toml(#[from] toml::de::Error),

	#[error(transparent)]
	Api(#[from] ApiError),
	#[error(transparent)]
	Chain(#[from] ChainError),
	#[error(transparent)]
	Service(#[from] ServiceError),
}

#[derive(Debug, thiserror::Error)]
pub enum BitcoinError {
	#[error(transparent)]
	Amount(#[from] bitcoin::amount::ParseAmountError),
	#[error(transparent)]
	Bip32(#[from] bitcoin::bip32::Error),
	#[error(transparent)]
	HexToArray(#[from] bitcoin::hex::HexToArrayError),
	#[error(transparent)]
	Parse(#[from] bitcoin::address::ParseError),
}
