//! Bitcoin UTXO consolidation tool.

#![deny(
	// clippy::all,
	missing_docs,
	unused_crate_dependencies,
	// warnings,
)]

mod chain;
mod cli;
mod conf;
mod discovery;
mod error;
mod filter;
mod http;
mod pipeline;
mod service;
mod util;

mod prelude {
	pub use crate::error::*;

	pub type Result<T> = std::result::Result<T, Error>;
}

// crates.io
use clap::Parser;
use tracing::Level;

fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let cli = cli::Cli::parse();

	tracing_subscriber::fmt()
		.with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
		.with_writer(std::io::stderr)
		.init();

	service::run(cli)?;

	Ok(())
}
