// std
use std::path::PathBuf;
// crates.io
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
	/// Path to the configuration file.
	///
	/// Defaults to `conf.toml` under the user configuration directory.
	#[arg(long, global = true, value_name = "PATH")]
	pub conf: Option<PathBuf>,

	/// Enable debug logging.
	#[arg(long, global = true)]
	pub debug: bool,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Download the UTXOs of an address together with their parent transactions.
	#[command(visible_alias = "dl")]
	Download(DownloadArgs),
	/// List the downloaded UTXOs.
	#[command(visible_alias = "ls")]
	List(ListArgs),
	/// Create a consolidation transaction request from the downloaded UTXOs.
	#[command(visible_alias = "tx")]
	Build(BuildArgs),
	/// Sign a transaction request with the external signer.
	#[command(visible_alias = "sg")]
	Sign(SignArgs),
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
	/// Address whose UTXOs are consolidated.
	#[arg(long)]
	pub input_address: Option<String>,

	/// File to store the UTXOs and their parent transactions.
	#[arg(long, default_value = "utxo.json")]
	pub outfile: PathBuf,

	/// Maximum number of UTXOs to fetch.
	#[arg(long, default_value_t = 10_000)]
	pub utxo_fetch_limit: usize,

	/// Also store the bare UTXO list in this file.
	#[arg(long)]
	pub utxo_id_file: Option<PathBuf>,

	/// Override the configured number of lookup workers.
	#[arg(long)]
	pub workers: Option<usize>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
	/// File holding the downloaded UTXOs.
	#[arg(long, default_value = "utxo.json")]
	pub utxo_file: PathBuf,

	/// Filter expression, e.g. `value < 100_000 and confirmations > 6`.
	#[arg(long)]
	pub utxo_filter_query: Option<String>,
}

#[derive(Debug, Args)]
pub struct BuildArgs {
	/// File holding the downloaded UTXOs.
	#[arg(long, default_value = "utxo.json")]
	pub utxo_file: PathBuf,

	/// Filter expression selecting the UTXOs to consolidate.
	#[arg(long)]
	pub utxo_filter_query: Option<String>,

	/// Address receiving the consolidated amount.
	#[arg(long)]
	pub output_address: Option<String>,

	/// BIP-32 path used to sign every input. Defaults to the configured path.
	#[arg(long)]
	pub input_path: Option<String>,

	/// Estimated fee in satoshis per virtual byte (a very rough estimate).
	#[arg(long, default_value_t = 10)]
	pub est_fee_sats_per_vbyte: u64,

	/// File to store the signer request.
	#[arg(long, default_value = "signer_request.json")]
	pub request_file: PathBuf,
}

#[derive(Debug, Args)]
pub struct SignArgs {
	/// File holding the signer request.
	#[arg(long, default_value = "signer_request.json")]
	pub request_file: PathBuf,

	/// File to store the signed transaction hex.
	#[arg(long, default_value = "signed_tx.txt")]
	pub signed_tx_file: PathBuf,
}

#[test]
fn cli_should_parse_aliases() {
	let cli = Cli::parse_from(["btc-utxo-consolidator", "dl", "--input-address", "3Abc"]);

	match cli.command {
		Command::Download(a) => {
			assert_eq!(a.input_address.as_deref(), Some("3Abc"));
			assert_eq!(a.utxo_fetch_limit, 10_000);
			assert_eq!(a.outfile, PathBuf::from("utxo.json"));
		},
		c => panic!("unexpected command {c:?}"),
	}

	let cli = Cli::parse_from(["btc-utxo-consolidator", "--debug", "tx", "--output-address", "bc1q"]);

	assert!(cli.debug);
	assert!(matches!(cli.command, Command::Build(BuildArgs { est_fee_sats_per_vbyte: 10, .. })));
}
