// std
use std::{path::Path, sync::Arc};
// crates.io
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
// self
use crate::{
	chain::btc::{
		api::{
			bitgo,
			signer::{self, Signer},
			trezor,
		},
		types::{SignerRequest, UtxoTx},
		ConsolidationTxBuilder,
	},
	cli::*,
	conf::Conf,
	discovery::{Discovery, UnspentSource},
	filter::Filter,
	http::Client,
	pipeline::{Pipeline, TxSource},
	prelude::*,
	util,
};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub fn run(cli: Cli) -> Result<()> {
	let conf = load_conf(cli.conf.as_deref())?;

	Runtime::new()?.block_on(async {
		match cli.command {
			Command::Download(args) => download(&conf, args).await,
			Command::List(args) => list(args),
			Command::Build(args) => build(&conf, args),
			Command::Sign(args) => sign(&conf, args).await,
		}
	})
}

fn load_conf(path: Option<&Path>) -> Result<Conf> {
	let p = match path {
		Some(p) => p.to_owned(),
		None => Conf::default_path()?,
	};

	match Conf::load_from(&p) {
		Ok(c) => Ok(c),
		r => {
			tracing::error!(
				"an error occurred while parsing the configuration, \
				please check the {p:?}",
			);

			r
		},
	}
}

async fn download(conf: &Conf, args: DownloadArgs) -> Result<()> {
	let address = args.input_address.clone().ok_or(ServiceError::MissingArgument("input-address"))?;
	let listing = bitgo::Api {
		http: Client::new(USER_AGENT, Some(conf.api.listing.timeout()))?,
		base_uri: conf.api.listing.uri.clone(),
	};
	let lookup = trezor::Api {
		http: Client::new(&conf.api.lookup.user_agent, Some(conf.api.lookup.timeout()))?,
		base_uris: conf.api.lookup.uris.clone(),
	};
	let shutdown = CancellationToken::new();
	let watcher = tokio::spawn({
		let shutdown = shutdown.clone();

		async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				tracing::warn!("received ctrl-c, shutting down");

				shutdown.cancel();
			}
		}
	});
	let r = download_with(&listing, lookup, conf, &args, &address, &shutdown).await;

	watcher.abort();

	r
}

async fn download_with<L, S>(
	listing: &L,
	lookup: S,
	conf: &Conf,
	args: &DownloadArgs,
	address: &str,
	shutdown: &CancellationToken,
) -> Result<()>
where
	L: UnspentSource,
	S: TxSource,
{
	let utxos = Discovery {
		source: listing,
		address,
		fetch_limit: args.utxo_fetch_limit,
		page_size: conf.api.listing.page_size,
		shutdown,
	}
	.run()
	.await?;

	if let Some(p) = &args.utxo_id_file {
		util::write_json(p, &utxos)?;

		tracing::info!("saved {} UTXO ids to {p:?}", utxos.len());
	}

	let pipeline =
		Pipeline { source: Arc::new(lookup), conf: conf.api.lookup.pipeline_conf(args.workers) };
	let fetched = pipeline.run(utxos, shutdown).await?;

	util::write_json(&args.outfile, &fetched.results)?;

	tracing::info!("saved {} UTXOs to {:?}", fetched.results.len(), args.outfile);

	Ok(())
}

fn list(args: ListArgs) -> Result<()> {
	let utxos = util::read_json::<Vec<UtxoTx>>(&args.utxo_file)?;

	for (i, u) in select(utxos, args.utxo_filter_query.as_deref())? {
		println!("{i} {} {}", u.utxo_id.value, u.utxo_id.txid);
	}

	Ok(())
}

// Pair every UTXO with its position in the file and keep those matching `query`.
fn select(utxos: Vec<UtxoTx>, query: Option<&str>) -> Result<Vec<(usize, UtxoTx)>> {
	let filter = query.map(Filter::parse).transpose()?;
	let total = utxos.len();
	let selected = utxos
		.into_iter()
		.enumerate()
		.filter(|(i, u)| filter.as_ref().map_or(true, |f| f.matches(*i, &u.utxo_id)))
		.collect::<Vec<_>>();

	tracing::info!("selected {}/{total} UTXOs", selected.len());

	Ok(selected)
}

fn build(conf: &Conf, args: BuildArgs) -> Result<()> {
	let recipient =
		args.output_address.as_deref().ok_or(ServiceError::MissingArgument("output-address"))?;
	let utxos = select(
		util::read_json::<Vec<UtxoTx>>(&args.utxo_file)?,
		args.utxo_filter_query.as_deref(),
	)?
	.into_iter()
	.map(|(_, u)| u)
	.collect::<Vec<_>>();
	let request = ConsolidationTxBuilder {
		coin_name: &conf.btc.coin_name,
		network: conf.btc.network,
		fee_rate: args.est_fee_sats_per_vbyte,
		input_path: args.input_path.as_deref().unwrap_or(&conf.btc.input_path),
		recipient,
		utxos: &utxos,
	}
	.build()?;

	util::write_json(&args.request_file, &request)?;

	tracing::info!("saved the signer request to {:?}", args.request_file);

	Ok(())
}

async fn sign(conf: &Conf, args: SignArgs) -> Result<()> {
	let request = util::read_json::<SignerRequest>(&args.request_file)?;
	let signer = signer::Api {
		http: Client::new(&conf.api.signer.user_agent, None)?,
		uri: conf.api.signer.uri.clone(),
	};

	sign_with(&signer, &request, &args.signed_tx_file).await
}

async fn sign_with<S>(signer: &S, request: &SignerRequest, path: &Path) -> Result<()>
where
	S: Signer,
{
	let raw = match signer.sign(request).await {
		Ok(r) => r,
		Err(e) => {
			tracing::error!("failed to sign the transaction, {path:?} is left untouched: {e}");

			Err(ServiceError::Signer(e.to_string()))?
		},
	};
	let tx_hex = array_bytes::bytes2hex("", &raw);

	util::write_text(path, &tx_hex)?;
	println!("{tx_hex}");

	tracing::info!("saved the signed transaction to {path:?}");

	Ok(())
}
