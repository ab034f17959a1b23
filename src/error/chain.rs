#[derive(Debug, thiserror::Error)]
pub enum ChainError {
	#[error("[chain] insufficient funds: required {required}, available {available}")]
	InsufficientFunds { required: u128, available: u128 },
	#[error("[chain] no inputs to consolidate")]
	NoInputs,
	#[error("[chain] transaction {txid} has no output {index}")]
	MissingOutput { txid: String, index: u32 },
	#[error("[chain] malformed transaction {txid}: {reason}")]
	MalformedTx { txid: String, reason: String },
	#[error("[chain] unsupported script type {script_type:?} of {txid}:{index}")]
	UnsupportedScriptType { script_type: String, txid: String, index: u32 },
}
