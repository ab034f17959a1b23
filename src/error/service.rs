#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
	#[error("[service] missing required argument --{0}")]
	MissingArgument(&'static str),
	#[error("[service] invalid filter query at offset {offset}: {reason}")]
	InvalidFilter { offset: usize, reason: String },
	#[error("[service] interrupted before every transaction was fetched")]
	Interrupted,
	#[error("[service] signer failed: {0}")]
	Signer(String),
}
