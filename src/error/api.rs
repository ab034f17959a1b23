#[derive(Debug, thiserror::Error)]
pub enum ApiError {
	#[error("[api] max retries exceeded for {txid} after {retries} attempts")]
	ExceededMaxRetries { txid: String, retries: u32 },
	#[error("[api] invalid unspents page, start {start} plus count {count} overflows")]
	InvalidPage { start: u64, count: u64 },
	#[error("[api] fail to list unspents at skip {skip} even with a page size of 1: {reason}")]
	PageSizeExhausted { skip: u64, reason: String },
}
