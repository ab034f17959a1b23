// std
use std::{
	ffi::OsString,
	fs,
	path::{Path, PathBuf},
};
// crates.io
use serde::{de::DeserializeOwned, Serialize};
// self
use crate::prelude::*;

pub fn read_json<T>(path: &Path) -> Result<T>
where
	T: DeserializeOwned,
{
	Ok(serde_json::from_slice(&fs::read(path)?)?)
}

pub fn write_json<T>(path: &Path, value: &T) -> Result<()>
where
	T: ?Sized + Serialize,
{
	write_atomic(path, serde_json::to_string_pretty(value)?.as_bytes())
}

pub fn write_text(path: &Path, text: &str) -> Result<()> {
	write_atomic(path, text.as_bytes())
}

// Replace `path` only once `data` is fully written, so a failure never leaves it truncated.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
	let tmp = tmp_path(path);

	if let Err(e) = fs::write(&tmp, data).and_then(|_| fs::rename(&tmp, path)) {
		let _ = fs::remove_file(&tmp);

		Err(e)?;
	}

	tracing::debug!("wrote {} bytes to {path:?}", data.len());

	Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
	let mut name = path.file_name().map(OsString::from).unwrap_or_default();

	name.push(".tmp");

	path.with_file_name(name)
}
