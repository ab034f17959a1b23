pub mod bitgo;
pub mod signer;
pub mod trezor;
