//! Cryptography for delivery tokens: key derivation and hashing helpers in
//! `integrity`, the authenticated token codec in `token`. The codec only ever
//! sees a derived key, never the operator secret itself.

pub mod integrity;
pub mod token;

pub use integrity::{derive_key, DerivedKey};
pub use token::{TokenCodec, TokenError};
