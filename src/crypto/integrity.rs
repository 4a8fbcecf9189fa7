//! Key derivation and secret comparison. The operator secret is turned into a
//! fixed-size AES-256 key here and nowhere else, so the codec never sees the
//! raw secret.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

pub const DERIVED_KEY_LEN: usize = 32;

/// 256-bit symmetric key derived from the operator secret.
///
/// Opaque on purpose: the bytes are only reachable from inside the crate and
/// `Debug` never prints them.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKey([u8; DERIVED_KEY_LEN]);

impl DerivedKey {
    pub(crate) fn as_bytes(&self) -> &[u8; DERIVED_KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(<redacted>)")
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Produces a raw SHA-256 digest of the provided bytes.
pub fn sha256_digest(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Derives the token key from the operator secret: SHA-256 over the raw
/// UTF-8 bytes. Deterministic, and the same secret always yields the same key.
///
/// Rejecting an empty secret is the caller's job (see `config`).
pub fn derive_key(secret: &str) -> DerivedKey {
    DerivedKey(sha256_digest(secret.as_bytes()))
}

/// Compares a presented credential against the operator secret without
/// leaking the position of the first mismatching byte. Both sides are hashed
/// first so the comparison is always over equal-length inputs.
pub fn secrets_match(presented: &str, expected: &str) -> bool {
    let mut lhs = sha256_digest(presented.as_bytes());
    let mut rhs = sha256_digest(expected.as_bytes());
    let equal: bool = lhs.ct_eq(&rhs).into();
    lhs.zeroize();
    rhs.zeroize();
    equal
}

#[cfg(test)]
mod tests {
    use super::{derive_key, secrets_match};
    use hex::ToHex;

    #[test]
    fn derived_key_is_sha256_of_secret() {
        let key = derive_key("abc");
        assert_eq!(
            key.as_bytes().encode_hex::<String>(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn derivation_is_deterministic() {
        assert_eq!(derive_key("s3cret"), derive_key("s3cret"));
        assert_ne!(derive_key("s3cret"), derive_key("s3cret "));
    }

    #[test]
    fn debug_output_is_redacted() {
        let printed = format!("{:?}", derive_key("s3cret"));
        assert_eq!(printed, "DerivedKey(<redacted>)");
    }

    #[test]
    fn compares_secrets() {
        assert!(secrets_match("s3cret", "s3cret"));
        assert!(!secrets_match("s3cre", "s3cret"));
        assert!(!secrets_match("", "s3cret"));
    }
}
