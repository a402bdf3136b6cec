// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image fingerprints: SHA-256 over the raw upload bytes.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`.
///
/// Computed over the bytes as uploaded, before decoding, so the same file
/// always maps to the same fingerprint regardless of preprocessing.
pub fn fingerprint(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Whether `value` has the shape of a fingerprint (64 lowercase hex digits).
pub fn is_fingerprint(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SHA-256 of the empty byte slice (well-known constant).
    const EMPTY_SHA256: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn empty_input() {
        assert_eq!(fingerprint(b""), EMPTY_SHA256);
    }

    #[test]
    fn known_value() {
        let expected = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        assert_eq!(fingerprint(b"hello"), expected);
    }

    #[test]
    fn shape_check() {
        assert!(is_fingerprint(&fingerprint(b"scan.png")));
        assert!(!is_fingerprint("abc"));
        assert!(!is_fingerprint(&EMPTY_SHA256.to_uppercase()));
    }
}
