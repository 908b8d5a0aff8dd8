// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::certificate::Certificate;
use log::{error, warn};

/// Lowercase hex SHA-256 of the certificate DER
pub fn root_hash(cert: &Certificate) -> String {
    hex::encode(openssl::sha::sha256(&cert.der))
}

/// Pin the chain root to a configured hash.  Without a configured hash the
/// check is skipped.
pub fn verify_root_hash(root: &Certificate, trusted: Option<&str>) -> bool {
    let Some(trusted) = trusted else {
        warn!("No trusted root hash configured, skipping root pinning");
        return true;
    };

    let actual = root_hash(root);

    if !actual.eq_ignore_ascii_case(trusted.trim()) {
        error!(
            "Root certificate {} hash {actual} does not match trusted hash {trusted}",
            root.subject_name
        );
        return false;
    }

    true
}

/// Like [verify_root_hash], against a set of acceptable hashes
pub fn verify_root_hash_any(root: &Certificate, trusted: &[String]) -> bool {
    if trusted.is_empty() {
        return verify_root_hash(root, None);
    }

    let actual = root_hash(root);

    if trusted.iter().any(|t| actual.eq_ignore_ascii_case(t.trim())) {
        return true;
    }

    error!(
        "Root certificate {} hash {actual} matches none of the {} trusted hashes",
        root.subject_name,
        trusted.len()
    );

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cert() -> Certificate {
        Certificate {
            der: b"abc".to_vec(),
            ..Default::default()
        }
    }

    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn pinned_root() {
        assert!(verify_root_hash(&cert(), Some(ABC_SHA256)));
        assert!(verify_root_hash(&cert(), Some(&ABC_SHA256.to_uppercase())));
        assert!(!verify_root_hash(&cert(), Some("00")));
    }

    #[test]
    fn unpinned_root() {
        assert!(verify_root_hash(&cert(), None));
        assert!(verify_root_hash_any(&cert(), &[]));
    }

    #[test]
    fn any_of_several() {
        let trusted = vec!["00".to_string(), ABC_SHA256.to_uppercase()];
        assert!(verify_root_hash_any(&cert(), &trusted));
        assert!(!verify_root_hash_any(&cert(), &trusted[..1]));
    }
}
