// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::certificate::Certificate;
use log::{debug, error};

/// Derives the key identifier a certificate's SKI is expected to carry
pub trait IKeyIdentifierResolver {
    fn key_identifier(&self, public_key_bits: &[u8]) -> Vec<u8>;
}

/// RFC 7093 §2 method 2: leftmost 160 bits of the SHA-384 of the
/// subjectPublicKey bits
#[derive(Debug, Default)]
pub struct Rfc7093Method2;

impl IKeyIdentifierResolver for Rfc7093Method2 {
    fn key_identifier(&self, public_key_bits: &[u8]) -> Vec<u8> {
        openssl::sha::sha384(public_key_bits)[..20].to_vec()
    }
}

pub struct SubjectKeyIdentifierVerifier<'a> {
    resolver: &'a dyn IKeyIdentifierResolver,
}

impl<'a> SubjectKeyIdentifierVerifier<'a> {
    pub fn new(resolver: &'a dyn IKeyIdentifierResolver) -> Self {
        Self { resolver }
    }

    /// A missing SKI is accepted; a present one must match the derived
    /// identifier
    pub fn verify(&self, cert: &Certificate) -> bool {
        let Some(ski) = &cert.subject_key_id else {
            debug!(
                "Certificate {} has no subject key identifier",
                cert.subject_name
            );
            return true;
        };

        let expected = self.resolver.key_identifier(&cert.public_key_bits);

        if *ski != expected {
            error!(
                "Subject key identifier {} of {} does not match the public key (expected {})",
                hex::encode(ski),
                cert.subject_name,
                hex::encode(&expected)
            );
            return false;
        }

        true
    }

    pub fn verify_all(&self, chain: &[Certificate]) -> bool {
        chain.iter().all(|c| self.verify(c))
    }
}
