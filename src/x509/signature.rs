// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use log::warn;
use openssl::bn::BigNum;
use openssl::ecdsa::EcdsaSig;
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::sign::Verifier;

/// Signature schemes understood by the verifiers.  X.509 schemes carry
/// DER-encoded signatures, COSE schemes carry raw `r || s`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    EcdsaSha256,
    EcdsaSha384,
    EcdsaSha512,
    RsaSha256,
    RsaSha384,
    RsaSha512,
    CoseEs256,
    CoseEs384,
    CoseEs512,
}

impl SignatureAlgorithm {
    /// Map an X.509 AlgorithmIdentifier OID
    pub fn from_oid(oid: &str) -> Result<Self, Error> {
        match oid {
            "1.2.840.10045.4.3.2" => Ok(Self::EcdsaSha256),
            "1.2.840.10045.4.3.3" => Ok(Self::EcdsaSha384),
            "1.2.840.10045.4.3.4" => Ok(Self::EcdsaSha512),
            "1.2.840.113549.1.1.11" => Ok(Self::RsaSha256),
            "1.2.840.113549.1.1.12" => Ok(Self::RsaSha384),
            "1.2.840.113549.1.1.13" => Ok(Self::RsaSha512),
            unknown => Err(Error::UnsupportedAlgorithm(format!(
                "signature algorithm {unknown}"
            ))),
        }
    }

    /// Map a COSE "alg" header value
    pub fn from_cose(alg: i128) -> Result<Self, Error> {
        match alg {
            -7 => Ok(Self::CoseEs256),
            -35 => Ok(Self::CoseEs384),
            -36 => Ok(Self::CoseEs512),
            unknown => Err(Error::UnsupportedAlgorithm(format!("COSE alg {unknown}"))),
        }
    }

    fn digest(&self) -> MessageDigest {
        match self {
            Self::EcdsaSha256 | Self::RsaSha256 | Self::CoseEs256 => MessageDigest::sha256(),
            Self::EcdsaSha384 | Self::RsaSha384 | Self::CoseEs384 => MessageDigest::sha384(),
            Self::EcdsaSha512 | Self::RsaSha512 | Self::CoseEs512 => MessageDigest::sha512(),
        }
    }

    fn is_raw_ecdsa(&self) -> bool {
        matches!(self, Self::CoseEs256 | Self::CoseEs384 | Self::CoseEs512)
    }
}

/// Checks a signature over a message with a public key
pub trait ISignatureVerifier {
    /// `public_key` is a DER-encoded SubjectPublicKeyInfo
    fn verify(
        &self,
        message: &[u8],
        signature: &[u8],
        algorithm: SignatureAlgorithm,
        public_key: &[u8],
    ) -> bool;
}

/// OpenSSL-backed signature verification
#[derive(Debug, Default)]
pub struct OpensslSignatureVerifier;

impl OpensslSignatureVerifier {
    pub fn new() -> Self {
        Self
    }

    fn try_verify(
        &self,
        message: &[u8],
        signature: &[u8],
        algorithm: SignatureAlgorithm,
        public_key: &[u8],
    ) -> Result<bool, ErrorStack> {
        let pkey = PKey::public_key_from_der(public_key)?;

        let sig = if algorithm.is_raw_ecdsa() {
            raw_ecdsa_to_der(signature)?
        } else {
            signature.to_vec()
        };

        let mut verifier = Verifier::new(algorithm.digest(), &pkey)?;
        verifier.update(message)?;
        verifier.verify(&sig)
    }
}

impl ISignatureVerifier for OpensslSignatureVerifier {
    fn verify(
        &self,
        message: &[u8],
        signature: &[u8],
        algorithm: SignatureAlgorithm,
        public_key: &[u8],
    ) -> bool {
        match self.try_verify(message, signature, algorithm, public_key) {
            Ok(ok) => ok,
            Err(e) => {
                warn!("{algorithm:?} signature could not be checked: {e}");
                false
            }
        }
    }
}

fn raw_ecdsa_to_der(sig: &[u8]) -> Result<Vec<u8>, ErrorStack> {
    let (r, s) = sig.split_at(sig.len() / 2);

    EcdsaSig::from_private_components(BigNum::from_slice(r)?, BigNum::from_slice(s)?)?.to_der()
}
