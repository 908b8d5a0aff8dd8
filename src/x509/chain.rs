// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::certificate::*;
use super::primitives::*;
use super::roothash::verify_root_hash;
use super::signature::ISignatureVerifier;
use chrono::{DateTime, Utc};
use log::{debug, error};
use std::collections::HashSet;

/// Extensions every chain may mark critical
pub const COMMON_EXTENSION_OIDS: [&str; 7] = [
    OID_BASIC_CONSTRAINTS,
    OID_KEY_USAGE,
    OID_EXTENDED_KEY_USAGE,
    OID_AUTHORITY_KEY_IDENTIFIER,
    OID_SUBJECT_KEY_IDENTIFIER,
    OID_AUTHORITY_INFO_ACCESS,
    OID_CRL_DISTRIBUTION_POINTS,
];

/// Why a chain was refused
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainFailure {
    /// too short, or the root hash does not match
    Structure(String),
    /// a certificate signature does not verify
    Signature(String),
    /// validity, naming, key usage, extension or constraint violations
    Policy(String),
}

impl std::fmt::Display for ChainFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structure(s) => write!(f, "chain structure: {s}"),
            Self::Signature(s) => write!(f, "signature: {s}"),
            Self::Policy(s) => write!(f, "certificate policy: {s}"),
        }
    }
}

impl std::error::Error for ChainFailure {}

/// Walks a chain from leaf (index 0) to root (last) checking each
/// certificate against its issuer.  The root is checked against itself.
pub struct ChainVerifier<'a> {
    signature_verifier: &'a dyn ISignatureVerifier,
    known_extension_oids: HashSet<String>,
    root_basic_constraints: Option<u32>,
    now: Option<DateTime<Utc>>,
}

impl<'a> ChainVerifier<'a> {
    pub fn new(signature_verifier: &'a dyn ISignatureVerifier) -> Self {
        Self {
            signature_verifier,
            known_extension_oids: COMMON_EXTENSION_OIDS.iter().map(|s| s.to_string()).collect(),
            root_basic_constraints: None,
            now: None,
        }
    }

    /// Accept additional critical extensions
    pub fn known_extension_oids<I, S>(mut self, oids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_extension_oids
            .extend(oids.into_iter().map(|s| s.into()));
        self
    }

    /// Path length the root must allow, instead of the one implied by the
    /// chain length
    pub fn root_basic_constraints(mut self, path_len: u32) -> Self {
        self.root_basic_constraints = Some(path_len);
        self
    }

    /// Check validity at a fixed instant rather than the current time
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn verify(&self, chain: &[Certificate], trusted_root_hash: Option<&str>) -> bool {
        self.check(chain, trusted_root_hash).is_ok()
    }

    pub fn check(
        &self,
        chain: &[Certificate],
        trusted_root_hash: Option<&str>,
    ) -> Result<(), ChainFailure> {
        if chain.len() <= 1 {
            error!("Chain of {} certificates is too short", chain.len());
            return Err(ChainFailure::Structure(format!(
                "chain of {} certificates",
                chain.len()
            )));
        }

        let now = self.now.unwrap_or_else(Utc::now);

        self.check_from(
            chain,
            ExpectedBasicConstraints::NotCa,
            KeyUsage::DigitalSignature,
            now,
        )?;

        let root = &chain[chain.len() - 1];

        if !verify_root_hash(root, trusted_root_hash) {
            return Err(ChainFailure::Structure(format!(
                "root {} is not trusted",
                root.subject_name
            )));
        }

        debug!("Chain of {} certificates verified", chain.len());

        Ok(())
    }

    fn check_from(
        &self,
        chain: &[Certificate],
        expected_bc: ExpectedBasicConstraints,
        expected_ku: KeyUsage,
        now: DateTime<Utc>,
    ) -> Result<(), ChainFailure> {
        match chain {
            [child, parent, ..] => {
                self.check_certificate(child, parent, expected_bc, expected_ku, now)?;
                self.check_from(&chain[1..], expected_bc.next(), KeyUsage::KeyCertSign, now)
            }
            [root] => {
                let bc = self
                    .root_basic_constraints
                    .map(ExpectedBasicConstraints::PathLen)
                    .unwrap_or(expected_bc);

                self.check_certificate(root, root, bc, expected_ku, now)
            }
            [] => Err(ChainFailure::Structure("empty chain".to_string())),
        }
    }

    fn check_certificate(
        &self,
        child: &Certificate,
        parent: &Certificate,
        expected_bc: ExpectedBasicConstraints,
        expected_ku: KeyUsage,
        now: DateTime<Utc>,
    ) -> Result<(), ChainFailure> {
        let subject = &child.subject_name;

        if !verify_validity(child, now) {
            return Err(ChainFailure::Policy(format!("{subject} expired or not yet valid")));
        }

        if !verify_signature(self.signature_verifier, child, parent) {
            return Err(ChainFailure::Signature(format!(
                "{subject} not signed by {}",
                parent.subject_name
            )));
        }

        if !verify_issuer(child, parent) {
            return Err(ChainFailure::Policy(format!("{subject} issuer mismatch")));
        }

        if !verify_authority_key_identifier(child, parent) {
            return Err(ChainFailure::Policy(format!(
                "{subject} authority key identifier mismatch"
            )));
        }

        if !verify_key_usage(child, expected_ku) {
            return Err(ChainFailure::Policy(format!(
                "{subject} lacks {expected_ku:?}"
            )));
        }

        if !verify_critical_extensions(child, &self.known_extension_oids) {
            return Err(ChainFailure::Policy(format!(
                "{subject} has an unknown critical extension"
            )));
        }

        if !verify_basic_constraints(child, expected_bc) {
            return Err(ChainFailure::Policy(format!(
                "{subject} basic constraints violation"
            )));
        }

        Ok(())
    }
}
