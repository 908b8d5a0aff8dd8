// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use crate::dp::IDistributionPointClient;
use crate::revocation::{ICrlProvider, RevocationMode, RevocationVerifier};
use crate::tcbinfo::DICE_EXTENSION_OIDS;
use crate::x509::primitives::verify_extended_key_usage;
use crate::x509::{
    verify_root_hash_any, Certificate, ChainVerifier, ISignatureVerifier, OID_KP_CODE_SIGNING,
};
use chrono::{DateTime, Utc};
use log::{debug, info};

/// Longest signer chain assembled through caIssuers links
pub const MAX_CHAIN_LENGTH: usize = 8;

/// Builds and validates the certificate chain of a manifest signer
pub struct SigningChainService<'a> {
    dp: &'a dyn IDistributionPointClient,
    signature_verifier: &'a dyn ISignatureVerifier,
    crl_provider: &'a dyn ICrlProvider,
    trusted_root_hashes: Vec<String>,
    known_extension_oids: Vec<String>,
    now: Option<DateTime<Utc>>,
}

impl<'a> SigningChainService<'a> {
    pub fn new(
        dp: &'a dyn IDistributionPointClient,
        signature_verifier: &'a dyn ISignatureVerifier,
        crl_provider: &'a dyn ICrlProvider,
    ) -> Self {
        Self {
            dp,
            signature_verifier,
            crl_provider,
            trusted_root_hashes: vec![],
            known_extension_oids: vec![],
            now: None,
        }
    }

    /// SHA-256 hex values accepted for the signer chain root.  Empty means
    /// any root.
    pub fn trusted_root_hashes(mut self, hashes: &[String]) -> Self {
        self.trusted_root_hashes = hashes.to_vec();
        self
    }

    pub fn known_extension_oids(mut self, oids: &[String]) -> Self {
        self.known_extension_oids = oids.to_vec();
        self
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    fn download(&self, href: &str) -> Result<Vec<u8>, Error> {
        self.dp
            .fetch_bytes(href)
            .ok_or_else(|| Error::Download(href.to_string()))
    }

    /// Fetch the certificate (or PEM bundle) at `href` and complete it
    /// upwards through caIssuers links
    pub fn fetch_chain(&self, href: &str) -> Result<Vec<Certificate>, Error> {
        let mut chain = Certificate::parse_all(&self.download(href)?)
            .map_err(|e| Error::Syntax(format!("signer certificate {href}: {e}")))?;

        while let Some(last) = chain.last() {
            if last.is_self_issued() {
                break;
            }

            let Some(parent) = last.ca_issuers.first().cloned() else {
                debug!("{} has no caIssuers link", last.subject_name);
                break;
            };

            if chain.len() >= MAX_CHAIN_LENGTH {
                return Err(Error::Signer(format!(
                    "chain longer than {MAX_CHAIN_LENGTH} certificates"
                )));
            }

            let parents = Certificate::parse_all(&self.download(&parent)?)
                .map_err(|e| Error::Syntax(format!("issuer certificate {parent}: {e}")))?;

            chain.extend(parents);
        }

        Ok(chain)
    }

    /// Validate the signer chain at `href` and return the signer's DER
    /// SubjectPublicKeyInfo.  `kid`, when present, must be the leaf SKI.
    pub fn resolve(&self, href: &str, kid: Option<&[u8]>) -> Result<Vec<u8>, Error> {
        let chain = self.fetch_chain(href)?;

        let Some(leaf) = chain.first() else {
            return Err(Error::Signer(format!("empty chain at {href}")));
        };

        if let Some(kid) = kid {
            if leaf.subject_key_id.as_deref() != Some(kid) {
                return Err(Error::Signer(format!(
                    "key identifier {} does not match {}",
                    hex::encode(kid),
                    leaf.subject_name
                )));
            }
        }

        if !verify_extended_key_usage(leaf, &[OID_KP_CODE_SIGNING.to_string()]) {
            return Err(Error::Signer(format!(
                "{} is not a code signing certificate",
                leaf.subject_name
            )));
        }

        let mut chain_verifier = ChainVerifier::new(self.signature_verifier)
            .known_extension_oids(DICE_EXTENSION_OIDS)
            .known_extension_oids(self.known_extension_oids.iter().cloned());

        let mut revocation_verifier =
            RevocationVerifier::new(self.crl_provider, self.signature_verifier)
                .mode(RevocationMode::SerialNumber)
                .require_crl_for_leaf(false);

        if let Some(now) = self.now {
            chain_verifier = chain_verifier.at(now);
            revocation_verifier = revocation_verifier.at(now);
        }

        chain_verifier
            .check(&chain, None)
            .map_err(|e| Error::Signer(e.to_string()))?;

        if let Some(root) = chain.last() {
            if !verify_root_hash_any(root, &self.trusted_root_hashes) {
                return Err(Error::Signer(format!(
                    "root {} is not trusted",
                    root.subject_name
                )));
            }
        }

        if !revocation_verifier.verify(&chain) {
            return Err(Error::Signer(format!("{} chain revoked", leaf.subject_name)));
        }

        info!("Manifest signer {} verified", leaf.subject_name);

        Ok(leaf.public_key.clone())
    }
}
