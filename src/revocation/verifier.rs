// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::icrlprovider::ICrlProvider;
use crate::tcbinfo::{
    contains_all, has_tcb_info_extension, tcb_infos_from_extensions, TcbInfoMeasurement,
};
use crate::x509::{Certificate, Crl, CrlEntry, Extension, ISignatureVerifier, SignatureAlgorithm};
use chrono::{DateTime, Utc};
use log::{debug, error, warn};

/// Which CRL entries revoke a certificate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevocationMode {
    /// every entry revokes by serial number
    SerialNumber,
    /// entries without TcbInfo revoke by serial number, entries with
    /// TcbInfo revoke every certificate reporting those measurements
    Dice,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RevocationReason {
    SerialNumber,
    Measurement(String),
}

/// Walks a chain from leaf to root, checking each non-root certificate
/// against the CRL named by its first distribution point
pub struct RevocationVerifier<'a> {
    crl_provider: &'a dyn ICrlProvider,
    signature_verifier: &'a dyn ISignatureVerifier,
    mode: RevocationMode,
    require_crl_for_leaf: bool,
    now: Option<DateTime<Utc>>,
}

impl<'a> RevocationVerifier<'a> {
    pub fn new(
        crl_provider: &'a dyn ICrlProvider,
        signature_verifier: &'a dyn ISignatureVerifier,
    ) -> Self {
        Self {
            crl_provider,
            signature_verifier,
            mode: RevocationMode::Dice,
            require_crl_for_leaf: false,
            now: None,
        }
    }

    pub fn mode(mut self, mode: RevocationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Fail when the leaf has no CRL distribution point.  Certificates
    /// above the leaf always need one.
    pub fn require_crl_for_leaf(mut self, require: bool) -> Self {
        self.require_crl_for_leaf = require;
        self
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn verify(&self, chain: &[Certificate]) -> bool {
        if chain.is_empty() {
            error!("Empty chain, nothing to check for revocation");
            return false;
        }

        if !self.require_crl_for_leaf
            && chain.iter().all(|c| c.crl_distribution_points.is_empty())
        {
            warn!("No certificate in the chain names a CRL distribution point, skipping revocation");
            return true;
        }

        self.verify_from(chain, 0, self.require_crl_for_leaf)
    }

    fn verify_from(&self, chain: &[Certificate], pos: usize, require_crl: bool) -> bool {
        // the root is trusted as-is
        if pos + 1 >= chain.len() {
            return true;
        }

        let cert = &chain[pos];

        let Some(url) = cert.crl_distribution_points.first() else {
            if require_crl {
                error!(
                    "Certificate {} has no CRL distribution point",
                    cert.subject_name
                );
                return false;
            }

            debug!(
                "Certificate {} has no CRL distribution point, skipping",
                cert.subject_name
            );
            return self.verify_from(chain, pos + 1, true);
        };

        if !self.verify_against_crl(url, chain, pos) {
            return false;
        }

        self.verify_from(chain, pos + 1, true)
    }

    fn verify_against_crl(&self, url: &str, chain: &[Certificate], pos: usize) -> bool {
        let cert = &chain[pos];

        let crl = match self.crl_provider.get_crl(url) {
            Ok(crl) => crl,
            Err(e) => {
                error!("Fetching CRL for {} failed: {e}", cert.subject_name);
                return false;
            }
        };

        if !self.verify_crl_signature(&crl, &chain[pos + 1..]) {
            error!(
                "CRL {url} is not signed by any issuer of {}",
                cert.subject_name
            );
            return false;
        }

        self.check_freshness(&crl, url);

        match self.revocation_reason(&crl, cert) {
            Ok(None) => true,
            Ok(Some(reason)) => {
                error!(
                    "Certificate {} with serial number {} is revoked by {url}: {reason:?}",
                    cert.subject_name,
                    hex::encode(&cert.serial)
                );
                false
            }
            Err(e) => {
                error!(
                    "Checking {} against CRL {url} failed: {e}",
                    cert.subject_name
                );
                false
            }
        }
    }

    // the first certificate at or above the issuer position whose key
    // verifies the CRL wins
    fn verify_crl_signature(&self, crl: &Crl, candidates: &[Certificate]) -> bool {
        let alg = match SignatureAlgorithm::from_oid(&crl.signature_algorithm) {
            Ok(alg) => alg,
            Err(e) => {
                error!("CRL issued by {}: {e}", crl.issuer_name);
                return false;
            }
        };

        candidates.iter().any(|c| {
            self.signature_verifier
                .verify(&crl.tbs, &crl.signature, alg, &c.public_key)
        })
    }

    fn check_freshness(&self, crl: &Crl, url: &str) {
        let now = self.now.unwrap_or_else(Utc::now);

        if let Some(next_update) = crl.next_update {
            if next_update < now {
                warn!("CRL {url} is stale: next update was due at {next_update}");
            }
        }
    }

    /// Decide whether `cert` is revoked by `crl`.  Fails only when TcbInfo
    /// extensions cannot be decoded.
    pub fn revocation_reason(
        &self,
        crl: &Crl,
        cert: &Certificate,
    ) -> Result<Option<RevocationReason>, crate::tcbinfo::Error> {
        let is_serial_entry = |e: &&CrlEntry| {
            self.mode == RevocationMode::SerialNumber || !has_tcb_info_extension(&e.extensions)
        };

        if crl
            .entries
            .iter()
            .filter(is_serial_entry)
            .any(|e| same_serial(&e.serial, &cert.serial))
        {
            return Ok(Some(RevocationReason::SerialNumber));
        }

        if self.mode == RevocationMode::SerialNumber {
            return Ok(None);
        }

        let reported = measurements_of(&cert.extensions)?;

        for entry in crl
            .entries
            .iter()
            .filter(|e| has_tcb_info_extension(&e.extensions))
        {
            let mut revoked = measurements_of(&entry.extensions)?;

            for m in revoked.iter_mut() {
                if let Some(vi) = m.value.masked_vendor_info.as_mut() {
                    vi.set_default_mask();
                }
            }

            if !revoked.is_empty() && contains_all(&reported, &revoked) {
                let what: Vec<String> = revoked.iter().map(|m| m.to_string()).collect();
                return Ok(Some(RevocationReason::Measurement(what.join("; "))));
            }
        }

        Ok(None)
    }
}

fn measurements_of(
    extensions: &[Extension],
) -> Result<Vec<TcbInfoMeasurement>, crate::tcbinfo::Error> {
    Ok(tcb_infos_from_extensions(extensions)?
        .into_iter()
        .map(TcbInfoMeasurement::from)
        .collect())
}

// INTEGER encodings may differ in leading zero octets
fn same_serial(a: &[u8], b: &[u8]) -> bool {
    fn trim(s: &[u8]) -> &[u8] {
        let n = s.iter().take_while(|b| **b == 0).count();
        &s[n..]
    }

    trim(a) == trim(b)
}
