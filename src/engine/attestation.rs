// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::config::VerifierConfig;
use super::errors::Error;
use super::result::{AttestationResult, RejectReason};
use crate::dp::IDistributionPointClient;
use crate::manifest::{self, ManifestResolver};
use crate::revocation::{ICrlProvider, RevocationMode, RevocationVerifier};
use crate::tcbinfo::{
    self, contains_all, tcb_infos_from_extensions, TcbInfoAggregator, TcbInfoMeasurement,
    TcbInfoVerifier, UeidVerifier, DICE_EXTENSION_OIDS,
};
use crate::x509::primitives::verify_extended_key_usage;
use crate::x509::{
    Certificate, ChainFailure, ChainVerifier, IKeyIdentifierResolver, ISignatureVerifier,
    Rfc7093Method2, SubjectKeyIdentifierVerifier,
};
use chrono::{DateTime, Utc};
use log::{error, info};

/// Decides whether a device is trustworthy from its certificate chain, the
/// measurements it reports and the manifest that describes its expected
/// state.  Holds no state across calls.
pub struct AttestationEngine<'a> {
    config: VerifierConfig,
    signature_verifier: &'a dyn ISignatureVerifier,
    crl_provider: &'a dyn ICrlProvider,
    dp: &'a dyn IDistributionPointClient,
    key_id_resolver: &'a dyn IKeyIdentifierResolver,
    device_id: Option<Vec<u8>>,
    now: Option<DateTime<Utc>>,
}

impl<'a> AttestationEngine<'a> {
    pub fn new(
        config: VerifierConfig,
        signature_verifier: &'a dyn ISignatureVerifier,
        crl_provider: &'a dyn ICrlProvider,
        dp: &'a dyn IDistributionPointClient,
    ) -> Self {
        Self {
            config,
            signature_verifier,
            crl_provider,
            dp,
            key_id_resolver: &Rfc7093Method2,
            device_id: None,
            now: None,
        }
    }

    pub fn key_identifier_resolver(mut self, resolver: &'a dyn IKeyIdentifierResolver) -> Self {
        self.key_id_resolver = resolver;
        self
    }

    /// Device id the chain UEIDs must name
    pub fn device_id(mut self, device_id: &[u8]) -> Self {
        self.device_id = Some(device_id.to_vec());
        self
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// `trusted_root_hash` overrides the configured one.  `Err` means the
    /// inputs could not be evaluated; a failed verification is
    /// `Ok(AttestationResult::Rejected(..))`.
    pub fn attest(
        &self,
        chain: &[Certificate],
        device_measurements: &[TcbInfoMeasurement],
        manifest_root: &[u8],
        trusted_root_hash: Option<&str>,
    ) -> Result<AttestationResult, Error> {
        let now = self.now.unwrap_or_else(Utc::now);

        let trusted_root_hash = trusted_root_hash.or(self.config.trusted_root_hash.as_deref());

        if let Err(e) = self.chain_verifier(now).check(chain, trusted_root_hash) {
            return Ok(reject(match e {
                ChainFailure::Structure(s) => RejectReason::ChainStructure(s),
                ChainFailure::Signature(s) => RejectReason::Signature(s),
                ChainFailure::Policy(s) => RejectReason::CertificatePolicy(s),
            }));
        }

        if !SubjectKeyIdentifierVerifier::new(self.key_id_resolver).verify_all(chain) {
            return Ok(reject(RejectReason::CertificatePolicy(
                "subject key identifier mismatch".to_string(),
            )));
        }

        if !verify_extended_key_usage(&chain[0], &self.config.leaf_key_purposes) {
            return Ok(reject(RejectReason::CertificatePolicy(format!(
                "{} lacks the required key purposes",
                chain[0].subject_name
            ))));
        }

        let chain_measurements = match self.chain_measurements(chain) {
            Ok(m) => m,
            Err(tcbinfo::Error::Conflict(s) | tcbinfo::Error::Policy(s)) => {
                return Ok(reject(RejectReason::CertificatePolicy(s)));
            }
            Err(e) => return Err(Error::Syntax(e.to_string())),
        };

        let revocation_verifier = RevocationVerifier::new(self.crl_provider, self.signature_verifier)
            .mode(RevocationMode::Dice)
            .require_crl_for_leaf(self.config.require_crl_for_leaf)
            .at(now);

        if !revocation_verifier.verify(chain) {
            return Ok(reject(RejectReason::Revocation(
                "device certificate chain revoked".to_string(),
            )));
        }

        info!("Device chain of {} certificates verified", chain.len());

        let resolver = ManifestResolver::new(
            self.dp,
            self.signature_verifier,
            self.crl_provider,
            self.config.resolver_options()?,
        )
        .at(now);

        let reference = match resolver.resolve(manifest_root) {
            Ok(r) => r,
            Err(manifest::Error::Syntax(s)) => return Err(Error::Syntax(s)),
            Err(e) => return Ok(reject(RejectReason::Manifest(e.to_string()))),
        };

        let mut candidates = device_measurements.to_vec();
        candidates.extend(chain_measurements);

        if !contains_all(&candidates, &reference.reference) {
            return Ok(reject(RejectReason::Match(format!(
                "{} reference measurements, {} reported",
                reference.reference.len(),
                candidates.len()
            ))));
        }

        info!(
            "Attestation accepted: {} reference measurements matched",
            reference.reference.len()
        );

        Ok(AttestationResult::Accepted(reference))
    }

    fn chain_verifier(&self, now: DateTime<Utc>) -> ChainVerifier<'a> {
        ChainVerifier::new(self.signature_verifier)
            .known_extension_oids(DICE_EXTENSION_OIDS)
            .known_extension_oids(self.config.known_extension_oids.iter().cloned())
            .at(now)
    }

    // every chain certificate must agree on the components it reports
    fn chain_measurements(
        &self,
        chain: &[Certificate],
    ) -> Result<Vec<TcbInfoMeasurement>, tcbinfo::Error> {
        let tcb_info_verifier =
            TcbInfoVerifier::new().test_mode_secrets(self.config.test_mode_secrets);
        let mut aggregator = TcbInfoAggregator::new();

        for cert in chain.iter() {
            let infos = tcb_infos_from_extensions(&cert.extensions)?;

            for info in infos.iter() {
                tcb_info_verifier.verify(info)?;
            }

            aggregator.add_all(infos.into_iter().map(TcbInfoMeasurement::from))?;
        }

        let mut ueid_verifier = UeidVerifier::new();
        if let Some(id) = &self.device_id {
            ueid_verifier = ueid_verifier.device_id(id);
        }
        ueid_verifier.verify(chain)?;

        Ok(aggregator.measurements())
    }
}

fn reject(reason: RejectReason) -> AttestationResult {
    error!("Attestation rejected: {reason}");
    AttestationResult::Rejected(reason)
}
