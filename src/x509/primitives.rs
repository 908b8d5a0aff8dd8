// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Single-certificate checks.  Each returns `false` after logging the
//! offending certificate; none of them aborts.

use super::certificate::{same_name, Certificate, KeyUsage};
use super::signature::{ISignatureVerifier, SignatureAlgorithm};
use chrono::{DateTime, Utc};
use log::error;
use std::collections::HashSet;

/// Basic constraints a certificate must satisfy at its position in a chain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpectedBasicConstraints {
    /// leaf: must not be a CA
    NotCa,
    /// CA with at least this many intermediates allowed below it
    PathLen(u32),
}

impl ExpectedBasicConstraints {
    /// Expectation for the issuer of a certificate with this expectation
    pub fn next(&self) -> Self {
        match self {
            Self::NotCa => Self::PathLen(0),
            Self::PathLen(n) => Self::PathLen(n.saturating_add(1)),
        }
    }
}

pub fn verify_validity(cert: &Certificate, now: DateTime<Utc>) -> bool {
    if now < cert.not_before || now > cert.not_after {
        error!(
            "Certificate {} is not valid at {now} (valid from {} to {})",
            cert.subject_name, cert.not_before, cert.not_after
        );
        return false;
    }

    true
}

pub fn verify_signature(
    verifier: &dyn ISignatureVerifier,
    child: &Certificate,
    parent: &Certificate,
) -> bool {
    let alg = match SignatureAlgorithm::from_oid(&child.signature_algorithm) {
        Ok(alg) => alg,
        Err(e) => {
            error!("Certificate {}: {e}", child.subject_name);
            return false;
        }
    };

    if !verifier.verify(&child.tbs, &child.signature, alg, &parent.public_key) {
        error!(
            "Signature of certificate {} does not verify with the key of {}",
            child.subject_name, parent.subject_name
        );
        return false;
    }

    true
}

pub fn verify_issuer(child: &Certificate, parent: &Certificate) -> bool {
    if !same_name(&child.issuer, &parent.subject) {
        error!(
            "Issuer of certificate {} is not {}",
            child.subject_name, parent.subject_name
        );
        return false;
    }

    true
}

/// An absent AKI is accepted; a present one must equal the parent's SKI
pub fn verify_authority_key_identifier(child: &Certificate, parent: &Certificate) -> bool {
    let Some(aki) = &child.authority_key_id else {
        return true;
    };

    if parent.subject_key_id.as_ref() != Some(aki) {
        error!(
            "Authority key identifier {} of {} does not match the subject key identifier of {}",
            hex::encode(aki),
            child.subject_name,
            parent.subject_name
        );
        return false;
    }

    true
}

pub fn verify_key_usage(cert: &Certificate, usage: KeyUsage) -> bool {
    if !cert.has_key_usage(usage) {
        error!("Certificate {} lacks key usage {usage:?}", cert.subject_name);
        return false;
    }

    true
}

pub fn verify_critical_extensions(cert: &Certificate, known: &HashSet<String>) -> bool {
    for e in cert.extensions.iter().filter(|e| e.critical) {
        if !known.contains(&e.oid) {
            error!(
                "Certificate {} carries unknown critical extension {}",
                cert.subject_name, e.oid
            );
            return false;
        }
    }

    true
}

/// A CA with no path length constraint satisfies any expectation
pub fn verify_basic_constraints(cert: &Certificate, expected: ExpectedBasicConstraints) -> bool {
    let ok = match (expected, cert.basic_constraints) {
        (ExpectedBasicConstraints::NotCa, bc) => !bc.map_or(false, |bc| bc.ca),
        (ExpectedBasicConstraints::PathLen(_), None) => false,
        (ExpectedBasicConstraints::PathLen(n), Some(bc)) => {
            bc.ca && bc.path_len.map_or(true, |pl| pl >= n)
        }
    };

    if !ok {
        error!(
            "Basic constraints {:?} of {} do not satisfy {expected:?}",
            cert.basic_constraints, cert.subject_name
        );
    }

    ok
}

/// Every purpose must be listed in the certificate's extended key usage
pub fn verify_extended_key_usage(cert: &Certificate, purposes: &[String]) -> bool {
    if purposes.is_empty() {
        return true;
    }

    let Some(eku) = &cert.extended_key_usage else {
        error!(
            "Certificate {} has no extended key usage, expecting {purposes:?}",
            cert.subject_name
        );
        return false;
    };

    for p in purposes.iter() {
        if !eku.contains(p) {
            error!(
                "Certificate {} lacks extended key usage {p}",
                cert.subject_name
            );
            return false;
        }
    }

    true
}
