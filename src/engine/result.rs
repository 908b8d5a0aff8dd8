// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::tcbinfo::MeasurementSet;
use std::fmt;

/// Why an attestation was refused
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// wrong chain length, untrusted root
    ChainStructure(String),
    /// a certificate signature does not verify
    Signature(String),
    /// validity, naming, key identifiers, usage, extensions, constraints
    CertificatePolicy(String),
    /// revoked by serial number or by measurement, or CRL unusable
    Revocation(String),
    /// the manifest graph could not be verified
    Manifest(String),
    /// reference measurements not reported by the device
    Match(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChainStructure(s) => write!(f, "chain structure: {s}"),
            Self::Signature(s) => write!(f, "signature: {s}"),
            Self::CertificatePolicy(s) => write!(f, "certificate policy: {s}"),
            Self::Revocation(s) => write!(f, "revoked: {s}"),
            Self::Manifest(s) => write!(f, "manifest: {s}"),
            Self::Match(s) => write!(f, "measurement mismatch: {s}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttestationResult {
    /// Carries the resolved manifest measurements; endorsed values are
    /// left to the caller's policy
    Accepted(MeasurementSet),
    Rejected(RejectReason),
}

impl AttestationResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

impl fmt::Display for AttestationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted(m) => write!(
                f,
                "accepted ({} reference, {} endorsed measurements)",
                m.reference.len(),
                m.endorsed.len()
            ),
            Self::Rejected(r) => write!(f, "rejected: {r}"),
        }
    }
}
