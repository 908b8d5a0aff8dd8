// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Hardware root-of-trust attestation verification.
//!
//! This crate decides whether a device can be trusted from three inputs:
//! the DICE certificate chain it presents, the measurements it reports,
//! and a signed reference integrity manifest ([CoRIM]) describing the
//! expected firmware state.
//!
//! The API allows:
//! * Verifying an X.509 certificate chain leaf-to-root with per-position
//!   policy, root pinning and key identifier checks
//! * Checking revocation against CRLs, by serial number and by TCG DICE
//!   measurement subsets
//! * Decoding and matching TcbInfo measurements with partial-match
//!   semantics
//! * Resolving a graph of signed CoRIM manifests into reference and
//!   endorsed measurements
//! * Orchestrating all of the above into a single accept/reject decision
//!
//! [CoRIM]: https://datatracker.ietf.org/doc/draft-ietf-rats-corim/

pub mod dp;
pub mod engine;
pub mod manifest;
pub mod revocation;
pub mod tcbinfo;
pub mod x509;

#[cfg(test)]
mod testutils;
