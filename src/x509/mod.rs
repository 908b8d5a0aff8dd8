// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! X.509 certificate and CRL views, signature verification and the
//! leaf-to-root chain verifier.

pub use self::certificate::*;
pub use self::chain::{ChainFailure, ChainVerifier, COMMON_EXTENSION_OIDS};
pub use self::crl::{Crl, CrlEntry};
pub use self::errors::Error;
pub use self::keyid::{IKeyIdentifierResolver, Rfc7093Method2, SubjectKeyIdentifierVerifier};
pub use self::primitives::ExpectedBasicConstraints;
pub use self::roothash::{root_hash, verify_root_hash, verify_root_hash_any};
pub use self::signature::{ISignatureVerifier, OpensslSignatureVerifier, SignatureAlgorithm};

mod certificate;
mod chain;
mod crl;
mod errors;
mod keyid;
pub mod primitives;
mod roothash;
mod signature;
