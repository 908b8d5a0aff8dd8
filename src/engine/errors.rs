// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

/// Failures that prevent an attestation from being evaluated at all.
/// Verification outcomes are reported through `AttestationResult`.
#[derive(thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Syntax error: {0}")]
    Syntax(String),
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Config(e) | Error::Syntax(e) => {
                write!(f, "{}", e)
            }
        }
    }
}
