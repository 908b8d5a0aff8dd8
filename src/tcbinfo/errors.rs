// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

#[derive(thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Syntax error: {0}")]
    Syntax(String),
    #[error("Semantic error: {0}")]
    Sema(String),
    #[error("Duplicated field: {0}")]
    DuplicatedField(String),
    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedHash(String),
    #[error("Conflicting measurements: {0}")]
    Conflict(String),
    #[error("Policy violation: {0}")]
    Policy(String),
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Syntax(e)
            | Error::Sema(e)
            | Error::DuplicatedField(e)
            | Error::UnsupportedHash(e)
            | Error::Conflict(e)
            | Error::Policy(e) => {
                write!(f, "{}", e)
            }
        }
    }
}
