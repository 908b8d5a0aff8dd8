// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

#[derive(thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Syntax error: {0}")]
    Syntax(String),
    #[error("Semantic error: {0}")]
    Sema(String),
    #[error("Missing field: {0}")]
    MissingField(String),
    #[error("Duplicated field: {0}")]
    DuplicatedField(String),
    #[error("{0} not signed")]
    NotSigned(String),
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("signature expired at {0}")]
    Expired(String),
    #[error("signature not valid before {0}")]
    NotYetValid(String),
    #[error("unrecognized profile: {0}")]
    UnknownProfile(String),
    #[error("failed to download data from path: {0}")]
    Download(String),
    #[error("unsupported hash algorithm: {0}")]
    UnsupportedHash(String),
    #[error("signer verification failed: {0}")]
    Signer(String),
    #[error("manifest revoked: {0}")]
    Revoked(String),
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Syntax(e)
            | Error::Sema(e)
            | Error::MissingField(e)
            | Error::DuplicatedField(e)
            | Error::NotSigned(e)
            | Error::InvalidSignature(e)
            | Error::Expired(e)
            | Error::NotYetValid(e)
            | Error::UnknownProfile(e)
            | Error::Download(e)
            | Error::UnsupportedHash(e)
            | Error::Signer(e)
            | Error::Revoked(e) => {
                write!(f, "{}", e)
            }
        }
    }
}

impl From<crate::tcbinfo::Error> for Error {
    fn from(e: crate::tcbinfo::Error) -> Self {
        match e {
            crate::tcbinfo::Error::UnsupportedHash(s) => Error::UnsupportedHash(s),
            other => Error::Sema(other.to_string()),
        }
    }
}
