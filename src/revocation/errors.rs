// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

#[derive(thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("CRL not available: {0}")]
    NotFound(String),
    #[error("Syntax error: {0}")]
    Syntax(String),
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NotFound(e) | Error::Syntax(e) => {
                write!(f, "{}", e)
            }
        }
    }
}
