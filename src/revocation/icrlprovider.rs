// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use crate::x509::Crl;

pub trait ICrlProvider {
    /// Return the CRL published at the given distribution point
    fn get_crl(&self, url: &str) -> Result<Crl, Error>;
}
