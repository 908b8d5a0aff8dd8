// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use super::icrlprovider::ICrlProvider;
use crate::dp::IDistributionPointClient;
use crate::x509::Crl;

/// Downloads CRLs through a distribution point client
pub struct DistributionPointCrlProvider<'a> {
    dp: &'a dyn IDistributionPointClient,
}

impl<'a> DistributionPointCrlProvider<'a> {
    pub fn new(dp: &'a dyn IDistributionPointClient) -> Self {
        Self { dp }
    }
}

impl ICrlProvider for DistributionPointCrlProvider<'_> {
    fn get_crl(&self, url: &str) -> Result<Crl, Error> {
        let der = self
            .dp
            .fetch_bytes(url)
            .ok_or_else(|| Error::NotFound(url.to_string()))?;

        Crl::from_der(&der).map_err(|e| Error::Syntax(format!("{url}: {e}")))
    }
}
