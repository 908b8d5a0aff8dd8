// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use super::icrlprovider::ICrlProvider;
use crate::x509::Crl;
use std::collections::HashMap;
use std::sync::RwLock;

/// CRLs stashed in memory, indexed by distribution point URL
#[derive(Debug, Default)]
pub struct MemoCrlProvider {
    p: RwLock<HashMap<String, Crl>>,
}

impl MemoCrlProvider {
    pub fn new() -> Self {
        Self {
            p: Default::default(),
        }
    }

    pub fn insert(&self, url: &str, crl: Crl) {
        if let Ok(mut p) = self.p.write() {
            p.insert(url.to_string(), crl);
        }
    }

    /// Decode and stash a DER CRL
    pub fn load_der(&self, url: &str, der: &[u8]) -> Result<(), Error> {
        let crl = Crl::from_der(der).map_err(|e| Error::Syntax(e.to_string()))?;

        self.insert(url, crl);

        Ok(())
    }
}

impl ICrlProvider for MemoCrlProvider {
    fn get_crl(&self, url: &str) -> Result<Crl, Error> {
        self.p
            .read()
            .ok()
            .and_then(|p| p.get(url).cloned())
            .ok_or_else(|| Error::NotFound(url.to_string()))
    }
}
