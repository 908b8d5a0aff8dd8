// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::idistributionpoint::IDistributionPointClient;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory distribution point, keyed by path.  Every lookup is recorded.
#[derive(Debug, Default)]
pub struct MemoDistributionPoint {
    p: RwLock<HashMap<String, Vec<u8>>>,
    fetched: RwLock<Vec<String>>,
}

impl MemoDistributionPoint {
    pub fn new() -> Self {
        Self {
            p: Default::default(),
            fetched: Default::default(),
        }
    }

    pub fn insert(&self, path: &str, data: Vec<u8>) {
        if let Ok(mut p) = self.p.write() {
            p.insert(path.to_string(), data);
        }
    }

    /// Paths requested so far, in order
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.read().map(|f| f.clone()).unwrap_or_default()
    }
}

impl IDistributionPointClient for MemoDistributionPoint {
    fn fetch_bytes(&self, path: &str) -> Option<Vec<u8>> {
        if let Ok(mut f) = self.fetched.write() {
            f.push(path.to_string());
        }

        self.p.read().ok()?.get(path).cloned()
    }
}
