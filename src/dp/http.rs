// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use super::idistributionpoint::IDistributionPointClient;
use log::{debug, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
}

/// Fetches over HTTP(S), with an optional proxy, and from the local
/// filesystem
#[derive(Debug)]
pub struct HttpDistributionPoint {
    client: Client,
}

impl HttpDistributionPoint {
    pub fn new(proxy: Option<&ProxyConfig>) -> Result<Self, Error> {
        let mut builder = Client::builder().timeout(FETCH_TIMEOUT);

        if let Some(p) = proxy {
            let url = format!("http://{}:{}", p.host, p.port);
            let proxy = reqwest::Proxy::all(&url)
                .map_err(|e| Error::Client(format!("proxy {url}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Client(e.to_string()))?;

        Ok(Self { client })
    }

    fn fetch_url(&self, url: &str) -> Option<Vec<u8>> {
        let rsp = match self.client.get(url).send() {
            Ok(rsp) => rsp,
            Err(e) => {
                warn!("GET {url} failed: {e}");
                return None;
            }
        };

        if !rsp.status().is_success() {
            warn!("GET {url} returned {}", rsp.status());
            return None;
        }

        match rsp.bytes() {
            Ok(b) => {
                debug!("Downloaded {} bytes from {url}", b.len());
                Some(b.to_vec())
            }
            Err(e) => {
                warn!("reading body of {url} failed: {e}");
                None
            }
        }
    }

    fn fetch_file(&self, path: &str) -> Option<Vec<u8>> {
        match std::fs::read(path) {
            Ok(b) => {
                debug!("Read {} bytes from {path}", b.len());
                Some(b)
            }
            Err(e) => {
                warn!("reading {path} failed: {e}");
                None
            }
        }
    }
}

impl IDistributionPointClient for HttpDistributionPoint {
    fn fetch_bytes(&self, path: &str) -> Option<Vec<u8>> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return self.fetch_url(path);
        }

        self.fetch_file(path.strip_prefix("file://").unwrap_or(path))
    }
}
