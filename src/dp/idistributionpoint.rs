// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

pub trait IDistributionPointClient {
    /// Fetch the resource at `path`, an http(s) URL, a file:// URL or a
    /// local path.  `None` on any retrieval failure.
    fn fetch_bytes(&self, path: &str) -> Option<Vec<u8>>;
}
