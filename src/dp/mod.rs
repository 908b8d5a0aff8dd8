// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Retrieval of certificates, CRLs and manifests from distribution points.

pub use self::errors::Error;
pub use self::http::{HttpDistributionPoint, ProxyConfig};
pub use self::idistributionpoint::IDistributionPointClient;
pub use self::memo_distributionpoint::MemoDistributionPoint;

mod errors;
mod http;
mod idistributionpoint;
mod memo_distributionpoint;
