// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! CRL-based revocation of certificate chains, by serial number and by
//! DICE measurement.

pub use self::dp_crlprovider::DistributionPointCrlProvider;
pub use self::errors::Error;
pub use self::icrlprovider::ICrlProvider;
pub use self::memo_crlprovider::MemoCrlProvider;
pub use self::verifier::{RevocationMode, RevocationReason, RevocationVerifier};

mod dp_crlprovider;
mod errors;
mod icrlprovider;
mod memo_crlprovider;
mod verifier;
