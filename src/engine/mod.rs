// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Attestation orchestration: device chain, revocation, manifest
//! resolution and measurement matching.

pub use self::attestation::AttestationEngine;
pub use self::config::{VerifierConfig, DEFAULT_DESIGN_LOCATOR_PATTERN};
pub use self::errors::Error;
pub use self::result::{AttestationResult, RejectReason};

mod attestation;
mod config;
mod errors;
mod result;
