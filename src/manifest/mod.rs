// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Signed reference integrity manifests (CoRIM) and cross-manifests, and
//! the resolver that walks their link graph.

pub use self::comid::{Comid, EnvironmentMap, MeasurementMap, Triple};
pub use self::corim::Corim;
pub use self::cose::{ProtectedHeader, Sign1, SignatureValidity};
pub use self::document::{Document, Signed};
pub use self::errors::Error;
pub use self::locator::{Locator, LocatorType};
pub use self::mapping::{comid_measurements, triple_measurements};
pub use self::resolver::{ManifestResolver, ResolverOptions, DEFAULT_MAX_DEPTH, DEFAULT_PROFILE};
pub use self::signer::{SigningChainService, MAX_CHAIN_LENGTH};
pub use self::xcorim::Xcorim;

mod comid;
mod common;
mod corim;
mod cose;
mod document;
mod errors;
mod locator;
mod mapping;
mod resolver;
mod signer;
mod xcorim;
