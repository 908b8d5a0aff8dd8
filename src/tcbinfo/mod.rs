// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! DICE TcbInfo measurements: the key/value model, reference matching and
//! the X.509 extension decoder and the rules certificate TcbInfo and UEID
//! extensions must follow.

pub use self::aggregator::TcbInfoAggregator;
pub use self::errors::Error;
pub use self::extension::{
    has_tcb_info_extension, parse_multi_tcb_info, parse_tcb_info, parse_ueid,
    tcb_infos_from_extensions, TcbInfo, Ueid, DICE_EXTENSION_OIDS, TCG_DICE_MULTI_TCB_INFO,
    TCG_DICE_TCB_INFO, TCG_DICE_UEID,
};
pub use self::key::{TcbInfoKey, DEFAULT_INDEX, DEFAULT_VENDOR};
pub use self::measurement::{contains_all, MeasurementSet, TcbInfoMeasurement};
pub use self::value::{
    hash_alg_from_cose, FwId, MaskedVendorInfo, TcbInfoValue, SHA256_OID, SHA384_OID, SHA512_OID,
};
pub use self::verification::{TcbInfoVerifier, UeidVerifier, MAX_SVN, MEASUREMENT_TYPES_OID};

mod aggregator;
mod errors;
mod extension;
mod key;
mod measurement;
mod value;
mod verification;
