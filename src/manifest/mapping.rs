// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::comid::{Comid, EnvironmentMap, MeasurementMap, Triple};
use crate::tcbinfo::{MaskedVendorInfo, MeasurementSet, TcbInfoKey, TcbInfoMeasurement, TcbInfoValue};

fn to_key(env: &EnvironmentMap, m: &MeasurementMap) -> TcbInfoKey {
    let mut key = match (env.layer, &m.mkey, &env.model) {
        (Some(layer), Some(mtype), _) => TcbInfoKey::from_type(layer, mtype),
        (Some(layer), None, Some(model)) => TcbInfoKey::from_model(layer, model),
        _ => TcbInfoKey {
            layer: env.layer,
            mtype: m.mkey.clone(),
            model: env.model.clone(),
            ..Default::default()
        },
    };

    // explicit environment fields win over the canonical defaults
    key.vendor = env.vendor.clone().or(key.vendor);
    if env.model.is_some() {
        key.model = env.model.clone();
    }
    key.index = env.index.or(key.index);

    key
}

fn to_value(m: &MeasurementMap) -> TcbInfoValue {
    TcbInfoValue {
        version: m.version.clone(),
        svn: m.svn,
        fwid: m.digests.first().cloned(),
        masked_vendor_info: m
            .raw_value
            .as_ref()
            .map(|v| MaskedVendorInfo::new(v.clone(), m.raw_value_mask.clone())),
        flags: m.flags.clone(),
    }
}

/// One measurement per measurement-map of the triple
pub fn triple_measurements(t: &Triple) -> Vec<TcbInfoMeasurement> {
    t.measurements
        .iter()
        .map(|m| TcbInfoMeasurement::new(to_key(&t.environment, m), to_value(m)))
        .collect()
}

/// Reference and endorsed measurements carried by a CoMID
pub fn comid_measurements(comid: &Comid) -> MeasurementSet {
    MeasurementSet {
        reference: comid
            .reference_triples
            .iter()
            .flat_map(triple_measurements)
            .collect(),
        endorsed: comid
            .endorsed_triples
            .iter()
            .flat_map(triple_measurements)
            .collect(),
    }
}
