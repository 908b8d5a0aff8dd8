// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::extension::TcbInfo;
use super::key::TcbInfoKey;
use super::value::{MaskedVendorInfo, TcbInfoValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A component identity together with its measured attributes
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcbInfoMeasurement {
    pub key: TcbInfoKey,
    #[serde(default)]
    pub value: TcbInfoValue,
}

impl TcbInfoMeasurement {
    pub fn new(key: TcbInfoKey, value: TcbInfoValue) -> Self {
        Self { key, value }
    }

    /// True iff the keys are equal and every value field set in `reference`
    /// is matched here
    pub fn matches_reference(&self, reference: &TcbInfoMeasurement) -> bool {
        self.key == reference.key && self.value.matches_reference(&reference.value)
    }
}

impl From<TcbInfo> for TcbInfoMeasurement {
    fn from(t: TcbInfo) -> Self {
        let key = TcbInfoKey {
            vendor: t.vendor,
            model: t.model,
            layer: t.layer,
            index: t.index,
            mtype: t.mtype,
        };

        let value = TcbInfoValue {
            version: t.version,
            svn: t.svn,
            fwid: t.fwid,
            masked_vendor_info: t.vendor_info.map(|vi| MaskedVendorInfo::new(vi, None)),
            flags: t.flags,
        };

        Self { key, value }
    }
}

impl fmt::Display for TcbInfoMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.key, self.value)
    }
}

/// Check that each reference is matched by at least one candidate.  The
/// same candidate may satisfy several references.
pub fn contains_all(candidates: &[TcbInfoMeasurement], references: &[TcbInfoMeasurement]) -> bool {
    references.iter().all(|r| {
        let found = candidates.iter().any(|c| c.matches_reference(r));

        if !found {
            log::debug!("No candidate measurement matches reference {r}");
        }

        found
    })
}

/// Measurements gathered from a manifest hierarchy
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementSet {
    /// Expected device state
    pub reference: Vec<TcbInfoMeasurement>,
    /// Attributes vouched for by the manifest signer
    pub endorsed: Vec<TcbInfoMeasurement>,
}

impl MeasurementSet {
    pub fn merge(&mut self, other: MeasurementSet) {
        self.reference.extend(other.reference);
        self.endorsed.extend(other.endorsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tcbinfo::{FwId, SHA384_OID};

    const TYPE_OID: &str = "2.16.840.1.113741.1.15.4.1";

    fn fwid_measurement(layer: i64, digest: u8) -> TcbInfoMeasurement {
        TcbInfoMeasurement::new(
            TcbInfoKey::from_type(layer, TYPE_OID),
            TcbInfoValue {
                fwid: Some(FwId {
                    hash_alg: SHA384_OID.to_string(),
                    digest: vec![digest; 48],
                }),
                ..Default::default()
            },
        )
    }

    #[test]
    fn reference_matches_itself() {
        let m = fwid_measurement(1, 0xaa);
        assert!(m.matches_reference(&m));
    }

    #[test]
    fn key_mismatch_never_matches() {
        let m = fwid_measurement(1, 0xaa);
        let mut r = m.clone();
        r.key.index = Some(0);
        assert!(!m.matches_reference(&r));
    }

    #[test]
    fn extra_candidate_fields_are_ignored() {
        let mut candidate = fwid_measurement(1, 0xaa);
        candidate.value.svn = Some(7);
        candidate.value.version = Some("2.1".to_string());

        assert!(candidate.matches_reference(&fwid_measurement(1, 0xaa)));
    }

    #[test]
    fn matches_empty_reference() {
        let reference =
            TcbInfoMeasurement::new(TcbInfoKey::from_type(1, TYPE_OID), Default::default());

        let mut candidate = fwid_measurement(1, 0xaa);
        candidate.value.svn = Some(4);
        candidate.value.flags = Some("00".to_string());

        assert!(candidate.matches_reference(&reference));
        assert!(TcbInfoMeasurement::new(reference.key.clone(), Default::default())
            .matches_reference(&reference));
        assert!(!fwid_measurement(2, 0xaa).matches_reference(&reference));
    }

    #[test]
    fn contains_all_with_empty_references() {
        assert!(contains_all(&[], &[]));
        assert!(contains_all(&[fwid_measurement(1, 0xaa)], &[]));
    }

    #[test]
    fn contains_all_reports_missing_reference() {
        let candidates = vec![fwid_measurement(1, 0xaa), fwid_measurement(2, 0xbb)];

        assert!(contains_all(&candidates, &[fwid_measurement(2, 0xbb)]));
        assert!(!contains_all(
            &candidates,
            &[fwid_measurement(1, 0xaa), fwid_measurement(3, 0xcc)]
        ));
        assert!(!contains_all(&candidates, &[fwid_measurement(1, 0xbb)]));
    }

    #[test]
    fn one_candidate_satisfies_several_references() {
        let mut candidate = fwid_measurement(1, 0xaa);
        candidate.value.svn = Some(2);

        let mut by_svn = TcbInfoMeasurement::new(candidate.key.clone(), Default::default());
        by_svn.value.svn = Some(2);

        assert!(contains_all(
            &[candidate],
            &[fwid_measurement(1, 0xaa), by_svn]
        ));
    }

    #[test]
    fn json_device_measurements() {
        let j = r#"[{
            "key": {"vendor": "intel.com", "layer": 1, "type": "2.16.840.1.113741.1.15.4.1"},
            "value": {"svn": 3, "fwid": {"hash-alg": "2.16.840.1.101.3.4.2.2", "digest": "0a0b"}}
        }]"#;

        let v: Vec<TcbInfoMeasurement> = serde_json::from_str(j).expect("valid measurements");
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].value.svn, Some(3));
        assert_eq!(
            v[0].value.fwid.as_ref().map(|f| f.digest.clone()),
            Some(vec![0x0a, 0x0b])
        );
    }

    #[test]
    fn merge_keeps_both_lists() {
        let mut a = MeasurementSet {
            reference: vec![fwid_measurement(1, 1)],
            endorsed: vec![],
        };
        a.merge(MeasurementSet {
            reference: vec![fwid_measurement(2, 2)],
            endorsed: vec![fwid_measurement(3, 3)],
        });

        assert_eq!(a.reference.len(), 2);
        assert_eq!(a.endorsed.len(), 1);
    }
}
