// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const SHA256_OID: &str = "2.16.840.1.101.3.4.2.1";
pub const SHA384_OID: &str = "2.16.840.1.101.3.4.2.2";
pub const SHA512_OID: &str = "2.16.840.1.101.3.4.2.3";

/// Map a COSE / named-information hash algorithm id to its OID
pub fn hash_alg_from_cose(alg: i128) -> Result<&'static str, Error> {
    match alg {
        1 => Ok(SHA256_OID),
        7 => Ok(SHA384_OID),
        8 => Ok(SHA512_OID),
        unknown => Err(Error::UnsupportedHash(format!("hash algorithm id {unknown}"))),
    }
}

/// A firmware identifier: digest of a component together with the OID of
/// the hash algorithm that produced it
#[serde_with::serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FwId {
    pub hash_alg: String,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub digest: Vec<u8>,
}

/// Vendor-defined bytes, optionally paired with a mask selecting the bits
/// that take part in comparisons
#[serde_with::serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MaskedVendorInfo {
    #[serde_as(as = "serde_with::hex::Hex")]
    pub vendor_info: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "Option<serde_with::hex::Hex>")]
    pub mask: Option<Vec<u8>>,
}

impl MaskedVendorInfo {
    pub fn new(vendor_info: Vec<u8>, mask: Option<Vec<u8>>) -> Self {
        Self { vendor_info, mask }
    }

    /// Install an all-ones mask as wide as the vendor info, unless a mask is
    /// already present
    pub fn set_default_mask(&mut self) {
        if self.mask.is_none() {
            self.mask = Some(vec![0xff; self.vendor_info.len()]);
        }
    }

    /// Compare against a reference using the reference's mask.  Without a
    /// mask the comparison is exact.
    pub fn matches_reference(&self, reference: &MaskedVendorInfo) -> bool {
        let Some(mask) = &reference.mask else {
            return self.vendor_info == reference.vendor_info;
        };

        if self.vendor_info.len() != reference.vendor_info.len()
            || mask.len() != reference.vendor_info.len()
        {
            return false;
        }

        self.vendor_info
            .iter()
            .zip(reference.vendor_info.iter())
            .zip(mask.iter())
            .all(|((c, r), m)| c & m == r & m)
    }
}

/// The measured attributes of a component.  Every field is optional: a
/// reference only constrains the fields it sets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TcbInfoValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svn: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fwid: Option<FwId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masked_vendor_info: Option<MaskedVendorInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<String>,
}

fn field_matches<T: PartialEq>(candidate: &Option<T>, reference: &Option<T>) -> bool {
    match reference {
        None => true,
        Some(r) => candidate.as_ref() == Some(r),
    }
}

impl TcbInfoValue {
    /// Every field set in `reference` must be set, and equal, here.  Vendor
    /// info is compared under the reference's mask.
    pub fn matches_reference(&self, reference: &TcbInfoValue) -> bool {
        let vendor_info_matches = match (&self.masked_vendor_info, &reference.masked_vendor_info) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(c), Some(r)) => c.matches_reference(r),
        };

        field_matches(&self.version, &reference.version)
            && field_matches(&self.svn, &reference.svn)
            && field_matches(&self.fwid, &reference.fwid)
            && field_matches(&self.flags, &reference.flags)
            && vendor_info_matches
    }
}

impl fmt::Display for TcbInfoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields = vec![];

        if let Some(v) = &self.version {
            fields.push(format!("version={v}"));
        }
        if let Some(v) = self.svn {
            fields.push(format!("svn={v}"));
        }
        if let Some(v) = &self.fwid {
            fields.push(format!("fwid={}:{}", v.hash_alg, hex::encode(&v.digest)));
        }
        if let Some(v) = &self.masked_vendor_info {
            match &v.mask {
                Some(m) => fields.push(format!(
                    "vendor-info={}/{}",
                    hex::encode(&v.vendor_info),
                    hex::encode(m)
                )),
                None => fields.push(format!("vendor-info={}", hex::encode(&v.vendor_info))),
            }
        }
        if let Some(v) = &self.flags {
            fields.push(format!("flags={v}"));
        }

        write!(f, "{{{}}}", fields.join(", "))
    }
}
