// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::common::*;
use super::errors::Error;
use ciborium::Value;

pub const XCORIM_TAG: u64 = 510;
pub const UNSIGNED_XCORIM_TAG: u64 = 511;

const XCORIM_ID_LABEL: i128 = 0;
const XCORIM_DENY_LIST_LABEL: i128 = 1;
const XCORIM_PROFILE_LABEL: i128 = 3;

/// Cross-manifest: identifiers of manifests that must no longer be trusted
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Xcorim {
    pub id: String,
    pub deny_list: Vec<String>,
    pub profile: Option<String>,
}

impl Xcorim {
    pub fn decode(v: &Value) -> Result<Xcorim, Error> {
        let contents = to_map(untag(v, UNSIGNED_XCORIM_TAG), "xcorim-map")?;

        let mut x = Xcorim::default();
        let mut has_id = false;

        for (k, v) in contents.iter() {
            match int_key(k) {
                Some(XCORIM_ID_LABEL) => {
                    x.id = to_identifier(v, "xcorim-id")?;
                    has_id = true;
                }
                Some(XCORIM_DENY_LIST_LABEL) => {
                    x.deny_list = to_array(v, "deny-list")?
                        .iter()
                        .map(|e| to_identifier(e, "deny-list entry"))
                        .collect::<Result<_, _>>()?;
                }
                Some(XCORIM_PROFILE_LABEL) => x.profile = Some(to_identifier(v, "profile")?),
                _ => continue,
            }
        }

        if !has_id {
            return Err(Error::MissingField("xcorim-id".to_string()));
        }

        Ok(x)
    }

    pub fn denies(&self, manifest_id: &str) -> bool {
        self.deny_list.iter().any(|d| d == manifest_id)
    }
}
