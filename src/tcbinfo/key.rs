// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// Vendor assumed by the canonical key constructors
pub const DEFAULT_VENDOR: &str = "intel.com";

/// Index assumed when a key is built from a layer and a model
pub const DEFAULT_INDEX: i64 = 0;

/// Identity of a measured component.  Two measurements describe the same
/// component iff their keys are equal, field by field, absent fields
/// included.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TcbInfoKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub mtype: Option<String>,
}

impl TcbInfoKey {
    /// Key for a component identified by layer and measurement type OID
    pub fn from_type(layer: i64, mtype: &str) -> Self {
        Self {
            vendor: Some(DEFAULT_VENDOR.to_string()),
            layer: Some(layer),
            mtype: Some(mtype.to_string()),
            ..Default::default()
        }
    }

    /// Key for a component identified by layer and model
    pub fn from_model(layer: i64, model: &str) -> Self {
        Self {
            vendor: Some(DEFAULT_VENDOR.to_string()),
            model: Some(model.to_string()),
            layer: Some(layer),
            index: Some(DEFAULT_INDEX),
            mtype: None,
        }
    }
}

impl fmt::Display for TcbInfoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields = vec![];

        if let Some(v) = &self.vendor {
            fields.push(format!("vendor={v}"));
        }
        if let Some(v) = &self.model {
            fields.push(format!("model={v}"));
        }
        if let Some(v) = self.layer {
            fields.push(format!("layer={v}"));
        }
        if let Some(v) = self.index {
            fields.push(format!("index={v}"));
        }
        if let Some(v) = &self.mtype {
            fields.push(format!("type={v}"));
        }

        write!(f, "{{{}}}", fields.join(", "))
    }
}
