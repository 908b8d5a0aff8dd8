// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use super::extension::{parse_ueid, TcbInfo, Ueid, TCG_DICE_UEID};
use super::key::DEFAULT_VENDOR;
use super::value::{SHA256_OID, SHA384_OID, SHA512_OID};
use crate::x509::Certificate;
use log::{debug, error};

/// Arc under which every measurement type OID lives
pub const MEASUREMENT_TYPES_OID: &str = "2.16.840.1.113741.1.15.4";

/// Highest security version a certificate may report
pub const MAX_SVN: i64 = 31;

const CMF_LAYER: i64 = 1;
const CMF_TYPE_OID: &str = "2.16.840.1.113741.1.15.4.1";

const OID_COMMON_NAME: &str = "2.5.4.3";
const DICE_SUBJECT_PARTS: usize = 5;

/// Field rules every TcbInfo carried by a device certificate must follow
#[derive(Clone, Debug)]
pub struct TcbInfoVerifier {
    vendor: String,
    test_mode_secrets: bool,
}

impl Default for TcbInfoVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TcbInfoVerifier {
    pub fn new() -> Self {
        Self {
            vendor: DEFAULT_VENDOR.to_string(),
            test_mode_secrets: false,
        }
    }

    pub fn vendor(mut self, vendor: &str) -> Self {
        self.vendor = vendor.to_string();
        self
    }

    /// Devices provisioned with test mode secrets may report operational
    /// flags on their firmware measurement
    pub fn test_mode_secrets(mut self, allow: bool) -> Self {
        self.test_mode_secrets = allow;
        self
    }

    pub fn verify(&self, info: &TcbInfo) -> Result<(), Error> {
        self.verify_vendor(info)?;
        verify_svn(info)?;
        verify_layer(info)?;
        verify_hash_alg(info)?;
        verify_type(info)?;
        self.verify_flags(info)
    }

    fn verify_vendor(&self, info: &TcbInfo) -> Result<(), Error> {
        match info.vendor.as_deref() {
            Some(v) if v == self.vendor => Ok(()),
            Some(v) => policy(format!("vendor {v}, expecting {}", self.vendor)),
            None => policy("vendor missing".to_string()),
        }
    }

    fn verify_flags(&self, info: &TcbInfo) -> Result<(), Error> {
        let flags_set = info
            .flags
            .as_deref()
            .is_some_and(|f| f.chars().any(|c| c != '0'));

        if flags_set && is_cmf(info) && !self.test_mode_secrets {
            return policy(format!(
                "firmware measurement reports operational flags {}",
                info.flags.as_deref().unwrap_or_default()
            ));
        }

        Ok(())
    }
}

fn verify_svn(info: &TcbInfo) -> Result<(), Error> {
    match info.svn {
        Some(svn) if !(0..=MAX_SVN).contains(&svn) => {
            policy(format!("svn {svn} outside 0..={MAX_SVN}"))
        }
        _ => Ok(()),
    }
}

fn verify_layer(info: &TcbInfo) -> Result<(), Error> {
    match info.layer {
        Some(layer) if layer >= 0 => Ok(()),
        Some(layer) => policy(format!("negative layer {layer}")),
        None => policy("layer missing".to_string()),
    }
}

const FWID_HASH_ALGS: [&str; 3] = [SHA256_OID, SHA384_OID, SHA512_OID];

fn verify_hash_alg(info: &TcbInfo) -> Result<(), Error> {
    match &info.fwid {
        Some(fwid) if !FWID_HASH_ALGS.contains(&fwid.hash_alg.as_str()) => {
            policy(format!("FWID hash algorithm {}", fwid.hash_alg))
        }
        _ => Ok(()),
    }
}

// a type names one of the measurement types, never the arc itself
fn verify_type(info: &TcbInfo) -> Result<(), Error> {
    let Some(mtype) = info.mtype.as_deref() else {
        return Ok(());
    };

    let is_child = mtype
        .strip_prefix(MEASUREMENT_TYPES_OID)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|arc| !arc.is_empty());

    if !is_child {
        return policy(format!("type {mtype} is not a measurement type"));
    }

    Ok(())
}

fn is_cmf(info: &TcbInfo) -> bool {
    info.layer == Some(CMF_LAYER)
        && info.mtype.as_deref().map_or(true, |t| t == CMF_TYPE_OID)
}

fn policy(detail: String) -> Result<(), Error> {
    error!("Invalid TcbInfo: {detail}");
    Err(Error::Policy(detail))
}

/// Checks the tcg-dice-Ueid extensions of a chain: every certificate that
/// carries one must name the device of its DICE subject, and all of them
/// must name the same device.
#[derive(Clone, Debug, Default)]
pub struct UeidVerifier {
    device_id: Option<Vec<u8>>,
}

impl UeidVerifier {
    pub fn new() -> Self {
        Self { device_id: None }
    }

    /// Also require the uid to equal the id the device reported
    pub fn device_id(mut self, device_id: &[u8]) -> Self {
        self.device_id = Some(device_id.to_vec());
        self
    }

    pub fn verify(&self, chain: &[Certificate]) -> Result<(), Error> {
        let mut first: Option<Ueid> = None;

        for cert in chain.iter() {
            let Some(ext) = cert.extension(TCG_DICE_UEID) else {
                debug!("{} carries no UEID", cert.subject_name);
                continue;
            };

            let ueid = parse_ueid(&ext.value)?;
            self.verify_certificate(cert, &ueid)?;

            match &first {
                Some(f) if f != &ueid => {
                    return ueid_policy(format!(
                        "{} names device {} (family {:#04x}), the chain names {} (family {:#04x})",
                        cert.subject_name,
                        hex::encode(&ueid.uid),
                        ueid.family_id,
                        hex::encode(&f.uid),
                        f.family_id
                    ));
                }
                Some(_) => {}
                None => first = Some(ueid),
            }
        }

        Ok(())
    }

    fn verify_certificate(&self, cert: &Certificate, ueid: &Ueid) -> Result<(), Error> {
        if let Some(expected) = &self.device_id {
            if &ueid.uid != expected {
                return ueid_policy(format!(
                    "{} UEID {} does not match device id {}",
                    cert.subject_name,
                    hex::encode(&ueid.uid),
                    hex::encode(expected)
                ));
            }
        }

        let Some(from_subject) = subject_device_id(cert) else {
            return ueid_policy(format!(
                "{} carries a UEID but no DICE subject",
                cert.subject_name
            ));
        };

        if ueid.uid != from_subject {
            return ueid_policy(format!(
                "{} UEID {} does not match subject device id {}",
                cert.subject_name,
                hex::encode(&ueid.uid),
                hex::encode(&from_subject)
            ));
        }

        Ok(())
    }
}

// DICE subjects read `<company>:<family>:<level>:<data>:<device id>`, the
// device id being the uid in reversed byte order
fn subject_device_id(cert: &Certificate) -> Option<Vec<u8>> {
    let cn = cert.subject.iter().find(|r| r.oid == OID_COMMON_NAME)?;
    let parts: Vec<&str> = cn.value.split(':').collect();

    if parts.len() != DICE_SUBJECT_PARTS {
        return None;
    }

    let mut id = hex::decode(parts[DICE_SUBJECT_PARTS - 1]).ok()?;
    id.reverse();

    Some(id)
}

fn ueid_policy(detail: String) -> Result<(), Error> {
    error!("Invalid UEID: {detail}");
    Err(Error::Policy(detail))
}
