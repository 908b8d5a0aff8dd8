// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::certificate::{to_datetime, Extension};
use super::errors::Error;
use chrono::{DateTime, Utc};
use x509_parser::prelude::FromDer;
use x509_parser::revocation_list::CertificateRevocationList;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CrlEntry {
    pub serial: Vec<u8>,
    pub extensions: Vec<Extension>,
}

/// Owned view of a certificate revocation list
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Crl {
    pub der: Vec<u8>,
    pub tbs: Vec<u8>,
    pub signature_algorithm: String,
    pub signature: Vec<u8>,
    pub issuer_name: String,
    pub next_update: Option<DateTime<Utc>>,
    pub entries: Vec<CrlEntry>,
}

impl Crl {
    pub fn from_der(der: &[u8]) -> Result<Crl, Error> {
        let (_, crl) = CertificateRevocationList::from_der(der)
            .map_err(|e| Error::Syntax(format!("CRL: {e}")))?;

        let next_update = match crl.next_update() {
            Some(t) => Some(to_datetime(&t)?),
            None => None,
        };

        let entries = crl
            .iter_revoked_certificates()
            .map(|rc| CrlEntry {
                serial: rc.raw_serial().to_vec(),
                extensions: rc.extensions().iter().map(Extension::from).collect(),
            })
            .collect();

        Ok(Crl {
            der: der.to_vec(),
            tbs: crl.tbs_cert_list.as_ref().to_vec(),
            signature_algorithm: crl.signature_algorithm.algorithm.to_id_string(),
            signature: crl.signature_value.data.to_vec(),
            issuer_name: crl.issuer().to_string(),
            next_update,
            entries,
        })
    }
}
