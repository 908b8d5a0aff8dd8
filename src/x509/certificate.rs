// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use chrono::{DateTime, Utc};
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::{DistributionPointName, GeneralName, ParsedExtension, X509Extension};
use x509_parser::pem::Pem;
use x509_parser::prelude::FromDer;
use x509_parser::time::ASN1Time;
use x509_parser::x509::X509Name;

pub const OID_SUBJECT_KEY_IDENTIFIER: &str = "2.5.29.14";
pub const OID_KEY_USAGE: &str = "2.5.29.15";
pub const OID_BASIC_CONSTRAINTS: &str = "2.5.29.19";
pub const OID_CRL_DISTRIBUTION_POINTS: &str = "2.5.29.31";
pub const OID_AUTHORITY_KEY_IDENTIFIER: &str = "2.5.29.35";
pub const OID_EXTENDED_KEY_USAGE: &str = "2.5.29.37";
pub const OID_AUTHORITY_INFO_ACCESS: &str = "1.3.6.1.5.5.7.1.1";

pub const OID_CA_ISSUERS: &str = "1.3.6.1.5.5.7.48.2";
pub const OID_KP_CODE_SIGNING: &str = "1.3.6.1.5.5.7.3.3";

const OID_KP_SERVER_AUTH: &str = "1.3.6.1.5.5.7.3.1";
const OID_KP_CLIENT_AUTH: &str = "1.3.6.1.5.5.7.3.2";
const OID_KP_EMAIL_PROTECTION: &str = "1.3.6.1.5.5.7.3.4";
const OID_KP_TIME_STAMPING: &str = "1.3.6.1.5.5.7.3.8";
const OID_KP_OCSP_SIGNING: &str = "1.3.6.1.5.5.7.3.9";
const OID_ANY_EXTENDED_KEY_USAGE: &str = "2.5.29.37.0";

/// A raw extension: OID, criticality and DER-encoded value
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extension {
    pub oid: String,
    pub critical: bool,
    pub value: Vec<u8>,
}

impl From<&X509Extension<'_>> for Extension {
    fn from(e: &X509Extension<'_>) -> Self {
        Self {
            oid: e.oid.to_id_string(),
            critical: e.critical,
            value: e.value.to_vec(),
        }
    }
}

/// One attribute of a distinguished name
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rdn {
    pub oid: String,
    pub value: String,
}

impl Rdn {
    pub fn new(oid: &str, value: &str) -> Self {
        Self {
            oid: oid.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BasicConstraints {
    pub ca: bool,
    pub path_len: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyUsage {
    DigitalSignature,
    NonRepudiation,
    KeyEncipherment,
    DataEncipherment,
    KeyAgreement,
    KeyCertSign,
    CrlSign,
    EncipherOnly,
    DecipherOnly,
}

/// Owned view of an X.509 certificate, reduced to what chain, revocation
/// and signer checks look at
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Certificate {
    pub der: Vec<u8>,
    pub tbs: Vec<u8>,
    /// signature algorithm OID
    pub signature_algorithm: String,
    pub signature: Vec<u8>,
    pub serial: Vec<u8>,
    pub subject: Vec<Rdn>,
    pub issuer: Vec<Rdn>,
    /// printable subject, for logs
    pub subject_name: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// DER-encoded SubjectPublicKeyInfo
    pub public_key: Vec<u8>,
    /// subjectPublicKey BIT STRING contents
    pub public_key_bits: Vec<u8>,
    pub extensions: Vec<Extension>,
    pub basic_constraints: Option<BasicConstraints>,
    pub key_usage: Option<Vec<KeyUsage>>,
    /// extended key usage purpose OIDs
    pub extended_key_usage: Option<Vec<String>>,
    pub authority_key_id: Option<Vec<u8>>,
    pub subject_key_id: Option<Vec<u8>>,
    pub crl_distribution_points: Vec<String>,
    pub ca_issuers: Vec<String>,
}

impl Certificate {
    /// Decode a single DER-encoded certificate
    pub fn from_der(der: &[u8]) -> Result<Certificate, Error> {
        let (rest, x509) = X509Certificate::from_der(der)
            .map_err(|e| Error::Syntax(format!("certificate: {e}")))?;

        if !rest.is_empty() {
            return Err(Error::Syntax(format!(
                "certificate: {} trailing bytes",
                rest.len()
            )));
        }

        let mut c = Certificate {
            der: der.to_vec(),
            tbs: x509.tbs_certificate.as_ref().to_vec(),
            signature_algorithm: x509.signature_algorithm.algorithm.to_id_string(),
            signature: x509.signature_value.data.to_vec(),
            serial: x509.raw_serial().to_vec(),
            subject: to_rdns(x509.subject()),
            issuer: to_rdns(x509.issuer()),
            subject_name: x509.subject().to_string(),
            not_before: to_datetime(&x509.validity().not_before)?,
            not_after: to_datetime(&x509.validity().not_after)?,
            public_key: x509.public_key().raw.to_vec(),
            public_key_bits: x509.public_key().subject_public_key.data.to_vec(),
            ..Default::default()
        };

        for ext in x509.extensions() {
            c.extensions.push(Extension::from(ext));
            c.set_parsed_extension(ext.parsed_extension());
        }

        Ok(c)
    }

    /// Decode either a PEM bundle or a single DER certificate
    pub fn parse_all(data: &[u8]) -> Result<Vec<Certificate>, Error> {
        if !data.starts_with(b"-----BEGIN") {
            return Ok(vec![Certificate::from_der(data)?]);
        }

        let mut certs = vec![];

        for pem in Pem::iter_from_buffer(data) {
            let pem = pem.map_err(|e| Error::Syntax(format!("PEM: {e}")))?;

            if pem.label != "CERTIFICATE" {
                continue;
            }

            certs.push(Certificate::from_der(&pem.contents)?);
        }

        if certs.is_empty() {
            return Err(Error::Syntax("no certificate found in PEM data".to_string()));
        }

        Ok(certs)
    }

    fn set_parsed_extension(&mut self, pe: &ParsedExtension) {
        match pe {
            ParsedExtension::BasicConstraints(bc) => {
                self.basic_constraints = Some(BasicConstraints {
                    ca: bc.ca,
                    path_len: bc.path_len_constraint,
                })
            }
            ParsedExtension::KeyUsage(ku) => {
                let flags = [
                    (ku.digital_signature(), KeyUsage::DigitalSignature),
                    (ku.non_repudiation(), KeyUsage::NonRepudiation),
                    (ku.key_encipherment(), KeyUsage::KeyEncipherment),
                    (ku.data_encipherment(), KeyUsage::DataEncipherment),
                    (ku.key_agreement(), KeyUsage::KeyAgreement),
                    (ku.key_cert_sign(), KeyUsage::KeyCertSign),
                    (ku.crl_sign(), KeyUsage::CrlSign),
                    (ku.encipher_only(), KeyUsage::EncipherOnly),
                    (ku.decipher_only(), KeyUsage::DecipherOnly),
                ];

                self.key_usage = Some(
                    flags
                        .iter()
                        .filter(|(set, _)| *set)
                        .map(|(_, u)| *u)
                        .collect(),
                );
            }
            ParsedExtension::ExtendedKeyUsage(eku) => {
                let flags = [
                    (eku.any, OID_ANY_EXTENDED_KEY_USAGE),
                    (eku.server_auth, OID_KP_SERVER_AUTH),
                    (eku.client_auth, OID_KP_CLIENT_AUTH),
                    (eku.code_signing, OID_KP_CODE_SIGNING),
                    (eku.email_protection, OID_KP_EMAIL_PROTECTION),
                    (eku.time_stamping, OID_KP_TIME_STAMPING),
                    (eku.ocsp_signing, OID_KP_OCSP_SIGNING),
                ];

                let mut purposes: Vec<String> = flags
                    .iter()
                    .filter(|(set, _)| *set)
                    .map(|(_, oid)| oid.to_string())
                    .collect();
                purposes.extend(eku.other.iter().map(|oid| oid.to_id_string()));

                self.extended_key_usage = Some(purposes);
            }
            ParsedExtension::AuthorityKeyIdentifier(aki) => {
                self.authority_key_id = aki.key_identifier.as_ref().map(|k| k.0.to_vec());
            }
            ParsedExtension::SubjectKeyIdentifier(ski) => {
                self.subject_key_id = Some(ski.0.to_vec());
            }
            ParsedExtension::CRLDistributionPoints(dps) => {
                for dp in dps.points.iter() {
                    let Some(DistributionPointName::FullName(names)) = &dp.distribution_point
                    else {
                        continue;
                    };

                    for name in names.iter() {
                        if let GeneralName::URI(uri) = name {
                            self.crl_distribution_points.push(uri.to_string());
                        }
                    }
                }
            }
            ParsedExtension::AuthorityInfoAccess(aia) => {
                for ad in aia.accessdescs.iter() {
                    if ad.access_method.to_id_string() != OID_CA_ISSUERS {
                        continue;
                    }

                    if let GeneralName::URI(uri) = &ad.access_location {
                        self.ca_issuers.push(uri.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    pub fn extension(&self, oid: &str) -> Option<&Extension> {
        self.extensions.iter().find(|e| e.oid == oid)
    }

    /// Issuer and subject carry the same attributes
    pub fn is_self_issued(&self) -> bool {
        same_name(&self.subject, &self.issuer)
    }

    pub fn has_key_usage(&self, usage: KeyUsage) -> bool {
        self.key_usage
            .as_ref()
            .map_or(false, |ku| ku.contains(&usage))
    }

    pub fn is_ca(&self) -> bool {
        self.basic_constraints.map_or(false, |bc| bc.ca)
    }
}

/// Compare two names as attribute multisets, ignoring RDN order
pub fn same_name(a: &[Rdn], b: &[Rdn]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();

    a.sort();
    b.sort();

    a == b
}

fn to_rdns(name: &X509Name) -> Vec<Rdn> {
    let mut rdns = vec![];

    for rdn in name.iter_rdn() {
        for attr in rdn.iter() {
            let value = match attr.as_str() {
                Ok(s) => s.to_string(),
                Err(_) => hex::encode(attr.attr_value().data),
            };

            rdns.push(Rdn {
                oid: attr.attr_type().to_id_string(),
                value,
            });
        }
    }

    rdns
}

pub(crate) fn to_datetime(t: &ASN1Time) -> Result<DateTime<Utc>, Error> {
    DateTime::from_timestamp(t.timestamp(), 0)
        .ok_or_else(|| Error::Syntax(format!("time out of range: {t}")))
}
