// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::common::*;
use super::errors::Error;
use crate::x509::{ISignatureVerifier, SignatureAlgorithm};
use chrono::{DateTime, Utc};
use ciborium::Value;
use log::debug;

pub const COSE_SIGN1_TAG: u64 = 18;

const HEADER_ALG: i128 = 1;
const HEADER_CONTENT_TYPE: i128 = 3;
const HEADER_KID: i128 = 4;
const HEADER_CORIM_META: i128 = 8;

const META_SIGNER: i128 = 0;
const META_VALIDITY: i128 = 1;
const VALIDITY_NOT_BEFORE: i128 = 0;
const VALIDITY_NOT_AFTER: i128 = 1;
const SIGNER_ENTITY_NAME: i128 = 0;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignatureValidity {
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
}

/// The protected header fields a manifest envelope may carry
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProtectedHeader {
    pub alg: Option<i128>,
    pub content_type: Option<String>,
    pub kid: Option<Vec<u8>>,
    pub signers: Vec<String>,
    pub validity: Option<SignatureValidity>,
}

impl ProtectedHeader {
    fn decode(buf: &[u8]) -> Result<Self, Error> {
        let mut h = ProtectedHeader::default();

        // zero-length protected bucket
        if buf.is_empty() {
            return Ok(h);
        }

        let v = decode_cbor(buf)?;

        for (k, v) in to_map(&v, "protected header")?.iter() {
            match int_key(k) {
                Some(HEADER_ALG) => h.alg = Some(to_int(v, "alg")?),
                Some(HEADER_CONTENT_TYPE) => {
                    h.content_type = Some(match v {
                        Value::Integer(i) => i128::from(*i).to_string(),
                        _ => to_tstr(v, "content type")?,
                    })
                }
                Some(HEADER_KID) => h.kid = Some(to_bstr(v, "kid")?),
                Some(HEADER_CORIM_META) => h.set_meta(v)?,
                _ => continue,
            }
        }

        Ok(h)
    }

    fn set_meta(&mut self, v: &Value) -> Result<(), Error> {
        // meta may travel bstr-wrapped
        let unwrapped;
        let v = match v {
            Value::Bytes(b) => {
                unwrapped = decode_cbor(b)?;
                &unwrapped
            }
            _ => v,
        };

        let meta = to_map(v, "corim-meta")?;

        if let Some(s) = map_get(meta, META_SIGNER) {
            let signers: &[Value] = match s {
                Value::Array(a) => a,
                other => std::slice::from_ref(other),
            };

            for signer in signers.iter() {
                if let Value::Map(m) = signer {
                    if let Some(Value::Text(name)) = map_get(m, SIGNER_ENTITY_NAME) {
                        self.signers.push(name.clone());
                    }
                }
            }
        }

        if let Some(validity) = map_get(meta, META_VALIDITY) {
            self.validity = Some(match validity {
                Value::Map(m) => SignatureValidity {
                    not_before: map_get(m, VALIDITY_NOT_BEFORE)
                        .map(|t| to_time(t, "not-before"))
                        .transpose()?,
                    not_after: map_get(m, VALIDITY_NOT_AFTER)
                        .map(|t| to_time(t, "not-after"))
                        .transpose()?,
                },
                // a bare time is the end of the window
                t => SignatureValidity {
                    not_before: None,
                    not_after: Some(to_time(t, "signature-validity")?),
                },
            });
        }

        Ok(())
    }
}

/// A decoded COSE_Sign1 structure
#[derive(Clone, Debug, PartialEq)]
pub struct Sign1 {
    /// serialized protected header, as signed
    pub protected: Vec<u8>,
    pub header: ProtectedHeader,
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl Sign1 {
    /// Decode the untagged `[protected, unprotected, payload, signature]`
    /// array
    pub fn from_value(v: Value) -> Result<Sign1, Error> {
        let Value::Array(a) = v else {
            return Err(Error::Syntax("COSE_Sign1: expecting array".to_string()));
        };

        let [protected, unprotected, payload, signature] = <[Value; 4]>::try_from(a)
            .map_err(|a| Error::Syntax(format!("COSE_Sign1: {} items, expecting 4", a.len())))?;

        let protected = to_bstr(&protected, "protected header")?;
        to_map(&unprotected, "unprotected header")?;

        let payload = match payload {
            Value::Bytes(b) => b,
            Value::Null => return Err(Error::Sema("detached payload".to_string())),
            _ => return Err(Error::Syntax("payload: expecting bytes".to_string())),
        };

        Ok(Sign1 {
            header: ProtectedHeader::decode(&protected)?,
            protected,
            payload,
            signature: to_bstr(&signature, "signature")?,
        })
    }

    /// The Sig_structure for a COSE_Sign1 with empty external AAD
    pub fn to_be_signed(&self) -> Result<Vec<u8>, Error> {
        encode_cbor(&Value::Array(vec![
            Value::Text("Signature1".to_string()),
            Value::Bytes(self.protected.clone()),
            Value::Bytes(vec![]),
            Value::Bytes(self.payload.clone()),
        ]))
    }

    /// Verify with a DER SubjectPublicKeyInfo
    pub fn verify(
        &self,
        verifier: &dyn ISignatureVerifier,
        public_key: &[u8],
    ) -> Result<bool, Error> {
        let alg = self
            .header
            .alg
            .ok_or_else(|| Error::MissingField("alg".to_string()))?;

        let alg = SignatureAlgorithm::from_cose(alg)
            .map_err(|e| Error::InvalidSignature(e.to_string()))?;

        let tbs = self.to_be_signed()?;

        Ok(verifier.verify(&tbs, &self.signature, alg, public_key))
    }

    /// Check the signature validity window, if the header declares one
    pub fn check_validity(&self, now: DateTime<Utc>) -> Result<(), Error> {
        let Some(validity) = &self.header.validity else {
            debug!("No signature validity window declared");
            return Ok(());
        };

        if let Some(not_after) = validity.not_after {
            if not_after < now {
                return Err(Error::Expired(not_after.to_rfc3339()));
            }
        }

        if let Some(not_before) = validity.not_before {
            if not_before > now {
                return Err(Error::NotYetValid(not_before.to_rfc3339()));
            }
        }

        Ok(())
    }
}
