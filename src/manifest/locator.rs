// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::common::*;
use super::errors::Error;
use crate::tcbinfo::{hash_alg_from_cose, FwId};
use ciborium::Value;
use openssl::hash::{hash, MessageDigest};

const LOCATOR_HREF: i128 = 0;
const LOCATOR_THUMBPRINT: i128 = 1;
const LOCATOR_TYPE: i128 = 2;

/// What a locator link points at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocatorType {
    /// signer certificate (or PEM bundle)
    Certificate,
    /// nested CoRIM
    Manifest,
    /// cross-manifest deny list
    CrossManifest,
}

impl LocatorType {
    fn from_value(v: &Value) -> Result<Self, Error> {
        match v {
            Value::Integer(i) => match i128::from(*i) {
                0 => Ok(Self::Certificate),
                1 => Ok(Self::Manifest),
                2 => Ok(Self::CrossManifest),
                unknown => Err(Error::Sema(format!("unknown locator type {unknown}"))),
            },
            Value::Text(s) => match s.to_ascii_lowercase().as_str() {
                "certificate" | "cer" => Ok(Self::Certificate),
                "corim" => Ok(Self::Manifest),
                "xcorim" => Ok(Self::CrossManifest),
                unknown => Err(Error::Sema(format!("unknown locator type {unknown}"))),
            },
            _ => Err(Error::Syntax("locator type: expecting int or text".to_string())),
        }
    }

    /// Infer the type from the link's file extension
    pub fn from_href(href: &str) -> Option<Self> {
        let path = href.split(['?', '#']).next().unwrap_or(href);
        let ext = path.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase())?;

        match ext.as_str() {
            "cer" | "crt" | "der" | "pem" => Some(Self::Certificate),
            "corim" => Some(Self::Manifest),
            "xcorim" => Some(Self::CrossManifest),
            _ => None,
        }
    }
}

/// A typed link from a manifest to another resource
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Locator {
    pub href: String,
    pub thumbprint: Option<FwId>,
    pub ltype: LocatorType,
}

impl Locator {
    pub fn new(href: &str, ltype: LocatorType) -> Self {
        Self {
            href: href.to_string(),
            thumbprint: None,
            ltype,
        }
    }

    pub fn decode(v: &Value) -> Result<Locator, Error> {
        let m = to_map(v, "locator")?;

        let href = map_get(m, LOCATOR_HREF)
            .ok_or_else(|| Error::MissingField("locator href".to_string()))
            .and_then(|h| to_identifier(h, "locator href"))?;

        let thumbprint = map_get(m, LOCATOR_THUMBPRINT)
            .map(|t| to_digest(t, "locator thumbprint"))
            .transpose()?;

        let ltype = match map_get(m, LOCATOR_TYPE) {
            Some(t) => LocatorType::from_value(t)?,
            None => LocatorType::from_href(&href)
                .ok_or_else(|| Error::Sema(format!("cannot tell the type of locator {href}")))?,
        };

        Ok(Locator {
            href,
            thumbprint,
            ltype,
        })
    }

    /// Check fetched content against the thumbprint, if there is one
    pub fn check_thumbprint(&self, data: &[u8]) -> Result<(), Error> {
        let Some(t) = &self.thumbprint else {
            return Ok(());
        };

        let md = match t.hash_alg.as_str() {
            crate::tcbinfo::SHA256_OID => MessageDigest::sha256(),
            crate::tcbinfo::SHA384_OID => MessageDigest::sha384(),
            crate::tcbinfo::SHA512_OID => MessageDigest::sha512(),
            other => return Err(Error::UnsupportedHash(other.to_string())),
        };

        let digest = hash(md, data).map_err(|e| Error::Sema(e.to_string()))?;

        if digest.as_ref() != t.digest.as_slice() {
            return Err(Error::Sema(format!("thumbprint mismatch for {}", self.href)));
        }

        Ok(())
    }
}

/// `[alg, bytes]` digest
pub fn to_digest(v: &Value, name: &str) -> Result<FwId, Error> {
    match to_array(v, name)? {
        [alg, digest] => Ok(FwId {
            hash_alg: hash_alg_from_cose(to_int(alg, name)?)?.to_string(),
            digest: to_bstr(digest, name)?,
        }),
        _ => Err(Error::Syntax(format!("{name}: expecting [alg, digest]"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator(entries: Vec<(i32, Value)>) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (Value::Integer(k.into()), v))
                .collect(),
        )
    }

    #[test]
    fn type_from_href() {
        let cases = [
            ("https://x/signer.cer", Some(LocatorType::Certificate)),
            ("file:///tmp/chain.PEM", Some(LocatorType::Certificate)),
            ("https://x/fw/main.corim", Some(LocatorType::Manifest)),
            ("https://x/fw/main.xcorim?v=2", Some(LocatorType::CrossManifest)),
            ("https://x/fw/readme", None),
        ];

        for (href, expected) in cases {
            assert_eq!(LocatorType::from_href(href), expected, "{href}");
        }
    }

    #[test]
    fn decode() {
        let l = Locator::decode(&locator(vec![
            (0, Value::Tag(32, Box::new(Value::Text("https://x/a".to_string())))),
            (2, Value::Integer(2.into())),
        ]))
        .unwrap();
        assert_eq!(l, Locator::new("https://x/a", LocatorType::CrossManifest));

        let l = Locator::decode(&locator(vec![(0, Value::Text("https://x/a.corim".to_string()))]))
            .unwrap();
        assert_eq!(l.ltype, LocatorType::Manifest);

        assert!(matches!(
            Locator::decode(&locator(vec![(0, Value::Text("https://x/a".to_string()))])),
            Err(Error::Sema(_))
        ));
        assert!(matches!(
            Locator::decode(&locator(vec![(2, Value::Integer(1.into()))])),
            Err(Error::MissingField(_))
        ));
    }

    #[test]
    fn thumbprint() {
        let data = b"nested manifest";
        let digest = hash(MessageDigest::sha256(), data).unwrap().to_vec();

        let l = Locator::decode(&locator(vec![
            (0, Value::Text("https://x/a.corim".to_string())),
            (
                1,
                Value::Array(vec![Value::Integer(1.into()), Value::Bytes(digest)]),
            ),
        ]))
        .unwrap();

        assert!(l.check_thumbprint(data).is_ok());
        assert!(matches!(l.check_thumbprint(b"other"), Err(Error::Sema(_))));

        let bad_alg = locator(vec![
            (0, Value::Text("https://x/a.corim".to_string())),
            (1, Value::Array(vec![Value::Integer(99.into()), Value::Bytes(vec![])])),
        ]);
        assert!(matches!(Locator::decode(&bad_alg), Err(Error::UnsupportedHash(_))));
    }
}
