// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::common::*;
use super::errors::Error;
use super::locator::to_digest;
use crate::tcbinfo::FwId;
use bitmask::*;
use ciborium::Value;
use log::debug;

const COMID_TAG_IDENTITY: i128 = 1;
const COMID_TRIPLES: i128 = 4;

const TAG_ID: i128 = 0;

const TRIPLES_REFERENCE: i128 = 0;
const TRIPLES_ENDORSED: i128 = 1;

const ENVIRONMENT_CLASS: i128 = 0;

const CLASS_ID: i128 = 0;
const CLASS_VENDOR: i128 = 1;
const CLASS_MODEL: i128 = 2;
const CLASS_LAYER: i128 = 3;
const CLASS_INDEX: i128 = 4;

const MEASUREMENT_MKEY: i128 = 0;
const MEASUREMENT_MVAL: i128 = 1;

const MVAL_VERSION: i128 = 0;
const MVAL_SVN: i128 = 1;
const MVAL_DIGESTS: i128 = 2;
const MVAL_FLAGS: i128 = 3;
const MVAL_RAW_VALUE: i128 = 4;
const MVAL_RAW_VALUE_MASK: i128 = 5;

const VERSION_VERSION: i128 = 0;

const TAG_SVN: u64 = 552;
const TAG_MIN_SVN: u64 = 553;
const TAG_TAGGED_BYTES: u64 = 560;

bitmask! {
    #[derive(Debug)]
    mask MvalSet: u8 where flags Mval {
        Version      = 0x01,
        Svn          = 0x02,
        Digests      = 0x04,
        Flags        = 0x08,
        RawValue     = 0x10,
        RawValueMask = 0x20,
    }
}

/// The class part of an environment-map
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvironmentMap {
    pub class_id: Option<String>, // 0 => $class-id-type-choice
    pub vendor: Option<String>,   // 1 => tstr
    pub model: Option<String>,    // 2 => tstr
    pub layer: Option<i64>,       // 3 => uint
    pub index: Option<i64>,       // 4 => uint
}

impl EnvironmentMap {
    fn decode(v: &Value) -> Result<EnvironmentMap, Error> {
        let mut env = EnvironmentMap::default();

        let Some(class) = map_get(to_map(v, "environment-map")?, ENVIRONMENT_CLASS) else {
            return Ok(env);
        };

        for (k, v) in to_map(class, "class-map")?.iter() {
            match int_key(k) {
                Some(CLASS_ID) => env.class_id = Some(to_identifier(v, "class-id")?),
                Some(CLASS_VENDOR) => env.vendor = Some(to_tstr(v, "vendor")?),
                Some(CLASS_MODEL) => env.model = Some(to_tstr(v, "model")?),
                Some(CLASS_LAYER) => env.layer = Some(to_i64(v, "layer")?),
                Some(CLASS_INDEX) => env.index = Some(to_i64(v, "index")?),
                _ => continue,
            }
        }

        Ok(env)
    }
}

/// One measurement-map with its mval flattened
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MeasurementMap {
    pub mkey: Option<String>,
    pub version: Option<String>,
    pub svn: Option<i64>,
    pub digests: Vec<FwId>,
    pub flags: Option<String>,
    pub raw_value: Option<Vec<u8>>,
    pub raw_value_mask: Option<Vec<u8>>,
}

impl MeasurementMap {
    fn decode(v: &Value) -> Result<MeasurementMap, Error> {
        let contents = to_map(v, "measurement-map")?;

        let mval = map_get(contents, MEASUREMENT_MVAL)
            .ok_or_else(|| Error::MissingField("mval".to_string()))?;

        let mut d = MvalDecoder {
            m: MeasurementMap::default(),
            mval_set: MvalSet::none(),
        };

        if let Some(mkey) = map_get(contents, MEASUREMENT_MKEY) {
            d.m.mkey = Some(to_identifier(mkey, "mkey")?);
        }

        d.decode(mval)
    }
}

struct MvalDecoder {
    m: MeasurementMap,
    mval_set: MvalSet,
}

impl MvalDecoder {
    fn decode(mut self, mval: &Value) -> Result<MeasurementMap, Error> {
        for (k, v) in to_map(mval, "measurement-values-map")?.iter() {
            match int_key(k) {
                Some(MVAL_VERSION) => self.set_version(v)?,
                Some(MVAL_SVN) => self.set_svn(v)?,
                Some(MVAL_DIGESTS) => self.set_digests(v)?,
                Some(MVAL_FLAGS) => self.set_flags(v)?,
                Some(MVAL_RAW_VALUE) => self.set_raw_value(v)?,
                Some(MVAL_RAW_VALUE_MASK) => self.set_raw_value_mask(v)?,
                _ => continue,
            }
        }

        if self.m.raw_value_mask.is_some() && self.m.raw_value.is_none() {
            return Err(Error::Sema("raw-value-mask without raw-value".to_string()));
        }

        Ok(self.m)
    }

    fn claim(&mut self, f: Mval, name: &str) -> Result<(), Error> {
        if self.mval_set.contains(f) {
            return Err(Error::DuplicatedField(name.to_string()));
        }
        self.mval_set.set(f);
        Ok(())
    }

    fn set_version(&mut self, v: &Value) -> Result<(), Error> {
        self.claim(Mval::Version, "version")?;

        let version = map_get(to_map(v, "version-map")?, VERSION_VERSION)
            .ok_or_else(|| Error::MissingField("version".to_string()))?;

        self.m.version = Some(to_tstr(version, "version")?);

        Ok(())
    }

    fn set_svn(&mut self, v: &Value) -> Result<(), Error> {
        self.claim(Mval::Svn, "svn")?;

        self.m.svn = match v {
            Value::Tag(TAG_SVN | TAG_MIN_SVN, inner) => Some(to_i64(inner, "svn")?),
            _ => {
                debug!("Ignoring untagged svn");
                None
            }
        };

        Ok(())
    }

    fn set_digests(&mut self, v: &Value) -> Result<(), Error> {
        self.claim(Mval::Digests, "digests")?;

        self.m.digests = to_array(v, "digests")?
            .iter()
            .map(|d| to_digest(d, "digest"))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(())
    }

    fn set_flags(&mut self, v: &Value) -> Result<(), Error> {
        self.claim(Mval::Flags, "flags")?;

        self.m.flags = Some(match v {
            Value::Bytes(b) => hex::encode(b),
            Value::Text(s) => s.to_lowercase(),
            _ => return Err(Error::Syntax("flags: expecting bytes or text".to_string())),
        });

        Ok(())
    }

    fn set_raw_value(&mut self, v: &Value) -> Result<(), Error> {
        self.claim(Mval::RawValue, "raw-value")?;
        self.m.raw_value = Some(to_bstr(untag(v, TAG_TAGGED_BYTES), "raw-value")?);
        Ok(())
    }

    fn set_raw_value_mask(&mut self, v: &Value) -> Result<(), Error> {
        self.claim(Mval::RawValueMask, "raw-value-mask")?;
        self.m.raw_value_mask = Some(to_bstr(v, "raw-value-mask")?);
        Ok(())
    }
}

/// `[environment-map, [+ measurement-map]]`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Triple {
    pub environment: EnvironmentMap,
    pub measurements: Vec<MeasurementMap>,
}

impl Triple {
    fn decode(v: &Value) -> Result<Triple, Error> {
        match to_array(v, "triple")? {
            [env, measurements] => Ok(Triple {
                environment: EnvironmentMap::decode(env)?,
                measurements: to_array(measurements, "measurements")?
                    .iter()
                    .map(MeasurementMap::decode)
                    .collect::<Result<Vec<_>, _>>()?,
            }),
            _ => Err(Error::Syntax(
                "triple: expecting [environment, measurements]".to_string(),
            )),
        }
    }
}

/// Concise Module Identifier: the triples a manifest vouches for
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Comid {
    pub id: Option<String>,
    pub reference_triples: Vec<Triple>,
    pub endorsed_triples: Vec<Triple>,
}

impl Comid {
    /// Decode a CBOR-encoded CoMID
    pub fn decode(buf: &[u8]) -> Result<Comid, Error> {
        let v = decode_cbor(buf)?;

        let mut comid = Comid::default();

        for (k, v) in to_map(&v, "comid")?.iter() {
            match int_key(k) {
                Some(COMID_TAG_IDENTITY) => {
                    if let Some(id) = map_get(to_map(v, "tag-identity")?, TAG_ID) {
                        comid.id = Some(to_identifier(id, "tag-id")?);
                    }
                }
                Some(COMID_TRIPLES) => comid.set_triples(v)?,
                _ => continue,
            }
        }

        Ok(comid)
    }

    fn set_triples(&mut self, v: &Value) -> Result<(), Error> {
        let triples = to_map(v, "triples-map")?;

        let decode_all = |key| -> Result<Vec<Triple>, Error> {
            match map_get(triples, key) {
                Some(t) => to_array(t, "triples")?.iter().map(Triple::decode).collect(),
                None => Ok(vec![]),
            }
        };

        self.reference_triples = decode_all(TRIPLES_REFERENCE)?;
        self.endorsed_triples = decode_all(TRIPLES_ENDORSED)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::corim::{self, ComidBuilder, MeasurementBuilder};
    use crate::tcbinfo::SHA384_OID;

    #[test]
    fn decode_triples() {
        let buf = ComidBuilder::new("comid-1")
            .reference(
                corim::environment(Some("intel.com"), Some("Agilex"), Some(1), None),
                vec![MeasurementBuilder::new()
                    .mkey_oid(&[0x2b, 0x06, 0x01])
                    .svn(3)
                    .digest(7, &[0xaa; 48])
                    .raw_value(&[0x0f], Some(&[0xff]))
                    .build()],
            )
            .endorsed(
                corim::environment(Some("intel.com"), None, Some(0), None),
                vec![MeasurementBuilder::new().version("1.2").build()],
            )
            .encode();

        let comid = Comid::decode(&buf).unwrap();

        assert_eq!(comid.id.as_deref(), Some("comid-1"));
        assert_eq!(comid.reference_triples.len(), 1);
        assert_eq!(comid.endorsed_triples.len(), 1);

        let t = &comid.reference_triples[0];
        assert_eq!(t.environment.vendor.as_deref(), Some("intel.com"));
        assert_eq!(t.environment.model.as_deref(), Some("Agilex"));
        assert_eq!(t.environment.layer, Some(1));

        let m = &t.measurements[0];
        assert_eq!(m.mkey.as_deref(), Some("1.3.6.1"));
        assert_eq!(m.svn, Some(3));
        assert_eq!(m.digests[0].hash_alg, SHA384_OID);
        assert_eq!(m.raw_value, Some(vec![0x0f]));
        assert_eq!(m.raw_value_mask, Some(vec![0xff]));

        let e = &comid.endorsed_triples[0].measurements[0];
        assert_eq!(e.version.as_deref(), Some("1.2"));
    }

    #[test]
    fn untagged_svn_is_ignored() {
        let m = Value::Map(vec![(
            Value::Integer(1.into()),
            Value::Map(vec![(Value::Integer(1.into()), Value::Integer(5.into()))]),
        )]);

        assert_eq!(MeasurementMap::decode(&m).unwrap().svn, None);
    }

    #[test]
    fn duplicated_mval_field() {
        let svn = Value::Tag(TAG_SVN, Box::new(Value::Integer(1.into())));
        let m = Value::Map(vec![(
            Value::Integer(1.into()),
            Value::Map(vec![
                (Value::Integer(1.into()), svn.clone()),
                (Value::Integer(1.into()), svn),
            ]),
        )]);

        assert!(matches!(MeasurementMap::decode(&m), Err(Error::DuplicatedField(_))));
    }

    #[test]
    fn unsupported_digest() {
        let buf = ComidBuilder::new("comid-1")
            .reference(
                corim::environment(Some("intel.com"), None, Some(1), None),
                vec![MeasurementBuilder::new().digest(42, &[0; 32]).build()],
            )
            .encode();

        assert!(matches!(Comid::decode(&buf), Err(Error::UnsupportedHash(_))));
    }

    #[test]
    fn missing_mval() {
        let m = Value::Map(vec![(Value::Integer(0.into()), Value::Text("k".to_string()))]);
        assert!(matches!(MeasurementMap::decode(&m), Err(Error::MissingField(_))));
    }
}
