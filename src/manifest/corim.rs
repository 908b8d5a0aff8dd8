// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::comid::Comid;
use super::common::*;
use super::errors::Error;
use super::locator::{Locator, LocatorType};
use bitmask::*;
use ciborium::Value;
use log::debug;

pub const CORIM_TAG: u64 = 500;
pub const UNSIGNED_CORIM_TAG: u64 = 501;
pub const COMID_TAG: u64 = 506;

const CORIM_ID_LABEL: i128 = 0;
const CORIM_TAGS_LABEL: i128 = 1;
const CORIM_LOCATORS_LABEL: i128 = 2;
const CORIM_PROFILE_LABEL: i128 = 3;

bitmask! {
    #[derive(Debug)]
    mask FieldSet: u8 where flags Field {
        Id       = 0x01,
        Tags     = 0x02,
        Locators = 0x04,
        Profile  = 0x08,
    }
}

/// A reference integrity manifest: the CoMIDs it carries and the links to
/// related documents
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Corim {
    pub id: String,              // 0 => $corim-id-type-choice
    pub comids: Vec<Comid>,      // 1 => [* #6.506(bstr .cbor concise-mid-tag)]
    pub locators: Vec<Locator>,  // 2 => [* corim-locator-map]
    pub profile: Option<String>, // 3 => $profile-type-choice
}

impl Corim {
    /// Decode an (untagged or #6.501-tagged) corim-map
    pub fn decode(v: &Value) -> Result<Corim, Error> {
        let contents = to_map(untag(v, UNSIGNED_CORIM_TAG), "corim-map")?;

        let mut d = CorimDecoder {
            corim: Corim::default(),
            fields_set: FieldSet::none(),
        };

        d.parse(contents)?;
        d.validate()?;

        Ok(d.corim)
    }

    /// Links of the given type
    pub fn locators_of(&self, ltype: LocatorType) -> impl Iterator<Item = &Locator> {
        self.locators.iter().filter(move |l| l.ltype == ltype)
    }
}

struct CorimDecoder {
    corim: Corim,
    fields_set: FieldSet,
}

impl CorimDecoder {
    fn parse(&mut self, contents: &[(Value, Value)]) -> Result<(), Error> {
        for (k, v) in contents.iter() {
            match int_key(k) {
                Some(CORIM_ID_LABEL) => self.set_id(v)?,
                Some(CORIM_TAGS_LABEL) => self.set_tags(v)?,
                Some(CORIM_LOCATORS_LABEL) => self.set_locators(v)?,
                Some(CORIM_PROFILE_LABEL) => self.set_profile(v)?,
                _ => continue,
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), Error> {
        if !self.fields_set.contains(Field::Id) {
            return Err(Error::MissingField("corim-id".to_string()));
        }

        Ok(())
    }

    fn claim(&mut self, f: Field, name: &str) -> Result<(), Error> {
        if self.fields_set.contains(f) {
            return Err(Error::DuplicatedField(name.to_string()));
        }
        self.fields_set.set(f);
        Ok(())
    }

    fn set_id(&mut self, v: &Value) -> Result<(), Error> {
        self.claim(Field::Id, "corim-id")?;
        self.corim.id = to_identifier(v, "corim-id")?;
        Ok(())
    }

    fn set_tags(&mut self, v: &Value) -> Result<(), Error> {
        self.claim(Field::Tags, "tags")?;

        for tag in to_array(v, "tags")?.iter() {
            match tag {
                Value::Tag(COMID_TAG, inner) => {
                    let comid = Comid::decode(&to_bstr(inner, "comid")?)?;
                    self.corim.comids.push(comid);
                }
                Value::Tag(t, _) => debug!("Skipping unsupported tag #6.{t}"),
                _ => return Err(Error::Syntax("tags: expecting tagged entries".to_string())),
            }
        }

        Ok(())
    }

    fn set_locators(&mut self, v: &Value) -> Result<(), Error> {
        self.claim(Field::Locators, "dependent-rims")?;

        // a single locator may appear unwrapped
        self.corim.locators = match v {
            Value::Array(a) => a.iter().map(Locator::decode).collect::<Result<_, _>>()?,
            other => vec![Locator::decode(other)?],
        };

        Ok(())
    }

    fn set_profile(&mut self, v: &Value) -> Result<(), Error> {
        self.claim(Field::Profile, "profile")?;
        self.corim.profile = Some(to_identifier(v, "profile")?);
        Ok(())
    }
}
