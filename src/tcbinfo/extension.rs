// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use super::value::FwId;
use crate::x509::Extension;
use asn1_rs::{Any, Class, FromDer, Integer, Oid, Tag};
use bitmask::*;
use std::borrow::Cow;

/// tcg-dice-TcbInfo
pub const TCG_DICE_TCB_INFO: &str = "2.23.133.5.4.1";
/// tcg-dice-Ueid
pub const TCG_DICE_UEID: &str = "2.23.133.5.4.4";
/// tcg-dice-MultiTcbInfo
pub const TCG_DICE_MULTI_TCB_INFO: &str = "2.23.133.5.4.5";

/// DICE extensions a verifier understands even when marked critical
pub const DICE_EXTENSION_OIDS: [&str; 3] =
    [TCG_DICE_TCB_INFO, TCG_DICE_MULTI_TCB_INFO, TCG_DICE_UEID];

const UEID_LEN: usize = 16;

const TCB_INFO_VENDOR: u32 = 0;
const TCB_INFO_MODEL: u32 = 1;
const TCB_INFO_VERSION: u32 = 2;
const TCB_INFO_SVN: u32 = 3;
const TCB_INFO_LAYER: u32 = 4;
const TCB_INFO_INDEX: u32 = 5;
const TCB_INFO_FWIDS: u32 = 6;
const TCB_INFO_FLAGS: u32 = 7;
const TCB_INFO_VENDOR_INFO: u32 = 8;
const TCB_INFO_TYPE: u32 = 9;

bitmask! {
    #[derive(Debug)]
    mask FieldSet: u16 where flags Field {
        Vendor     = 0x0001,
        Model      = 0x0002,
        Version    = 0x0004,
        Svn        = 0x0008,
        Layer      = 0x0010,
        Index      = 0x0020,
        FwIds      = 0x0040,
        Flags      = 0x0080,
        VendorInfo = 0x0100,
        Type       = 0x0200,
    }
}

/// A decoded DiceTcbInfo structure
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TcbInfo {
    pub vendor: Option<String>,      // [0] UTF8String
    pub model: Option<String>,       // [1] UTF8String
    pub version: Option<String>,     // [2] UTF8String
    pub svn: Option<i64>,            // [3] INTEGER
    pub layer: Option<i64>,          // [4] INTEGER
    pub index: Option<i64>,          // [5] INTEGER
    pub fwid: Option<FwId>,          // [6] FWIDLIST
    pub flags: Option<String>,       // [7] OperationalFlags, hex
    pub vendor_info: Option<Vec<u8>>, // [8] OCTET STRING
    pub mtype: Option<String>,       // [9] OCTET STRING, OID
}

struct TcbInfoDecoder {
    info: TcbInfo,
    fields_set: FieldSet,
}

impl TcbInfoDecoder {
    fn new() -> Self {
        Self {
            info: Default::default(),
            fields_set: FieldSet::none(),
        }
    }

    fn decode(seq: &Any) -> Result<TcbInfo, Error> {
        expect_universal(seq, Tag::Sequence, "DiceTcbInfo")?;

        let mut d = TcbInfoDecoder::new();
        let mut rest = seq.data;

        while !rest.is_empty() {
            let (r, field) = Any::from_der(rest)
                .map_err(|e| Error::Syntax(format!("DiceTcbInfo field: {e:?}")))?;
            rest = r;

            d.set_field(&field)?;
        }

        Ok(d.info)
    }

    fn set_field(&mut self, field: &Any) -> Result<(), Error> {
        let class = field.header.class();
        let tag = field.header.tag().0;

        if class != Class::ContextSpecific {
            return Err(Error::Syntax(format!(
                "DiceTcbInfo: unexpected {class:?} tag {tag}"
            )));
        }

        match tag {
            TCB_INFO_VENDOR => {
                self.mark(Field::Vendor, "vendor")?;
                self.info.vendor = Some(to_utf8(field.data, "vendor")?);
            }
            TCB_INFO_MODEL => {
                self.mark(Field::Model, "model")?;
                self.info.model = Some(to_utf8(field.data, "model")?);
            }
            TCB_INFO_VERSION => {
                self.mark(Field::Version, "version")?;
                self.info.version = Some(to_utf8(field.data, "version")?);
            }
            TCB_INFO_SVN => {
                self.mark(Field::Svn, "svn")?;
                self.info.svn = Some(to_int(field.data, "svn")?);
            }
            TCB_INFO_LAYER => {
                self.mark(Field::Layer, "layer")?;
                self.info.layer = Some(to_int(field.data, "layer")?);
            }
            TCB_INFO_INDEX => {
                self.mark(Field::Index, "index")?;
                self.info.index = Some(to_int(field.data, "index")?);
            }
            TCB_INFO_FWIDS => {
                self.mark(Field::FwIds, "fwids")?;
                self.info.fwid = to_fwid(field.data)?;
            }
            TCB_INFO_FLAGS => {
                self.mark(Field::Flags, "flags")?;
                self.info.flags = Some(to_flags(field.data)?);
            }
            TCB_INFO_VENDOR_INFO => {
                self.mark(Field::VendorInfo, "vendorInfo")?;
                self.info.vendor_info = Some(field.data.to_vec());
            }
            TCB_INFO_TYPE => {
                self.mark(Field::Type, "type")?;
                self.info.mtype = Some(to_type(field.data)?);
            }
            unknown => {
                return Err(Error::Syntax(format!(
                    "DiceTcbInfo: unknown field [{unknown}]"
                )))
            }
        }

        Ok(())
    }

    fn mark(&mut self, f: Field, name: &str) -> Result<(), Error> {
        if self.fields_set.contains(f) {
            return Err(Error::DuplicatedField(name.to_string()));
        }

        self.fields_set.set(f);

        Ok(())
    }
}

fn parse_single<'a>(der: &'a [u8], what: &str) -> Result<Any<'a>, Error> {
    let (rest, any) = Any::from_der(der).map_err(|e| Error::Syntax(format!("{what}: {e:?}")))?;

    if !rest.is_empty() {
        return Err(Error::Syntax(format!(
            "{what}: {} trailing bytes",
            rest.len()
        )));
    }

    Ok(any)
}

fn expect_universal(any: &Any, tag: Tag, what: &str) -> Result<(), Error> {
    if any.header.class() != Class::Universal || any.header.tag() != tag {
        return Err(Error::Syntax(format!(
            "{what}: expecting universal tag {}, got {:?} tag {}",
            tag.0,
            any.header.class(),
            any.header.tag().0
        )));
    }

    Ok(())
}

fn to_utf8(data: &[u8], name: &str) -> Result<String, Error> {
    std::str::from_utf8(data)
        .map(|s| s.to_string())
        .map_err(|e| Error::Syntax(format!("{name}: {e}")))
}

fn to_int(data: &[u8], name: &str) -> Result<i64, Error> {
    if data.is_empty() {
        return Err(Error::Syntax(format!("{name}: empty integer")));
    }

    Integer::new(data)
        .as_i64()
        .map_err(|e| Error::Syntax(format!("{name}: {e:?}")))
}

fn to_fwid(data: &[u8]) -> Result<Option<FwId>, Error> {
    let mut fwids = vec![];
    let mut rest = data;

    while !rest.is_empty() {
        let (r, fwid) = Any::from_der(rest).map_err(|e| Error::Syntax(format!("FWID: {e:?}")))?;
        rest = r;

        expect_universal(&fwid, Tag::Sequence, "FWID")?;

        let (r, alg) =
            Any::from_der(fwid.data).map_err(|e| Error::Syntax(format!("FWID hashAlg: {e:?}")))?;
        expect_universal(&alg, Tag::Oid, "FWID hashAlg")?;

        let (r, digest) =
            Any::from_der(r).map_err(|e| Error::Syntax(format!("FWID digest: {e:?}")))?;
        expect_universal(&digest, Tag::OctetString, "FWID digest")?;

        if !r.is_empty() {
            return Err(Error::Syntax("FWID: trailing fields".to_string()));
        }

        fwids.push(FwId {
            hash_alg: Oid::new(Cow::Borrowed(alg.data)).to_id_string(),
            digest: digest.data.to_vec(),
        });
    }

    if fwids.len() > 1 {
        return Err(Error::Sema(format!(
            "{} FWIDs found, at most one is supported",
            fwids.len()
        )));
    }

    Ok(fwids.pop())
}

// BIT STRING contents: unused-bits octet followed by the flag bytes
fn to_flags(data: &[u8]) -> Result<String, Error> {
    match data.split_first() {
        Some((unused, bits)) if *unused < 8 => Ok(hex::encode(bits)),
        _ => Err(Error::Syntax("flags: malformed bit string".to_string())),
    }
}

// the type octets carry either a complete OID TLV or bare OID contents
fn to_type(data: &[u8]) -> Result<String, Error> {
    if data.is_empty() {
        return Err(Error::Syntax("type: empty".to_string()));
    }

    if let Ok((rest, any)) = Any::from_der(data) {
        if rest.is_empty() && any.header.class() == Class::Universal && any.header.tag() == Tag::Oid
        {
            return Ok(Oid::new(Cow::Borrowed(any.data)).to_id_string());
        }
    }

    Ok(Oid::new(Cow::Borrowed(data)).to_id_string())
}

/// Decode the DER value of a tcg-dice-TcbInfo extension
pub fn parse_tcb_info(der: &[u8]) -> Result<TcbInfo, Error> {
    let any = parse_single(der, "DiceTcbInfo")?;

    TcbInfoDecoder::decode(&any)
}

/// Decode the DER value of a tcg-dice-MultiTcbInfo extension
pub fn parse_multi_tcb_info(der: &[u8]) -> Result<Vec<TcbInfo>, Error> {
    let seq = parse_single(der, "DiceTcbInfoSeq")?;

    expect_universal(&seq, Tag::Sequence, "DiceTcbInfoSeq")?;

    let mut infos = vec![];
    let mut rest = seq.data;

    while !rest.is_empty() {
        let (r, item) = Any::from_der(rest)
            .map_err(|e| Error::Syntax(format!("DiceTcbInfoSeq item: {e:?}")))?;
        rest = r;

        infos.push(TcbInfoDecoder::decode(&item)?);
    }

    Ok(infos)
}

/// Collect the TcbInfo structures carried in a set of certificate or CRL
/// entry extensions
pub fn tcb_infos_from_extensions(extensions: &[Extension]) -> Result<Vec<TcbInfo>, Error> {
    let mut infos = vec![];

    for e in extensions.iter() {
        match e.oid.as_str() {
            TCG_DICE_TCB_INFO => infos.push(parse_tcb_info(&e.value)?),
            TCG_DICE_MULTI_TCB_INFO => infos.extend(parse_multi_tcb_info(&e.value)?),
            _ => continue,
        }
    }

    Ok(infos)
}

pub fn has_tcb_info_extension(extensions: &[Extension]) -> bool {
    extensions
        .iter()
        .any(|e| e.oid == TCG_DICE_TCB_INFO || e.oid == TCG_DICE_MULTI_TCB_INFO)
}

/// A decoded tcg-dice-Ueid.  The 16 octets are a type code, a 3-octet
/// OUI, 2 reserved octets, the family id, a test mode octet and the 8-octet
/// device uid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ueid {
    pub family_id: u8,
    pub test_mode: u8,
    pub uid: Vec<u8>,
}

/// Decode the DER value of a tcg-dice-Ueid extension
pub fn parse_ueid(der: &[u8]) -> Result<Ueid, Error> {
    let seq = parse_single(der, "TcgUeid")?;
    expect_universal(&seq, Tag::Sequence, "TcgUeid")?;

    let (rest, ueid) =
        Any::from_der(seq.data).map_err(|e| Error::Syntax(format!("TcgUeid ueid: {e:?}")))?;
    expect_universal(&ueid, Tag::OctetString, "TcgUeid ueid")?;

    if !rest.is_empty() {
        return Err(Error::Syntax("TcgUeid: trailing fields".to_string()));
    }

    if ueid.data.len() != UEID_LEN {
        return Err(Error::Syntax(format!(
            "TcgUeid: expecting {UEID_LEN} octets, got {}",
            ueid.data.len()
        )));
    }

    Ok(Ueid {
        family_id: ueid.data[6],
        test_mode: ueid.data[7],
        uid: ueid.data[8..].to_vec(),
    })
}
