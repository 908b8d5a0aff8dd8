// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::common::*;
use super::corim::{Corim, CORIM_TAG, UNSIGNED_CORIM_TAG};
use super::cose::{Sign1, COSE_SIGN1_TAG};
use super::errors::Error;
use super::xcorim::{Xcorim, UNSIGNED_XCORIM_TAG, XCORIM_TAG};
use ciborium::Value;

/// Decoded content together with the envelope that signed it
#[derive(Clone, Debug, PartialEq)]
pub struct Signed<T> {
    pub envelope: Sign1,
    pub content: T,
}

/// Any of the documents a manifest graph is made of
#[derive(Clone, Debug, PartialEq)]
pub enum Document {
    SignedCorim(Signed<Corim>),
    UnsignedCorim(Corim),
    SignedXcorim(Signed<Xcorim>),
    UnsignedXcorim(Xcorim),
}

type Decoder = fn(Value) -> Result<Document, Error>;

/// (outer tag, inner tag) => decoder
const DECODERS: [(u64, u64, Decoder); 4] = [
    (CORIM_TAG, COSE_SIGN1_TAG, decode_signed_corim),
    (CORIM_TAG, UNSIGNED_CORIM_TAG, decode_unsigned_corim),
    (XCORIM_TAG, COSE_SIGN1_TAG, decode_signed_xcorim),
    (XCORIM_TAG, UNSIGNED_XCORIM_TAG, decode_unsigned_xcorim),
];

impl Document {
    pub fn decode(buf: &[u8]) -> Result<Document, Error> {
        let Value::Tag(outer, v) = decode_cbor(buf)? else {
            return Err(Error::Syntax("expecting tagged document".to_string()));
        };

        let Value::Tag(inner, v) = *v else {
            return Err(Error::Syntax(format!("#6.{outer}: expecting tagged content")));
        };

        let (_, _, decoder) = DECODERS
            .iter()
            .find(|(o, i, _)| *o == outer && *i == inner)
            .ok_or_else(|| Error::Syntax(format!("unknown document type #6.{outer}(#6.{inner})")))?;

        decoder(*v)
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Document::SignedCorim(_) | Document::SignedXcorim(_))
    }

    pub fn envelope(&self) -> Option<&Sign1> {
        match self {
            Document::SignedCorim(s) => Some(&s.envelope),
            Document::SignedXcorim(s) => Some(&s.envelope),
            _ => None,
        }
    }

    pub fn profile(&self) -> Option<&str> {
        match self {
            Document::SignedCorim(s) => s.content.profile.as_deref(),
            Document::UnsignedCorim(c) => c.profile.as_deref(),
            Document::SignedXcorim(s) => s.content.profile.as_deref(),
            Document::UnsignedXcorim(x) => x.profile.as_deref(),
        }
    }
}

fn decode_signed<T>(
    v: Value,
    decode: fn(&Value) -> Result<T, Error>,
) -> Result<Signed<T>, Error> {
    let envelope = Sign1::from_value(v)?;
    let content = decode(&decode_cbor(&envelope.payload)?)?;

    Ok(Signed { envelope, content })
}

fn decode_signed_corim(v: Value) -> Result<Document, Error> {
    decode_signed(v, Corim::decode).map(Document::SignedCorim)
}

fn decode_unsigned_corim(v: Value) -> Result<Document, Error> {
    Corim::decode(&v).map(Document::UnsignedCorim)
}

fn decode_signed_xcorim(v: Value) -> Result<Document, Error> {
    decode_signed(v, Xcorim::decode).map(Document::SignedXcorim)
}

fn decode_unsigned_xcorim(v: Value) -> Result<Document, Error> {
    Xcorim::decode(&v).map(Document::UnsignedXcorim)
}
