// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use asn1_rs::Oid;
use chrono::{DateTime, Utc};
use ciborium::de::from_reader;
use ciborium::Value;
use std::borrow::Cow;

const TAG_EPOCH_TIME: u64 = 1;
const TAG_RFC3339_TIME: u64 = 0;
const TAG_URI: u64 = 32;
const TAG_UUID: u64 = 37;
const TAG_OID: u64 = 111;

pub fn decode_cbor(buf: &[u8]) -> Result<Value, Error> {
    from_reader(buf).map_err(|e| Error::Syntax(e.to_string()))
}

pub fn encode_cbor(v: &Value) -> Result<Vec<u8>, Error> {
    let mut buf = vec![];
    ciborium::ser::into_writer(v, &mut buf).map_err(|e| Error::Syntax(e.to_string()))?;
    Ok(buf)
}

pub fn int_key(k: &Value) -> Option<i128> {
    match k {
        Value::Integer(i) => Some((*i).into()),
        _ => None,
    }
}

/// Look up an integer-keyed entry
pub fn map_get(m: &[(Value, Value)], key: i128) -> Option<&Value> {
    m.iter()
        .find(|(k, _)| int_key(k) == Some(key))
        .map(|(_, v)| v)
}

/// Strip one level of the given tag, if present
pub fn untag(v: &Value, tag: u64) -> &Value {
    match v {
        Value::Tag(t, inner) if *t == tag => &**inner,
        _ => v,
    }
}

pub fn to_map<'a>(v: &'a Value, name: &str) -> Result<&'a [(Value, Value)], Error> {
    match v {
        Value::Map(m) => Ok(m),
        _ => Err(Error::Syntax(format!("{name}: expecting map"))),
    }
}

pub fn to_array<'a>(v: &'a Value, name: &str) -> Result<&'a [Value], Error> {
    match v {
        Value::Array(a) => Ok(a),
        _ => Err(Error::Syntax(format!("{name}: expecting array"))),
    }
}

pub fn to_bstr(v: &Value, name: &str) -> Result<Vec<u8>, Error> {
    match v {
        Value::Bytes(b) => Ok(b.clone()),
        _ => Err(Error::Syntax(format!("{name}: expecting bytes"))),
    }
}

pub fn to_tstr(v: &Value, name: &str) -> Result<String, Error> {
    match v {
        Value::Text(s) => Ok(s.clone()),
        _ => Err(Error::Syntax(format!("{name}: expecting text"))),
    }
}

pub fn to_int(v: &Value, name: &str) -> Result<i128, Error> {
    match v {
        Value::Integer(i) => Ok((*i).into()),
        _ => Err(Error::Syntax(format!("{name}: expecting integer"))),
    }
}

pub fn to_i64(v: &Value, name: &str) -> Result<i64, Error> {
    i64::try_from(to_int(v, name)?)
        .map_err(|_| Error::Syntax(format!("{name}: integer out of range")))
}

/// Identifiers: text, URI-tagged text, OID-tagged bytes, UUID-tagged or
/// plain bytes (as hex)
pub fn to_identifier(v: &Value, name: &str) -> Result<String, Error> {
    match v {
        Value::Text(s) => Ok(s.clone()),
        Value::Bytes(b) => Ok(hex::encode(b)),
        Value::Tag(TAG_URI, inner) => to_tstr(inner, name),
        Value::Tag(TAG_OID, inner) => {
            let b = to_bstr(inner, name)?;
            Ok(Oid::new(Cow::Borrowed(&b)).to_id_string())
        }
        Value::Tag(TAG_UUID, inner) => Ok(hex::encode(to_bstr(inner, name)?)),
        Value::Integer(i) => Ok(i128::from(*i).to_string()),
        _ => Err(Error::Syntax(format!("{name}: unexpected identifier type"))),
    }
}

/// Epoch seconds (optionally `#6.1`) or RFC 3339 text (optionally `#6.0`)
pub fn to_time(v: &Value, name: &str) -> Result<DateTime<Utc>, Error> {
    match v {
        Value::Tag(TAG_EPOCH_TIME, inner) | Value::Tag(TAG_RFC3339_TIME, inner) => {
            to_time(inner, name)
        }
        Value::Integer(_) => {
            let secs = to_i64(v, name)?;
            DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| Error::Syntax(format!("{name}: time out of range")))
        }
        Value::Text(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| Error::Syntax(format!("{name}: {e}"))),
        _ => Err(Error::Syntax(format!("{name}: expecting time"))),
    }
}
