// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Fixtures shared by the unit tests.

/// Synthetic certificates signed with a keyed-hash stand-in for real crypto
pub mod fake {
    use crate::x509::*;
    use chrono::{Duration, Utc};

    pub const ALG_OID: &str = "1.2.840.10045.4.3.2";

    /// Accepts a signature iff it equals `SHA-256(message || public_key)`
    pub struct FakeSignatureVerifier;

    impl ISignatureVerifier for FakeSignatureVerifier {
        fn verify(
            &self,
            message: &[u8],
            signature: &[u8],
            _algorithm: SignatureAlgorithm,
            public_key: &[u8],
        ) -> bool {
            signature == sign(message, public_key)
        }
    }

    pub fn sign(message: &[u8], public_key: &[u8]) -> Vec<u8> {
        let mut m = message.to_vec();
        m.extend_from_slice(public_key);
        openssl::sha::sha256(&m).to_vec()
    }

    fn key_of(subject: &str) -> Vec<u8> {
        format!("key-{subject}").into_bytes()
    }

    pub fn certificate(
        subject: &str,
        issuer: &str,
        basic_constraints: Option<BasicConstraints>,
        key_usage: Vec<KeyUsage>,
    ) -> Certificate {
        let now = Utc::now();
        let key = key_of(subject);
        let tbs = format!("tbs-{subject}").into_bytes();
        let issuer_key = key_of(issuer);

        Certificate {
            der: format!("der-{subject}").into_bytes(),
            signature: sign(&tbs, &issuer_key),
            tbs,
            signature_algorithm: ALG_OID.to_string(),
            serial: subject.as_bytes().to_vec(),
            subject: vec![Rdn::new("2.5.4.3", subject)],
            issuer: vec![Rdn::new("2.5.4.3", issuer)],
            subject_name: format!("CN={subject}"),
            not_before: now - Duration::days(1),
            not_after: now + Duration::days(1),
            public_key: key.clone(),
            subject_key_id: Some(Rfc7093Method2.key_identifier(&key)),
            authority_key_id: if subject != issuer {
                Some(Rfc7093Method2.key_identifier(&issuer_key))
            } else {
                None
            },
            public_key_bits: key,
            basic_constraints,
            key_usage: Some(key_usage),
            ..Default::default()
        }
    }

    pub fn leaf(subject: &str, issuer: &str) -> Certificate {
        certificate(subject, issuer, None, vec![KeyUsage::DigitalSignature])
    }

    /// Leaf first.  Certificate `i > 0` is a CA allowing `i - 1`
    /// intermediates below it; the last one is self-signed.
    pub fn chain(len: usize) -> Vec<Certificate> {
        let name = |i: usize| format!("cert-{i}");

        (0..len)
            .map(|i| {
                let issuer = if i + 1 < len { name(i + 1) } else { name(i) };

                if i == 0 {
                    return certificate(&name(0), &issuer, None, vec![KeyUsage::DigitalSignature]);
                }

                certificate(
                    &name(i),
                    &issuer,
                    Some(BasicConstraints {
                        ca: true,
                        path_len: Some(i as u32 - 1),
                    }),
                    vec![KeyUsage::KeyCertSign, KeyUsage::CrlSign],
                )
            })
            .collect()
    }

    /// A CRL issued by `issuer`, signed with its fake key
    pub fn crl(issuer: &Certificate, entries: Vec<CrlEntry>) -> Crl {
        let tbs = format!("crl-tbs-{}-{}", issuer.subject_name, entries.len()).into_bytes();

        Crl {
            der: tbs.clone(),
            signature: sign(&tbs, &issuer.public_key),
            tbs,
            signature_algorithm: ALG_OID.to_string(),
            issuer_name: issuer.subject_name.clone(),
            next_update: Some(Utc::now() + Duration::days(1)),
            entries,
        }
    }
}

/// Real certificates and keys, issued with OpenSSL
pub mod pki {
    use openssl::asn1::Asn1Time;
    use openssl::bn::BigNum;
    use openssl::ec::{EcGroup, EcKey};
    use openssl::ecdsa::EcdsaSig;
    use openssl::hash::MessageDigest;
    use openssl::nid::Nid;
    use openssl::pkey::{PKey, Private};
    use openssl::sign::Signer;
    use openssl::x509::extension::{
        AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage,
        SubjectKeyIdentifier,
    };
    use openssl::x509::{X509Builder, X509NameBuilder, X509};
    use std::sync::atomic::{AtomicU32, Ordering};

    static SERIAL: AtomicU32 = AtomicU32::new(1);

    pub struct Pki {
        pub key: PKey<Private>,
        pub cert: X509,
    }

    impl Pki {
        pub fn der(&self) -> Vec<u8> {
            self.cert.to_der().unwrap()
        }

        pub fn pem(&self) -> Vec<u8> {
            self.cert.to_pem().unwrap()
        }

        /// DER SubjectPublicKeyInfo
        pub fn spki(&self) -> Vec<u8> {
            self.key.public_key_to_der().unwrap()
        }

        /// ES256 signature in COSE `r || s` form
        pub fn sign_raw(&self, message: &[u8]) -> Vec<u8> {
            let mut s = Signer::new(MessageDigest::sha256(), &self.key).unwrap();
            s.update(message).unwrap();
            let der = s.sign_to_vec().unwrap();

            let sig = EcdsaSig::from_der(&der).unwrap();
            let mut raw = sig.r().to_vec_padded(32).unwrap();
            raw.extend(sig.s().to_vec_padded(32).unwrap());
            raw
        }

        /// SubjectKeyIdentifier extension value
        pub fn key_id(&self) -> Vec<u8> {
            self.cert
                .subject_key_id()
                .map(|k| k.as_slice().to_vec())
                .unwrap_or_default()
        }
    }

    #[derive(Clone, Copy)]
    pub struct Profile {
        ca: Option<Option<u32>>,
        code_signing: bool,
        key_ids: bool,
        validity_days: u32,
    }

    impl Profile {
        pub fn ca(path_len: Option<u32>) -> Self {
            Self {
                ca: Some(path_len),
                code_signing: false,
                key_ids: true,
                validity_days: 30,
            }
        }

        pub fn code_signer() -> Self {
            Self {
                ca: None,
                code_signing: true,
                key_ids: true,
                validity_days: 30,
            }
        }

        /// End-entity certificate without key identifiers
        pub fn device_leaf() -> Self {
            Self {
                ca: None,
                code_signing: false,
                key_ids: false,
                validity_days: 30,
            }
        }

        pub fn without_key_ids(mut self) -> Self {
            self.key_ids = false;
            self
        }

        pub fn without_code_signing(mut self) -> Self {
            self.code_signing = false;
            self
        }
    }

    pub fn issue(subject: &str, issuer: Option<&Pki>, profile: Profile) -> Pki {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("O", "Example").unwrap();
        name.append_entry_by_text("CN", subject).unwrap();
        let name = name.build();

        let mut b = X509Builder::new().unwrap();
        b.set_version(2).unwrap();
        let serial = BigNum::from_u32(SERIAL.fetch_add(1, Ordering::SeqCst))
            .unwrap()
            .to_asn1_integer()
            .unwrap();
        b.set_serial_number(&serial).unwrap();
        b.set_subject_name(&name).unwrap();
        match issuer {
            Some(i) => b.set_issuer_name(i.cert.subject_name()).unwrap(),
            None => b.set_issuer_name(&name).unwrap(),
        }
        b.set_pubkey(&key).unwrap();

        let not_before = Asn1Time::from_unix(chrono::Utc::now().timestamp() - 3600).unwrap();
        b.set_not_before(&not_before).unwrap();
        b.set_not_after(&Asn1Time::days_from_now(profile.validity_days).unwrap())
            .unwrap();

        match profile.ca {
            Some(path_len) => {
                let mut bc = BasicConstraints::new();
                bc.critical().ca();
                if let Some(pl) = path_len {
                    bc.pathlen(pl);
                }
                b.append_extension(bc.build().unwrap()).unwrap();
                b.append_extension(
                    KeyUsage::new()
                        .critical()
                        .key_cert_sign()
                        .crl_sign()
                        .build()
                        .unwrap(),
                )
                .unwrap();
            }
            None => {
                b.append_extension(KeyUsage::new().critical().digital_signature().build().unwrap())
                    .unwrap();
            }
        }

        if profile.code_signing {
            b.append_extension(ExtendedKeyUsage::new().code_signing().build().unwrap())
                .unwrap();
        }

        if profile.key_ids {
            let ski = SubjectKeyIdentifier::new()
                .build(&b.x509v3_context(None, None))
                .unwrap();
            b.append_extension(ski).unwrap();

            if let Some(i) = issuer {
                let aki = AuthorityKeyIdentifier::new()
                    .keyid(true)
                    .build(&b.x509v3_context(Some(&i.cert), None))
                    .unwrap();
                b.append_extension(aki).unwrap();
            }
        }

        let signing_key = issuer.map(|i| &i.key).unwrap_or(&key);
        b.sign(signing_key, MessageDigest::sha256()).unwrap();

        Pki {
            key,
            cert: b.build(),
        }
    }
}

/// CBOR builders for CoMID, CoRIM and cross-manifest documents
pub mod corim {
    use super::pki::Pki;
    use chrono::{DateTime, Utc};
    use ciborium::Value;

    pub const PROFILE: &str = "https://intel.com/corim/profile/1.0";

    fn int(i: i64) -> Value {
        Value::Integer(i.into())
    }

    fn map(entries: Vec<(i64, Value)>) -> Value {
        Value::Map(entries.into_iter().map(|(k, v)| (int(k), v)).collect())
    }

    fn tag(t: u64, v: Value) -> Value {
        Value::Tag(t, Box::new(v))
    }

    fn encode(v: &Value) -> Vec<u8> {
        let mut buf = vec![];
        ciborium::ser::into_writer(v, &mut buf).unwrap();
        buf
    }

    pub fn epoch(t: DateTime<Utc>) -> Value {
        tag(1, int(t.timestamp()))
    }

    /// environment-map with a class-map
    pub fn environment(
        vendor: Option<&str>,
        model: Option<&str>,
        layer: Option<i64>,
        index: Option<i64>,
    ) -> Value {
        let mut class = vec![];
        if let Some(v) = vendor {
            class.push((1, Value::Text(v.to_string())));
        }
        if let Some(m) = model {
            class.push((2, Value::Text(m.to_string())));
        }
        if let Some(l) = layer {
            class.push((3, int(l)));
        }
        if let Some(i) = index {
            class.push((4, int(i)));
        }
        map(vec![(0, map(class))])
    }

    #[derive(Default)]
    pub struct MeasurementBuilder {
        mkey: Option<Value>,
        mval: Vec<(i64, Value)>,
    }

    impl MeasurementBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn mkey_oid(mut self, oid: &[u8]) -> Self {
            self.mkey = Some(tag(111, Value::Bytes(oid.to_vec())));
            self
        }

        pub fn version(mut self, v: &str) -> Self {
            self.mval
                .push((0, map(vec![(0, Value::Text(v.to_string()))])));
            self
        }

        pub fn svn(mut self, svn: i64) -> Self {
            self.mval.push((1, tag(552, int(svn))));
            self
        }

        pub fn digest(mut self, alg: i64, digest: &[u8]) -> Self {
            self.mval.push((
                2,
                Value::Array(vec![Value::Array(vec![
                    int(alg),
                    Value::Bytes(digest.to_vec()),
                ])]),
            ));
            self
        }

        pub fn raw_value(mut self, value: &[u8], mask: Option<&[u8]>) -> Self {
            self.mval.push((4, Value::Bytes(value.to_vec())));
            if let Some(m) = mask {
                self.mval.push((5, Value::Bytes(m.to_vec())));
            }
            self
        }

        pub fn build(self) -> Value {
            let mut m = vec![];
            if let Some(k) = self.mkey {
                m.push((0, k));
            }
            m.push((1, map(self.mval)));
            map(m)
        }
    }

    pub struct ComidBuilder {
        id: String,
        reference: Vec<Value>,
        endorsed: Vec<Value>,
    }

    impl ComidBuilder {
        pub fn new(id: &str) -> Self {
            Self {
                id: id.to_string(),
                reference: vec![],
                endorsed: vec![],
            }
        }

        pub fn reference(mut self, env: Value, measurements: Vec<Value>) -> Self {
            self.reference
                .push(Value::Array(vec![env, Value::Array(measurements)]));
            self
        }

        pub fn endorsed(mut self, env: Value, measurements: Vec<Value>) -> Self {
            self.endorsed
                .push(Value::Array(vec![env, Value::Array(measurements)]));
            self
        }

        pub fn encode(self) -> Vec<u8> {
            encode(&map(vec![
                (1, map(vec![(0, Value::Text(self.id))])),
                (
                    4,
                    map(vec![
                        (0, Value::Array(self.reference)),
                        (1, Value::Array(self.endorsed)),
                    ]),
                ),
            ]))
        }
    }

    /// Protected header knobs shared by both document kinds
    #[derive(Clone, Default)]
    struct Header {
        kid: Option<Vec<u8>>,
        validity: Option<(DateTime<Utc>, DateTime<Utc>)>,
    }

    impl Header {
        fn encode(&self) -> Vec<u8> {
            let mut h = vec![(1, int(-7))];
            if let Some(kid) = &self.kid {
                h.push((4, Value::Bytes(kid.clone())));
            }
            if let Some((nb, na)) = self.validity {
                h.push((
                    8,
                    map(vec![
                        (0, map(vec![(0, Value::Text("Example signer".to_string()))])),
                        (1, map(vec![(0, epoch(nb)), (1, epoch(na))])),
                    ]),
                ));
            }
            encode(&map(h))
        }
    }

    fn seal(outer: u64, payload: Vec<u8>, header: &Header, sign: impl Fn(&[u8]) -> Vec<u8>) -> Vec<u8> {
        let protected = header.encode();

        let tbs = encode(&Value::Array(vec![
            Value::Text("Signature1".to_string()),
            Value::Bytes(protected.clone()),
            Value::Bytes(vec![]),
            Value::Bytes(payload.clone()),
        ]));

        encode(&tag(
            outer,
            tag(
                18,
                Value::Array(vec![
                    Value::Bytes(protected),
                    Value::Map(vec![]),
                    Value::Bytes(payload),
                    Value::Bytes(sign(&tbs)),
                ]),
            ),
        ))
    }

    pub struct CorimBuilder {
        id: String,
        profile: Option<String>,
        comids: Vec<Vec<u8>>,
        locators: Vec<Value>,
        header: Header,
    }

    impl CorimBuilder {
        pub fn new(id: &str) -> Self {
            Self {
                id: id.to_string(),
                profile: Some(PROFILE.to_string()),
                comids: vec![],
                locators: vec![],
                header: Header::default(),
            }
        }

        pub fn profile(mut self, profile: Option<&str>) -> Self {
            self.profile = profile.map(str::to_string);
            self
        }

        pub fn comid(mut self, comid: Vec<u8>) -> Self {
            self.comids.push(comid);
            self
        }

        /// `ltype` 0 certificate, 1 corim, 2 xcorim; inferred from the
        /// href when absent
        pub fn locator(mut self, href: &str, ltype: Option<i64>) -> Self {
            let mut l = vec![(0, tag(32, Value::Text(href.to_string())))];
            if let Some(t) = ltype {
                l.push((2, int(t)));
            }
            self.locators.push(map(l));
            self
        }

        pub fn kid(mut self, kid: Vec<u8>) -> Self {
            self.header.kid = Some(kid);
            self
        }

        pub fn validity(mut self, not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
            self.header.validity = Some((not_before, not_after));
            self
        }

        /// The corim-map, untagged
        pub fn to_value(&self) -> Value {
            let mut m = vec![(0, Value::Text(self.id.clone()))];
            if !self.comids.is_empty() {
                m.push((
                    1,
                    Value::Array(
                        self.comids
                            .iter()
                            .map(|c| tag(506, Value::Bytes(c.clone())))
                            .collect(),
                    ),
                ));
            }
            if !self.locators.is_empty() {
                m.push((2, Value::Array(self.locators.clone())));
            }
            if let Some(p) = &self.profile {
                m.push((3, tag(32, Value::Text(p.clone()))));
            }
            map(m)
        }

        pub fn encode_unsigned(&self) -> Vec<u8> {
            encode(&tag(500, tag(501, self.to_value())))
        }

        pub fn sign_with(&self, sign: impl Fn(&[u8]) -> Vec<u8>) -> Vec<u8> {
            seal(500, encode(&tag(501, self.to_value())), &self.header, sign)
        }

        pub fn sign(&self, signer: &Pki) -> Vec<u8> {
            self.sign_with(|tbs| signer.sign_raw(tbs))
        }
    }

    pub struct XcorimBuilder {
        id: String,
        deny_list: Vec<String>,
        header: Header,
    }

    impl XcorimBuilder {
        pub fn new(id: &str) -> Self {
            Self {
                id: id.to_string(),
                deny_list: vec![],
                header: Header::default(),
            }
        }

        pub fn deny(mut self, id: &str) -> Self {
            self.deny_list.push(id.to_string());
            self
        }

        pub fn to_value(&self) -> Value {
            map(vec![
                (0, Value::Text(self.id.clone())),
                (
                    1,
                    Value::Array(
                        self.deny_list
                            .iter()
                            .map(|d| Value::Text(d.clone()))
                            .collect(),
                    ),
                ),
                (3, tag(32, Value::Text(PROFILE.to_string()))),
            ])
        }

        pub fn encode_unsigned(&self) -> Vec<u8> {
            encode(&tag(510, tag(511, self.to_value())))
        }

        pub fn sign_with(&self, sign: impl Fn(&[u8]) -> Vec<u8>) -> Vec<u8> {
            seal(510, encode(&self.to_value()), &self.header, sign)
        }

        pub fn sign(&self, signer: &Pki) -> Vec<u8> {
            self.sign_with(|tbs| signer.sign_raw(tbs))
        }
    }
}
