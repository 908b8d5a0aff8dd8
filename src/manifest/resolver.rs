// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::corim::Corim;
use super::cose::Sign1;
use super::document::{Document, Signed};
use super::errors::Error;
use super::locator::{Locator, LocatorType};
use super::mapping::comid_measurements;
use super::signer::SigningChainService;
use super::xcorim::Xcorim;
use crate::dp::IDistributionPointClient;
use crate::revocation::ICrlProvider;
use crate::tcbinfo::MeasurementSet;
use crate::x509::ISignatureVerifier;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use regex::Regex;
use std::collections::HashSet;

pub const DEFAULT_MAX_DEPTH: u8 = 16;
pub const DEFAULT_PROFILE: &str = "https://intel.com/corim/profile/1.0";

/// Policy knobs for manifest resolution
#[derive(Clone, Debug)]
pub struct ResolverOptions {
    pub accept_unsigned: bool,
    /// nested links followed below the root
    pub max_depth: u8,
    /// empty accepts any profile
    pub allowed_profiles: Vec<String>,
    /// certificate-typed link naming the design manifest
    pub design_locator_pattern: Option<Regex>,
    /// accepted SHA-256 hex values for signer chain roots
    pub trusted_root_hashes: Vec<String>,
    pub require_cross_manifest: bool,
    pub known_extension_oids: Vec<String>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            accept_unsigned: false,
            max_depth: DEFAULT_MAX_DEPTH,
            allowed_profiles: vec![DEFAULT_PROFILE.to_string()],
            design_locator_pattern: None,
            trusted_root_hashes: vec![],
            require_cross_manifest: false,
            known_extension_oids: vec![],
        }
    }
}

/// A manifest that passed every check, with the links still to follow
struct AcceptedManifest {
    measurements: MeasurementSet,
    children: Vec<Locator>,
}

/// Resolves a manifest graph into the measurements it vouches for
pub struct ManifestResolver<'a> {
    dp: &'a dyn IDistributionPointClient,
    signature_verifier: &'a dyn ISignatureVerifier,
    crl_provider: &'a dyn ICrlProvider,
    options: ResolverOptions,
    now: Option<DateTime<Utc>>,
}

impl<'a> ManifestResolver<'a> {
    pub fn new(
        dp: &'a dyn IDistributionPointClient,
        signature_verifier: &'a dyn ISignatureVerifier,
        crl_provider: &'a dyn ICrlProvider,
        options: ResolverOptions,
    ) -> Self {
        Self {
            dp,
            signature_verifier,
            crl_provider,
            options,
            now: None,
        }
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    /// Verify `root` and every manifest reachable from it, level by level,
    /// and merge their measurements.  Any failure aborts the resolution.
    pub fn resolve(&self, root: &[u8]) -> Result<MeasurementSet, Error> {
        let mut result = MeasurementSet::default();
        let mut visited: HashSet<[u8; 32]> = HashSet::new();

        let mut level = vec![("<root>".to_string(), root.to_vec())];
        let mut depth: u8 = 0;

        while !level.is_empty() {
            let mut next = vec![];

            for (origin, data) in level.into_iter() {
                if !visited.insert(openssl::sha::sha256(&data)) {
                    debug!("Manifest {origin} already accepted, skipping");
                    continue;
                }

                let accepted = self.accept(&origin, &data)?;
                result.merge(accepted.measurements);

                if depth >= self.options.max_depth {
                    if !accepted.children.is_empty() {
                        warn!(
                            "Depth limit {} reached at {origin}, not following {} links",
                            self.options.max_depth,
                            accepted.children.len()
                        );
                    }
                    continue;
                }

                for link in accepted.children.iter() {
                    next.push((link.href.clone(), self.download(link)?));
                }
            }

            level = next;
            depth = depth.saturating_add(1);
        }

        info!(
            "Manifest resolution complete: {} reference and {} endorsed measurements",
            result.reference.len(),
            result.endorsed.len()
        );

        Ok(result)
    }

    fn download(&self, link: &Locator) -> Result<Vec<u8>, Error> {
        debug!("Fetching {}", link.href);

        let data = self
            .dp
            .fetch_bytes(&link.href)
            .ok_or_else(|| Error::Download(link.href.clone()))?;

        link.check_thumbprint(&data)?;

        Ok(data)
    }

    fn accept(&self, origin: &str, data: &[u8]) -> Result<AcceptedManifest, Error> {
        let (corim, signer_key) = match Document::decode(data)? {
            Document::SignedCorim(Signed { envelope, content }) => {
                let key = self.verify_envelope(&content, &envelope, origin)?;
                (content, Some(key))
            }
            Document::UnsignedCorim(content) => {
                if !self.options.accept_unsigned {
                    return Err(Error::NotSigned(format!("manifest {origin}")));
                }
                warn!("Accepting unsigned manifest {origin}");
                (content, None)
            }
            Document::SignedXcorim(_) | Document::UnsignedXcorim(_) => {
                return Err(Error::Sema(format!(
                    "{origin}: expecting a manifest, got a cross-manifest"
                )))
            }
        };

        self.check_profile(corim.profile.as_deref())?;
        self.check_cross_manifests(&corim, signer_key.as_deref())?;

        let mut measurements = MeasurementSet::default();
        for comid in corim.comids.iter() {
            measurements.merge(comid_measurements(comid));
        }

        let children = self.children(&corim);

        info!(
            "Manifest {} accepted with {} reference measurements",
            corim.id,
            measurements.reference.len()
        );

        Ok(AcceptedManifest {
            measurements,
            children,
        })
    }

    // signer, signature, validity window
    fn verify_envelope(&self, corim: &Corim, envelope: &Sign1, origin: &str) -> Result<Vec<u8>, Error> {
        let signer_link = corim
            .locators_of(LocatorType::Certificate)
            .find(|l| !self.is_design_link(l))
            .ok_or_else(|| Error::Signer(format!("{origin}: no signer certificate locator")))?;

        let mut signers = SigningChainService::new(self.dp, self.signature_verifier, self.crl_provider)
            .trusted_root_hashes(&self.options.trusted_root_hashes)
            .known_extension_oids(&self.options.known_extension_oids);

        if let Some(now) = self.now {
            signers = signers.at(now);
        }

        let key = signers.resolve(&signer_link.href, envelope.header.kid.as_deref())?;

        if !envelope.verify(self.signature_verifier, &key)? {
            return Err(Error::InvalidSignature(format!("manifest {origin}")));
        }

        envelope.check_validity(self.now())?;

        Ok(key)
    }

    fn check_profile(&self, profile: Option<&str>) -> Result<(), Error> {
        if self.options.allowed_profiles.is_empty() {
            return Ok(());
        }

        match profile {
            Some(p) if self.options.allowed_profiles.iter().any(|a| a == p) => Ok(()),
            Some(p) => Err(Error::UnknownProfile(p.to_string())),
            None => Err(Error::UnknownProfile("<none>".to_string())),
        }
    }

    fn check_cross_manifests(&self, corim: &Corim, signer_key: Option<&[u8]>) -> Result<(), Error> {
        let links: Vec<&Locator> = corim.locators_of(LocatorType::CrossManifest).collect();

        if links.is_empty() {
            if self.options.require_cross_manifest && signer_key.is_some() {
                return Err(Error::MissingField(format!(
                    "cross-manifest locator in {}",
                    corim.id
                )));
            }
            return Ok(());
        }

        for link in links {
            let xcorim = self.load_cross_manifest(link, signer_key)?;

            self.check_profile(xcorim.profile.as_deref())?;

            if xcorim.denies(&corim.id) {
                return Err(Error::Revoked(format!("{} denied by {}", corim.id, xcorim.id)));
            }

            debug!("Manifest {} not denied by {}", corim.id, xcorim.id);
        }

        Ok(())
    }

    fn load_cross_manifest(&self, link: &Locator, signer_key: Option<&[u8]>) -> Result<Xcorim, Error> {
        match Document::decode(&self.download(link)?)? {
            Document::SignedXcorim(Signed { envelope, content }) => {
                let key = signer_key.ok_or_else(|| {
                    Error::Signer(format!(
                        "cannot verify {}: referencing manifest is unsigned",
                        link.href
                    ))
                })?;

                if !envelope.verify(self.signature_verifier, key)? {
                    return Err(Error::InvalidSignature(format!("cross-manifest {}", link.href)));
                }

                envelope.check_validity(self.now())?;

                Ok(content)
            }
            Document::UnsignedXcorim(content) => {
                if !self.options.accept_unsigned {
                    return Err(Error::NotSigned(format!("cross-manifest {}", link.href)));
                }
                Ok(content)
            }
            _ => Err(Error::Sema(format!(
                "{}: expecting a cross-manifest",
                link.href
            ))),
        }
    }

    fn is_design_link(&self, link: &Locator) -> bool {
        self.options
            .design_locator_pattern
            .as_ref()
            .is_some_and(|re| re.is_match(&link.href))
    }

    // the design manifest, when linked, replaces every nested link
    fn children(&self, corim: &Corim) -> Vec<Locator> {
        if let Some(design) = corim
            .locators_of(LocatorType::Certificate)
            .find(|l| self.is_design_link(l))
        {
            debug!("Following design manifest {}", design.href);
            return vec![design.clone()];
        }

        corim.locators_of(LocatorType::Manifest).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dp::MemoDistributionPoint;
    use crate::revocation::MemoCrlProvider;
    use crate::testutils::corim::{self, ComidBuilder, CorimBuilder, MeasurementBuilder, XcorimBuilder};
    use crate::testutils::pki::{self, Pki, Profile};
    use crate::x509::OpensslSignatureVerifier;
    use chrono::Duration;

    const SIGNER: &str = "https://x/signer.pem";
    const TYPE_OID: [u8; 10] = [0x60, 0x86, 0x48, 0x01, 0x86, 0xf8, 0x4d, 0x01, 0x0f, 0x04];

    struct Fixture {
        dp: MemoDistributionPoint,
        verifier: OpensslSignatureVerifier,
        crls: MemoCrlProvider,
        signer: Pki,
    }

    impl Fixture {
        fn new() -> Self {
            let root = pki::issue("Signing Root", None, Profile::ca(None));
            let signer = pki::issue("Manifest Signer", Some(&root), Profile::code_signer());

            let dp = MemoDistributionPoint::new();
            dp.insert(SIGNER, [signer.pem(), root.pem()].concat());

            Self {
                dp,
                verifier: OpensslSignatureVerifier::new(),
                crls: MemoCrlProvider::new(),
                signer,
            }
        }

        fn resolver(&self, options: ResolverOptions) -> ManifestResolver<'_> {
            ManifestResolver::new(&self.dp, &self.verifier, &self.crls, options)
        }

        /// A manifest carrying one reference measurement with digest `[n; 48]`
        fn manifest(&self, id: &str, n: u8) -> CorimBuilder {
            CorimBuilder::new(id)
                .comid(
                    ComidBuilder::new(&format!("{id}-comid"))
                        .reference(
                            corim::environment(Some("intel.com"), None, Some(1), None),
                            vec![MeasurementBuilder::new()
                                .mkey_oid(&TYPE_OID)
                                .digest(7, &[n; 48])
                                .build()],
                        )
                        .encode(),
                )
                .locator(SIGNER, None)
                .kid(self.signer.key_id())
        }

        fn corim_fetches(&self) -> usize {
            self.dp
                .fetched()
                .iter()
                .filter(|p| p.ends_with(".corim"))
                .count()
        }
    }

    #[test]
    fn single_manifest() {
        let f = Fixture::new();
        let root = f.manifest("m0", 0).sign(&f.signer);

        let got = f.resolver(ResolverOptions::default()).resolve(&root).unwrap();

        assert_eq!(got.reference.len(), 1);
        assert!(got.endorsed.is_empty());
        assert_eq!(got.reference[0].value.fwid.as_ref().unwrap().digest, vec![0; 48]);
    }

    #[test]
    fn depth_bound() {
        let f = Fixture::new();
        let href = |i: usize| format!("https://x/m{i}.corim");

        for i in 1..=20 {
            let mut b = f.manifest(&format!("m{i}"), i as u8);
            if i < 20 {
                b = b.locator(&href(i + 1), None);
            }
            f.dp.insert(&href(i), b.sign(&f.signer));
        }

        let root = f.manifest("m0", 0).locator(&href(1), None).sign(&f.signer);

        let got = f.resolver(ResolverOptions::default()).resolve(&root).unwrap();

        assert_eq!(f.corim_fetches(), 16);
        assert_eq!(got.reference.len(), 17);
    }

    #[test]
    fn cycle_is_visited_once() {
        let f = Fixture::new();
        let root = f
            .manifest("m0", 0)
            .locator("https://x/m1.corim", None)
            .sign(&f.signer);
        let m1 = f
            .manifest("m1", 1)
            .locator("https://x/m0.corim", None)
            .sign(&f.signer);

        f.dp.insert("https://x/m0.corim", root.clone());
        f.dp.insert("https://x/m1.corim", m1);

        let got = f.resolver(ResolverOptions::default()).resolve(&root).unwrap();

        assert_eq!(got.reference.len(), 2);
    }

    #[test]
    fn expired() {
        let f = Fixture::new();
        let now = Utc::now();
        let root = f
            .manifest("m0", 0)
            .validity(now - Duration::days(10), now - Duration::days(1))
            .sign(&f.signer);

        let e = f.resolver(ResolverOptions::default()).resolve(&root).unwrap_err();

        assert!(matches!(e, Error::Expired(_)));
        assert!(e.to_string().starts_with("signature expired at "));
    }

    #[test]
    fn valid_window() {
        let f = Fixture::new();
        let now = Utc::now();
        let root = f
            .manifest("m0", 0)
            .validity(now - Duration::days(1), now + Duration::days(1))
            .sign(&f.signer);

        assert!(f.resolver(ResolverOptions::default()).resolve(&root).is_ok());
    }

    #[test]
    fn invalid_signature() {
        let f = Fixture::new();
        let other = pki::issue("Impostor", None, Profile::code_signer());
        let root = f.manifest("m0", 0).sign(&other);

        assert!(matches!(
            f.resolver(ResolverOptions::default()).resolve(&root),
            Err(Error::InvalidSignature(_))
        ));
    }

    #[test]
    fn unsigned() {
        let f = Fixture::new();
        let root = f.manifest("m0", 0).encode_unsigned();

        let e = f.resolver(ResolverOptions::default()).resolve(&root).unwrap_err();
        assert!(matches!(e, Error::NotSigned(_)));
        assert!(e.to_string().ends_with("not signed"));

        let options = ResolverOptions {
            accept_unsigned: true,
            ..Default::default()
        };
        assert_eq!(f.resolver(options).resolve(&root).unwrap().reference.len(), 1);
    }

    #[test]
    fn download_failure() {
        let f = Fixture::new();
        let root = f
            .manifest("m0", 0)
            .locator("https://x/missing.corim", None)
            .sign(&f.signer);

        let e = f.resolver(ResolverOptions::default()).resolve(&root).unwrap_err();

        assert_eq!(
            e.to_string(),
            "failed to download data from path: https://x/missing.corim"
        );
    }

    #[test]
    fn unknown_profile() {
        let f = Fixture::new();
        let root = f
            .manifest("m0", 0)
            .profile(Some("https://example.com/other"))
            .sign(&f.signer);

        assert!(matches!(
            f.resolver(ResolverOptions::default()).resolve(&root),
            Err(Error::UnknownProfile(_))
        ));

        let options = ResolverOptions {
            allowed_profiles: vec![],
            ..Default::default()
        };
        assert!(f.resolver(options).resolve(&root).is_ok());
    }

    #[test]
    fn unsupported_hash() {
        let f = Fixture::new();
        let comid = ComidBuilder::new("c")
            .reference(
                corim::environment(Some("intel.com"), None, Some(1), None),
                vec![MeasurementBuilder::new().digest(42, &[0; 32]).build()],
            )
            .encode();
        let root = CorimBuilder::new("m0")
            .comid(comid)
            .locator(SIGNER, None)
            .sign(&f.signer);

        assert!(matches!(
            f.resolver(ResolverOptions::default()).resolve(&root),
            Err(Error::UnsupportedHash(_))
        ));
    }

    #[test]
    fn cross_manifest() {
        let f = Fixture::new();
        f.dp.insert(
            "https://x/deny.xcorim",
            XcorimBuilder::new("x1").deny("m9").sign(&f.signer),
        );
        f.dp.insert(
            "https://x/revoke.xcorim",
            XcorimBuilder::new("x2").deny("m0").sign(&f.signer),
        );

        let ok = f
            .manifest("m0", 0)
            .locator("https://x/deny.xcorim", None)
            .sign(&f.signer);
        assert!(f.resolver(ResolverOptions::default()).resolve(&ok).is_ok());

        let revoked = f
            .manifest("m0", 0)
            .locator("https://x/revoke.xcorim", None)
            .sign(&f.signer);
        assert!(matches!(
            f.resolver(ResolverOptions::default()).resolve(&revoked),
            Err(Error::Revoked(_))
        ));
    }

    #[test]
    fn cross_manifest_signed_by_someone_else() {
        let f = Fixture::new();
        let other = pki::issue("Impostor", None, Profile::code_signer());
        f.dp.insert(
            "https://x/deny.xcorim",
            XcorimBuilder::new("x1").sign(&other),
        );

        let root = f
            .manifest("m0", 0)
            .locator("https://x/deny.xcorim", None)
            .sign(&f.signer);

        assert!(matches!(
            f.resolver(ResolverOptions::default()).resolve(&root),
            Err(Error::InvalidSignature(_))
        ));
    }

    #[test]
    fn required_cross_manifest() {
        let f = Fixture::new();
        let root = f.manifest("m0", 0).sign(&f.signer);

        let options = ResolverOptions {
            require_cross_manifest: true,
            ..Default::default()
        };

        assert!(matches!(
            f.resolver(options).resolve(&root),
            Err(Error::MissingField(_))
        ));
    }

    #[test]
    fn design_manifest() {
        let f = Fixture::new();
        let design = "https://x/design/d1.corim";
        f.dp.insert(design, f.manifest("design", 7).sign(&f.signer));

        // the firmware link is never fetched once a design link is present
        let root = f
            .manifest("m0", 0)
            .locator(design, Some(0))
            .locator("https://x/missing.corim", None)
            .sign(&f.signer);

        let options = ResolverOptions {
            design_locator_pattern: Some(Regex::new(r"^.*/design/[^/]+\.corim$").unwrap()),
            ..Default::default()
        };

        let got = f.resolver(options).resolve(&root).unwrap();

        assert_eq!(got.reference.len(), 2);
        assert_eq!(got.reference[1].value.fwid.as_ref().unwrap().digest, vec![7; 48]);
    }

    #[test]
    fn not_a_manifest() {
        let f = Fixture::new();
        let x = XcorimBuilder::new("x1").encode_unsigned();

        assert!(matches!(
            f.resolver(ResolverOptions::default()).resolve(&x),
            Err(Error::Sema(_))
        ));
    }
}
