// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use crate::dp::ProxyConfig;
use crate::manifest::{ResolverOptions, DEFAULT_MAX_DEPTH, DEFAULT_PROFILE};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_DESIGN_LOCATOR_PATTERN: &str = r"^.*/design/[^/]+\.corim$";

/// Verifier policy, usually read from a JSON file.  Every key is optional.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct VerifierConfig {
    /// SHA-256 hex of the device chain root
    pub trusted_root_hash: Option<String>,
    /// SHA-256 hex values accepted for manifest signer roots
    pub manifest_trusted_root_hashes: Vec<String>,
    pub accept_unsigned_manifest: bool,
    pub require_crl_for_leaf: bool,
    pub require_cross_manifest: bool,
    pub max_manifest_depth: u8,
    pub allowed_profiles: Vec<String>,
    /// empty disables design manifest handling
    pub design_locator_pattern: String,
    /// critical extensions accepted on top of the standard and DICE ones
    pub known_extension_oids: Vec<String>,
    /// extended key purposes the device leaf must carry
    pub leaf_key_purposes: Vec<String>,
    /// devices hold test mode secrets, so their firmware measurement may
    /// report operational flags
    pub test_mode_secrets: bool,
    pub proxy: Option<ProxyConfig>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            trusted_root_hash: None,
            manifest_trusted_root_hashes: vec![],
            accept_unsigned_manifest: false,
            require_crl_for_leaf: false,
            require_cross_manifest: false,
            max_manifest_depth: DEFAULT_MAX_DEPTH,
            allowed_profiles: vec![DEFAULT_PROFILE.to_string()],
            design_locator_pattern: DEFAULT_DESIGN_LOCATOR_PATTERN.to_string(),
            known_extension_oids: vec![],
            leaf_key_purposes: vec![],
            test_mode_secrets: false,
            proxy: None,
        }
    }
}

impl VerifierConfig {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: VerifierConfig =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;

        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), Error> {
        let hashes = self
            .trusted_root_hash
            .iter()
            .chain(self.manifest_trusted_root_hashes.iter());

        for h in hashes {
            let decoded = hex::decode(h.trim())
                .map_err(|e| Error::Config(format!("root hash {h}: {e}")))?;

            if decoded.len() != 32 {
                return Err(Error::Config(format!(
                    "root hash {h}: expecting 32 bytes, got {}",
                    decoded.len()
                )));
            }
        }

        self.design_pattern()?;

        Ok(())
    }

    fn design_pattern(&self) -> Result<Option<Regex>, Error> {
        if self.design_locator_pattern.is_empty() {
            return Ok(None);
        }

        Regex::new(&self.design_locator_pattern)
            .map(Some)
            .map_err(|e| Error::Config(format!("design-locator-pattern: {e}")))
    }

    pub fn resolver_options(&self) -> Result<ResolverOptions, Error> {
        Ok(ResolverOptions {
            accept_unsigned: self.accept_unsigned_manifest,
            max_depth: self.max_manifest_depth,
            allowed_profiles: self.allowed_profiles.clone(),
            design_locator_pattern: self.design_pattern()?,
            trusted_root_hashes: self.manifest_trusted_root_hashes.clone(),
            require_cross_manifest: self.require_cross_manifest,
            known_extension_oids: self.known_extension_oids.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = VerifierConfig::from_json("{}").unwrap();

        assert_eq!(c, VerifierConfig::default());
        assert_eq!(c.max_manifest_depth, 16);
        assert!(!c.accept_unsigned_manifest);

        let o = c.resolver_options().unwrap();
        assert!(o
            .design_locator_pattern
            .unwrap()
            .is_match("https://x/design/abc.corim"));
    }

    #[test]
    fn parse() {
        let json = r#"{
            "trusted-root-hash": "9F86D081884C7D659A2FEAA0C55AD015A3BF4F1B2B0B822CD15D6C15B0F00A08",
            "accept-unsigned-manifest": true,
            "max-manifest-depth": 4,
            "test-mode-secrets": true,
            "design-locator-pattern": "",
            "proxy": { "host": "proxy.example.com", "port": 3128 }
        }"#;

        let c = VerifierConfig::from_json(json).unwrap();

        assert!(c.accept_unsigned_manifest);
        assert_eq!(c.max_manifest_depth, 4);
        assert!(c.test_mode_secrets);
        assert_eq!(c.proxy.as_ref().map(|p| p.port), Some(3128));
        assert!(c.resolver_options().unwrap().design_locator_pattern.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        let bad = [
            r#"{ "trusted-root-hash": "abcd" }"#,
            r#"{ "manifest-trusted-root-hashes": ["zz"] }"#,
            r#"{ "design-locator-pattern": "(" }"#,
            r#"{ "no-such-key": 1 }"#,
        ];

        for json in bad {
            assert!(
                matches!(VerifierConfig::from_json(json), Err(Error::Config(_))),
                "{json}"
            );
        }
    }
}
