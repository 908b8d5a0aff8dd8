// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use rotverifier::dp::HttpDistributionPoint;
use rotverifier::engine::{AttestationEngine, AttestationResult, VerifierConfig};
use rotverifier::manifest::ManifestResolver;
use rotverifier::revocation::{DistributionPointCrlProvider, RevocationVerifier};
use rotverifier::tcbinfo::{MeasurementSet, TcbInfoMeasurement, DICE_EXTENSION_OIDS};
use rotverifier::x509::{
    Certificate, ChainVerifier, OpensslSignatureVerifier, Rfc7093Method2,
    SubjectKeyIdentifierVerifier,
};
use std::error::Error;
use std::fs;
use std::path::Path;

#[derive(Parser)]
enum RotVerifierCli {
    VerifyChain(VerifyChainArgs),
    Resolve(ResolveArgs),
    Attest(AttestArgs),
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Verify the supplied device certificate chain (leaf first) and \
    check it for revocation")]
struct VerifyChainArgs {
    #[arg(short, long, default_value = "chain.pem")]
    chain: String,

    #[arg(long)]
    config: Option<String>,

    #[arg(short, long)]
    trusted_root_hash: Option<String>,
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Resolve the supplied CoRIM and every manifest it links to, and \
    print the reference and endorsed measurements")]
struct ResolveArgs {
    #[arg(short, long, default_value = "manifest.corim")]
    manifest: String,

    #[arg(short, long)]
    config: Option<String>,
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Attest a device from its certificate chain, its reported \
    measurements and the CoRIM describing its expected state")]
struct AttestArgs {
    #[arg(long, default_value = "chain.pem")]
    chain: String,

    #[arg(long, default_value = "measurements.json")]
    measurements: String,

    #[arg(long, default_value = "manifest.corim")]
    manifest: String,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    trusted_root_hash: Option<String>,

    /// hex device id the chain UEIDs must name
    #[arg(long)]
    device_id: Option<String>,
}

fn main() {
    env_logger::init();

    match RotVerifierCli::parse() {
        RotVerifierCli::VerifyChain(args) => match verify_chain(&args) {
            Ok(()) => println!("chain verification successful"),
            Err(e) => eprintln!("chain verification failed: {e}"),
        },

        RotVerifierCli::Resolve(args) => match resolve(&args) {
            Ok(m) => match serde_json::to_string_pretty(&m) {
                Ok(j) => println!("{j}"),
                Err(e) => eprintln!("manifest resolution failed: {e}"),
            },
            Err(e) => eprintln!("manifest resolution failed: {e}"),
        },

        RotVerifierCli::Attest(args) => match attest(&args) {
            Ok(AttestationResult::Accepted(_)) => println!("attestation successful"),
            Ok(AttestationResult::Rejected(r)) => eprintln!("attestation failed: {r}"),
            Err(e) => eprintln!("attestation failed: {e}"),
        },
    }
}

fn load_config(path: &Option<String>) -> Result<VerifierConfig, Box<dyn Error>> {
    match path {
        Some(p) => Ok(VerifierConfig::load(Path::new(p))?),
        None => Ok(VerifierConfig::default()),
    }
}

fn verify_chain(args: &VerifyChainArgs) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args.config)?;

    let chain = Certificate::parse_all(&fs::read(&args.chain)?)?;

    let dp = HttpDistributionPoint::new(config.proxy.as_ref())?;
    let crls = DistributionPointCrlProvider::new(&dp);
    let sv = OpensslSignatureVerifier::new();

    let trusted = args
        .trusted_root_hash
        .as_deref()
        .or(config.trusted_root_hash.as_deref());

    ChainVerifier::new(&sv)
        .known_extension_oids(DICE_EXTENSION_OIDS)
        .known_extension_oids(config.known_extension_oids.iter().cloned())
        .check(&chain, trusted)?;

    if !SubjectKeyIdentifierVerifier::new(&Rfc7093Method2).verify_all(&chain) {
        return Err("subject key identifier mismatch".into());
    }

    if !RevocationVerifier::new(&crls, &sv)
        .require_crl_for_leaf(config.require_crl_for_leaf)
        .verify(&chain)
    {
        return Err("certificate chain revoked".into());
    }

    Ok(())
}

fn resolve(args: &ResolveArgs) -> Result<MeasurementSet, Box<dyn Error>> {
    let config = load_config(&args.config)?;

    let dp = HttpDistributionPoint::new(config.proxy.as_ref())?;
    let crls = DistributionPointCrlProvider::new(&dp);
    let sv = OpensslSignatureVerifier::new();

    let root = fs::read(&args.manifest)?;

    let m = ManifestResolver::new(&dp, &sv, &crls, config.resolver_options()?).resolve(&root)?;

    Ok(m)
}

fn attest(args: &AttestArgs) -> Result<AttestationResult, Box<dyn Error>> {
    let config = load_config(&args.config)?;

    let dp = HttpDistributionPoint::new(config.proxy.as_ref())?;
    let crls = DistributionPointCrlProvider::new(&dp);
    let sv = OpensslSignatureVerifier::new();

    let chain = Certificate::parse_all(&fs::read(&args.chain)?)?;

    let j = fs::read_to_string(&args.measurements)?;
    let measurements: Vec<TcbInfoMeasurement> = serde_json::from_str(&j)?;

    let root = fs::read(&args.manifest)?;

    let mut engine = AttestationEngine::new(config, &sv, &crls, &dp);
    if let Some(id) = &args.device_id {
        engine = engine.device_id(&hex::decode(id)?);
    }

    let r = engine.attest(
        &chain,
        &measurements,
        &root,
        args.trusted_root_hash.as_deref(),
    )?;

    Ok(r)
}
