/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;

use anyhow::anyhow;
use clap::{value_parser, Arg, Command, ValueHint};

use g3_cert_chain::CertSubject;

const ARG_OUTPUT_DIR: &str = "output-dir";
const ARG_COUNTRY: &str = "country";
const ARG_STATE: &str = "state";
const ARG_LOCALITY: &str = "locality";
const ARG_ORGANIZATION: &str = "organization";
const ARG_ORGANIZATION_UNIT: &str = "organization-unit";
const ARG_COMMON_NAME: &str = "common-name";
const ARG_AGENT_COMMON_NAME: &str = "agent-common-name";
const ARG_VALIDITY_DAYS: &str = "validity-days";
const ARG_CA_PASSPHRASE: &str = "ca-passphrase";
const ARG_HOSTNAME: &str = "hostname";
const ARG_IMPORT_CERT: &str = "import-cert";
const ARG_IMPORT_KEY: &str = "import-key";
const ARG_IMPORT_ROOT_CERT: &str = "import-root-cert";
const ARG_IMPORT_CHAIN_CERT: &str = "import-chain-cert";
const ARG_IMPORT_KEY_PASSPHRASE: &str = "import-key-passphrase";

pub struct ImportArgs {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
    pub root_cert_file: PathBuf,
    pub chain_cert_file: PathBuf,
    pub passphrase: Option<String>,
}

pub struct ProcArgs {
    pub output_dir: PathBuf,
    pub subject: CertSubject,
    pub validity_days: u32,
    pub ca_passphrase: Option<String>,
    pub agent_common_name: String,
    pub hostname: String,
    pub import: Option<ImportArgs>,
}

fn build_cli_args() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about("bootstrap the certificate hierarchy for an edge device")
        .arg(
            Arg::new(ARG_OUTPUT_DIR)
                .help("Directory to materialize the certificate hierarchy into")
                .value_name("DIR")
                .short('o')
                .long(ARG_OUTPUT_DIR)
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new(ARG_HOSTNAME)
                .help("Hostname the hub server certificate is issued for")
                .value_name("HOSTNAME")
                .long(ARG_HOSTNAME)
                .required(true),
        )
        .arg(
            Arg::new(ARG_COUNTRY)
                .help("Subject country code of the generated root CA")
                .value_name("C")
                .long(ARG_COUNTRY)
                .default_value("US"),
        )
        .arg(
            Arg::new(ARG_STATE)
                .help("Subject state of the generated root CA")
                .value_name("ST")
                .long(ARG_STATE)
                .default_value("Washington"),
        )
        .arg(
            Arg::new(ARG_LOCALITY)
                .help("Subject locality of the generated root CA")
                .value_name("L")
                .long(ARG_LOCALITY)
                .default_value("Redmond"),
        )
        .arg(
            Arg::new(ARG_ORGANIZATION)
                .help("Subject organization of the generated root CA")
                .value_name("O")
                .long(ARG_ORGANIZATION)
                .default_value("Default Edge Organization"),
        )
        .arg(
            Arg::new(ARG_ORGANIZATION_UNIT)
                .help("Subject organizational unit of the generated root CA")
                .value_name("OU")
                .long(ARG_ORGANIZATION_UNIT)
                .default_value("Edge Unit"),
        )
        .arg(
            Arg::new(ARG_COMMON_NAME)
                .help("Subject common name of the generated root CA")
                .value_name("CN")
                .long(ARG_COMMON_NAME)
                .default_value("Edge Device CA"),
        )
        .arg(
            Arg::new(ARG_AGENT_COMMON_NAME)
                .help("Common name of the issued agent CA")
                .value_name("CN")
                .long(ARG_AGENT_COMMON_NAME)
                .default_value("Edge Agent CA"),
        )
        .arg(
            Arg::new(ARG_VALIDITY_DAYS)
                .help("Validity in days for issued certificates")
                .value_name("DAYS")
                .long(ARG_VALIDITY_DAYS)
                .default_value("365")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_CA_PASSPHRASE)
                .help("Passphrase to protect the generated root CA key on export")
                .value_name("PASSPHRASE")
                .long(ARG_CA_PASSPHRASE),
        )
        .arg(
            Arg::new(ARG_IMPORT_CERT)
                .help("Import a pre-issued device CA certificate instead of generating one")
                .value_name("FILE")
                .long(ARG_IMPORT_CERT)
                .value_parser(value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new(ARG_IMPORT_KEY)
                .help("Private key file of the imported device CA")
                .value_name("FILE")
                .long(ARG_IMPORT_KEY)
                .value_parser(value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new(ARG_IMPORT_ROOT_CERT)
                .help("Root certificate file of the imported device CA")
                .value_name("FILE")
                .long(ARG_IMPORT_ROOT_CERT)
                .value_parser(value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new(ARG_IMPORT_CHAIN_CERT)
                .help("Chain certificate file of the imported device CA")
                .value_name("FILE")
                .long(ARG_IMPORT_CHAIN_CERT)
                .value_parser(value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new(ARG_IMPORT_KEY_PASSPHRASE)
                .help("Passphrase of the imported private key")
                .value_name("PASSPHRASE")
                .long(ARG_IMPORT_KEY_PASSPHRASE),
        )
}

pub fn parse_clap() -> anyhow::Result<ProcArgs> {
    let args = build_cli_args().get_matches();

    let subject = CertSubject {
        country: args.get_one::<String>(ARG_COUNTRY).unwrap().clone(),
        state: args.get_one::<String>(ARG_STATE).unwrap().clone(),
        locality: args.get_one::<String>(ARG_LOCALITY).unwrap().clone(),
        organization: args.get_one::<String>(ARG_ORGANIZATION).unwrap().clone(),
        organization_unit: args
            .get_one::<String>(ARG_ORGANIZATION_UNIT)
            .unwrap()
            .clone(),
        common_name: args.get_one::<String>(ARG_COMMON_NAME).unwrap().clone(),
    };

    let import_cert = args.get_one::<PathBuf>(ARG_IMPORT_CERT);
    let import_key = args.get_one::<PathBuf>(ARG_IMPORT_KEY);
    let import_root_cert = args.get_one::<PathBuf>(ARG_IMPORT_ROOT_CERT);
    let import_chain_cert = args.get_one::<PathBuf>(ARG_IMPORT_CHAIN_CERT);
    let import = match (import_cert, import_key, import_root_cert, import_chain_cert) {
        (None, None, None, None) => None,
        (Some(cert_file), Some(key_file), Some(root_cert_file), Some(chain_cert_file)) => {
            Some(ImportArgs {
                cert_file: cert_file.clone(),
                key_file: key_file.clone(),
                root_cert_file: root_cert_file.clone(),
                chain_cert_file: chain_cert_file.clone(),
                passphrase: args.get_one::<String>(ARG_IMPORT_KEY_PASSPHRASE).cloned(),
            })
        }
        _ => {
            return Err(anyhow!(
                "import of a device CA requires --{ARG_IMPORT_CERT}, --{ARG_IMPORT_KEY}, \
                 --{ARG_IMPORT_ROOT_CERT} and --{ARG_IMPORT_CHAIN_CERT} all set"
            ));
        }
    };

    Ok(ProcArgs {
        output_dir: args.get_one::<PathBuf>(ARG_OUTPUT_DIR).unwrap().clone(),
        subject,
        validity_days: *args.get_one::<u32>(ARG_VALIDITY_DAYS).unwrap(),
        ca_passphrase: args.get_one::<String>(ARG_CA_PASSPHRASE).cloned(),
        agent_common_name: args
            .get_one::<String>(ARG_AGENT_COMMON_NAME)
            .unwrap()
            .clone(),
        hostname: args.get_one::<String>(ARG_HOSTNAME).unwrap().clone(),
        import,
    })
}
