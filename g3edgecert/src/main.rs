/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::Context;

use g3_cert_chain::{
    layout, CertChainRegistry, ImportedRootOptions, KeyProtection, LeafCertOptions,
    RootCertOptions, SubCaOptions,
};

mod opts;
use opts::ProcArgs;

fn main() -> anyhow::Result<()> {
    #[cfg(feature = "vendored-openssl")]
    unsafe {
        openssl_probe::init_openssl_env_vars();
    }

    let proc_args = opts::parse_clap().context("failed to parse command line options")?;
    run(&proc_args)
}

fn run(proc_args: &ProcArgs) -> anyhow::Result<()> {
    let certs_dir = proc_args.output_dir.as_path();
    let mut registry = CertChainRegistry::new();

    match &proc_args.import {
        Some(import) => {
            registry
                .import_root(
                    layout::DEVICE_CA_ID,
                    ImportedRootOptions {
                        cert_file: import.cert_file.clone(),
                        root_cert_file: import.root_cert_file.clone(),
                        chain_cert_file: import.chain_cert_file.clone(),
                        key_file: import.key_file.clone(),
                        protection: KeyProtection::from_passphrase(import.passphrase.clone()),
                    },
                )
                .context("failed to import device CA")?;
        }
        None => {
            registry
                .generate_root(
                    layout::DEVICE_CA_ID,
                    RootCertOptions {
                        subject: proc_args.subject.clone(),
                        validity_days: proc_args.validity_days,
                        protection: KeyProtection::from_passphrase(
                            proc_args.ca_passphrase.clone(),
                        ),
                    },
                )
                .context("failed to generate device CA")?;
        }
    }

    registry
        .issue_intermediate(
            layout::AGENT_CA_ID,
            SubCaOptions {
                issuer_id: layout::DEVICE_CA_ID.to_string(),
                common_name: proc_args.agent_common_name.clone(),
                validity_days: proc_args.validity_days,
                terminal: true,
                protection: KeyProtection::None,
            },
        )
        .context("failed to issue agent CA")?;
    registry
        .issue_leaf(
            layout::HUB_SERVER_ID,
            LeafCertOptions {
                issuer_id: layout::AGENT_CA_ID.to_string(),
                hostname: proc_args.hostname.clone(),
                validity_days: proc_args.validity_days,
                protection: KeyProtection::None,
            },
        )
        .context("failed to issue hub server certificate")?;

    for id in [layout::DEVICE_CA_ID, layout::AGENT_CA_ID, layout::HUB_SERVER_ID] {
        registry
            .export(id, certs_dir)
            .with_context(|| format!("failed to export {id}"))?;
    }
    registry
        .export_pfx(layout::HUB_SERVER_ID, certs_dir)
        .context("failed to export hub server pkcs12")?;
    registry
        .chain(
            layout::CHAIN_CA_ID,
            &[layout::AGENT_CA_ID, layout::DEVICE_CA_ID],
            certs_dir,
        )
        .context("failed to build CA chain bundle")?;

    let root = layout::device_ca_root_cert(certs_dir);
    println!("device root CA:  {}", root.file_path.display());
    let chain = layout::ca_chain_bundle(certs_dir);
    println!("CA chain bundle: {}", chain.file_path.display());
    let pfx = layout::hub_server_pfx(certs_dir);
    println!("hub server PFX:  {}", pfx.file_path.display());
    Ok(())
}
