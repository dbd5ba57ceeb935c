/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fs;
use std::path::Path;

use log::debug;
use openssl::pkcs12::Pkcs12;
use openssl::symm::Cipher;

use crate::layout;
use crate::policy::KeyProtection;
use crate::registry::{CertChainRegistry, RecordKey};
use crate::CertChainError;

impl CertChainRegistry {
    /// Materialize a registry entry under `<certs_dir>/<id>/`.
    ///
    /// The entry directory is deleted and recreated first, so a re-run never
    /// leaves stale artifacts behind.
    pub fn export(&self, id: &str, certs_dir: &Path) -> Result<(), CertChainError> {
        let record = self
            .entries
            .get(id)
            .ok_or_else(|| CertChainError::UnknownEntry(id.to_string()))?;

        let entry_dir = layout::entry_dir(certs_dir, id);
        if entry_dir.exists() {
            fs::remove_dir_all(&entry_dir).map_err(|e| CertChainError::file(&entry_dir, e))?;
        }

        let key_artifact = layout::private_key_file(certs_dir, id);
        create_private_dir(&key_artifact.dir)?;
        let cert_artifact = layout::cert_file(certs_dir, id);
        fs::create_dir_all(&cert_artifact.dir)
            .map_err(|e| CertChainError::file(&cert_artifact.dir, e))?;

        match &record.key {
            RecordKey::File(src) => {
                fs::copy(src, &key_artifact.file_path)
                    .map_err(|e| CertChainError::file(src, e))?;
            }
            RecordKey::Generated(key_pair) => {
                let pem = match &record.protection {
                    KeyProtection::Encrypted(passphrase) => key_pair
                        .private_key_to_pem_pkcs8_passphrase(
                            Cipher::aes_256_cbc(),
                            passphrase.as_bytes(),
                        ),
                    KeyProtection::None => key_pair.private_key_to_pem_pkcs8(),
                }
                .map_err(|e| CertChainError::Crypto(format!("failed to encode pkey: {e}")))?;
                fs::write(&key_artifact.file_path, pem)
                    .map_err(|e| CertChainError::file(&key_artifact.file_path, e))?;
            }
        }

        match &record.imported_cert_file {
            Some(src) => {
                fs::copy(src, &cert_artifact.file_path)
                    .map_err(|e| CertChainError::file(src, e))?;
            }
            None => {
                let pem = record
                    .certificate
                    .to_pem()
                    .map_err(|e| CertChainError::Crypto(format!("failed to encode cert: {e}")))?;
                fs::write(&cert_artifact.file_path, pem)
                    .map_err(|e| CertChainError::file(&cert_artifact.file_path, e))?;
            }
        }

        if let Some(src) = &record.imported_chain_file {
            let chain_artifact = layout::chain_cert_file(certs_dir, id);
            fs::copy(src, &chain_artifact.file_path).map_err(|e| CertChainError::file(src, e))?;
        }

        if record.is_root() {
            let root_artifact = layout::root_cert_file(certs_dir, id);
            match &record.imported_root_file {
                Some(src) => {
                    fs::copy(src, &root_artifact.file_path)
                        .map_err(|e| CertChainError::file(src, e))?;
                }
                None => {
                    fs::copy(&cert_artifact.file_path, &root_artifact.file_path)
                        .map_err(|e| CertChainError::file(&cert_artifact.file_path, e))?;
                }
            }
        }

        debug!("exported certificate {id} to {}", entry_dir.display());
        Ok(())
    }

    /// Bundle a registry entry's certificate and private key into a PKCS#12
    /// container at `<certs_dir>/<id>/cert/<id>.cert.pfx`.
    ///
    /// The container passphrase is deliberately empty. The private key file
    /// written by `export` keeps its own protection, the PKCS#12 wrapper is
    /// meant to be consumed by runtimes that cannot prompt for a passphrase.
    pub fn export_pfx(&self, id: &str, certs_dir: &Path) -> Result<(), CertChainError> {
        let record = self
            .entries
            .get(id)
            .ok_or_else(|| CertChainError::UnknownEntry(id.to_string()))?;

        let key_pair = record.signing_key()?;
        let pfx = Pkcs12::builder()
            .name(id)
            .pkey(&key_pair)
            .cert(record.certificate())
            .build2("")
            .map_err(|e| CertChainError::Crypto(format!("failed to build pkcs12: {e}")))?;
        let der = pfx
            .to_der()
            .map_err(|e| CertChainError::Crypto(format!("failed to encode pkcs12: {e}")))?;

        let artifact = layout::pfx_file(certs_dir, id);
        fs::create_dir_all(&artifact.dir).map_err(|e| CertChainError::file(&artifact.dir, e))?;
        fs::write(&artifact.file_path, der)
            .map_err(|e| CertChainError::file(&artifact.file_path, e))?;
        debug!("exported pkcs12 for {id} to {}", artifact.file_path.display());
        Ok(())
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> Result<(), CertChainError> {
    use std::os::unix::fs::DirBuilderExt;

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    builder.mode(0o700);
    builder.create(dir).map_err(|e| CertChainError::file(dir, e))
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> Result<(), CertChainError> {
    fs::create_dir_all(dir).map_err(|e| CertChainError::file(dir, e))
}
