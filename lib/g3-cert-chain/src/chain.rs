/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::layout;
use crate::registry::CertChainRegistry;
use crate::CertChainError;

impl CertChainRegistry {
    /// Concatenate the exported certificates of `member_ids`, in the given
    /// order, into `<certs_dir>/<output_id>/cert/<output_id>.cert.pem`.
    ///
    /// A member that was imported with a chain file contributes its exported
    /// `-chain.cert.pem` instead of its plain certificate. Every member must
    /// already be exported under `certs_dir`.
    pub fn chain(
        &self,
        output_id: &str,
        member_ids: &[&str],
        certs_dir: &Path,
    ) -> Result<PathBuf, CertChainError> {
        // resolve all members before any write
        let mut bundle = Vec::new();
        for id in member_ids {
            if !layout::entry_dir(certs_dir, id).is_dir() {
                return Err(CertChainError::UnknownEntry(id.to_string()));
            }
            let use_chain_file = self
                .entries
                .get(*id)
                .map(|r| r.imported_chain_file.is_some())
                .unwrap_or(false);
            let artifact = if use_chain_file {
                layout::chain_cert_file(certs_dir, id)
            } else {
                layout::cert_file(certs_dir, id)
            };
            let data = fs::read(&artifact.file_path)
                .map_err(|e| CertChainError::file(&artifact.file_path, e))?;
            bundle.extend_from_slice(&data);
        }

        let out_dir = layout::entry_dir(certs_dir, output_id);
        if out_dir.exists() {
            fs::remove_dir_all(&out_dir).map_err(|e| CertChainError::file(&out_dir, e))?;
        }
        let artifact = layout::cert_file(certs_dir, output_id);
        fs::create_dir_all(&artifact.dir).map_err(|e| CertChainError::file(&artifact.dir, e))?;
        fs::write(&artifact.file_path, &bundle)
            .map_err(|e| CertChainError::file(&artifact.file_path, e))?;
        debug!(
            "chained {} certificates into {}",
            member_ids.len(),
            artifact.file_path.display()
        );
        Ok(artifact.file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::KeyProtection;
    use crate::registry::{RootCertOptions, SubCaOptions};
    use crate::subject::CertSubject;

    fn test_subject() -> CertSubject {
        CertSubject {
            country: "US".to_string(),
            state: "Washington".to_string(),
            locality: "Redmond".to_string(),
            organization: "Example Org".to_string(),
            organization_unit: "Edge Unit".to_string(),
            common_name: "Edge Device CA".to_string(),
        }
    }

    #[test]
    fn chain_keeps_member_order() {
        let tmp = tempfile::tempdir().unwrap();
        let mut registry = CertChainRegistry::new();
        registry
            .generate_root(
                "device-ca",
                RootCertOptions {
                    subject: test_subject(),
                    validity_days: 365,
                    protection: KeyProtection::None,
                },
            )
            .unwrap();
        registry
            .issue_intermediate(
                "agent-ca",
                SubCaOptions {
                    issuer_id: "device-ca".to_string(),
                    common_name: "Agent CA".to_string(),
                    validity_days: 90,
                    terminal: true,
                    protection: KeyProtection::None,
                },
            )
            .unwrap();
        registry.export("device-ca", tmp.path()).unwrap();
        registry.export("agent-ca", tmp.path()).unwrap();

        let out = registry
            .chain("chain-ca", &["agent-ca", "device-ca"], tmp.path())
            .unwrap();

        let agent = fs::read(layout::cert_file(tmp.path(), "agent-ca").file_path).unwrap();
        let root = fs::read(layout::cert_file(tmp.path(), "device-ca").file_path).unwrap();
        let mut expected = agent;
        expected.extend_from_slice(&root);
        assert_eq!(fs::read(&out).unwrap(), expected);

        // idempotent re-run
        let out2 = registry
            .chain("chain-ca", &["agent-ca", "device-ca"], tmp.path())
            .unwrap();
        assert_eq!(fs::read(&out2).unwrap(), expected);
    }

    #[test]
    fn chain_unknown_member() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = CertChainRegistry::new();
        let r = registry.chain("chain-ca", &["not-exported"], tmp.path());
        assert!(matches!(r, Err(CertChainError::UnknownEntry(_))));
        assert!(!layout::entry_dir(tmp.path(), "chain-ca").exists());
    }
}
