/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! Read-only queries over the canonical on-disk export layout.
//!
//! The deployment driver resolves mount sources through these descriptors,
//! it never mutates registry state.

use std::path::{Path, PathBuf};

pub const DEVICE_CA_ID: &str = "edge-device-ca";
pub const AGENT_CA_ID: &str = "edge-agent-ca";
pub const CHAIN_CA_ID: &str = "edge-chain-ca";
pub const HUB_SERVER_ID: &str = "edge-hub-server";

pub struct CertArtifact {
    pub dir: PathBuf,
    pub file_name: String,
    pub file_path: PathBuf,
}

impl CertArtifact {
    fn new(dir: PathBuf, file_name: String) -> Self {
        let file_path = dir.join(&file_name);
        CertArtifact {
            dir,
            file_name,
            file_path,
        }
    }
}

pub(crate) fn entry_dir(certs_dir: &Path, id: &str) -> PathBuf {
    certs_dir.join(id)
}

pub fn private_key_file(certs_dir: &Path, id: &str) -> CertArtifact {
    CertArtifact::new(entry_dir(certs_dir, id).join("private"), format!("{id}.key.pem"))
}

pub fn cert_file(certs_dir: &Path, id: &str) -> CertArtifact {
    CertArtifact::new(entry_dir(certs_dir, id).join("cert"), format!("{id}.cert.pem"))
}

pub fn chain_cert_file(certs_dir: &Path, id: &str) -> CertArtifact {
    CertArtifact::new(
        entry_dir(certs_dir, id).join("cert"),
        format!("{id}-chain.cert.pem"),
    )
}

pub fn root_cert_file(certs_dir: &Path, id: &str) -> CertArtifact {
    CertArtifact::new(
        entry_dir(certs_dir, id).join("cert"),
        format!("{id}-root.cert.pem"),
    )
}

pub fn pfx_file(certs_dir: &Path, id: &str) -> CertArtifact {
    CertArtifact::new(entry_dir(certs_dir, id).join("cert"), format!("{id}.cert.pfx"))
}

/// The device root CA certificate a downstream verifier trusts.
pub fn device_ca_root_cert(certs_dir: &Path) -> CertArtifact {
    root_cert_file(certs_dir, DEVICE_CA_ID)
}

/// The bundled CA chain presented by TLS servers on the device.
pub fn ca_chain_bundle(certs_dir: &Path) -> CertArtifact {
    cert_file(certs_dir, CHAIN_CA_ID)
}

/// The hub server identity in PKCS#12 form.
pub fn hub_server_pfx(certs_dir: &Path) -> CertArtifact {
    pfx_file(certs_dir, HUB_SERVER_ID)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_paths() {
        let base = Path::new("/var/lib/edge/certs");
        let a = private_key_file(base, "device-ca");
        assert_eq!(a.dir, base.join("device-ca").join("private"));
        assert_eq!(a.file_name, "device-ca.key.pem");
        assert_eq!(
            a.file_path,
            base.join("device-ca").join("private").join("device-ca.key.pem")
        );

        let a = hub_server_pfx(base);
        assert_eq!(a.file_name, "edge-hub-server.cert.pfx");
        assert_eq!(
            a.file_path,
            base.join(HUB_SERVER_ID).join("cert").join("edge-hub-server.cert.pfx")
        );
    }
}
