/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fs;
use std::path::Path;

use openssl::pkey::{Id, PKey, Private};
use openssl::rsa::Rsa;

use crate::policy::KeyProtection;
use crate::CertChainError;

pub(crate) const DEFAULT_RSA_BITS: u32 = 2048;

pub(crate) fn new_rsa(bits: u32) -> Result<PKey<Private>, CertChainError> {
    let rsa_key = Rsa::generate(bits)
        .map_err(|e| CertChainError::Crypto(format!("failed to generate rsa {bits} keypair: {e}")))?;
    PKey::from_rsa(rsa_key)
        .map_err(|e| CertChainError::Crypto(format!("failed to convert rsa key to pkey: {e}")))
}

/// Load an RSA private key from a PEM file, decrypting it when the
/// protection carries a passphrase, and run the RSA self-consistency check.
pub(crate) fn load_rsa(path: &Path, protection: &KeyProtection) -> Result<PKey<Private>, CertChainError> {
    let data = fs::read(path).map_err(|e| CertChainError::file(path, e))?;
    let pkey = match protection.passphrase() {
        Some(p) => PKey::private_key_from_pem_passphrase(&data, p.as_bytes()),
        None => PKey::private_key_from_pem(&data),
    }
    .map_err(|e| {
        CertChainError::Crypto(format!(
            "failed to load private key {}: {e}",
            path.display()
        ))
    })?;
    if pkey.id() != Id::RSA {
        return Err(CertChainError::Crypto(format!(
            "unsupported key algorithm in {}, only RSA keys are supported",
            path.display()
        )));
    }
    let rsa = pkey
        .rsa()
        .map_err(|e| CertChainError::Crypto(format!("failed to get rsa key: {e}")))?;
    match rsa.check_key() {
        Ok(true) => Ok(pkey),
        Ok(false) => Err(CertChainError::Crypto(format!(
            "private key {} failed the consistency check",
            path.display()
        ))),
        Err(e) => Err(CertChainError::Crypto(format!(
            "failed to check private key {}: {e}",
            path.display()
        ))),
    }
}
