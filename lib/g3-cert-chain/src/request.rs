/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use openssl::hash::MessageDigest;
use openssl::pkey::{PKeyRef, Private};
use openssl::x509::{X509Req, X509ReqBuilder};

use crate::subject::CertSubject;
use crate::CertChainError;

/// Build a self-describing signing request carrying the subject and the
/// public half of the key pair.
pub(crate) fn build_csr(
    subject: &CertSubject,
    pkey: &PKeyRef<Private>,
) -> Result<X509Req, CertChainError> {
    let mut builder = X509ReqBuilder::new()
        .map_err(|e| CertChainError::Crypto(format!("failed to create x509 req builder: {e}")))?;
    builder
        .set_version(0)
        .map_err(|e| CertChainError::Crypto(format!("failed to set req version: {e}")))?;
    let subject_name = subject.build_x509_name()?;
    builder
        .set_subject_name(&subject_name)
        .map_err(|e| CertChainError::Crypto(format!("failed to set req subject name: {e}")))?;
    builder
        .set_pubkey(pkey)
        .map_err(|e| CertChainError::Crypto(format!("failed to set req pub key: {e}")))?;
    builder
        .sign(pkey, MessageDigest::sha256())
        .map_err(|e| CertChainError::Crypto(format!("failed to sign req: {e}")))?;
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkey;

    #[test]
    fn csr_carries_subject_and_key() {
        let subject = CertSubject {
            country: "US".to_string(),
            state: "Washington".to_string(),
            locality: "Redmond".to_string(),
            organization: "Example Org".to_string(),
            organization_unit: "Edge Unit".to_string(),
            common_name: "Edge Device CA".to_string(),
        };
        let key = pkey::new_rsa(2048).unwrap();
        let req = build_csr(&subject, &key).unwrap();

        let pub_key = req.public_key().unwrap();
        assert!(req.verify(&pub_key).unwrap());
        assert!(pub_key.public_eq(&key));
    }
}
