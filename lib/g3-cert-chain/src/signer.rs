/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use chrono::{Days, Utc};
use openssl::asn1::{Asn1Integer, Asn1Time, Asn1TimeRef};
use openssl::hash::MessageDigest;
use openssl::pkey::{PKeyRef, Private};
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAlternativeName,
    SubjectKeyIdentifier,
};
use openssl::x509::{X509Builder, X509Ref, X509ReqRef, X509};

use crate::CertChainError;

/// Extension profile of the certificate to issue.
pub(crate) enum CertProfile {
    /// CA:TRUE without path length restriction
    RootCa,
    /// CA:TRUE, with pathlen:0 when terminal
    SubCa { terminal: bool },
    /// CA:FALSE, serverAuth usage, SAN set to the hostname
    TlsServer { hostname: String },
}

pub(crate) enum SignIssuer<'a> {
    SelfSigned(&'a PKeyRef<Private>),
    Ca {
        cert: &'a X509Ref,
        key: &'a PKeyRef<Private>,
    },
}

pub(crate) struct ValidityWindow {
    not_before: Asn1Time,
    not_after: Asn1Time,
}

impl ValidityWindow {
    /// NotBefore is backdated one day to tolerate clock skew between the
    /// issuing host and the devices that will verify the chain.
    pub(crate) fn starting_now(validity_days: u32) -> Result<Self, CertChainError> {
        let time_before = Utc::now()
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| CertChainError::Crypto("unable to get time before date".to_string()))?;
        let not_before = Asn1Time::from_unix(time_before.timestamp())
            .map_err(|e| CertChainError::Crypto(format!("failed to get NotBefore time: {e}")))?;
        let not_after = Asn1Time::days_from_now(validity_days)
            .map_err(|e| CertChainError::Crypto(format!("failed to get NotAfter time: {e}")))?;
        Ok(ValidityWindow {
            not_before,
            not_after,
        })
    }
}

/// Days left until the certificate's NotAfter, partial days rounded up so a
/// request capped to this value still reaches the issuer's NotAfter before
/// the final clamp. Zero or negative when already expired.
pub(crate) fn remaining_days(cert: &X509Ref) -> Result<i32, CertChainError> {
    let now = Asn1Time::days_from_now(0)
        .map_err(|e| CertChainError::Crypto(format!("failed to get current time: {e}")))?;
    let diff = now
        .diff(cert.not_after())
        .map_err(|e| CertChainError::Crypto(format!("failed to diff asn1 times: {e}")))?;
    if diff.secs > 0 {
        Ok(diff.days + 1)
    } else {
        Ok(diff.days)
    }
}

/// Build and sign an X.509 certificate from a signing request.
///
/// The subject is taken from the request, the validity window is clamped to
/// the issuer certificate's own window so a subordinate never outlives it.
pub(crate) fn sign_certificate(
    req: &X509ReqRef,
    profile: &CertProfile,
    serial: &Asn1Integer,
    window: &ValidityWindow,
    issuer: SignIssuer<'_>,
) -> Result<X509, CertChainError> {
    let pub_key = req
        .public_key()
        .map_err(|e| CertChainError::Crypto(format!("failed to get req pub key: {e}")))?;
    if !req
        .verify(&pub_key)
        .map_err(|e| CertChainError::Crypto(format!("failed to verify req signature: {e}")))?
    {
        return Err(CertChainError::Crypto(
            "signing request carries an invalid signature".to_string(),
        ));
    }

    let mut builder = X509Builder::new()
        .map_err(|e| CertChainError::Crypto(format!("failed to create x509 builder: {e}")))?;
    builder
        .set_pubkey(&pub_key)
        .map_err(|e| CertChainError::Crypto(format!("failed to set pub key: {e}")))?;
    builder
        .set_serial_number(serial)
        .map_err(|e| CertChainError::Crypto(format!("failed to set serial number: {e}")))?;

    let ca_cert = match &issuer {
        SignIssuer::SelfSigned(_) => None,
        SignIssuer::Ca { cert, .. } => Some(*cert),
    };

    let not_before: &Asn1TimeRef = match ca_cert {
        Some(ca) if ca.not_before() > window.not_before => ca.not_before(),
        _ => &window.not_before,
    };
    builder
        .set_not_before(not_before)
        .map_err(|e| CertChainError::Crypto(format!("failed to set NotBefore: {e}")))?;
    let not_after: &Asn1TimeRef = match ca_cert {
        Some(ca) if ca.not_after() < window.not_after => ca.not_after(),
        _ => &window.not_after,
    };
    builder
        .set_not_after(not_after)
        .map_err(|e| CertChainError::Crypto(format!("failed to set NotAfter: {e}")))?;

    builder
        .set_version(2)
        .map_err(|e| CertChainError::Crypto(format!("failed to set x509 version 3: {e}")))?;

    let key_usage = match profile {
        CertProfile::RootCa | CertProfile::SubCa { .. } => KeyUsage::new()
            .critical()
            .key_cert_sign()
            .crl_sign()
            .build(),
        CertProfile::TlsServer { .. } => KeyUsage::new()
            .critical()
            .digital_signature()
            .key_encipherment()
            .build(),
    }
    .map_err(|e| CertChainError::Crypto(format!("failed to build KeyUsage extension: {e}")))?;
    builder
        .append_extension(key_usage)
        .map_err(|e| CertChainError::Crypto(format!("failed to append KeyUsage extension: {e}")))?;

    let mut basic_constraints = BasicConstraints::new();
    basic_constraints.critical();
    match profile {
        CertProfile::RootCa => {
            basic_constraints.ca();
        }
        CertProfile::SubCa { terminal } => {
            basic_constraints.ca();
            if *terminal {
                basic_constraints.pathlen(0);
            }
        }
        CertProfile::TlsServer { .. } => {}
    }
    let basic_constraints = basic_constraints.build().map_err(|e| {
        CertChainError::Crypto(format!("failed to build BasicConstraints extension: {e}"))
    })?;
    builder.append_extension(basic_constraints).map_err(|e| {
        CertChainError::Crypto(format!("failed to append BasicConstraints extension: {e}"))
    })?;

    if let CertProfile::TlsServer { .. } = profile {
        let ext_key_usage = ExtendedKeyUsage::new().server_auth().build().map_err(|e| {
            CertChainError::Crypto(format!("failed to build ExtendedKeyUsage extension: {e}"))
        })?;
        builder.append_extension(ext_key_usage).map_err(|e| {
            CertChainError::Crypto(format!("failed to append ExtendedKeyUsage extension: {e}"))
        })?;
    }

    builder
        .set_subject_name(req.subject_name())
        .map_err(|e| CertChainError::Crypto(format!("failed to set subject name: {e}")))?;

    let v3_ctx = builder.x509v3_context(ca_cert, None);
    let ski = SubjectKeyIdentifier::new().build(&v3_ctx).map_err(|e| {
        CertChainError::Crypto(format!("failed to build SubjectKeyIdentifier extension: {e}"))
    })?;
    let aki = match ca_cert {
        Some(_) => {
            let mut aki_builder = AuthorityKeyIdentifier::new();
            aki_builder.keyid(true);
            let aki = aki_builder.build(&v3_ctx).map_err(|e| {
                CertChainError::Crypto(format!(
                    "failed to build AuthorityKeyIdentifier extension: {e}"
                ))
            })?;
            Some(aki)
        }
        None => None,
    };
    let san = match profile {
        CertProfile::TlsServer { hostname } => {
            let mut san_builder = SubjectAlternativeName::new();
            san_builder.dns(hostname);
            let san = san_builder.build(&v3_ctx).map_err(|e| {
                CertChainError::Crypto(format!(
                    "failed to build SubjectAlternativeName extension: {e}"
                ))
            })?;
            Some(san)
        }
        _ => None,
    };
    builder.append_extension(ski).map_err(|e| {
        CertChainError::Crypto(format!("failed to append SubjectKeyIdentifier extension: {e}"))
    })?;
    if let Some(aki) = aki {
        builder.append_extension(aki).map_err(|e| {
            CertChainError::Crypto(format!(
                "failed to append AuthorityKeyIdentifier extension: {e}"
            ))
        })?;
    }
    if let Some(san) = san {
        builder.append_extension(san).map_err(|e| {
            CertChainError::Crypto(format!(
                "failed to append SubjectAlternativeName extension: {e}"
            ))
        })?;
    }

    match &issuer {
        SignIssuer::SelfSigned(key) => {
            builder
                .set_issuer_name(req.subject_name())
                .map_err(|e| CertChainError::Crypto(format!("failed to set issuer name: {e}")))?;
            builder
                .sign(key, MessageDigest::sha256())
                .map_err(|e| CertChainError::Crypto(format!("failed to sign: {e}")))?;
        }
        SignIssuer::Ca { cert, key } => {
            builder
                .set_issuer_name(cert.subject_name())
                .map_err(|e| CertChainError::Crypto(format!("failed to set issuer name: {e}")))?;
            builder
                .sign(key, MessageDigest::sha256())
                .map_err(|e| CertChainError::Crypto(format!("failed to sign: {e}")))?;
        }
    }

    Ok(builder.build())
}
