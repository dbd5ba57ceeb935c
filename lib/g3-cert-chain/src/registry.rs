/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use log::debug;
use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::BigNum;
use openssl::pkey::{PKey, Private};
use openssl::x509::{X509Ref, X509};

use crate::pkey;
use crate::policy::{self, KeyProtection};
use crate::request;
use crate::signer::{self, CertProfile, SignIssuer, ValidityWindow};
use crate::subject::CertSubject;
use crate::CertChainError;

const SERIAL_NUMBER_SEED: u32 = 1000;

pub struct RootCertOptions {
    pub subject: CertSubject,
    pub validity_days: u32,
    pub protection: KeyProtection,
}

pub struct ImportedRootOptions {
    pub cert_file: PathBuf,
    pub root_cert_file: PathBuf,
    pub chain_cert_file: PathBuf,
    pub key_file: PathBuf,
    pub protection: KeyProtection,
}

pub struct SubCaOptions {
    pub issuer_id: String,
    pub common_name: String,
    pub validity_days: u32,
    /// A terminal CA gets pathlen:0 and may only sign leaf certificates.
    pub terminal: bool,
    pub protection: KeyProtection,
}

pub struct LeafCertOptions {
    pub issuer_id: String,
    pub hostname: String,
    pub validity_days: u32,
    pub protection: KeyProtection,
}

pub(crate) enum RecordKey {
    Generated(PKey<Private>),
    /// Key loaded from a pre-existing file, held only transiently while
    /// signing or exporting.
    File(PathBuf),
}

pub struct CertRecord {
    pub(crate) id: String,
    pub(crate) issuer_id: String,
    pub(crate) certificate: X509,
    pub(crate) key: RecordKey,
    pub(crate) protection: KeyProtection,
    pub(crate) imported_cert_file: Option<PathBuf>,
    pub(crate) imported_chain_file: Option<PathBuf>,
    pub(crate) imported_root_file: Option<PathBuf>,
}

impl CertRecord {
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn issuer_id(&self) -> &str {
        &self.issuer_id
    }

    #[inline]
    pub fn certificate(&self) -> &X509Ref {
        &self.certificate
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.issuer_id == self.id
    }

    pub(crate) fn signing_key(&self) -> Result<PKey<Private>, CertChainError> {
        match &self.key {
            RecordKey::Generated(k) => Ok(k.clone()),
            RecordKey::File(path) => pkey::load_rsa(path, &self.protection),
        }
    }
}

/// In-memory hierarchy of certificates keyed by caller-chosen id.
///
/// One registry instance is owned by exactly one caller within one process
/// invocation, there is no locking and no cross-process serial persistence.
pub struct CertChainRegistry {
    pub(crate) entries: HashMap<String, CertRecord>,
    next_serial: u32,
}

impl Default for CertChainRegistry {
    fn default() -> Self {
        CertChainRegistry::new()
    }
}

impl CertChainRegistry {
    pub fn new() -> Self {
        CertChainRegistry {
            entries: HashMap::new(),
            next_serial: SERIAL_NUMBER_SEED,
        }
    }

    pub fn get(&self, id: &str) -> Option<&CertRecord> {
        self.entries.get(id)
    }

    /// Generate a fresh self-signed root CA.
    pub fn generate_root(
        &mut self,
        id: &str,
        opts: RootCertOptions,
    ) -> Result<&CertRecord, CertChainError> {
        if self.entries.contains_key(id) {
            return Err(CertChainError::DuplicateId(id.to_string()));
        }
        if !policy::is_valid_validity_days(opts.validity_days) {
            return Err(invalid_validity_days());
        }
        opts.protection.check()?;
        let mut subject = opts.subject;
        subject.country = subject.country.to_uppercase();
        if !subject.is_valid() {
            return Err(CertChainError::InvalidArgument(format!(
                "invalid certificate subject: {subject}"
            )));
        }

        let key_pair = pkey::new_rsa(pkey::DEFAULT_RSA_BITS)?;
        let req = request::build_csr(&subject, &key_pair)?;
        let serial = asn1_serial(self.next_serial)?;
        let window = ValidityWindow::starting_now(opts.validity_days)?;
        let cert = signer::sign_certificate(
            &req,
            &CertProfile::RootCa,
            &serial,
            &window,
            SignIssuer::SelfSigned(&key_pair),
        )?;
        debug!(
            "generated self-signed root certificate {id}, serial {}",
            self.next_serial
        );

        let record = CertRecord {
            id: id.to_string(),
            issuer_id: id.to_string(),
            certificate: cert,
            key: RecordKey::Generated(key_pair),
            protection: opts.protection,
            imported_cert_file: None,
            imported_chain_file: None,
            imported_root_file: None,
        };
        let record = self.entries.entry(id.to_string()).or_insert(record);
        self.next_serial += 1;
        Ok(record)
    }

    /// Register a pre-issued root CA loaded from disk.
    ///
    /// All four input files must exist, the key must decrypt and pass the
    /// RSA consistency check, the certificate must parse and not be expired.
    /// The record keeps the source paths so export can copy them verbatim.
    pub fn import_root(
        &mut self,
        id: &str,
        opts: ImportedRootOptions,
    ) -> Result<&CertRecord, CertChainError> {
        if self.entries.contains_key(id) {
            return Err(CertChainError::DuplicateId(id.to_string()));
        }
        opts.protection.check()?;
        for path in [
            &opts.cert_file,
            &opts.root_cert_file,
            &opts.chain_cert_file,
            &opts.key_file,
        ] {
            if !path.is_file() {
                return Err(CertChainError::file(
                    path,
                    io::Error::new(io::ErrorKind::NotFound, "no such file"),
                ));
            }
        }

        // the key material is held only transiently for validation
        pkey::load_rsa(&opts.key_file, &opts.protection)?;

        let data = fs::read(&opts.cert_file).map_err(|e| CertChainError::file(&opts.cert_file, e))?;
        let cert = X509::from_pem(&data).map_err(|e| {
            CertChainError::Crypto(format!(
                "failed to parse certificate {}: {e}",
                opts.cert_file.display()
            ))
        })?;
        let now = Asn1Time::days_from_now(0)
            .map_err(|e| CertChainError::Crypto(format!("failed to get current time: {e}")))?;
        if cert.not_after() < now {
            return Err(CertChainError::Crypto(format!(
                "certificate {} expired at {}",
                opts.cert_file.display(),
                cert.not_after()
            )));
        }
        debug!("imported root certificate {id} from {}", opts.cert_file.display());

        let record = CertRecord {
            id: id.to_string(),
            issuer_id: id.to_string(),
            certificate: cert,
            key: RecordKey::File(opts.key_file),
            protection: opts.protection,
            imported_cert_file: Some(opts.cert_file),
            imported_chain_file: Some(opts.chain_cert_file),
            imported_root_file: Some(opts.root_cert_file),
        };
        Ok(self.entries.entry(id.to_string()).or_insert(record))
    }

    /// Issue an intermediate CA signed by an already registered issuer.
    pub fn issue_intermediate(
        &mut self,
        id: &str,
        opts: SubCaOptions,
    ) -> Result<&CertRecord, CertChainError> {
        let profile = CertProfile::SubCa {
            terminal: opts.terminal,
        };
        self.issue_signed_cert(
            id,
            &opts.issuer_id,
            &opts.common_name,
            opts.validity_days,
            opts.protection,
            profile,
        )
    }

    /// Issue a leaf TLS server certificate signed by an already registered
    /// issuer.
    pub fn issue_leaf(
        &mut self,
        id: &str,
        opts: LeafCertOptions,
    ) -> Result<&CertRecord, CertChainError> {
        let profile = CertProfile::TlsServer {
            hostname: opts.hostname.clone(),
        };
        self.issue_signed_cert(
            id,
            &opts.issuer_id,
            &opts.hostname,
            opts.validity_days,
            opts.protection,
            profile,
        )
    }

    fn issue_signed_cert(
        &mut self,
        id: &str,
        issuer_id: &str,
        common_name: &str,
        validity_days: u32,
        protection: KeyProtection,
        profile: CertProfile,
    ) -> Result<&CertRecord, CertChainError> {
        if self.entries.contains_key(id) {
            return Err(CertChainError::DuplicateId(id.to_string()));
        }
        if !policy::is_valid_common_name(common_name) {
            return Err(CertChainError::InvalidArgument(format!(
                "common name length should be in range 1-{}",
                policy::MAX_COMMON_NAME_LEN
            )));
        }
        if !policy::is_valid_validity_days(validity_days) {
            return Err(invalid_validity_days());
        }
        protection.check()?;
        let issuer = self
            .entries
            .get(issuer_id)
            .ok_or_else(|| CertChainError::UnknownIssuer(issuer_id.to_string()))?;

        // a subordinate certificate may never outlive its issuer
        let remaining = signer::remaining_days(issuer.certificate())?;
        if remaining <= 0 {
            return Err(CertChainError::InvalidArgument(format!(
                "issuer certificate {issuer_id} has no remaining validity"
            )));
        }
        let effective_days = validity_days.min(remaining as u32);

        let subject =
            CertSubject::inherit_from_issuer(issuer.certificate().subject_name(), common_name);
        let key_pair = pkey::new_rsa(pkey::DEFAULT_RSA_BITS)?;
        let req = request::build_csr(&subject, &key_pair)?;
        let serial = asn1_serial(self.next_serial)?;
        let window = ValidityWindow::starting_now(effective_days)?;
        let issuer_key = issuer.signing_key()?;
        let cert = signer::sign_certificate(
            &req,
            &profile,
            &serial,
            &window,
            SignIssuer::Ca {
                cert: issuer.certificate(),
                key: &issuer_key,
            },
        )?;
        debug!(
            "issued certificate {id} signed by {issuer_id}, serial {}",
            self.next_serial
        );

        let record = CertRecord {
            id: id.to_string(),
            issuer_id: issuer_id.to_string(),
            certificate: cert,
            key: RecordKey::Generated(key_pair),
            protection,
            imported_cert_file: None,
            imported_chain_file: None,
            imported_root_file: None,
        };
        let record = self.entries.entry(id.to_string()).or_insert(record);
        self.next_serial += 1;
        Ok(record)
    }
}

fn invalid_validity_days() -> CertChainError {
    CertChainError::InvalidArgument(format!(
        "validity days should be in range {}-{}",
        policy::MIN_VALIDITY_DAYS,
        policy::MAX_VALIDITY_DAYS
    ))
}

fn asn1_serial(value: u32) -> Result<Asn1Integer, CertChainError> {
    let bn = BigNum::from_u32(value)
        .map_err(|e| CertChainError::Crypto(format!("failed to create big num: {e}")))?;
    bn.to_asn1_integer()
        .map_err(|e| CertChainError::Crypto(format!("failed to convert bn to asn1 integer: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_subject() -> CertSubject {
        CertSubject {
            country: "us".to_string(),
            state: "Washington".to_string(),
            locality: "Redmond".to_string(),
            organization: "Example Org".to_string(),
            organization_unit: "Edge Unit".to_string(),
            common_name: "Edge Device CA".to_string(),
        }
    }

    fn root_opts(validity_days: u32) -> RootCertOptions {
        RootCertOptions {
            subject: test_subject(),
            validity_days,
            protection: KeyProtection::None,
        }
    }

    #[test]
    fn generate_root_self_signed() {
        let mut registry = CertChainRegistry::new();
        let record = registry.generate_root("device-ca", root_opts(365)).unwrap();
        assert!(record.is_root());
        let cert = record.certificate();
        // country code got uppercased before storage
        let subject = CertSubject::inherit_from_issuer(cert.subject_name(), "x");
        assert_eq!(subject.country, "US");
        // self-signed: verifies with its own public key
        assert!(cert.verify(&cert.public_key().unwrap()).unwrap());
        assert_eq!(cert.pathlen(), None);
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut registry = CertChainRegistry::new();
        registry.generate_root("device-ca", root_opts(365)).unwrap();
        let r = registry.generate_root("device-ca", root_opts(365));
        assert!(matches!(r, Err(CertChainError::DuplicateId(_))));
    }

    #[test]
    fn invalid_subject_rejected() {
        let mut registry = CertChainRegistry::new();
        let mut opts = root_opts(365);
        opts.subject.country = "USA".to_string();
        let r = registry.generate_root("device-ca", opts);
        assert!(matches!(r, Err(CertChainError::InvalidArgument(_))));
        assert!(registry.get("device-ca").is_none());
    }

    #[test]
    fn validity_bounds_rejected() {
        let mut registry = CertChainRegistry::new();
        assert!(matches!(
            registry.generate_root("a", root_opts(0)),
            Err(CertChainError::InvalidArgument(_))
        ));
        assert!(matches!(
            registry.generate_root("b", root_opts(1096)),
            Err(CertChainError::InvalidArgument(_))
        ));
    }

    #[test]
    fn unknown_issuer_rejected_without_mutation() {
        let mut registry = CertChainRegistry::new();
        let r = registry.issue_intermediate(
            "agent-ca",
            SubCaOptions {
                issuer_id: "no-such-ca".to_string(),
                common_name: "Agent".to_string(),
                validity_days: 90,
                terminal: true,
                protection: KeyProtection::None,
            },
        );
        assert!(matches!(r, Err(CertChainError::UnknownIssuer(_))));
        assert!(registry.get("agent-ca").is_none());
    }

    #[test]
    fn validity_capped_to_issuer() {
        let mut registry = CertChainRegistry::new();
        registry.generate_root("device-ca", root_opts(365)).unwrap();
        registry
            .issue_intermediate(
                "agent-ca",
                SubCaOptions {
                    issuer_id: "device-ca".to_string(),
                    common_name: "Agent".to_string(),
                    validity_days: 730,
                    terminal: true,
                    protection: KeyProtection::None,
                },
            )
            .unwrap();
        let root = registry.get("device-ca").unwrap().certificate();
        let agent = registry.get("agent-ca").unwrap().certificate();
        assert!(agent.not_after() == root.not_after());
        assert_eq!(agent.pathlen(), Some(0));
    }

    #[test]
    fn leaf_is_not_a_ca() {
        let mut registry = CertChainRegistry::new();
        registry.generate_root("device-ca", root_opts(365)).unwrap();
        registry
            .issue_leaf(
                "hub-server",
                LeafCertOptions {
                    issuer_id: "device-ca".to_string(),
                    hostname: "edge.example.net".to_string(),
                    validity_days: 90,
                    protection: KeyProtection::None,
                },
            )
            .unwrap();
        let leaf = registry.get("hub-server").unwrap();
        assert!(!leaf.is_root());
        assert_eq!(leaf.issuer_id(), "device-ca");
        let san = leaf.certificate().subject_alt_names().unwrap();
        assert_eq!(san.len(), 1);
        assert_eq!(san[0].dnsname(), Some("edge.example.net"));
    }

    #[test]
    fn serial_numbers_strictly_increase() {
        let mut registry = CertChainRegistry::new();
        registry.generate_root("device-ca", root_opts(365)).unwrap();
        for i in 0..4 {
            registry
                .issue_leaf(
                    &format!("leaf-{i}"),
                    LeafCertOptions {
                        issuer_id: "device-ca".to_string(),
                        hostname: format!("host-{i}.example.net"),
                        validity_days: 90,
                        protection: KeyProtection::None,
                    },
                )
                .unwrap();
        }
        let mut serials = Vec::new();
        for id in ["device-ca", "leaf-0", "leaf-1", "leaf-2", "leaf-3"] {
            let serial = registry
                .get(id)
                .unwrap()
                .certificate()
                .serial_number()
                .to_bn()
                .unwrap();
            serials.push(serial.to_dec_str().unwrap().parse::<u64>().unwrap());
        }
        assert_eq!(serials, vec![1000, 1001, 1002, 1003, 1004]);
    }

    #[test]
    fn failed_issue_does_not_advance_serial() {
        let mut registry = CertChainRegistry::new();
        registry.generate_root("device-ca", root_opts(365)).unwrap();
        let r = registry.issue_leaf(
            "bad",
            LeafCertOptions {
                issuer_id: "device-ca".to_string(),
                hostname: String::new(),
                validity_days: 90,
                protection: KeyProtection::None,
            },
        );
        assert!(r.is_err());
        registry
            .issue_leaf(
                "good",
                LeafCertOptions {
                    issuer_id: "device-ca".to_string(),
                    hostname: "host.example.net".to_string(),
                    validity_days: 90,
                    protection: KeyProtection::None,
                },
            )
            .unwrap();
        let serial = registry
            .get("good")
            .unwrap()
            .certificate()
            .serial_number()
            .to_bn()
            .unwrap();
        assert_eq!(serial.to_dec_str().unwrap().parse::<u64>().unwrap(), 1001);
    }
}
