/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;

use openssl::nid::Nid;
use openssl::x509::{X509Name, X509NameRef};

use crate::policy::MAX_COMMON_NAME_LEN;
use crate::CertChainError;

const COUNTRY_LEN: usize = 2;
const MAX_STATE_LEN: usize = 128;
const MAX_LOCALITY_LEN: usize = 128;
const MAX_ORGANIZATION_LEN: usize = 64;
const MAX_ORGANIZATION_UNIT_LEN: usize = 64;

/// The six canonical X.509 subject fields used across the hierarchy.
#[derive(Clone)]
pub struct CertSubject {
    pub country: String,
    pub state: String,
    pub locality: String,
    pub organization: String,
    pub organization_unit: String,
    pub common_name: String,
}

impl CertSubject {
    /// Pure predicate over the field length bounds. Returns false instead of
    /// erroring so callers can report a single aggregated diagnostic.
    pub fn is_valid(&self) -> bool {
        self.country.len() == COUNTRY_LEN
            && self.state.len() <= MAX_STATE_LEN
            && self.locality.len() <= MAX_LOCALITY_LEN
            && self.organization.len() <= MAX_ORGANIZATION_LEN
            && self.organization_unit.len() <= MAX_ORGANIZATION_UNIT_LEN
            && !self.common_name.is_empty()
            && self.common_name.len() <= MAX_COMMON_NAME_LEN
    }

    /// Subject for a subordinate certificate: all fields except the common
    /// name are inherited from the issuer certificate's subject.
    pub(crate) fn inherit_from_issuer(issuer: &X509NameRef, common_name: &str) -> Self {
        CertSubject {
            country: entry_by_nid(issuer, Nid::COUNTRYNAME),
            state: entry_by_nid(issuer, Nid::STATEORPROVINCENAME),
            locality: entry_by_nid(issuer, Nid::LOCALITYNAME),
            organization: entry_by_nid(issuer, Nid::ORGANIZATIONNAME),
            organization_unit: entry_by_nid(issuer, Nid::ORGANIZATIONALUNITNAME),
            common_name: common_name.to_string(),
        }
    }

    pub(crate) fn build_x509_name(&self) -> Result<X509Name, CertChainError> {
        let mut builder = X509Name::builder().map_err(|e| {
            CertChainError::Crypto(format!("failed to create x509 subject name builder: {e}"))
        })?;
        append_entry(&mut builder, Nid::COUNTRYNAME, &self.country)?;
        append_entry(&mut builder, Nid::STATEORPROVINCENAME, &self.state)?;
        append_entry(&mut builder, Nid::LOCALITYNAME, &self.locality)?;
        append_entry(&mut builder, Nid::ORGANIZATIONNAME, &self.organization)?;
        append_entry(
            &mut builder,
            Nid::ORGANIZATIONALUNITNAME,
            &self.organization_unit,
        )?;
        append_entry(&mut builder, Nid::COMMONNAME, &self.common_name)?;
        Ok(builder.build())
    }
}

fn append_entry(
    builder: &mut openssl::x509::X509NameBuilder,
    nid: Nid,
    value: &str,
) -> Result<(), CertChainError> {
    if value.is_empty() {
        return Ok(());
    }
    builder
        .append_entry_by_nid(nid, value)
        .map_err(|e| CertChainError::Crypto(format!("failed to set subject entry to {value}: {e}")))
}

fn entry_by_nid(name: &X509NameRef, nid: Nid) -> String {
    name.entries_by_nid(nid)
        .next()
        .map(|e| String::from_utf8_lossy(e.data().as_slice()).to_string())
        .unwrap_or_default()
}

impl fmt::Display for CertSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "C={}, ST={}, L={}, O={}, OU={}, CN={}",
            self.country,
            self.state,
            self.locality,
            self.organization,
            self.organization_unit,
            self.common_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> CertSubject {
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
    fn accept_boundary_lengths() {
        let mut s = subject();
        s.state = "x".repeat(128);
        s.locality = "x".repeat(128);
        s.organization = "x".repeat(64);
        s.organization_unit = "x".repeat(64);
        s.common_name = "x".repeat(64);
        assert!(s.is_valid());
    }

    #[test]
    fn reject_bad_country() {
        let mut s = subject();
        s.country = "USA".to_string();
        assert!(!s.is_valid());
        s.country = "U".to_string();
        assert!(!s.is_valid());
        s.country = String::new();
        assert!(!s.is_valid());
    }

    #[test]
    fn reject_missing_common_name() {
        let mut s = subject();
        s.common_name = String::new();
        assert!(!s.is_valid());
    }

    #[test]
    fn reject_oversize_fields() {
        let mut s = subject();
        s.organization = "x".repeat(65);
        assert!(!s.is_valid());

        let mut s = subject();
        s.state = "x".repeat(129);
        assert!(!s.is_valid());

        let mut s = subject();
        s.common_name = "x".repeat(65);
        assert!(!s.is_valid());
    }

    #[test]
    fn x509_name_round_trip() {
        let name = subject().build_x509_name().unwrap();
        let s = CertSubject::inherit_from_issuer(&name, "Agent CA");
        assert_eq!(s.country, "US");
        assert_eq!(s.state, "Washington");
        assert_eq!(s.locality, "Redmond");
        assert_eq!(s.organization, "Example Org");
        assert_eq!(s.organization_unit, "Edge Unit");
        assert_eq!(s.common_name, "Agent CA");
    }
}
