/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use crate::CertChainError;

pub const MIN_VALIDITY_DAYS: u32 = 1;
pub const MAX_VALIDITY_DAYS: u32 = 1095;

pub const MIN_PASSPHRASE_LEN: usize = 4;
pub const MAX_PASSPHRASE_LEN: usize = 1023;

pub const MAX_COMMON_NAME_LEN: usize = 64;

pub fn is_valid_validity_days(days: u32) -> bool {
    (MIN_VALIDITY_DAYS..=MAX_VALIDITY_DAYS).contains(&days)
}

pub fn is_valid_passphrase(passphrase: &str) -> bool {
    (MIN_PASSPHRASE_LEN..=MAX_PASSPHRASE_LEN).contains(&passphrase.len())
}

pub fn is_valid_common_name(cn: &str) -> bool {
    !cn.is_empty() && cn.len() <= MAX_COMMON_NAME_LEN
}

/// Whether and how a private key gets protected on export.
///
/// The cipher is fixed to AES-256-CBC, selection by passphrase presence is
/// made explicit here instead of being inferred from an empty string.
#[derive(Clone, Default)]
pub enum KeyProtection {
    #[default]
    None,
    Encrypted(String),
}

impl KeyProtection {
    pub fn from_passphrase(passphrase: Option<String>) -> Self {
        match passphrase {
            Some(p) => KeyProtection::Encrypted(p),
            None => KeyProtection::None,
        }
    }

    pub(crate) fn passphrase(&self) -> Option<&str> {
        match self {
            KeyProtection::None => None,
            KeyProtection::Encrypted(p) => Some(p.as_str()),
        }
    }

    pub(crate) fn check(&self) -> Result<(), CertChainError> {
        if let KeyProtection::Encrypted(p) = self {
            if !is_valid_passphrase(p) {
                return Err(CertChainError::InvalidArgument(format!(
                    "passphrase length should be in range {MIN_PASSPHRASE_LEN}-{MAX_PASSPHRASE_LEN}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_days_bounds() {
        assert!(!is_valid_validity_days(0));
        assert!(is_valid_validity_days(1));
        assert!(is_valid_validity_days(1095));
        assert!(!is_valid_validity_days(1096));
    }

    #[test]
    fn passphrase_bounds() {
        assert!(!is_valid_passphrase("abc"));
        assert!(is_valid_passphrase("abcd"));
        assert!(is_valid_passphrase(&"x".repeat(1023)));
        assert!(!is_valid_passphrase(&"x".repeat(1024)));
    }

    #[test]
    fn protection_check() {
        assert!(KeyProtection::None.check().is_ok());
        assert!(KeyProtection::Encrypted("1234".to_string()).check().is_ok());
        assert!(KeyProtection::Encrypted("123".to_string()).check().is_err());
    }
}
