/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::path::{Path, PathBuf};

use openssl::error::ErrorStack;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CertChainError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("certificate id {0} is already registered")]
    DuplicateId(String),
    #[error("issuer id {0} is not registered")]
    UnknownIssuer(String),
    #[error("no exported entry found for id {0}")]
    UnknownEntry(String),
    #[error("crypto error: {0}")]
    Crypto(String),
    #[error("file access error on {path}: {source}")]
    FileAccess { path: PathBuf, source: io::Error },
}

impl From<ErrorStack> for CertChainError {
    fn from(e: ErrorStack) -> Self {
        CertChainError::Crypto(e.to_string())
    }
}

impl CertChainError {
    pub(crate) fn file(path: &Path, source: io::Error) -> Self {
        CertChainError::FileAccess {
            path: path.to_path_buf(),
            source,
        }
    }
}
