/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! Builder for the X.509 certificate hierarchy an edge runtime mounts into
//! its child containers: a device root CA (generated or imported), optional
//! intermediate CAs, and leaf TLS server certificates, with a canonical
//! PEM/PFX export layout.

mod error;
pub use error::CertChainError;

pub mod policy;
pub use policy::KeyProtection;

mod subject;
pub use subject::CertSubject;

mod pkey;
mod request;
mod signer;

mod registry;
pub use registry::{
    CertChainRegistry, CertRecord, ImportedRootOptions, LeafCertOptions, RootCertOptions,
    SubCaOptions,
};

mod chain;
mod export;

pub mod layout;
pub use layout::CertArtifact;
