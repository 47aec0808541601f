//! PKCS#7 message engine
//!
//! Builds, parses and transforms PKCS#7 (RFC 2315) messages: signed,
//! enveloped, signed-and-enveloped and digested data. Payloads stream
//! through a composable filter chain of digest, base64 and cipher stages.
//!
//! Layout:
//! - `domain`: algorithm registry, crypto wrappers, message model, MIME headers
//! - `services`: filter chain, streaming encode/decode, DER/PEM/S/MIME framing,
//!   signature verification
//! - `pipelines`: one-shot sign, encrypt/decrypt and verify workflows
//! - `infra`: errors and configuration

pub mod domain;
pub mod infra;
pub mod pipelines;
pub mod services;

pub use domain::crypto::{
    Certificate, CertificateLookup, CipherAlgorithm, CipherSpec, Crl, DigestAlgorithm, PrivateKey,
};
pub use domain::mime::{MimeHeader, MimeParam};
pub use domain::pkcs7::{
    Attribute, AttributeSet, ContentState, ContentType, MessageContent, Pkcs7, RecipientInfo,
    SignerInfo,
};
pub use infra::config::{ConfigManager, EngineConfiguration, ExportFormat};
pub use infra::error::{Pkcs7Error, Pkcs7Result};
pub use pipelines::{
    EncryptOptions, EncryptWorkflow, SignOptions, SignWorkflow, VerifyOptions, VerifyWorkflow,
};
pub use services::{BioChain, BioType, RecipientKey};
