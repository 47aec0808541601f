//! Cryptographic capabilities used by the message engine.
//!
//! - Digest algorithms and incremental digest contexts
//! - Content ciphers with their key/IV material
//! - Certificates, CRLs and certificate lookup
//! - Private keys, signatures and RSA key transport
//!
//! Everything here is a thin, typed layer over OpenSSL; PKCS#7 structure
//! lives in `domain::pkcs7`.

mod cert;
mod cipher;
mod digest_bytes;
mod hash;
mod signature;

pub use cert::{CertificateLookup, Certificate, Crl};
pub use cipher::{CipherAlgorithm, CipherContext, CipherMode, CipherSpec};
pub use digest_bytes::{DigestBytes, DigestBytesError};
pub use hash::{digest, DigestAlgorithm, DigestContext};
pub use signature::{sign_data, unwrap_key, verify_data, wrap_key, PrivateKey};
