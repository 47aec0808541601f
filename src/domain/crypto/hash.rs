//! Digest algorithm domain type and incremental digest context.
//!
//! `DigestAlgorithm` names the message digests a PKCS#7 message may carry
//! (MD5, SHA-1 and the SHA-2 family). `DigestContext` wraps an OpenSSL
//! hasher and can snapshot its running value without disturbing it, which
//! the digest filter stage relies on.

use std::fmt;
use std::str::FromStr;

use der::asn1::{Any, ObjectIdentifier};
use der::Decode;
use openssl::hash::{Hasher, MessageDigest};
use x509_cert::spki::AlgorithmIdentifierOwned;

use super::DigestBytes;
use crate::domain::constants::{
    ASN1_NULL, OID_MD5, OID_SHA1, OID_SHA224, OID_SHA256, OID_SHA384, OID_SHA512,
};
use crate::domain::registry;
use crate::infra::error::{Pkcs7Error, Pkcs7Result};

/// Supported message digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    pub const ALL: [DigestAlgorithm; 6] = [
        DigestAlgorithm::Md5,
        DigestAlgorithm::Sha1,
        DigestAlgorithm::Sha224,
        DigestAlgorithm::Sha256,
        DigestAlgorithm::Sha384,
        DigestAlgorithm::Sha512,
    ];

    /// Canonical registry short name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Sha1 => "SHA1",
            DigestAlgorithm::Sha224 => "SHA224",
            DigestAlgorithm::Sha256 => "SHA256",
            DigestAlgorithm::Sha384 => "SHA384",
            DigestAlgorithm::Sha512 => "SHA512",
        }
    }

    #[must_use]
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            DigestAlgorithm::Md5 => OID_MD5,
            DigestAlgorithm::Sha1 => OID_SHA1,
            DigestAlgorithm::Sha224 => OID_SHA224,
            DigestAlgorithm::Sha256 => OID_SHA256,
            DigestAlgorithm::Sha384 => OID_SHA384,
            DigestAlgorithm::Sha512 => OID_SHA512,
        }
    }

    #[must_use]
    pub fn digest_size(&self) -> usize {
        match self {
            DigestAlgorithm::Md5 => 16,
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha224 => 28,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    #[must_use]
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.oid() == *oid)
    }

    /// `AlgorithmIdentifier` with explicit NULL parameters, as OpenSSL writes it.
    #[must_use]
    pub fn algorithm_identifier(&self) -> AlgorithmIdentifierOwned {
        AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters: Any::from_der(ASN1_NULL).ok(),
        }
    }

    /// Start a fresh digest computation.
    pub fn context(&self) -> Pkcs7Result<DigestContext> {
        DigestContext::new(*self)
    }

    pub(crate) fn message_digest(&self) -> MessageDigest {
        match self {
            DigestAlgorithm::Md5 => MessageDigest::md5(),
            DigestAlgorithm::Sha1 => MessageDigest::sha1(),
            DigestAlgorithm::Sha224 => MessageDigest::sha224(),
            DigestAlgorithm::Sha256 => MessageDigest::sha256(),
            DigestAlgorithm::Sha384 => MessageDigest::sha384(),
            DigestAlgorithm::Sha512 => MessageDigest::sha512(),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = Pkcs7Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let oid = registry::oid_for_name(s)?;
        Self::from_oid(&oid)
            .ok_or_else(|| Pkcs7Error::UnknownAlgorithm(format!("'{s}' is not a digest algorithm")))
    }
}

/// Running digest computation.
///
/// `snapshot` clones the underlying hasher, so the context can keep
/// absorbing data after a value has been taken.
pub struct DigestContext {
    algorithm: DigestAlgorithm,
    hasher: Hasher,
}

impl DigestContext {
    pub fn new(algorithm: DigestAlgorithm) -> Pkcs7Result<Self> {
        Ok(Self {
            algorithm,
            hasher: Hasher::new(algorithm.message_digest())?,
        })
    }

    #[must_use]
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn update(&mut self, data: &[u8]) -> Pkcs7Result<()> {
        if !data.is_empty() {
            self.hasher.update(data)?;
        }
        Ok(())
    }

    /// Digest of everything absorbed so far.
    pub fn snapshot(&self) -> Pkcs7Result<DigestBytes> {
        let mut hasher = self.hasher.clone();
        let value = hasher.finish()?;
        Ok(DigestBytes::new(self.algorithm, value.to_vec())?)
    }

    pub fn finish(mut self) -> Pkcs7Result<DigestBytes> {
        let value = self.hasher.finish()?;
        Ok(DigestBytes::new(self.algorithm, value.to_vec())?)
    }
}

impl fmt::Debug for DigestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DigestContext(algo={})", self.algorithm)
    }
}

/// One-shot digest of `data`.
pub fn digest(algorithm: DigestAlgorithm, data: &[u8]) -> Pkcs7Result<DigestBytes> {
    let mut context = DigestContext::new(algorithm)?;
    context.update(data)?;
    context.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_sizes_match_openssl() {
        for alg in DigestAlgorithm::ALL {
            assert_eq!(alg.message_digest().size(), alg.digest_size(), "{alg}");
        }
    }

    #[test]
    fn snapshot_does_not_consume_context() {
        let mut ctx = DigestContext::new(DigestAlgorithm::Sha256).unwrap();
        ctx.update(b"abc").unwrap();
        let first = ctx.snapshot().unwrap();
        let second = ctx.snapshot().unwrap();
        assert_eq!(first, second);
        assert_eq!(
            hex::encode(first.as_slice()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        ctx.update(b"d").unwrap();
        assert_ne!(ctx.snapshot().unwrap(), first);
    }

    #[test]
    fn parses_registry_names() {
        assert_eq!("sha-256".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
        assert_eq!("SHA1".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha1);
        assert!("aes-128-cbc".parse::<DigestAlgorithm>().is_err());
    }
}
