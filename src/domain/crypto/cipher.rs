//! Symmetric content-encryption ciphers.
//!
//! `CipherSpec` is the algorithm selection plus (optionally) the key and IV
//! it will run with. Key material is generated lazily when an envelope is
//! sealed, so a spec built from just an algorithm is the common case.

use std::fmt;
use std::str::FromStr;

use der::asn1::{ObjectIdentifier, OctetString};
use der::{Decode, Encode};
use openssl::rand::rand_bytes;
use openssl::symm::{Cipher, Crypter, Mode};
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::domain::constants::{
    OID_AES_128_CBC, OID_AES_192_CBC, OID_AES_256_CBC, OID_DES_CBC, OID_DES_EDE3_CBC,
};
use crate::domain::registry;
use crate::infra::error::{Pkcs7Error, Pkcs7Result};

/// Supported content-encryption algorithms (all CBC with PKCS#7 padding)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherAlgorithm {
    DesCbc,
    DesEde3Cbc,
    Aes128Cbc,
    Aes192Cbc,
    Aes256Cbc,
}

impl CipherAlgorithm {
    pub const ALL: [CipherAlgorithm; 5] = [
        CipherAlgorithm::DesCbc,
        CipherAlgorithm::DesEde3Cbc,
        CipherAlgorithm::Aes128Cbc,
        CipherAlgorithm::Aes192Cbc,
        CipherAlgorithm::Aes256Cbc,
    ];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            CipherAlgorithm::DesCbc => "DES-CBC",
            CipherAlgorithm::DesEde3Cbc => "DES-EDE3-CBC",
            CipherAlgorithm::Aes128Cbc => "AES-128-CBC",
            CipherAlgorithm::Aes192Cbc => "AES-192-CBC",
            CipherAlgorithm::Aes256Cbc => "AES-256-CBC",
        }
    }

    #[must_use]
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            CipherAlgorithm::DesCbc => OID_DES_CBC,
            CipherAlgorithm::DesEde3Cbc => OID_DES_EDE3_CBC,
            CipherAlgorithm::Aes128Cbc => OID_AES_128_CBC,
            CipherAlgorithm::Aes192Cbc => OID_AES_192_CBC,
            CipherAlgorithm::Aes256Cbc => OID_AES_256_CBC,
        }
    }

    #[must_use]
    pub fn key_size(&self) -> usize {
        match self {
            CipherAlgorithm::DesCbc => 8,
            CipherAlgorithm::DesEde3Cbc => 24,
            CipherAlgorithm::Aes128Cbc => 16,
            CipherAlgorithm::Aes192Cbc => 24,
            CipherAlgorithm::Aes256Cbc => 32,
        }
    }

    #[must_use]
    pub fn iv_size(&self) -> usize {
        self.block_size()
    }

    #[must_use]
    pub fn block_size(&self) -> usize {
        match self {
            CipherAlgorithm::DesCbc | CipherAlgorithm::DesEde3Cbc => 8,
            _ => 16,
        }
    }

    #[must_use]
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.oid() == *oid)
    }

    fn openssl_cipher(&self) -> Pkcs7Result<Cipher> {
        let cipher = match self {
            CipherAlgorithm::DesCbc => Cipher::des_cbc(),
            CipherAlgorithm::DesEde3Cbc => Cipher::des_ede3_cbc(),
            CipherAlgorithm::Aes128Cbc => Cipher::aes_128_cbc(),
            CipherAlgorithm::Aes192Cbc => Cipher::aes_192_cbc(),
            CipherAlgorithm::Aes256Cbc => Cipher::aes_256_cbc(),
        };
        if cipher.key_len() != self.key_size() {
            return Err(Pkcs7Error::CryptographicError(format!(
                "OpenSSL reports key length {} for {}",
                cipher.key_len(),
                self.name()
            )));
        }
        Ok(cipher)
    }
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CipherAlgorithm {
    type Err = Pkcs7Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let oid = registry::oid_for_name(s)?;
        Self::from_oid(&oid)
            .ok_or_else(|| Pkcs7Error::UnknownAlgorithm(format!("'{s}' is not a supported cipher")))
    }
}

/// Algorithm selection plus key material sized to that algorithm.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherSpec {
    algorithm: CipherAlgorithm,
    key: Option<Vec<u8>>,
    iv: Option<Vec<u8>>,
}

impl CipherSpec {
    /// Spec without key material; a random key and IV are drawn when needed.
    #[must_use]
    pub fn new(algorithm: CipherAlgorithm) -> Self {
        Self {
            algorithm,
            key: None,
            iv: None,
        }
    }

    pub fn with_key(algorithm: CipherAlgorithm, key: Vec<u8>, iv: Vec<u8>) -> Pkcs7Result<Self> {
        if key.len() != algorithm.key_size() {
            return Err(Pkcs7Error::InvalidInput(format!(
                "{} requires a {}-byte key, got {}",
                algorithm,
                algorithm.key_size(),
                key.len()
            )));
        }
        if iv.len() != algorithm.iv_size() {
            return Err(Pkcs7Error::InvalidInput(format!(
                "{} requires a {}-byte IV, got {}",
                algorithm,
                algorithm.iv_size(),
                iv.len()
            )));
        }
        Ok(Self {
            algorithm,
            key: Some(key),
            iv: Some(iv),
        })
    }

    /// Rebuild the `CipherSpec` on the receiving side from the `AlgorithmIdentifier`
    /// (whose parameters carry the IV) and an unwrapped content key.
    pub fn from_algorithm_identifier(
        alg_id: &AlgorithmIdentifierOwned,
        key: Vec<u8>,
    ) -> Pkcs7Result<Self> {
        let algorithm = CipherAlgorithm::from_oid(&alg_id.oid).ok_or_else(|| {
            Pkcs7Error::UnknownAlgorithm(format!(
                "unsupported content cipher {}",
                registry::name_for_oid(&alg_id.oid)
            ))
        })?;
        let params = alg_id.parameters.as_ref().ok_or_else(|| {
            Pkcs7Error::malformed(format!("{algorithm} parameters missing IV"))
        })?;
        let iv = OctetString::from_der(&params.to_der()?)
            .map_err(|e| Pkcs7Error::malformed(format!("invalid {algorithm} IV parameter: {e}")))?;
        if key.len() != algorithm.key_size() {
            return Err(Pkcs7Error::CryptographicError(format!(
                "decrypted content key has length {}, {} expects {}",
                key.len(),
                algorithm,
                algorithm.key_size()
            )));
        }
        Self::with_key(algorithm, key, iv.as_bytes().to_vec())
    }

    #[must_use]
    pub fn algorithm(&self) -> CipherAlgorithm {
        self.algorithm
    }
    #[must_use]
    pub fn key(&self) -> Option<&[u8]> {
        self.key.as_deref()
    }
    #[must_use]
    pub fn iv(&self) -> Option<&[u8]> {
        self.iv.as_deref()
    }
    #[must_use]
    pub fn has_key_material(&self) -> bool {
        self.key.is_some() && self.iv.is_some()
    }

    /// Draw a random key and IV unless both are already present.
    pub fn ensure_key_material(&mut self) -> Pkcs7Result<()> {
        if self.key.is_none() {
            let mut key = vec![0u8; self.algorithm.key_size()];
            rand_bytes(&mut key)?;
            self.key = Some(key);
        }
        if self.iv.is_none() {
            let mut iv = vec![0u8; self.algorithm.iv_size()];
            rand_bytes(&mut iv)?;
            self.iv = Some(iv);
        }
        Ok(())
    }

    /// `AlgorithmIdentifier` carrying the IV as an OCTET STRING parameter.
    pub fn algorithm_identifier(&self) -> Pkcs7Result<AlgorithmIdentifierOwned> {
        let iv = self.iv.as_ref().ok_or_else(|| {
            Pkcs7Error::IncompleteMessage(format!("{} IV has not been generated", self.algorithm))
        })?;
        let params = OctetString::new(iv.clone())?;
        Ok(AlgorithmIdentifierOwned {
            oid: self.algorithm.oid(),
            parameters: Some(der::asn1::Any::from_der(&params.to_der()?)?),
        })
    }

    pub fn encryptor(&self) -> Pkcs7Result<CipherContext> {
        CipherContext::new(self, CipherMode::Encrypt)
    }

    pub fn decryptor(&self) -> Pkcs7Result<CipherContext> {
        CipherContext::new(self, CipherMode::Decrypt)
    }
}

impl fmt::Debug for CipherSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CipherSpec(algo={}, key={}, iv={})",
            self.algorithm,
            if self.key.is_some() { "set" } else { "unset" },
            if self.iv.is_some() { "set" } else { "unset" }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherMode {
    Encrypt,
    Decrypt,
}

/// Streaming cipher. `finish` emits the final padded block exactly once;
/// later calls return nothing.
pub struct CipherContext {
    algorithm: CipherAlgorithm,
    mode: CipherMode,
    crypter: Crypter,
    block_size: usize,
    finished: bool,
}

impl CipherContext {
    pub fn new(spec: &CipherSpec, mode: CipherMode) -> Pkcs7Result<Self> {
        let (key, iv) = match (spec.key(), spec.iv()) {
            (Some(key), Some(iv)) => (key, iv),
            _ => {
                return Err(Pkcs7Error::InvalidInput(format!(
                    "{} key material has not been generated",
                    spec.algorithm()
                )))
            }
        };
        let cipher = spec.algorithm().openssl_cipher()?;
        let openssl_mode = match mode {
            CipherMode::Encrypt => Mode::Encrypt,
            CipherMode::Decrypt => Mode::Decrypt,
        };
        let mut crypter = Crypter::new(cipher, openssl_mode, key, Some(iv))?;
        crypter.pad(true);
        Ok(Self {
            algorithm: spec.algorithm(),
            mode,
            crypter,
            block_size: cipher.block_size(),
            finished: false,
        })
    }

    #[must_use]
    pub fn algorithm(&self) -> CipherAlgorithm {
        self.algorithm
    }
    #[must_use]
    pub fn mode(&self) -> CipherMode {
        self.mode
    }
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn update(&mut self, input: &[u8]) -> Pkcs7Result<Vec<u8>> {
        if self.finished {
            return Err(Pkcs7Error::CryptographicError(format!(
                "{} stream already finalized",
                self.algorithm
            )));
        }
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let mut out = vec![0u8; input.len() + self.block_size];
        let written = self.crypter.update(input, &mut out)?;
        out.truncate(written);
        Ok(out)
    }

    pub fn finish(&mut self) -> Pkcs7Result<Vec<u8>> {
        if self.finished {
            return Ok(Vec::new());
        }
        self.finished = true;
        let mut out = vec![0u8; self.block_size * 2];
        let written = self.crypter.finalize(&mut out).map_err(|e| match self.mode {
            CipherMode::Decrypt => {
                Pkcs7Error::CryptographicError(format!("bad decrypt ({}): {e}", self.algorithm))
            }
            CipherMode::Encrypt => Pkcs7Error::from(e),
        })?;
        out.truncate(written);
        Ok(out)
    }
}

impl fmt::Debug for CipherContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CipherContext(algo={}, mode={:?}, finished={})",
            self.algorithm, self.mode, self.finished
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(ctx: &mut CipherContext, chunks: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(ctx.update(chunk).unwrap());
        }
        out.extend(ctx.finish().unwrap());
        out
    }

    #[test]
    fn chunked_encryption_matches_one_shot() {
        // Single DES is only available from OpenSSL 3's legacy provider.
        for alg in CipherAlgorithm::ALL
            .into_iter()
            .filter(|alg| *alg != CipherAlgorithm::DesCbc)
        {
            let mut spec = CipherSpec::new(alg);
            spec.ensure_key_material().unwrap();
            let whole = run(&mut spec.encryptor().unwrap(), &[b"hello pkcs7 world, in pieces"]);
            let pieces = run(
                &mut spec.encryptor().unwrap(),
                &[b"hello ", b"pkcs7 world", b", in pieces"],
            );
            assert_eq!(whole, pieces, "{alg}");
            assert_eq!(whole.len() % alg.block_size(), 0);
            let plain = run(&mut spec.decryptor().unwrap(), &[&whole]);
            assert_eq!(plain, b"hello pkcs7 world, in pieces");
        }
    }

    #[test]
    fn finish_is_idempotent() {
        let mut spec = CipherSpec::new(CipherAlgorithm::Aes128Cbc);
        spec.ensure_key_material().unwrap();
        let mut ctx = spec.encryptor().unwrap();
        assert_eq!(ctx.finish().unwrap().len(), 16);
        assert!(ctx.finish().unwrap().is_empty());
        assert!(ctx.update(b"late").is_err());
    }

    #[test]
    fn algorithm_identifier_round_trips_iv() {
        let spec =
            CipherSpec::with_key(CipherAlgorithm::DesEde3Cbc, vec![7; 24], vec![9; 8]).unwrap();
        let alg_id = spec.algorithm_identifier().unwrap();
        let rebuilt = CipherSpec::from_algorithm_identifier(&alg_id, vec![7; 24]).unwrap();
        assert_eq!(rebuilt, spec);
    }

    #[test]
    fn rejects_wrong_key_length() {
        assert!(CipherSpec::with_key(CipherAlgorithm::Aes256Cbc, vec![0; 16], vec![0; 16]).is_err());
        assert!(CipherSpec::new(CipherAlgorithm::Aes256Cbc).encryptor().is_err());
    }
}
