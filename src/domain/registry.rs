//! Algorithm registry: maps object identifiers to symbolic names and to the
//! digest/cipher capabilities the engine can instantiate.
//!
//! Lookups by name are case-insensitive. A second attempt ignores `-` and
//! `_` so that `sha-256`, `SHA_256` and `sha256` all resolve to the same
//! algorithm. Dotted OID strings are accepted as names.

use std::fmt;

use der::asn1::ObjectIdentifier;

use crate::domain::constants::*;
use crate::domain::crypto::{CipherAlgorithm, DigestAlgorithm};
use crate::infra::error::{Pkcs7Error, Pkcs7Result};

/// Broad family an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmKind {
    ContentType,
    Attribute,
    Digest,
    Cipher,
    KeyTransport,
    Signature,
}

/// Capability behind an OID that the engine knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Digest(DigestAlgorithm),
    Cipher(CipherAlgorithm),
}

struct RegistryEntry {
    short_name: &'static str,
    long_name: &'static str,
    oid: ObjectIdentifier,
    kind: AlgorithmKind,
}

const fn entry(
    short_name: &'static str,
    long_name: &'static str,
    oid: ObjectIdentifier,
    kind: AlgorithmKind,
) -> RegistryEntry {
    RegistryEntry {
        short_name,
        long_name,
        oid,
        kind,
    }
}

static ENTRIES: &[RegistryEntry] = &[
    entry("pkcs7-data", "pkcs7-data", OID_PKCS7_DATA, AlgorithmKind::ContentType),
    entry("pkcs7-signedData", "pkcs7-signedData", OID_PKCS7_SIGNED, AlgorithmKind::ContentType),
    entry(
        "pkcs7-envelopedData",
        "pkcs7-envelopedData",
        OID_PKCS7_ENVELOPED,
        AlgorithmKind::ContentType,
    ),
    entry(
        "pkcs7-signedAndEnvelopedData",
        "pkcs7-signedAndEnvelopedData",
        OID_PKCS7_SIGNED_AND_ENVELOPED,
        AlgorithmKind::ContentType,
    ),
    entry("pkcs7-digestData", "pkcs7-digestData", OID_PKCS7_DIGESTED, AlgorithmKind::ContentType),
    entry(
        "pkcs7-encryptedData",
        "pkcs7-encryptedData",
        OID_PKCS7_ENCRYPTED,
        AlgorithmKind::ContentType,
    ),
    entry("contentType", "contentType", OID_PKCS9_CONTENT_TYPE, AlgorithmKind::Attribute),
    entry("messageDigest", "messageDigest", OID_PKCS9_MESSAGE_DIGEST, AlgorithmKind::Attribute),
    entry("signingTime", "signingTime", OID_PKCS9_SIGNING_TIME, AlgorithmKind::Attribute),
    entry("SMIME-CAPS", "S/MIME Capabilities", OID_SMIME_CAPABILITIES, AlgorithmKind::Attribute),
    entry("MD5", "md5", OID_MD5, AlgorithmKind::Digest),
    entry("SHA1", "sha1", OID_SHA1, AlgorithmKind::Digest),
    entry("SHA224", "sha224", OID_SHA224, AlgorithmKind::Digest),
    entry("SHA256", "sha256", OID_SHA256, AlgorithmKind::Digest),
    entry("SHA384", "sha384", OID_SHA384, AlgorithmKind::Digest),
    entry("SHA512", "sha512", OID_SHA512, AlgorithmKind::Digest),
    entry("DES-CBC", "des-cbc", OID_DES_CBC, AlgorithmKind::Cipher),
    entry("DES-EDE3-CBC", "des-ede3-cbc", OID_DES_EDE3_CBC, AlgorithmKind::Cipher),
    entry("RC2-CBC", "rc2-cbc", OID_RC2_CBC, AlgorithmKind::Cipher),
    entry("AES-128-CBC", "aes-128-cbc", OID_AES_128_CBC, AlgorithmKind::Cipher),
    entry("AES-192-CBC", "aes-192-cbc", OID_AES_192_CBC, AlgorithmKind::Cipher),
    entry("AES-256-CBC", "aes-256-cbc", OID_AES_256_CBC, AlgorithmKind::Cipher),
    entry("rsaEncryption", "rsaEncryption", OID_RSA_ENCRYPTION, AlgorithmKind::KeyTransport),
    entry("RSA-SHA1", "sha1WithRSAEncryption", OID_SHA1_WITH_RSA, AlgorithmKind::Signature),
    entry("RSA-SHA256", "sha256WithRSAEncryption", OID_SHA256_WITH_RSA, AlgorithmKind::Signature),
    entry("RSA-SHA384", "sha384WithRSAEncryption", OID_SHA384_WITH_RSA, AlgorithmKind::Signature),
    entry("RSA-SHA512", "sha512WithRSAEncryption", OID_SHA512_WITH_RSA, AlgorithmKind::Signature),
    entry("ecdsa-with-SHA1", "ecdsa-with-SHA1", OID_ECDSA_WITH_SHA1, AlgorithmKind::Signature),
    entry("ecdsa-with-SHA256", "ecdsa-with-SHA256", OID_ECDSA_WITH_SHA256, AlgorithmKind::Signature),
    entry("ecdsa-with-SHA384", "ecdsa-with-SHA384", OID_ECDSA_WITH_SHA384, AlgorithmKind::Signature),
    entry("ecdsa-with-SHA512", "ecdsa-with-SHA512", OID_ECDSA_WITH_SHA512, AlgorithmKind::Signature),
];

fn by_oid(oid: &ObjectIdentifier) -> Option<&'static RegistryEntry> {
    ENTRIES.iter().find(|e| e.oid == *oid)
}

fn folded(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Symbolic short name for `oid`, or its dotted form when unregistered.
#[must_use]
pub fn name_for_oid(oid: &ObjectIdentifier) -> String {
    by_oid(oid).map_or_else(|| oid.to_string(), |e| e.short_name.to_string())
}

/// Long (descriptive) name for `oid`, or its dotted form when unregistered.
#[must_use]
pub fn long_name_for_oid(oid: &ObjectIdentifier) -> String {
    by_oid(oid).map_or_else(|| oid.to_string(), |e| e.long_name.to_string())
}

#[must_use]
pub fn kind_of(oid: &ObjectIdentifier) -> Option<AlgorithmKind> {
    by_oid(oid).map(|e| e.kind)
}

/// Resolve a symbolic name (short or long) or a dotted OID string.
pub fn oid_for_name(name: &str) -> Pkcs7Result<ObjectIdentifier> {
    let name = name.trim();
    if let Some(e) = ENTRIES
        .iter()
        .find(|e| e.short_name.eq_ignore_ascii_case(name) || e.long_name.eq_ignore_ascii_case(name))
    {
        return Ok(e.oid);
    }
    let key = folded(name);
    if let Some(e) = ENTRIES
        .iter()
        .find(|e| folded(e.short_name) == key || folded(e.long_name) == key)
    {
        return Ok(e.oid);
    }
    ObjectIdentifier::new(name)
        .map_err(|_| Pkcs7Error::UnknownAlgorithm(format!("unknown algorithm name '{name}'")))
}

/// Digest or cipher capability registered for `oid`.
pub fn capability_for(oid: &ObjectIdentifier) -> Pkcs7Result<Capability> {
    if let Some(digest) = DigestAlgorithm::from_oid(oid) {
        return Ok(Capability::Digest(digest));
    }
    if let Some(cipher) = CipherAlgorithm::from_oid(oid) {
        return Ok(Capability::Cipher(cipher));
    }
    Err(Pkcs7Error::UnknownAlgorithm(format!(
        "no digest or cipher available for {}",
        name_for_oid(oid)
    )))
}

pub fn digest_for_oid(oid: &ObjectIdentifier) -> Pkcs7Result<DigestAlgorithm> {
    match capability_for(oid)? {
        Capability::Digest(digest) => Ok(digest),
        Capability::Cipher(_) => Err(Pkcs7Error::UnknownAlgorithm(format!(
            "{} is a cipher, not a digest",
            name_for_oid(oid)
        ))),
    }
}

/// Named algorithm reference as carried in messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlgorithmRef {
    name: String,
    oid: ObjectIdentifier,
}

impl AlgorithmRef {
    #[must_use]
    pub fn from_oid(oid: ObjectIdentifier) -> Self {
        Self {
            name: name_for_oid(&oid),
            oid,
        }
    }

    pub fn from_name(name: &str) -> Pkcs7Result<Self> {
        oid_for_name(name).map(Self::from_oid)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[must_use]
    pub fn oid(&self) -> ObjectIdentifier {
        self.oid
    }
}

impl fmt::Display for AlgorithmRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.oid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_oid_falls_back_to_dotted_form() {
        let oid = ObjectIdentifier::new_unwrap("1.2.3.4.5");
        assert_eq!(name_for_oid(&oid), "1.2.3.4.5");
        assert!(kind_of(&oid).is_none());
    }

    #[test]
    fn folded_names_resolve() {
        assert_eq!(oid_for_name("sha-256").unwrap(), OID_SHA256);
        assert_eq!(oid_for_name("Sha_512").unwrap(), OID_SHA512);
        assert_eq!(oid_for_name("aes256cbc").unwrap(), OID_AES_256_CBC);
        assert_eq!(oid_for_name("sha256WithRSAEncryption").unwrap(), OID_SHA256_WITH_RSA);
    }

    #[test]
    fn rc2_is_named_but_not_runnable() {
        assert_eq!(name_for_oid(&OID_RC2_CBC), "RC2-CBC");
        assert!(matches!(
            capability_for(&OID_RC2_CBC),
            Err(Pkcs7Error::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn short_names_are_unique() {
        for (i, a) in ENTRIES.iter().enumerate() {
            for b in &ENTRIES[i + 1..] {
                assert_ne!(folded(a.short_name), folded(b.short_name));
                assert_ne!(a.oid, b.oid);
            }
        }
    }
}
