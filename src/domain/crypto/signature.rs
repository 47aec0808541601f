//! Private keys, signature primitives and RSA key transport.

use std::fmt;

use openssl::encrypt::{Decrypter, Encrypter};
use openssl::pkey::{HasPublic, Id, PKey, PKeyRef, Private};
use openssl::rsa::Padding;
use openssl::sign::{Signer, Verifier};

use super::{Certificate, DigestAlgorithm};
use crate::domain::constants::{
    OID_ECDSA_WITH_SHA1, OID_ECDSA_WITH_SHA256, OID_ECDSA_WITH_SHA384, OID_ECDSA_WITH_SHA512,
    OID_RSA_ENCRYPTION,
};
use crate::infra::error::{Pkcs7Error, Pkcs7Result};
use der::asn1::ObjectIdentifier;

/// Private key usable for signing and for unwrapping content keys.
#[derive(Clone)]
pub struct PrivateKey {
    pkey: PKey<Private>,
}

impl PrivateKey {
    #[must_use]
    pub fn from_pkey(pkey: PKey<Private>) -> Self {
        Self { pkey }
    }

    pub fn from_pem(pem: &[u8]) -> Pkcs7Result<Self> {
        let pkey = PKey::private_key_from_pem(pem)
            .map_err(|e| Pkcs7Error::CryptographicError(format!("invalid private key PEM: {e}")))?;
        Ok(Self { pkey })
    }

    pub fn from_der(der: &[u8]) -> Pkcs7Result<Self> {
        let pkey = PKey::private_key_from_der(der)
            .map_err(|e| Pkcs7Error::CryptographicError(format!("invalid private key DER: {e}")))?;
        Ok(Self { pkey })
    }

    #[must_use]
    pub fn as_pkey(&self) -> &PKey<Private> {
        &self.pkey
    }

    #[must_use]
    pub fn key_id(&self) -> Id {
        self.pkey.id()
    }

    /// True when the certificate's public key is the public half of this key.
    pub fn matches_certificate(&self, cert: &Certificate) -> Pkcs7Result<bool> {
        Ok(cert.public_key()?.public_eq(&self.pkey))
    }

    /// `digestEncryptionAlgorithm` OID to record for this key type.
    pub fn signature_algorithm(&self, digest: DigestAlgorithm) -> Pkcs7Result<ObjectIdentifier> {
        match self.pkey.id() {
            Id::RSA => Ok(OID_RSA_ENCRYPTION),
            Id::EC => match digest {
                DigestAlgorithm::Sha1 => Ok(OID_ECDSA_WITH_SHA1),
                DigestAlgorithm::Sha256 => Ok(OID_ECDSA_WITH_SHA256),
                DigestAlgorithm::Sha384 => Ok(OID_ECDSA_WITH_SHA384),
                DigestAlgorithm::Sha512 => Ok(OID_ECDSA_WITH_SHA512),
                other => Err(Pkcs7Error::UnknownAlgorithm(format!(
                    "ECDSA signatures with {other} are not supported"
                ))),
            },
            other => Err(Pkcs7Error::UnknownAlgorithm(format!(
                "unsupported signing key type {other:?}"
            ))),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey(type={:?}, bits={})", self.pkey.id(), self.pkey.bits())
    }
}

/// Sign `data` (hashing it with `digest` first).
pub fn sign_data(key: &PrivateKey, digest: DigestAlgorithm, data: &[u8]) -> Pkcs7Result<Vec<u8>> {
    let mut signer = Signer::new(digest.message_digest(), key.as_pkey())?;
    signer.update(data)?;
    Ok(signer.sign_to_vec()?)
}

pub fn verify_data<T: HasPublic>(
    public_key: &PKeyRef<T>,
    digest: DigestAlgorithm,
    data: &[u8],
    signature: &[u8],
) -> Pkcs7Result<bool> {
    let mut verifier = Verifier::new(digest.message_digest(), public_key)?;
    verifier.update(data)?;
    // OpenSSL reports a malformed signature as an error rather than `false`.
    Ok(verifier.verify(signature).unwrap_or(false))
}

/// Encrypt a content key to the recipient's RSA public key (PKCS#1 v1.5).
pub fn wrap_key(recipient: &Certificate, content_key: &[u8]) -> Pkcs7Result<Vec<u8>> {
    let public_key = recipient.public_key()?;
    if public_key.id() != Id::RSA {
        return Err(Pkcs7Error::CryptographicError(format!(
            "key transport requires an RSA recipient key, found {:?}",
            public_key.id()
        )));
    }
    let mut encrypter = Encrypter::new(&public_key)?;
    encrypter.set_rsa_padding(Padding::PKCS1)?;
    let mut wrapped = vec![0u8; encrypter.encrypt_len(content_key)?];
    let written = encrypter.encrypt(content_key, &mut wrapped)?;
    wrapped.truncate(written);
    Ok(wrapped)
}

/// Recover a content key wrapped by [`wrap_key`].
pub fn unwrap_key(key: &PrivateKey, wrapped: &[u8]) -> Pkcs7Result<Vec<u8>> {
    let mut decrypter = Decrypter::new(key.as_pkey())?;
    decrypter.set_rsa_padding(Padding::PKCS1)?;
    let mut content_key = vec![0u8; decrypter.decrypt_len(wrapped)?];
    let written = decrypter
        .decrypt(wrapped, &mut content_key)
        .map_err(|e| Pkcs7Error::CryptographicError(format!("unable to decrypt content key: {e}")))?;
    content_key.truncate(written);
    Ok(content_key)
}
