//! Per-signer record. Holds the private key until the message is finalized,
//! and the signature after.

use std::fmt;
use std::time::SystemTime;

use der::asn1::{Any, ObjectIdentifier};
use der::Decode;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::AlgorithmIdentifierOwned;

use super::asn1::IssuerAndSerialNumber;
use super::attributes::{Attribute, AttributeSet};
use crate::domain::constants::{ASN1_NULL, OID_RSA_ENCRYPTION, PKCS7_SIGNED_VERSION};
use crate::domain::crypto::{Certificate, DigestAlgorithm, PrivateKey};
use crate::domain::registry;
use crate::infra::error::{Pkcs7Error, Pkcs7Result};

/// Per-signer record of a signed message.
///
/// A signer created locally holds its private key until the message is
/// finalized; a signer decoded from DER only carries the public fields.
#[derive(Clone)]
pub struct SignerInfo {
    version: u8,
    issuer_and_serial: IssuerAndSerialNumber,
    digest_algorithm: AlgorithmIdentifierOwned,
    signed_attributes: AttributeSet,
    digest_encryption_algorithm: AlgorithmIdentifierOwned,
    signature: Option<Vec<u8>>,
    unsigned_attributes: AttributeSet,
    signing_key: Option<PrivateKey>,
}

impl SignerInfo {
    pub fn new(cert: &Certificate, key: PrivateKey, digest: DigestAlgorithm) -> Pkcs7Result<Self> {
        if !key.matches_certificate(cert)? {
            return Err(Pkcs7Error::CertificateError(
                "private key does not match signer certificate".into(),
            ));
        }
        let oid = key.signature_algorithm(digest)?;
        // rsaEncryption carries explicit NULL parameters, ECDSA carries none
        let parameters = if oid == OID_RSA_ENCRYPTION {
            Any::from_der(ASN1_NULL).ok()
        } else {
            None
        };
        let digest_encryption_algorithm = AlgorithmIdentifierOwned { oid, parameters };
        Ok(Self {
            version: PKCS7_SIGNED_VERSION,
            issuer_and_serial: cert.issuer_and_serial(),
            digest_algorithm: digest.algorithm_identifier(),
            signed_attributes: AttributeSet::new(),
            digest_encryption_algorithm,
            signature: None,
            unsigned_attributes: AttributeSet::new(),
            signing_key: Some(key),
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        version: u8,
        issuer_and_serial: IssuerAndSerialNumber,
        digest_algorithm: AlgorithmIdentifierOwned,
        signed_attributes: AttributeSet,
        digest_encryption_algorithm: AlgorithmIdentifierOwned,
        signature: Vec<u8>,
        unsigned_attributes: AttributeSet,
    ) -> Self {
        Self {
            version,
            issuer_and_serial,
            digest_algorithm,
            signed_attributes,
            digest_encryption_algorithm,
            signature: Some(signature),
            unsigned_attributes,
            signing_key: None,
        }
    }

    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }
    #[must_use]
    pub fn issuer_and_serial(&self) -> &IssuerAndSerialNumber {
        &self.issuer_and_serial
    }
    #[must_use]
    pub fn issuer(&self) -> &Name {
        &self.issuer_and_serial.issuer
    }
    #[must_use]
    pub fn serial_number(&self) -> &SerialNumber {
        &self.issuer_and_serial.serial_number
    }
    #[must_use]
    pub fn digest_algorithm(&self) -> &AlgorithmIdentifierOwned {
        &self.digest_algorithm
    }
    #[must_use]
    pub fn digest_encryption_algorithm(&self) -> &AlgorithmIdentifierOwned {
        &self.digest_encryption_algorithm
    }

    /// Resolve the digest algorithm to a runnable capability.
    pub fn digest_kind(&self) -> Pkcs7Result<DigestAlgorithm> {
        registry::digest_for_oid(&self.digest_algorithm.oid)
    }

    #[must_use]
    pub fn signed_attributes(&self) -> &AttributeSet {
        &self.signed_attributes
    }
    #[must_use]
    pub fn unsigned_attributes(&self) -> &AttributeSet {
        &self.unsigned_attributes
    }

    pub fn add_signed_attribute(&mut self, attribute: Attribute) {
        self.signed_attributes.add(attribute);
    }

    pub fn add_unsigned_attribute(&mut self, attribute: Attribute) {
        self.unsigned_attributes.add(attribute);
    }

    /// Encrypted digest, present once the message is finalized.
    #[must_use]
    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    #[must_use]
    pub fn has_signing_key(&self) -> bool {
        self.signing_key.is_some()
    }

    /// Value of the `signingTime` attribute, if any.
    pub fn signed_time(&self) -> Pkcs7Result<Option<SystemTime>> {
        self.signed_attributes.signing_time()
    }

    pub fn content_type_attribute(&self) -> Pkcs7Result<Option<ObjectIdentifier>> {
        self.signed_attributes.content_type()
    }

    pub fn message_digest(&self) -> Pkcs7Result<Option<Vec<u8>>> {
        self.signed_attributes.message_digest()
    }

    pub(crate) fn signing_key(&self) -> Option<&PrivateKey> {
        self.signing_key.as_ref()
    }

    pub(crate) fn set_signature(&mut self, signature: Vec<u8>) {
        self.signature = Some(signature);
    }
}

impl fmt::Debug for SignerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerInfo")
            .field("issuer", &self.issuer().to_string())
            .field("serial", &hex::encode(self.serial_number().as_bytes()))
            .field("digest", &registry::name_for_oid(&self.digest_algorithm.oid))
            .field("signed_attributes", &self.signed_attributes.len())
            .field("signed", &self.signature.is_some())
            .finish()
    }
}
