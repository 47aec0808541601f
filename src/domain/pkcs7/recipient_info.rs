//! Per-recipient record carrying the content key wrapped under the
//! recipient's public key.

use std::fmt;

use der::asn1::Any;
use der::Decode;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::AlgorithmIdentifierOwned;

use super::asn1::IssuerAndSerialNumber;
use crate::domain::constants::{ASN1_NULL, OID_RSA_ENCRYPTION, PKCS7_ENVELOPED_VERSION};
use crate::domain::crypto::Certificate;

/// Per-recipient record: who the content key was wrapped for, and the
/// wrapped key itself once the envelope has been sealed.
#[derive(Clone)]
pub struct RecipientInfo {
    version: u8,
    issuer_and_serial: IssuerAndSerialNumber,
    key_encryption_algorithm: AlgorithmIdentifierOwned,
    encrypted_key: Option<Vec<u8>>,
    certificate: Option<Certificate>,
}

impl RecipientInfo {
    /// Recipient addressed by `cert` using RSA key transport.
    #[must_use]
    pub fn new(cert: &Certificate) -> Self {
        Self {
            version: PKCS7_ENVELOPED_VERSION,
            issuer_and_serial: cert.issuer_and_serial(),
            key_encryption_algorithm: AlgorithmIdentifierOwned {
                oid: OID_RSA_ENCRYPTION,
                parameters: Any::from_der(ASN1_NULL).ok(),
            },
            encrypted_key: None,
            certificate: Some(cert.clone()),
        }
    }

    pub(crate) fn from_parts(
        version: u8,
        issuer_and_serial: IssuerAndSerialNumber,
        key_encryption_algorithm: AlgorithmIdentifierOwned,
        encrypted_key: Vec<u8>,
    ) -> Self {
        Self {
            version,
            issuer_and_serial,
            key_encryption_algorithm,
            encrypted_key: Some(encrypted_key),
            certificate: None,
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
    pub fn key_encryption_algorithm(&self) -> &AlgorithmIdentifierOwned {
        &self.key_encryption_algorithm
    }
    #[must_use]
    pub fn encrypted_key(&self) -> Option<&[u8]> {
        self.encrypted_key.as_deref()
    }
    /// Recipient certificate; only known for locally added recipients.
    #[must_use]
    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    #[must_use]
    pub fn matches(&self, cert: &Certificate) -> bool {
        cert.matches(&self.issuer_and_serial)
    }

    pub(crate) fn set_encrypted_key(&mut self, encrypted_key: Vec<u8>) {
        self.encrypted_key = Some(encrypted_key);
    }
}

impl fmt::Debug for RecipientInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RecipientInfo(issuer={}, serial={}, key_len={})",
            self.issuer(),
            hex::encode(self.serial_number().as_bytes()),
            self.encrypted_key.as_ref().map_or(0, Vec::len)
        )
    }
}
