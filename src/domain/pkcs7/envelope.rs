//! Shared envelope of `EnvelopedData` and `SignedAndEnvelopedData`.

use der::asn1::ObjectIdentifier;
use x509_cert::spki::AlgorithmIdentifierOwned;

use super::recipient_info::RecipientInfo;
use crate::domain::constants::OID_PKCS7_DATA;
use crate::domain::crypto::{Certificate, CipherSpec};
use crate::infra::error::{Pkcs7Error, Pkcs7Result};

/// `EncryptedContentInfo`: inner content type, cipher and ciphertext.
#[derive(Clone, Debug)]
pub struct EncryptedContent {
    content_type: ObjectIdentifier,
    cipher: Option<CipherSpec>,
    algorithm: Option<AlgorithmIdentifierOwned>,
    ciphertext: Option<Vec<u8>>,
}

impl Default for EncryptedContent {
    fn default() -> Self {
        Self {
            content_type: OID_PKCS7_DATA,
            cipher: None,
            algorithm: None,
            ciphertext: None,
        }
    }
}

impl EncryptedContent {
    pub(crate) fn from_parts(
        content_type: ObjectIdentifier,
        algorithm: AlgorithmIdentifierOwned,
        ciphertext: Option<Vec<u8>>,
    ) -> Self {
        Self {
            content_type,
            cipher: None,
            algorithm: Some(algorithm),
            ciphertext,
        }
    }

    #[must_use]
    pub fn content_type(&self) -> ObjectIdentifier {
        self.content_type
    }
    #[must_use]
    pub fn cipher(&self) -> Option<&CipherSpec> {
        self.cipher.as_ref()
    }
    /// Content-encryption `AlgorithmIdentifier` (with IV) once sealed or decoded.
    #[must_use]
    pub fn algorithm(&self) -> Option<&AlgorithmIdentifierOwned> {
        self.algorithm.as_ref()
    }
    #[must_use]
    pub fn ciphertext(&self) -> Option<&[u8]> {
        self.ciphertext.as_deref()
    }
}

#[derive(Clone, Debug)]
pub struct Envelope {
    version: u8,
    recipient_infos: Vec<RecipientInfo>,
    encrypted_content: EncryptedContent,
}

impl Envelope {
    #[must_use]
    pub fn new(version: u8) -> Self {
        Self {
            version,
            recipient_infos: Vec::new(),
            encrypted_content: EncryptedContent::default(),
        }
    }

    pub(crate) fn from_parts(
        version: u8,
        recipient_infos: Vec<RecipientInfo>,
        encrypted_content: EncryptedContent,
    ) -> Self {
        Self {
            version,
            recipient_infos,
            encrypted_content,
        }
    }

    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }
    #[must_use]
    pub fn recipient_infos(&self) -> &[RecipientInfo] {
        &self.recipient_infos
    }
    #[must_use]
    pub fn encrypted_content(&self) -> &EncryptedContent {
        &self.encrypted_content
    }
    #[must_use]
    pub fn cipher(&self) -> Option<&CipherSpec> {
        self.encrypted_content.cipher()
    }

    pub fn add_recipient_info(&mut self, recipient: RecipientInfo) {
        self.recipient_infos.push(recipient);
    }

    pub fn set_cipher(&mut self, cipher: CipherSpec) {
        self.encrypted_content.cipher = Some(cipher);
    }

    /// First recipient whose issuer and serial match `cert`.
    pub fn find_recipient(&self, cert: &Certificate) -> Pkcs7Result<&RecipientInfo> {
        self.recipient_infos
            .iter()
            .find(|ri| ri.matches(cert))
            .ok_or_else(|| {
                Pkcs7Error::RecipientNotFound(format!(
                    "no recipient info for issuer '{}' serial {}",
                    cert.issuer(),
                    hex::encode(cert.serial_number().as_bytes())
                ))
            })
    }

    pub(crate) fn recipient_infos_mut(&mut self) -> &mut [RecipientInfo] {
        &mut self.recipient_infos
    }

    pub(crate) fn cipher_mut(&mut self) -> Option<&mut CipherSpec> {
        self.encrypted_content.cipher.as_mut()
    }

    pub(crate) fn set_algorithm(&mut self, algorithm: AlgorithmIdentifierOwned) {
        self.encrypted_content.algorithm = Some(algorithm);
    }

    pub(crate) fn set_ciphertext(&mut self, ciphertext: Vec<u8>) {
        self.encrypted_content.ciphertext = Some(ciphertext);
    }
}
