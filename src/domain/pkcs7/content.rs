//! Content variants of a PKCS#7 message.
//!
//! Each variant implements [`Pkcs7Content`]. Operations that do not apply to
//! a variant (adding a recipient to `SignedData`, signers on `DigestedData`,
//! ...) fall through to the trait's default methods, which report
//! `UnsupportedOperation` naming the variant and the operation.

use std::fmt;

use der::asn1::{Any, ObjectIdentifier};
use x509_cert::spki::AlgorithmIdentifierOwned;

use super::envelope::Envelope;
use super::recipient_info::RecipientInfo;
use super::signer_info::SignerInfo;
use crate::domain::constants::{
    OID_PKCS7_DATA, OID_PKCS7_DIGESTED, OID_PKCS7_ENCRYPTED, OID_PKCS7_ENVELOPED,
    OID_PKCS7_SIGNED, OID_PKCS7_SIGNED_AND_ENVELOPED, PKCS7_DIGESTED_VERSION,
    PKCS7_ENVELOPED_VERSION, PKCS7_SIGNED_AND_ENVELOPED_VERSION, PKCS7_SIGNED_VERSION,
};
use crate::domain::crypto::{Certificate, CipherSpec, Crl, DigestAlgorithm};
use crate::domain::registry;
use crate::infra::error::{Pkcs7Error, Pkcs7Result};

/// PKCS#7 content type OIDs known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Data,
    Signed,
    Enveloped,
    SignedAndEnveloped,
    Digested,
    Encrypted,
}

impl ContentType {
    #[must_use]
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            ContentType::Data => OID_PKCS7_DATA,
            ContentType::Signed => OID_PKCS7_SIGNED,
            ContentType::Enveloped => OID_PKCS7_ENVELOPED,
            ContentType::SignedAndEnveloped => OID_PKCS7_SIGNED_AND_ENVELOPED,
            ContentType::Digested => OID_PKCS7_DIGESTED,
            ContentType::Encrypted => OID_PKCS7_ENCRYPTED,
        }
    }

    #[must_use]
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        [
            ContentType::Data,
            ContentType::Signed,
            ContentType::Enveloped,
            ContentType::SignedAndEnveloped,
            ContentType::Digested,
            ContentType::Encrypted,
        ]
        .into_iter()
        .find(|ct| ct.oid() == *oid)
    }

    /// Registry short name, e.g. `pkcs7-signedData`.
    #[must_use]
    pub fn name(&self) -> String {
        registry::name_for_oid(&self.oid())
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Inner `ContentInfo` carried by signed and digested messages.
///
/// For `data` the payload is kept as raw octets; any other inner type is
/// kept as its encoded value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncapsulatedContent {
    content_type: Option<ObjectIdentifier>,
    data: Option<Vec<u8>>,
    other: Option<Any>,
}

impl EncapsulatedContent {
    /// Empty `data` content.
    #[must_use]
    pub fn data() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        content_type: ObjectIdentifier,
        data: Option<Vec<u8>>,
        other: Option<Any>,
    ) -> Self {
        Self {
            content_type: Some(content_type),
            data,
            other,
        }
    }

    #[must_use]
    pub fn content_type(&self) -> ObjectIdentifier {
        self.content_type.unwrap_or(OID_PKCS7_DATA)
    }
    /// Payload octets of a `data` inner content, if embedded.
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }
    #[must_use]
    pub fn other(&self) -> Option<&Any> {
        self.other.as_ref()
    }
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.data.is_some() || self.other.is_some()
    }

    pub(crate) fn set_bytes(&mut self, data: Vec<u8>) {
        self.data = Some(data);
        self.other = None;
    }

    pub(crate) fn clear(&mut self) {
        self.data = None;
        self.other = None;
    }
}

/// Operations shared by all content variants.
pub trait Pkcs7Content {
    fn content_type(&self) -> ContentType;

    fn set_cipher(&mut self, _cipher: CipherSpec) -> Pkcs7Result<()> {
        Err(unsupported(self.content_type(), "set_cipher"))
    }

    fn cipher(&self) -> Pkcs7Result<Option<&CipherSpec>> {
        Err(unsupported(self.content_type(), "cipher"))
    }

    fn add_recipient_info(&mut self, _recipient: RecipientInfo) -> Pkcs7Result<()> {
        Err(unsupported(self.content_type(), "add_recipient_info"))
    }

    fn recipient_infos(&self) -> Pkcs7Result<&[RecipientInfo]> {
        Err(unsupported(self.content_type(), "recipient_infos"))
    }

    fn add_signer(&mut self, _signer: SignerInfo) -> Pkcs7Result<()> {
        Err(unsupported(self.content_type(), "add_signer"))
    }

    fn signer_infos(&self) -> Pkcs7Result<&[SignerInfo]> {
        Err(unsupported(self.content_type(), "signer_infos"))
    }

    fn signer_infos_mut(&mut self) -> Pkcs7Result<&mut [SignerInfo]> {
        Err(unsupported(self.content_type(), "signer_infos"))
    }

    fn add_certificate(&mut self, _cert: Certificate) -> Pkcs7Result<()> {
        Err(unsupported(self.content_type(), "add_certificate"))
    }

    fn certificates(&self) -> Pkcs7Result<&[Certificate]> {
        Err(unsupported(self.content_type(), "certificates"))
    }

    fn add_crl(&mut self, _crl: Crl) -> Pkcs7Result<()> {
        Err(unsupported(self.content_type(), "add_crl"))
    }

    fn crls(&self) -> Pkcs7Result<&[Crl]> {
        Err(unsupported(self.content_type(), "crls"))
    }

    fn digest_algorithms(&self) -> Pkcs7Result<&[AlgorithmIdentifierOwned]> {
        Err(unsupported(self.content_type(), "digest_algorithms"))
    }
}

fn unsupported(content_type: ContentType, operation: &str) -> Pkcs7Error {
    Pkcs7Error::unsupported(content_type.name(), operation)
}

/// Record `signer`'s digest algorithm unless one with the same OID is present.
fn push_signer(
    digest_algorithms: &mut Vec<AlgorithmIdentifierOwned>,
    signer_infos: &mut Vec<SignerInfo>,
    signer: SignerInfo,
) {
    let alg = signer.digest_algorithm();
    if !digest_algorithms.iter().any(|existing| existing.oid == alg.oid) {
        digest_algorithms.push(alg.clone());
    }
    signer_infos.push(signer);
}

#[derive(Clone, Debug)]
pub struct SignedContent {
    pub(crate) version: u8,
    pub(crate) digest_algorithms: Vec<AlgorithmIdentifierOwned>,
    pub(crate) contents: EncapsulatedContent,
    pub(crate) certificates: Vec<Certificate>,
    pub(crate) crls: Vec<Crl>,
    pub(crate) signer_infos: Vec<SignerInfo>,
}

impl Default for SignedContent {
    fn default() -> Self {
        Self {
            version: PKCS7_SIGNED_VERSION,
            digest_algorithms: Vec::new(),
            contents: EncapsulatedContent::data(),
            certificates: Vec::new(),
            crls: Vec::new(),
            signer_infos: Vec::new(),
        }
    }
}

impl SignedContent {
    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }
    #[must_use]
    pub fn contents(&self) -> &EncapsulatedContent {
        &self.contents
    }
}

impl Pkcs7Content for SignedContent {
    fn content_type(&self) -> ContentType {
        ContentType::Signed
    }
    fn add_signer(&mut self, signer: SignerInfo) -> Pkcs7Result<()> {
        push_signer(&mut self.digest_algorithms, &mut self.signer_infos, signer);
        Ok(())
    }
    fn signer_infos(&self) -> Pkcs7Result<&[SignerInfo]> {
        Ok(&self.signer_infos)
    }
    fn signer_infos_mut(&mut self) -> Pkcs7Result<&mut [SignerInfo]> {
        Ok(&mut self.signer_infos)
    }
    fn add_certificate(&mut self, cert: Certificate) -> Pkcs7Result<()> {
        self.certificates.push(cert);
        Ok(())
    }
    fn certificates(&self) -> Pkcs7Result<&[Certificate]> {
        Ok(&self.certificates)
    }
    fn add_crl(&mut self, crl: Crl) -> Pkcs7Result<()> {
        self.crls.push(crl);
        Ok(())
    }
    fn crls(&self) -> Pkcs7Result<&[Crl]> {
        Ok(&self.crls)
    }
    fn digest_algorithms(&self) -> Pkcs7Result<&[AlgorithmIdentifierOwned]> {
        Ok(&self.digest_algorithms)
    }
}

#[derive(Clone, Debug)]
pub struct EnvelopedContent {
    pub(crate) envelope: Envelope,
}

impl Default for EnvelopedContent {
    fn default() -> Self {
        Self {
            envelope: Envelope::new(PKCS7_ENVELOPED_VERSION),
        }
    }
}

impl EnvelopedContent {
    #[must_use]
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }
}

impl Pkcs7Content for EnvelopedContent {
    fn content_type(&self) -> ContentType {
        ContentType::Enveloped
    }
    fn set_cipher(&mut self, cipher: CipherSpec) -> Pkcs7Result<()> {
        self.envelope.set_cipher(cipher);
        Ok(())
    }
    fn cipher(&self) -> Pkcs7Result<Option<&CipherSpec>> {
        Ok(self.envelope.cipher())
    }
    fn add_recipient_info(&mut self, recipient: RecipientInfo) -> Pkcs7Result<()> {
        self.envelope.add_recipient_info(recipient);
        Ok(())
    }
    fn recipient_infos(&self) -> Pkcs7Result<&[RecipientInfo]> {
        Ok(self.envelope.recipient_infos())
    }
}

#[derive(Clone, Debug)]
pub struct SignedAndEnvelopedContent {
    pub(crate) envelope: Envelope,
    pub(crate) digest_algorithms: Vec<AlgorithmIdentifierOwned>,
    pub(crate) certificates: Vec<Certificate>,
    pub(crate) crls: Vec<Crl>,
    pub(crate) signer_infos: Vec<SignerInfo>,
}

impl Default for SignedAndEnvelopedContent {
    fn default() -> Self {
        Self {
            envelope: Envelope::new(PKCS7_SIGNED_AND_ENVELOPED_VERSION),
            digest_algorithms: Vec::new(),
            certificates: Vec::new(),
            crls: Vec::new(),
            signer_infos: Vec::new(),
        }
    }
}

impl SignedAndEnvelopedContent {
    #[must_use]
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }
}

impl Pkcs7Content for SignedAndEnvelopedContent {
    fn content_type(&self) -> ContentType {
        ContentType::SignedAndEnveloped
    }
    fn set_cipher(&mut self, cipher: CipherSpec) -> Pkcs7Result<()> {
        self.envelope.set_cipher(cipher);
        Ok(())
    }
    fn cipher(&self) -> Pkcs7Result<Option<&CipherSpec>> {
        Ok(self.envelope.cipher())
    }
    fn add_recipient_info(&mut self, recipient: RecipientInfo) -> Pkcs7Result<()> {
        self.envelope.add_recipient_info(recipient);
        Ok(())
    }
    fn recipient_infos(&self) -> Pkcs7Result<&[RecipientInfo]> {
        Ok(self.envelope.recipient_infos())
    }
    fn add_signer(&mut self, signer: SignerInfo) -> Pkcs7Result<()> {
        push_signer(&mut self.digest_algorithms, &mut self.signer_infos, signer);
        Ok(())
    }
    fn signer_infos(&self) -> Pkcs7Result<&[SignerInfo]> {
        Ok(&self.signer_infos)
    }
    fn signer_infos_mut(&mut self) -> Pkcs7Result<&mut [SignerInfo]> {
        Ok(&mut self.signer_infos)
    }
    fn add_certificate(&mut self, cert: Certificate) -> Pkcs7Result<()> {
        self.certificates.push(cert);
        Ok(())
    }
    fn certificates(&self) -> Pkcs7Result<&[Certificate]> {
        Ok(&self.certificates)
    }
    fn add_crl(&mut self, crl: Crl) -> Pkcs7Result<()> {
        self.crls.push(crl);
        Ok(())
    }
    fn crls(&self) -> Pkcs7Result<&[Crl]> {
        Ok(&self.crls)
    }
    fn digest_algorithms(&self) -> Pkcs7Result<&[AlgorithmIdentifierOwned]> {
        Ok(&self.digest_algorithms)
    }
}

#[derive(Clone, Debug)]
pub struct DigestedContent {
    pub(crate) version: u8,
    pub(crate) digest_algorithm: AlgorithmIdentifierOwned,
    pub(crate) contents: EncapsulatedContent,
    pub(crate) digest: Option<Vec<u8>>,
}

impl DigestedContent {
    #[must_use]
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self {
            version: PKCS7_DIGESTED_VERSION,
            digest_algorithm: algorithm.algorithm_identifier(),
            contents: EncapsulatedContent::data(),
            digest: None,
        }
    }

    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }
    #[must_use]
    pub fn digest_algorithm(&self) -> &AlgorithmIdentifierOwned {
        &self.digest_algorithm
    }
    #[must_use]
    pub fn contents(&self) -> &EncapsulatedContent {
        &self.contents
    }
    #[must_use]
    pub fn digest(&self) -> Option<&[u8]> {
        self.digest.as_deref()
    }
}

impl Pkcs7Content for DigestedContent {
    fn content_type(&self) -> ContentType {
        ContentType::Digested
    }
    fn digest_algorithms(&self) -> Pkcs7Result<&[AlgorithmIdentifierOwned]> {
        Ok(std::slice::from_ref(&self.digest_algorithm))
    }
}

/// The concrete variant held by a message.
#[derive(Clone, Debug)]
pub enum MessageContent {
    Signed(SignedContent),
    Enveloped(EnvelopedContent),
    SignedAndEnveloped(SignedAndEnvelopedContent),
    Digested(DigestedContent),
}

impl MessageContent {
    #[must_use]
    pub fn as_content(&self) -> &dyn Pkcs7Content {
        match self {
            MessageContent::Signed(c) => c,
            MessageContent::Enveloped(c) => c,
            MessageContent::SignedAndEnveloped(c) => c,
            MessageContent::Digested(c) => c,
        }
    }

    pub fn as_content_mut(&mut self) -> &mut dyn Pkcs7Content {
        match self {
            MessageContent::Signed(c) => c,
            MessageContent::Enveloped(c) => c,
            MessageContent::SignedAndEnveloped(c) => c,
            MessageContent::Digested(c) => c,
        }
    }

    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.as_content().content_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_report_unsupported() {
        let mut digested = DigestedContent::new(DigestAlgorithm::Sha256);
        let err = digested.signer_infos().unwrap_err();
        assert!(matches!(
            err,
            Pkcs7Error::UnsupportedOperation { ref target, ref operation }
                if target == "pkcs7-digestData" && operation == "signer_infos"
        ));
        assert!(digested
            .set_cipher(CipherSpec::new(crate::domain::crypto::CipherAlgorithm::Aes128Cbc))
            .is_err());
        assert_eq!(digested.digest_algorithms().unwrap().len(), 1);
    }

    #[test]
    fn signed_has_no_recipients() {
        let signed = SignedContent::default();
        assert!(matches!(
            signed.recipient_infos(),
            Err(Pkcs7Error::UnsupportedOperation { .. })
        ));
        assert!(signed.signer_infos().unwrap().is_empty());
    }

    #[test]
    fn content_type_names_come_from_registry() {
        assert_eq!(ContentType::Signed.name(), "pkcs7-signedData");
        assert_eq!(ContentType::from_oid(&OID_PKCS7_ENVELOPED), Some(ContentType::Enveloped));
    }
}
