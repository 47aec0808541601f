//! Bridge between the message model and its DER encoding.

use der::asn1::{Any, OctetString};
use der::{Decode, Encode};

use crate::domain::constants::OID_PKCS7_DATA;
use crate::domain::crypto::{Certificate, Crl};
use crate::domain::pkcs7::asn1::{
    ContentInfoAsn1, DigestedDataAsn1, EncryptedContentInfoAsn1, EnvelopedDataAsn1,
    OrderedSetOf, RecipientInfoAsn1, SignedAndEnvelopedDataAsn1, SignedDataAsn1, SignerInfoAsn1,
};
use crate::domain::pkcs7::attributes::{from_any, to_any};
use crate::domain::pkcs7::{
    AttributeSet, ContentState, ContentType, DigestedContent, EncapsulatedContent,
    EncryptedContent, Envelope, EnvelopedContent, MessageContent, Pkcs7, RecipientInfo,
    SignedContent, SignerInfo,
};
use crate::infra::error::{Pkcs7Error, Pkcs7Result};

fn octets(bytes: &[u8]) -> Pkcs7Result<OctetString> {
    Ok(OctetString::new(bytes)?)
}

/// Decode `T` from an `Any`, reporting failures as malformed input.
fn decode_any<T>(any: &Any, what: &str) -> Pkcs7Result<T>
where
    T: for<'b> Decode<'b>,
{
    from_any(any).map_err(|e| Pkcs7Error::malformed(format!("invalid {what}: {e}")))
}

fn optional_set<T: Clone>(items: &[T]) -> Option<OrderedSetOf<T>> {
    (!items.is_empty()).then(|| OrderedSetOf(items.to_vec()))
}

impl EncapsulatedContent {
    pub(crate) fn to_asn1(&self) -> Pkcs7Result<ContentInfoAsn1> {
        let content = match (self.bytes(), self.other()) {
            (Some(data), _) => Some(to_any(&octets(data)?)?),
            (None, Some(other)) => Some(other.clone()),
            (None, None) => None,
        };
        Ok(ContentInfoAsn1 {
            content_type: self.content_type(),
            content,
        })
    }

    pub(crate) fn from_asn1(ci: &ContentInfoAsn1) -> Pkcs7Result<Self> {
        match &ci.content {
            Some(any) if ci.content_type == OID_PKCS7_DATA => {
                let data: OctetString = decode_any(any, "data content")?;
                Ok(Self::from_parts(
                    ci.content_type,
                    Some(data.as_bytes().to_vec()),
                    None,
                ))
            }
            Some(any) => Ok(Self::from_parts(ci.content_type, None, Some(any.clone()))),
            None => Ok(Self::from_parts(ci.content_type, None, None)),
        }
    }
}

impl SignerInfo {
    pub(crate) fn to_asn1(&self) -> Pkcs7Result<SignerInfoAsn1> {
        let signature = self.signature().ok_or_else(|| {
            Pkcs7Error::IncompleteMessage(format!(
                "signer {} has not been signed; finalize the message first",
                self.issuer()
            ))
        })?;
        Ok(SignerInfoAsn1 {
            version: self.version(),
            issuer_and_serial_number: self.issuer_and_serial().clone(),
            digest_algorithm: self.digest_algorithm().clone(),
            authenticated_attributes: self.signed_attributes().to_asn1()?,
            digest_encryption_algorithm: self.digest_encryption_algorithm().clone(),
            encrypted_digest: octets(signature)?,
            unauthenticated_attributes: self.unsigned_attributes().to_asn1()?,
        })
    }

    pub(crate) fn from_asn1(asn1: SignerInfoAsn1) -> Pkcs7Result<Self> {
        Ok(Self::from_parts(
            asn1.version,
            asn1.issuer_and_serial_number,
            asn1.digest_algorithm,
            AttributeSet::from_asn1(asn1.authenticated_attributes.as_ref())?,
            asn1.digest_encryption_algorithm,
            asn1.encrypted_digest.as_bytes().to_vec(),
            AttributeSet::from_asn1(asn1.unauthenticated_attributes.as_ref())?,
        ))
    }
}

impl RecipientInfo {
    pub(crate) fn to_asn1(&self) -> Pkcs7Result<RecipientInfoAsn1> {
        let key = self.encrypted_key().ok_or_else(|| {
            Pkcs7Error::IncompleteMessage(format!(
                "content key has not been wrapped for {}; finalize the message first",
                self.issuer()
            ))
        })?;
        Ok(RecipientInfoAsn1 {
            version: self.version(),
            issuer_and_serial_number: self.issuer_and_serial().clone(),
            key_encryption_algorithm: self.key_encryption_algorithm().clone(),
            encrypted_key: octets(key)?,
        })
    }

    pub(crate) fn from_asn1(asn1: RecipientInfoAsn1) -> Self {
        Self::from_parts(
            asn1.version,
            asn1.issuer_and_serial_number,
            asn1.key_encryption_algorithm,
            asn1.encrypted_key.as_bytes().to_vec(),
        )
    }
}

impl Envelope {
    fn recipients_to_asn1(&self) -> Pkcs7Result<OrderedSetOf<RecipientInfoAsn1>> {
        self.recipient_infos()
            .iter()
            .map(RecipientInfo::to_asn1)
            .collect::<Pkcs7Result<Vec<_>>>()
            .map(OrderedSetOf)
    }

    fn encrypted_content_to_asn1(&self) -> Pkcs7Result<EncryptedContentInfoAsn1> {
        let encrypted = self.encrypted_content();
        let algorithm = encrypted.algorithm().ok_or_else(|| {
            Pkcs7Error::IncompleteMessage(
                "content has not been encrypted; finalize the message first".into(),
            )
        })?;
        Ok(EncryptedContentInfoAsn1 {
            content_type: encrypted.content_type(),
            content_encryption_algorithm: algorithm.clone(),
            encrypted_content: encrypted.ciphertext().map(octets).transpose()?,
        })
    }

    fn from_asn1(
        version: u8,
        recipients: OrderedSetOf<RecipientInfoAsn1>,
        encrypted: EncryptedContentInfoAsn1,
    ) -> Self {
        Envelope::from_parts(
            version,
            recipients
                .into_vec()
                .into_iter()
                .map(RecipientInfo::from_asn1)
                .collect(),
            EncryptedContent::from_parts(
                encrypted.content_type,
                encrypted.content_encryption_algorithm,
                encrypted
                    .encrypted_content
                    .map(|octets| octets.as_bytes().to_vec()),
            ),
        )
    }
}

fn signer_infos_to_asn1(signers: &[SignerInfo]) -> Pkcs7Result<OrderedSetOf<SignerInfoAsn1>> {
    signers
        .iter()
        .map(SignerInfo::to_asn1)
        .collect::<Pkcs7Result<Vec<_>>>()
        .map(OrderedSetOf)
}

fn signer_infos_from_asn1(set: OrderedSetOf<SignerInfoAsn1>) -> Pkcs7Result<Vec<SignerInfo>> {
    set.into_vec().into_iter().map(SignerInfo::from_asn1).collect()
}

fn certificates_from_asn1(
    set: Option<OrderedSetOf<x509_cert::Certificate>>,
) -> Pkcs7Result<Vec<Certificate>> {
    set.map(OrderedSetOf::into_vec)
        .unwrap_or_default()
        .into_iter()
        .map(Certificate::from_parsed)
        .collect()
}

fn crls_from_asn1(set: Option<OrderedSetOf<Any>>) -> Pkcs7Result<Vec<Crl>> {
    set.map(OrderedSetOf::into_vec)
        .unwrap_or_default()
        .into_iter()
        .map(|any| {
            Crl::from_der(&any.to_der()?)
                .map_err(|e| Pkcs7Error::malformed(format!("invalid CRL: {e}")))
        })
        .collect()
}

fn parsed_certificates(certs: &[Certificate]) -> Vec<x509_cert::Certificate> {
    certs.iter().map(|c| c.parsed().clone()).collect()
}

fn encoded_crls(crls: &[Crl]) -> Pkcs7Result<Vec<Any>> {
    crls.iter()
        .map(|c| Ok(Any::from_der(c.as_der())?))
        .collect()
}

impl Pkcs7 {
    /// Structured (pre-DER) form of the message.
    ///
    /// # Errors
    /// `IncompleteMessage` when signatures, wrapped keys, ciphertext or the
    /// digest have not been produced yet.
    pub fn as_asn1(&self) -> Pkcs7Result<ContentInfoAsn1> {
        let content = match self.content() {
            MessageContent::Signed(c) => to_any(&SignedDataAsn1 {
                version: c.version,
                digest_algorithms: OrderedSetOf(c.digest_algorithms.clone()),
                content_info: c.contents.to_asn1()?,
                certificates: optional_set(&parsed_certificates(&c.certificates)),
                crls: optional_set(&encoded_crls(&c.crls)?),
                signer_infos: signer_infos_to_asn1(&c.signer_infos)?,
            })?,
            MessageContent::Enveloped(c) => to_any(&EnvelopedDataAsn1 {
                version: c.envelope.version(),
                recipient_infos: c.envelope.recipients_to_asn1()?,
                encrypted_content_info: c.envelope.encrypted_content_to_asn1()?,
            })?,
            MessageContent::SignedAndEnveloped(c) => to_any(&SignedAndEnvelopedDataAsn1 {
                version: c.envelope.version(),
                recipient_infos: c.envelope.recipients_to_asn1()?,
                digest_algorithms: OrderedSetOf(c.digest_algorithms.clone()),
                encrypted_content_info: c.envelope.encrypted_content_to_asn1()?,
                certificates: optional_set(&parsed_certificates(&c.certificates)),
                crls: optional_set(&encoded_crls(&c.crls)?),
                signer_infos: signer_infos_to_asn1(&c.signer_infos)?,
            })?,
            MessageContent::Digested(c) => {
                let digest = c.digest.as_deref().ok_or_else(|| {
                    Pkcs7Error::IncompleteMessage(
                        "digest has not been computed; finalize the message first".into(),
                    )
                })?;
                to_any(&DigestedDataAsn1 {
                    version: c.version,
                    digest_algorithm: c.digest_algorithm.clone(),
                    content_info: c.contents.to_asn1()?,
                    digest: octets(digest)?,
                })?
            }
        };
        Ok(ContentInfoAsn1 {
            content_type: self.content_type().oid(),
            content: Some(content),
        })
    }

    pub fn to_der(&self) -> Pkcs7Result<Vec<u8>> {
        Ok(self.as_asn1()?.to_der()?)
    }

    /// Rebuild a message from its structured form.
    ///
    /// # Errors
    /// `MalformedMessage` for structural violations, `UnsupportedOperation`
    /// for `signedAndEnvelopedData` and content types the engine does not
    /// model.
    pub fn from_asn1(ci: ContentInfoAsn1) -> Pkcs7Result<Self> {
        let content_type = ContentType::from_oid(&ci.content_type).ok_or_else(|| {
            Pkcs7Error::unsupported(
                crate::domain::registry::name_for_oid(&ci.content_type),
                "from_asn1",
            )
        })?;
        let any = ci.content.as_ref().ok_or_else(|| {
            Pkcs7Error::malformed(format!("{content_type} ContentInfo has no content"))
        })?;

        let message = match content_type {
            ContentType::Signed => {
                let sd: SignedDataAsn1 = decode_any(any, "SignedData")?;
                let contents = EncapsulatedContent::from_asn1(&sd.content_info)?;
                let detached = !contents.is_present();
                let mut p7 = Pkcs7::from_content(
                    MessageContent::Signed(SignedContent {
                        version: sd.version,
                        digest_algorithms: sd.digest_algorithms.into_vec(),
                        contents,
                        certificates: certificates_from_asn1(sd.certificates)?,
                        crls: crls_from_asn1(sd.crls)?,
                        signer_infos: signer_infos_from_asn1(sd.signer_infos)?,
                    }),
                    ContentState::Populated,
                );
                p7.mark_detached(detached);
                p7
            }
            ContentType::Enveloped => {
                let ed: EnvelopedDataAsn1 = decode_any(any, "EnvelopedData")?;
                Pkcs7::from_content(
                    MessageContent::Enveloped(EnvelopedContent {
                        envelope: Envelope::from_asn1(
                            ed.version,
                            ed.recipient_infos,
                            ed.encrypted_content_info,
                        ),
                    }),
                    ContentState::Populated,
                )
            }
            ContentType::Digested => {
                let dd: DigestedDataAsn1 = decode_any(any, "DigestedData")?;
                let contents = EncapsulatedContent::from_asn1(&dd.content_info)?;
                let detached = !contents.is_present();
                let mut p7 = Pkcs7::from_content(
                    MessageContent::Digested(DigestedContent {
                        version: dd.version,
                        digest_algorithm: dd.digest_algorithm,
                        contents,
                        digest: Some(dd.digest.as_bytes().to_vec()),
                    }),
                    ContentState::Populated,
                );
                p7.mark_detached(detached);
                p7
            }
            ContentType::SignedAndEnveloped | ContentType::Data | ContentType::Encrypted => {
                return Err(Pkcs7Error::unsupported(content_type.name(), "from_asn1"))
            }
        };
        log::debug!("Decoded {} message", message.content_type());
        Ok(message)
    }

    /// Parse a DER-encoded `ContentInfo`.
    pub fn from_der(bytes: &[u8]) -> Pkcs7Result<Self> {
        let ci = ContentInfoAsn1::from_der(bytes)
            .map_err(|e| Pkcs7Error::malformed(format!("invalid PKCS#7 ContentInfo: {e}")))?;
        Self::from_asn1(ci)
    }

    /// Parse DER and require a specific content type.
    ///
    /// # Errors
    /// `TypeMismatch` when the encoded type differs from `expected`.
    pub fn from_der_as(bytes: &[u8], expected: ContentType) -> Pkcs7Result<Self> {
        let ci = ContentInfoAsn1::from_der(bytes)
            .map_err(|e| Pkcs7Error::malformed(format!("invalid PKCS#7 ContentInfo: {e}")))?;
        if ci.content_type != expected.oid() {
            return Err(Pkcs7Error::TypeMismatch {
                expected: expected.name(),
                found: crate::domain::registry::name_for_oid(&ci.content_type),
            });
        }
        Self::from_asn1(ci)
    }
}

/// Signed-and-enveloped structures can still be decoded structurally, for
/// inspection, even though they cannot be rebuilt into a message.
pub fn decode_signed_and_enveloped(bytes: &[u8]) -> Pkcs7Result<SignedAndEnvelopedDataAsn1> {
    let ci = ContentInfoAsn1::from_der(bytes)
        .map_err(|e| Pkcs7Error::malformed(format!("invalid PKCS#7 ContentInfo: {e}")))?;
    if ci.content_type != ContentType::SignedAndEnveloped.oid() {
        return Err(Pkcs7Error::TypeMismatch {
            expected: ContentType::SignedAndEnveloped.name(),
            found: crate::domain::registry::name_for_oid(&ci.content_type),
        });
    }
    let any = ci
        .content
        .as_ref()
        .ok_or_else(|| Pkcs7Error::malformed("SignedAndEnvelopedData has no content"))?;
    decode_any(any, "SignedAndEnvelopedData")
}
