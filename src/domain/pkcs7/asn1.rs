//! RFC 2315 ASN.1 schema.
//!
//! These are the wire structures only; the editable message model lives in
//! the sibling modules and converts to/from these in `services::codec`.
//!
//! `SET OF` collections of signer infos, recipient infos, digest algorithms,
//! certificates and CRLs use [`OrderedSetOf`], which keeps insertion order
//! instead of sorting by encoding. CRLs stay as raw `Any` elements so that
//! v1 lists, which `x509_cert` cannot represent, pass through unchanged. Authenticated attributes are the
//! exception: they are signed over, so they use a DER-sorted `SetOfVec`.

use der::asn1::{Any, ObjectIdentifier, OctetString, SetOfVec};
use der::{
    Decode, DecodeValue, Encode, EncodeValue, FixedTag, Header, Length, Reader, Sequence, Tag,
    Writer,
};
use x509_cert::attr::Attribute;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::AlgorithmIdentifierOwned;
use x509_cert::Certificate;

/// `SET OF T` encoded in the order the elements were added.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderedSetOf<T>(pub Vec<T>);

impl<T> OrderedSetOf<T> {
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.0
    }
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.0
    }
}

impl<T> From<Vec<T>> for OrderedSetOf<T> {
    fn from(items: Vec<T>) -> Self {
        Self(items)
    }
}

impl<'a, T> DecodeValue<'a> for OrderedSetOf<T>
where
    T: Decode<'a>,
{
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            let mut items = Vec::new();
            while !reader.is_finished() {
                items.push(T::decode(reader)?);
            }
            Ok(Self(items))
        })
    }
}

impl<T> EncodeValue for OrderedSetOf<T>
where
    T: Encode,
{
    fn value_len(&self) -> der::Result<Length> {
        self.0
            .iter()
            .try_fold(Length::ZERO, |len, item| len + item.encoded_len()?)
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        for item in &self.0 {
            item.encode(writer)?;
        }
        Ok(())
    }
}

impl<T> FixedTag for OrderedSetOf<T> {
    const TAG: Tag = Tag::Set;
}

/// ```text
/// ContentInfo ::= SEQUENCE {
///   contentType ContentType,
///   content [0] EXPLICIT ANY DEFINED BY contentType OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct ContentInfoAsn1 {
    pub content_type: ObjectIdentifier,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    pub content: Option<Any>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct IssuerAndSerialNumber {
    pub issuer: Name,
    pub serial_number: SerialNumber,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SignerInfoAsn1 {
    pub version: u8,
    pub issuer_and_serial_number: IssuerAndSerialNumber,
    pub digest_algorithm: AlgorithmIdentifierOwned,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    pub authenticated_attributes: Option<SetOfVec<Attribute>>,
    pub digest_encryption_algorithm: AlgorithmIdentifierOwned,
    pub encrypted_digest: OctetString,
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    pub unauthenticated_attributes: Option<SetOfVec<Attribute>>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SignedDataAsn1 {
    pub version: u8,
    pub digest_algorithms: OrderedSetOf<AlgorithmIdentifierOwned>,
    pub content_info: ContentInfoAsn1,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    pub certificates: Option<OrderedSetOf<Certificate>>,
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    pub crls: Option<OrderedSetOf<Any>>,
    pub signer_infos: OrderedSetOf<SignerInfoAsn1>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct RecipientInfoAsn1 {
    pub version: u8,
    pub issuer_and_serial_number: IssuerAndSerialNumber,
    pub key_encryption_algorithm: AlgorithmIdentifierOwned,
    pub encrypted_key: OctetString,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct EncryptedContentInfoAsn1 {
    pub content_type: ObjectIdentifier,
    pub content_encryption_algorithm: AlgorithmIdentifierOwned,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    pub encrypted_content: Option<OctetString>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct EnvelopedDataAsn1 {
    pub version: u8,
    pub recipient_infos: OrderedSetOf<RecipientInfoAsn1>,
    pub encrypted_content_info: EncryptedContentInfoAsn1,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SignedAndEnvelopedDataAsn1 {
    pub version: u8,
    pub recipient_infos: OrderedSetOf<RecipientInfoAsn1>,
    pub digest_algorithms: OrderedSetOf<AlgorithmIdentifierOwned>,
    pub encrypted_content_info: EncryptedContentInfoAsn1,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    pub certificates: Option<OrderedSetOf<Certificate>>,
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    pub crls: Option<OrderedSetOf<Any>>,
    pub signer_infos: OrderedSetOf<SignerInfoAsn1>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct DigestedDataAsn1 {
    pub version: u8,
    pub digest_algorithm: AlgorithmIdentifierOwned,
    pub content_info: ContentInfoAsn1,
    pub digest: OctetString,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_set_keeps_insertion_order() {
        let set = OrderedSetOf(vec![
            OctetString::new(vec![0x09]).unwrap(),
            OctetString::new(vec![0x01]).unwrap(),
        ]);
        let der = set.to_der().unwrap();
        assert_eq!(der, vec![0x31, 0x06, 0x04, 0x01, 0x09, 0x04, 0x01, 0x01]);
        let decoded = OrderedSetOf::<OctetString>::from_der(&der).unwrap();
        assert_eq!(decoded, set);
    }

    #[test]
    fn empty_content_info_omits_explicit_tag() {
        let ci = ContentInfoAsn1 {
            content_type: crate::domain::constants::OID_PKCS7_DATA,
            content: None,
        };
        let der = ci.to_der().unwrap();
        assert_eq!(ContentInfoAsn1::from_der(&der).unwrap(), ci);
        assert_eq!(der.len(), 2 + 11);
    }
}
