//! Authenticated / unauthenticated attribute model.
//!
//! An [`AttributeSet`] keeps at most one attribute per type; adding a second
//! attribute of the same type replaces the first in place. Sets keep their
//! insertion order in memory, while the signed encoding (`canonical_der`)
//! is DER-sorted as the signature requires.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::SystemTime;

use der::asn1::{Any, GeneralizedTime, ObjectIdentifier, OctetString, SetOfVec, UtcTime};
use der::{Decode, Encode, Tag, Tagged};
use x509_cert::attr::Attribute as Asn1Attribute;
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::domain::constants::{
    OID_PKCS9_CONTENT_TYPE, OID_PKCS9_MESSAGE_DIGEST, OID_PKCS9_SIGNING_TIME,
    OID_SMIME_CAPABILITIES,
};
use crate::domain::registry;
use crate::infra::error::{Pkcs7Error, Pkcs7Result};

/// Encode a value as a standalone `Any`.
pub(crate) fn to_any<T: Encode>(value: &T) -> Pkcs7Result<Any> {
    Ok(Any::from_der(&value.to_der()?)?)
}

/// Decode a typed value out of an `Any`.
pub(crate) fn from_any<T>(any: &Any) -> Pkcs7Result<T>
where
    T: for<'b> Decode<'b>,
{
    Ok(T::from_der(&any.to_der()?)?)
}

/// Equality and hashing look at the type and the values only; whether the
/// attribute was built single- or multi-valued does not count.
#[derive(Clone)]
pub struct Attribute {
    type_id: ObjectIdentifier,
    values: Vec<Any>,
    single_valued: bool,
}

impl Attribute {
    /// Single-valued attribute holding an already-encoded value.
    #[must_use]
    pub fn create(type_id: ObjectIdentifier, value: Any) -> Self {
        Self {
            type_id,
            values: vec![value],
            single_valued: true,
        }
    }

    /// Single-valued attribute holding `value` in its natural ASN.1 type.
    pub fn create_from<T: Encode>(type_id: ObjectIdentifier, value: &T) -> Pkcs7Result<Self> {
        Ok(Self::create(type_id, to_any(value)?))
    }

    pub fn multi_valued(type_id: ObjectIdentifier, values: Vec<Any>) -> Pkcs7Result<Self> {
        if values.is_empty() {
            return Err(Pkcs7Error::InvalidInput(format!(
                "attribute {} needs at least one value",
                registry::name_for_oid(&type_id)
            )));
        }
        Ok(Self {
            type_id,
            values,
            single_valued: false,
        })
    }

    pub fn content_type(content_type: ObjectIdentifier) -> Pkcs7Result<Self> {
        Self::create_from(OID_PKCS9_CONTENT_TYPE, &content_type)
    }

    pub fn message_digest(digest: &[u8]) -> Pkcs7Result<Self> {
        Self::create_from(OID_PKCS9_MESSAGE_DIGEST, &OctetString::new(digest)?)
    }

    pub fn signing_time(time: SystemTime) -> Pkcs7Result<Self> {
        let utc = UtcTime::from_system_time(time)
            .map_err(|e| Pkcs7Error::InvalidInput(format!("signing time out of UTCTime range: {e}")))?;
        Self::create_from(OID_PKCS9_SIGNING_TIME, &utc)
    }

    /// `SMIMECapabilities`: preference-ordered list of algorithms.
    pub fn smime_capabilities(capabilities: Vec<AlgorithmIdentifierOwned>) -> Pkcs7Result<Self> {
        Self::create_from(OID_SMIME_CAPABILITIES, &capabilities)
    }

    #[must_use]
    pub fn type_id(&self) -> ObjectIdentifier {
        self.type_id
    }
    #[must_use]
    pub fn type_name(&self) -> String {
        registry::name_for_oid(&self.type_id)
    }
    #[must_use]
    pub fn values(&self) -> &[Any] {
        &self.values
    }
    /// First (for single-valued attributes, the only) value.
    #[must_use]
    pub fn value(&self) -> Option<&Any> {
        self.values.first()
    }
    #[must_use]
    pub fn is_single_valued(&self) -> bool {
        self.single_valued
    }

    pub fn decode_value<T>(&self) -> Pkcs7Result<T>
    where
        T: for<'b> Decode<'b>,
    {
        let value = self.value().ok_or_else(|| {
            Pkcs7Error::malformed(format!("attribute {} has no value", self.type_name()))
        })?;
        from_any(value)
    }

    pub(crate) fn to_asn1(&self) -> Pkcs7Result<Asn1Attribute> {
        let values = SetOfVec::try_from(self.values.clone())?;
        Ok(Asn1Attribute {
            oid: self.type_id,
            values,
        })
    }

    pub(crate) fn from_asn1(attr: &Asn1Attribute) -> Pkcs7Result<Self> {
        let mut values: Vec<Any> = attr.values.iter().cloned().collect();
        match values.len() {
            0 => Err(Pkcs7Error::malformed(format!(
                "attribute {} carries no values",
                registry::name_for_oid(&attr.oid)
            ))),
            1 => Ok(Self::create(attr.oid, values.remove(0))),
            _ => Self::multi_valued(attr.oid, values),
        }
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.values == other.values
    }
}

impl Eq for Attribute {}

impl Hash for Attribute {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.as_bytes().hash(state);
        for value in &self.values {
            u8::from(value.tag()).hash(state);
            value.value().hash(state);
        }
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Attribute(type={}, values={})",
            self.type_name(),
            self.values.len()
        )
    }
}

/// Ordered attribute collection, unique by attribute type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AttributeSet {
    attributes: Vec<Attribute>,
}

impl AttributeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `attribute`, replacing any existing attribute of the same type.
    pub fn add(&mut self, attribute: Attribute) {
        match self
            .attributes
            .iter_mut()
            .find(|existing| existing.type_id == attribute.type_id)
        {
            Some(slot) => *slot = attribute,
            None => self.attributes.push(attribute),
        }
    }

    #[must_use]
    pub fn get(&self, type_id: &ObjectIdentifier) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.type_id == *type_id)
    }

    pub fn remove(&mut self, type_id: &ObjectIdentifier) -> Option<Attribute> {
        let index = self.attributes.iter().position(|a| a.type_id == *type_id)?;
        Some(self.attributes.remove(index))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// `signingTime`, accepting either UTCTime or GeneralizedTime.
    pub fn signing_time(&self) -> Pkcs7Result<Option<SystemTime>> {
        let Some(value) = self.get(&OID_PKCS9_SIGNING_TIME).and_then(Attribute::value) else {
            return Ok(None);
        };
        let time = match value.tag() {
            Tag::UtcTime => from_any::<UtcTime>(value)?.to_system_time(),
            Tag::GeneralizedTime => from_any::<GeneralizedTime>(value)?.to_system_time(),
            other => {
                return Err(Pkcs7Error::malformed(format!(
                    "signingTime has unexpected type {other}"
                )))
            }
        };
        Ok(Some(time))
    }

    /// Raw `messageDigest` octets, if present.
    pub fn message_digest(&self) -> Pkcs7Result<Option<Vec<u8>>> {
        self.get(&OID_PKCS9_MESSAGE_DIGEST)
            .map(|attr| {
                attr.decode_value::<OctetString>()
                    .map(|octets| octets.as_bytes().to_vec())
            })
            .transpose()
    }

    pub fn content_type(&self) -> Pkcs7Result<Option<ObjectIdentifier>> {
        self.get(&OID_PKCS9_CONTENT_TYPE)
            .map(Attribute::decode_value::<ObjectIdentifier>)
            .transpose()
    }

    pub(crate) fn to_asn1(&self) -> Pkcs7Result<Option<SetOfVec<Asn1Attribute>>> {
        if self.attributes.is_empty() {
            return Ok(None);
        }
        let attrs = self
            .attributes
            .iter()
            .map(Attribute::to_asn1)
            .collect::<Pkcs7Result<Vec<_>>>()?;
        Ok(Some(SetOfVec::try_from(attrs)?))
    }

    pub(crate) fn from_asn1(set: Option<&SetOfVec<Asn1Attribute>>) -> Pkcs7Result<Self> {
        let mut out = Self::new();
        if let Some(set) = set {
            for attr in set.iter() {
                if out.get(&attr.oid).is_some() {
                    return Err(Pkcs7Error::malformed(format!(
                        "duplicate attribute {}",
                        registry::name_for_oid(&attr.oid)
                    )));
                }
                out.attributes.push(Attribute::from_asn1(attr)?);
            }
        }
        Ok(out)
    }

    /// DER of the attributes as a universal `SET OF`, which is what gets signed.
    pub fn canonical_der(&self) -> Pkcs7Result<Vec<u8>> {
        match self.to_asn1()? {
            Some(set) => Ok(set.to_der()?),
            None => Ok(SetOfVec::<Asn1Attribute>::new().to_der()?),
        }
    }
}

impl<'a> IntoIterator for &'a AttributeSet {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::OID_PKCS7_DATA;
    use std::collections::hash_map::DefaultHasher;
    use std::time::Duration;

    fn hash_of(attr: &Attribute) -> u64 {
        let mut h = DefaultHasher::new();
        attr.hash(&mut h);
        h.finish()
    }

    #[test]
    fn add_replaces_same_type() {
        let mut set = AttributeSet::new();
        set.add(Attribute::content_type(OID_PKCS7_DATA).unwrap());
        set.add(Attribute::message_digest(&[1, 2, 3]).unwrap());
        set.add(Attribute::message_digest(&[4, 5, 6]).unwrap());
        assert_eq!(set.len(), 2);
        assert_eq!(set.message_digest().unwrap().unwrap(), vec![4, 5, 6]);
        assert_eq!(set.iter().next().unwrap().type_id(), OID_PKCS9_CONTENT_TYPE);
    }

    #[test]
    fn equal_attributes_hash_equal() {
        let a = Attribute::message_digest(&[9; 20]).unwrap();
        let b = Attribute::message_digest(&[9; 20]).unwrap();
        let c = Attribute::message_digest(&[8; 20]).unwrap();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(a, c);
    }

    #[test]
    fn single_and_multi_valued_forms_compare_equal() {
        let single = Attribute::message_digest(&[1, 2, 3]).unwrap();
        let multi =
            Attribute::multi_valued(OID_PKCS9_MESSAGE_DIGEST, single.values().to_vec()).unwrap();
        assert!(single.is_single_valued());
        assert!(!multi.is_single_valued());
        assert_eq!(single, multi);
        assert_eq!(hash_of(&single), hash_of(&multi));

        let back = Attribute::from_asn1(&multi.to_asn1().unwrap()).unwrap();
        assert_eq!(back, multi);
    }

    #[test]
    fn canonical_der_is_sorted_set() {
        let mut set = AttributeSet::new();
        let when = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        set.add(Attribute::signing_time(when).unwrap());
        set.add(Attribute::content_type(OID_PKCS7_DATA).unwrap());
        let der = set.canonical_der().unwrap();
        assert_eq!(der[0], 0x31);
        let back = SetOfVec::<Asn1Attribute>::from_der(&der).unwrap();
        let reparsed = AttributeSet::from_asn1(Some(&back)).unwrap();
        assert_eq!(reparsed.canonical_der().unwrap(), der);
        assert_eq!(reparsed.signing_time().unwrap().unwrap(), when);
    }

    #[test]
    fn multi_valued_requires_values() {
        assert!(Attribute::multi_valued(OID_PKCS9_CONTENT_TYPE, Vec::new()).is_err());
    }
}
