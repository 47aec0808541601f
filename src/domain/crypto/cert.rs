use std::fmt;

use der::asn1::BitString;
use der::{Decode, Encode, Sequence};
use openssl::pkey::{PKey, Public};
use openssl::x509::X509;
use x509_cert::crl::RevokedCert;
use x509_cert::ext::Extensions;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::AlgorithmIdentifierOwned;
use x509_cert::time::Time;

use crate::domain::pkcs7::asn1::IssuerAndSerialNumber;
use crate::infra::error::{Pkcs7Error, Pkcs7Result};

/// X.509 certificate, kept both as the original DER and in parsed form.
#[derive(Clone)]
pub struct Certificate {
    der: Box<[u8]>,
    parsed: x509_cert::Certificate,
}

/// `TBSCertList` with the version made optional, so v1 lists (which omit
/// it) decode as well as v2 ones.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct TbsCrl {
    #[asn1(optional = "true")]
    version: Option<u8>,
    signature: AlgorithmIdentifierOwned,
    issuer: Name,
    this_update: Time,
    #[asn1(optional = "true")]
    next_update: Option<Time>,
    #[asn1(optional = "true")]
    revoked_certificates: Option<Vec<RevokedCert>>,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    crl_extensions: Option<Extensions>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct SignedCrl {
    tbs_cert_list: TbsCrl,
    signature_algorithm: AlgorithmIdentifierOwned,
    signature: BitString,
}

/// X.509 certificate revocation list, v1 or v2. The original DER is kept
/// verbatim so re-encoding a decoded message is byte-stable.
#[derive(Clone)]
pub struct Crl {
    der: Box<[u8]>,
    parsed: SignedCrl,
}

impl Certificate {
    pub fn from_der(der: &[u8]) -> Pkcs7Result<Self> {
        let parsed = x509_cert::Certificate::from_der(der)
            .map_err(|e| Pkcs7Error::CertificateError(format!("invalid certificate DER: {e}")))?;
        Ok(Self {
            der: der.into(),
            parsed,
        })
    }

    pub fn from_pem(pem: &[u8]) -> Pkcs7Result<Self> {
        let x509 = X509::from_pem(pem)
            .map_err(|e| Pkcs7Error::CertificateError(format!("invalid certificate PEM: {e}")))?;
        Self::from_x509(&x509)
    }

    pub fn from_x509(x509: &X509) -> Pkcs7Result<Self> {
        Self::from_der(&x509.to_der()?)
    }

    pub(crate) fn from_parsed(parsed: x509_cert::Certificate) -> Pkcs7Result<Self> {
        let der = parsed.to_der()?;
        Ok(Self {
            der: der.into_boxed_slice(),
            parsed,
        })
    }

    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }
    #[must_use]
    pub fn parsed(&self) -> &x509_cert::Certificate {
        &self.parsed
    }
    #[must_use]
    pub fn issuer(&self) -> &Name {
        &self.parsed.tbs_certificate.issuer
    }
    #[must_use]
    pub fn subject(&self) -> &Name {
        &self.parsed.tbs_certificate.subject
    }
    #[must_use]
    pub fn serial_number(&self) -> &SerialNumber {
        &self.parsed.tbs_certificate.serial_number
    }

    #[must_use]
    pub fn issuer_and_serial(&self) -> IssuerAndSerialNumber {
        IssuerAndSerialNumber {
            issuer: self.issuer().clone(),
            serial_number: self.serial_number().clone(),
        }
    }

    /// Structural match on issuer name and serial number.
    #[must_use]
    pub fn matches(&self, reference: &IssuerAndSerialNumber) -> bool {
        self.issuer() == &reference.issuer && self.serial_number() == &reference.serial_number
    }

    pub fn to_x509(&self) -> Pkcs7Result<X509> {
        X509::from_der(&self.der)
            .map_err(|e| Pkcs7Error::CertificateError(format!("OpenSSL rejected certificate: {e}")))
    }

    pub fn public_key(&self) -> Pkcs7Result<PKey<Public>> {
        self.to_x509()?
            .public_key()
            .map_err(|e| Pkcs7Error::CertificateError(format!("unusable public key: {e}")))
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}
impl Eq for Certificate {}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Certificate(subject={}, serial={}, len={})",
            self.subject(),
            hex::encode(self.serial_number().as_bytes()),
            self.der.len()
        )
    }
}

impl Crl {
    pub fn from_der(der: &[u8]) -> Pkcs7Result<Self> {
        let parsed = SignedCrl::from_der(der)
            .map_err(|e| Pkcs7Error::CertificateError(format!("invalid CRL DER: {e}")))?;
        Ok(Self {
            der: der.into(),
            parsed,
        })
    }

    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Structure version: 1 when the list omits the field, otherwise the
    /// encoded value plus one.
    #[must_use]
    pub fn version(&self) -> u8 {
        self.parsed
            .tbs_cert_list
            .version
            .map_or(1, |v| v.saturating_add(1))
    }
    #[must_use]
    pub fn issuer(&self) -> &Name {
        &self.parsed.tbs_cert_list.issuer
    }
    #[must_use]
    pub fn this_update(&self) -> &Time {
        &self.parsed.tbs_cert_list.this_update
    }
    #[must_use]
    pub fn next_update(&self) -> Option<&Time> {
        self.parsed.tbs_cert_list.next_update.as_ref()
    }
    #[must_use]
    pub fn revoked_count(&self) -> usize {
        self.parsed
            .tbs_cert_list
            .revoked_certificates
            .as_ref()
            .map_or(0, Vec::len)
    }
}

impl PartialEq for Crl {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}
impl Eq for Crl {}

impl fmt::Debug for Crl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Crl(issuer={}, len={})", self.issuer(), self.der.len())
    }
}

/// Resolves a certificate from an issuer/serial reference.
pub trait CertificateLookup {
    fn find_by_issuer_and_serial(&self, reference: &IssuerAndSerialNumber) -> Option<&Certificate>;
}

impl CertificateLookup for [Certificate] {
    fn find_by_issuer_and_serial(&self, reference: &IssuerAndSerialNumber) -> Option<&Certificate> {
        self.iter().find(|cert| cert.matches(reference))
    }
}

impl CertificateLookup for Vec<Certificate> {
    fn find_by_issuer_and_serial(&self, reference: &IssuerAndSerialNumber) -> Option<&Certificate> {
        self.as_slice().find_by_issuer_and_serial(reference)
    }
}
