//! Error types for PKCS#7 message construction, parsing and streaming.

use thiserror::Error;

/// Result type for engine operations
pub type Pkcs7Result<T> = Result<T, Pkcs7Error>;

/// Error taxonomy shared by every layer of the engine.
///
/// Stream failures from a wrapped transport surface as [`Pkcs7Error::Io`] with the
/// original `std::io::Error` intact; malformed base64 is reported separately as
/// [`Pkcs7Error::Base64`] so callers can tell a broken stream from bad data.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum Pkcs7Error {
    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Content type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Incomplete message: {0}")]
    IncompleteMessage(String),

    #[error("No recipient info matches certificate: {0}")]
    RecipientNotFound(String),

    #[error("Operation '{operation}' is not supported for {target}")]
    UnsupportedOperation { target: String, operation: String },

    #[error("Stream I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed base64 data: {0}")]
    Base64(String),

    #[error("Cryptographic error: {0}")]
    CryptographicError(String),

    #[error("Certificate error: {0}")]
    CertificateError(String),

    #[error("Signature verification failed: {0}")]
    VerificationFailed(String),

    #[error("ASN.1 encoding error: {0}")]
    Asn1Error(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Pkcs7Error {
    /// Shorthand for [`Pkcs7Error::UnsupportedOperation`].
    pub fn unsupported(target: impl Into<String>, operation: impl Into<String>) -> Self {
        Pkcs7Error::UnsupportedOperation {
            target: target.into(),
            operation: operation.into(),
        }
    }

    /// Wrap a DER decoding failure as a structural violation.
    pub fn malformed(error: impl std::fmt::Display) -> Self {
        Pkcs7Error::MalformedMessage(error.to_string())
    }
}

impl From<der::Error> for Pkcs7Error {
    fn from(error: der::Error) -> Self {
        Pkcs7Error::Asn1Error(error.to_string())
    }
}

impl From<openssl::error::ErrorStack> for Pkcs7Error {
    fn from(error: openssl::error::ErrorStack) -> Self {
        Pkcs7Error::CryptographicError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = Pkcs7Error::UnknownAlgorithm("1.2.3.4".to_string());
        assert_eq!(error.to_string(), "Unknown algorithm: 1.2.3.4");

        let error = Pkcs7Error::unsupported("signedAndEnvelopedData", "from_der");
        assert_eq!(
            error.to_string(),
            "Operation 'from_der' is not supported for signedAndEnvelopedData"
        );
    }

    #[test]
    fn test_io_error_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let error: Pkcs7Error = io.into();
        match error {
            Pkcs7Error::Io(inner) => assert_eq!(inner.kind(), std::io::ErrorKind::BrokenPipe),
            other => panic!("Wrong error type: {other:?}"),
        }
    }
}
