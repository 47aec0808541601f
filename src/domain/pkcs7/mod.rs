//! PKCS#7 message model.
//!
//! - `asn1`: RFC 2315 wire structures
//! - `attributes`: authenticated / unauthenticated attribute sets
//! - `signer_info`, `recipient_info`, `envelope`: per-party records
//! - `content`: the four content variants and their shared operations
//! - `message`: the top-level [`Pkcs7`] handle and its lifecycle

pub mod asn1;
pub mod attributes;
pub mod content;
pub mod envelope;
pub mod message;
pub mod recipient_info;
pub mod signer_info;

pub use asn1::{IssuerAndSerialNumber, OrderedSetOf};
pub use attributes::{Attribute, AttributeSet};
pub use content::{
    ContentType, DigestedContent, EncapsulatedContent, EnvelopedContent, MessageContent,
    Pkcs7Content, SignedAndEnvelopedContent, SignedContent,
};
pub use envelope::{EncryptedContent, Envelope};
pub use message::{ContentState, Pkcs7};
pub use recipient_info::RecipientInfo;
pub use signer_info::SignerInfo;
