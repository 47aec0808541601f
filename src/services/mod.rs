//! Service layer: streaming, encoding and cryptographic operations on the
//! message model.

pub mod bio;
pub mod codec;
pub mod data_stream;
pub mod envelope;
pub mod pem;
pub mod signature;
pub mod smime;

pub use bio::{Bio, BioChain, BioType};
pub use codec::decode_signed_and_enveloped;
pub use data_stream::RecipientKey;
pub use smime::{read_smime, write_smime, SmimeDocument};
