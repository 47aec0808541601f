pub mod constants;
pub mod crypto;
pub mod mime;
pub mod pkcs7;
pub mod registry;
