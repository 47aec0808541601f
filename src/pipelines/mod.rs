//! Workflow pipelines orchestrating the message services.

pub mod encrypt;
pub mod sign;
pub mod verify;

pub use encrypt::{EncryptOptions, EncryptWorkflow};
pub use sign::{SignOptions, SignWorkflow};
pub use verify::{VerifyOptions, VerifyWorkflow};
