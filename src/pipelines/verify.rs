//! `VerifyWorkflow`: check the signatures of a `signedData` message and
//! return its content.
//!
//! Only signatures are checked; certificate chains are not built or
//! validated.

use crate::domain::crypto::CertificateLookup;
use crate::domain::pkcs7::{ContentType, Pkcs7};
use crate::infra::config::EngineConfiguration;
use crate::infra::error::{Pkcs7Error, Pkcs7Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyOptions {
    /// Resolve signers and return the content without checking signatures.
    pub no_signature_check: bool,
    /// Ignore certificates embedded in the message when resolving signers.
    pub no_intern: bool,
}

pub struct VerifyWorkflow {
    config: EngineConfiguration,
}

impl Default for VerifyWorkflow {
    fn default() -> Self {
        Self::new(EngineConfiguration::default())
    }
}

impl VerifyWorkflow {
    #[must_use]
    pub fn new(config: EngineConfiguration) -> Self {
        Self { config }
    }

    /// Verify every signer of `p7` and return the signed content.
    ///
    /// `detached` supplies the content of a detached signature; it must be
    /// `None` when the message embeds its content.
    ///
    /// # Errors
    /// `TypeMismatch` for anything but `signedData`, `IncompleteMessage`
    /// without signers, `CertificateError` when a signer cannot be
    /// resolved and `VerificationFailed` for a bad digest or signature.
    pub fn verify(
        &self,
        p7: &Pkcs7,
        lookup: &dyn CertificateLookup,
        detached: Option<&[u8]>,
        options: &VerifyOptions,
    ) -> Pkcs7Result<Vec<u8>> {
        if !p7.is_signed() {
            return Err(Pkcs7Error::TypeMismatch {
                expected: ContentType::Signed.name(),
                found: p7.content_type().name(),
            });
        }
        let signer_infos = p7.signer_infos()?;
        if signer_infos.is_empty() {
            return Err(Pkcs7Error::IncompleteMessage("no signers to verify".into()));
        }
        if detached.is_some() && p7.embedded_content().is_some() {
            return Err(Pkcs7Error::InvalidInput(
                "detached content supplied for a message that embeds its content".into(),
            ));
        }

        let signers = p7.signers(lookup, !options.no_intern)?;
        let mut chain = p7.data_decode(None, detached)?;
        let content = chain.read_to_end(self.config.stream_buffer_size)?;

        if options.no_signature_check {
            log::warn!("Signature check skipped for {} signer(s)", signers.len());
            return Ok(content);
        }
        for (info, signer) in signer_infos.iter().zip(&signers) {
            p7.signature_verify(&chain, info, signer, &content)?;
        }
        log::info!("Verified {} signature(s)", signers.len());
        Ok(content)
    }
}
