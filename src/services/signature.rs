//! Signer resolution and signature verification.

use crate::domain::crypto::{verify_data, Certificate, CertificateLookup};
use crate::domain::pkcs7::{MessageContent, Pkcs7, SignerInfo};
use crate::domain::registry;
use crate::infra::error::{Pkcs7Error, Pkcs7Result};
use crate::services::bio::BioChain;

impl Pkcs7 {
    /// Certificates of every signer, in signer order.
    ///
    /// Each signer is resolved first against the certificates embedded in
    /// the message (when `use_embedded`), then against `lookup`.
    ///
    /// # Errors
    /// `CertificateError` when a signer cannot be resolved.
    pub fn signers(
        &self,
        lookup: &dyn CertificateLookup,
        use_embedded: bool,
    ) -> Pkcs7Result<Vec<Certificate>> {
        let (signer_infos, embedded) = match self.content() {
            MessageContent::Signed(c) => (&c.signer_infos, &c.certificates),
            MessageContent::SignedAndEnveloped(c) => (&c.signer_infos, &c.certificates),
            _ => return Err(Pkcs7Error::unsupported(self.content_type().name(), "signers")),
        };

        signer_infos
            .iter()
            .map(|si| {
                let reference = si.issuer_and_serial();
                let found = if use_embedded {
                    embedded.find_by_issuer_and_serial(reference)
                } else {
                    None
                };
                found
                    .or_else(|| lookup.find_by_issuer_and_serial(reference))
                    .cloned()
                    .ok_or_else(|| {
                        Pkcs7Error::CertificateError(format!(
                            "signer certificate not found (issuer '{}', serial {})",
                            si.issuer(),
                            hex::encode(si.serial_number().as_bytes())
                        ))
                    })
            })
            .collect()
    }

    /// Verify one signer against a chain produced by [`Pkcs7::data_decode`]
    /// that has been read to the end.
    ///
    /// With authenticated attributes, the `messageDigest` attribute must
    /// equal the digest computed by the chain and the signature covers the
    /// DER-encoded attribute set. Without them, the signature covers
    /// `content` directly.
    pub fn signature_verify(
        &self,
        chain: &BioChain,
        signer_info: &SignerInfo,
        signer: &Certificate,
        content: &[u8],
    ) -> Pkcs7Result<()> {
        if !self.is_signed() && !self.is_signed_and_enveloped() {
            return Err(Pkcs7Error::unsupported(
                self.content_type().name(),
                "signature_verify",
            ));
        }

        let alg = signer_info.digest_kind()?;
        let computed = chain
            .find_digest(alg)
            .ok_or_else(|| {
                Pkcs7Error::VerificationFailed(format!("no {alg} digest stage in the filter chain"))
            })?
            .digest()?;
        let signature = signer_info.signature().ok_or_else(|| {
            Pkcs7Error::VerificationFailed("signer info carries no signature".into())
        })?;
        let public_key = signer.public_key()?;

        let valid = if signer_info.signed_attributes().is_empty() {
            verify_data(&public_key, alg, content, signature)?
        } else {
            let recorded = signer_info.message_digest()?.ok_or_else(|| {
                Pkcs7Error::VerificationFailed("messageDigest attribute missing".into())
            })?;
            if recorded != computed.as_slice() {
                return Err(Pkcs7Error::VerificationFailed(format!(
                    "message digest mismatch ({})",
                    registry::name_for_oid(&alg.oid())
                )));
            }
            let signed = signer_info.signed_attributes().canonical_der()?;
            verify_data(&public_key, alg, &signed, signature)?
        };

        if !valid {
            return Err(Pkcs7Error::VerificationFailed(format!(
                "signature mismatch for signer {}",
                signer.subject()
            )));
        }
        log::debug!("Signature by {} verified", signer.subject());
        Ok(())
    }
}
