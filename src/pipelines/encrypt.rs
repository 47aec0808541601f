//! `EncryptWorkflow`: enveloped and signed-and-enveloped messages.

use crate::domain::crypto::{Certificate, CertificateLookup, CipherSpec, PrivateKey};
use crate::domain::pkcs7::{MessageContent, Pkcs7};
use crate::infra::config::EngineConfiguration;
use crate::infra::error::{Pkcs7Error, Pkcs7Result};
use crate::services::data_stream::RecipientKey;
use crate::services::smime::{add_text_header, strip_text_header};

#[derive(Debug, Clone, Copy, Default)]
pub struct EncryptOptions {
    /// Wrap the payload in a `text/plain` MIME header with CRLF line
    /// endings before encrypting.
    pub text: bool,
}

pub struct EncryptWorkflow {
    config: EngineConfiguration,
}

impl Default for EncryptWorkflow {
    fn default() -> Self {
        Self::new(EngineConfiguration::default())
    }
}

impl EncryptWorkflow {
    #[must_use]
    pub fn new(config: EngineConfiguration) -> Self {
        Self { config }
    }

    fn cipher_or_default(&self, cipher: Option<CipherSpec>) -> Pkcs7Result<CipherSpec> {
        match cipher {
            Some(spec) => Ok(spec),
            None => Ok(CipherSpec::new(self.config.cipher_algorithm()?)),
        }
    }

    fn payload<'a>(data: &'a [u8], options: &EncryptOptions) -> std::borrow::Cow<'a, [u8]> {
        if options.text {
            std::borrow::Cow::Owned(add_text_header(data))
        } else {
            std::borrow::Cow::Borrowed(data)
        }
    }

    /// Encrypt `data` for every certificate in `recipients`.
    ///
    /// Without an explicit `cipher` the configured default is used with a
    /// freshly generated key and IV.
    pub fn encrypt(
        &self,
        recipients: &[Certificate],
        data: &[u8],
        cipher: Option<CipherSpec>,
        options: &EncryptOptions,
    ) -> Pkcs7Result<Pkcs7> {
        let cipher = self.cipher_or_default(cipher)?;
        log::info!(
            "Encrypting {} bytes for {} recipient(s) with {}",
            data.len(),
            recipients.len(),
            cipher.algorithm()
        );

        let mut p7 = Pkcs7::new_enveloped();
        for recipient in recipients {
            p7.add_recipient(recipient)?;
        }
        p7.set_cipher(cipher)?;
        p7.finalize(&Self::payload(data, options))?;
        Ok(p7)
    }

    /// Sign `data` as `signer` and encrypt it for `recipients` in one
    /// `signedAndEnvelopedData` message.
    pub fn sign_and_encrypt(
        &self,
        signer: &Certificate,
        key: PrivateKey,
        recipients: &[Certificate],
        data: &[u8],
        cipher: Option<CipherSpec>,
        options: &EncryptOptions,
    ) -> Pkcs7Result<Pkcs7> {
        let cipher = self.cipher_or_default(cipher)?;
        let digest = self.config.digest_algorithm()?;
        log::info!(
            "Signing as {} and encrypting for {} recipient(s)",
            signer.subject(),
            recipients.len()
        );

        let mut p7 = Pkcs7::new_signed_and_enveloped();
        p7.add_signature(signer, key, digest)?;
        p7.add_certificate(signer.clone())?;
        for recipient in recipients {
            p7.add_recipient(recipient)?;
        }
        p7.set_cipher(cipher)?;
        p7.finalize(&Self::payload(data, options))?;
        Ok(p7)
    }

    /// Recover the plaintext of an enveloped or signed-and-enveloped
    /// message addressed to `cert`.
    ///
    /// # Errors
    /// `RecipientNotFound` when `cert` is not among the recipients;
    /// `CryptographicError` when the key or padding do not check out.
    pub fn decrypt(&self, p7: &Pkcs7, key: &PrivateKey, cert: &Certificate) -> Pkcs7Result<Vec<u8>> {
        if !matches!(
            p7.content(),
            MessageContent::Enveloped(_) | MessageContent::SignedAndEnveloped(_)
        ) {
            return Err(Pkcs7Error::unsupported(p7.content_type().name(), "decrypt"));
        }
        if !key.matches_certificate(cert)? {
            return Err(Pkcs7Error::CertificateError(format!(
                "private key does not match certificate {}",
                cert.subject()
            )));
        }
        let mut chain = p7.data_decode(Some(RecipientKey::new(key, cert)), None)?;
        let plaintext = chain.read_to_end(self.config.stream_buffer_size)?;
        log::info!("Decrypted {} bytes", plaintext.len());
        Ok(plaintext)
    }

    /// [`EncryptWorkflow::decrypt`] for payloads produced with
    /// `EncryptOptions::text`; the text header is removed.
    pub fn decrypt_text(
        &self,
        p7: &Pkcs7,
        key: &PrivateKey,
        cert: &Certificate,
    ) -> Pkcs7Result<Vec<u8>> {
        strip_text_header(&self.decrypt(p7, key, cert)?)
    }

    /// Decrypt a signed-and-enveloped message and check every signature
    /// over the recovered plaintext.
    pub fn decrypt_and_verify(
        &self,
        p7: &Pkcs7,
        key: &PrivateKey,
        cert: &Certificate,
        lookup: &dyn CertificateLookup,
    ) -> Pkcs7Result<Vec<u8>> {
        if !p7.is_signed_and_enveloped() {
            return Err(Pkcs7Error::TypeMismatch {
                expected: crate::domain::pkcs7::ContentType::SignedAndEnveloped.name(),
                found: p7.content_type().name(),
            });
        }
        let signers = p7.signers(lookup, true)?;
        let mut chain = p7.data_decode(Some(RecipientKey::new(key, cert)), None)?;
        let plaintext = chain.read_to_end(self.config.stream_buffer_size)?;
        for (info, signer) in p7.signer_infos()?.iter().zip(&signers) {
            p7.signature_verify(&chain, info, signer, &plaintext)?;
        }
        log::info!(
            "Decrypted {} bytes, {} signature(s) verified",
            plaintext.len(),
            signers.len()
        );
        Ok(plaintext)
    }
}
