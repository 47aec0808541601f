//! Sealing and opening of envelopes.
//!
//! Sealing draws the content key (unless the cipher spec already carries
//! one), wraps it for every recipient and records the content-encryption
//! algorithm with its IV. Opening finds the caller's recipient info, unwraps
//! the key and rebuilds the cipher from the recorded algorithm.

use crate::domain::constants::STREAM_BUFFER_SIZE;
use crate::domain::crypto::{unwrap_key, wrap_key, Certificate, CipherContext, CipherSpec, PrivateKey};
use crate::domain::pkcs7::{Envelope, RecipientInfo};
use crate::infra::error::{Pkcs7Error, Pkcs7Result};
use crate::services::bio::{BioChain, MemBio};

impl Envelope {
    /// Prepare the envelope for encryption and return the encrypting context.
    pub(crate) fn seal(&mut self) -> Pkcs7Result<CipherContext> {
        if self.recipient_infos().is_empty() {
            return Err(Pkcs7Error::IncompleteMessage(
                "envelope has no recipients".into(),
            ));
        }
        let cipher = self.cipher_mut().ok_or_else(|| {
            Pkcs7Error::IncompleteMessage("content cipher has not been set".into())
        })?;
        cipher.ensure_key_material()?;
        let cipher = cipher.clone();
        let content_key = cipher
            .key()
            .ok_or_else(|| Pkcs7Error::IncompleteMessage("content key missing".into()))?;

        for recipient in self.recipient_infos_mut() {
            let cert = recipient.certificate().ok_or_else(|| {
                Pkcs7Error::IncompleteMessage(format!(
                    "no certificate available to wrap the key for {}",
                    recipient.issuer()
                ))
            })?;
            let wrapped = wrap_key(cert, content_key)?;
            recipient.set_encrypted_key(wrapped);
        }
        log::debug!(
            "Sealed {} envelope for {} recipient(s)",
            cipher.algorithm(),
            self.recipient_infos().len()
        );

        self.set_algorithm(cipher.algorithm_identifier()?);
        cipher.encryptor()
    }

    /// Decrypting context for the recipient identified by `cert`.
    pub(crate) fn open(&self, key: &PrivateKey, cert: &Certificate) -> Pkcs7Result<CipherContext> {
        let recipient = self.find_recipient(cert)?;
        let wrapped = recipient.encrypted_key().ok_or_else(|| {
            Pkcs7Error::IncompleteMessage("recipient info carries no encrypted key".into())
        })?;
        let algorithm = self.encrypted_content().algorithm().ok_or_else(|| {
            Pkcs7Error::IncompleteMessage("content encryption algorithm missing".into())
        })?;
        let content_key = unwrap_key(key, wrapped)?;
        CipherSpec::from_algorithm_identifier(algorithm, content_key)?.decryptor()
    }

    /// Encrypt `plaintext` for `recipients`, one recipient info per
    /// certificate in input order.
    pub fn encrypt_for(
        &mut self,
        recipients: &[Certificate],
        cipher: CipherSpec,
        plaintext: &[u8],
    ) -> Pkcs7Result<()> {
        for cert in recipients {
            self.add_recipient_info(RecipientInfo::new(cert));
        }
        self.set_cipher(cipher);
        let context = self.seal()?;
        let mut chain = BioChain::new(MemBio::new()).push_cipher(context);
        chain.write_all(plaintext)?;
        chain.flush()?;
        let ciphertext = chain
            .find_mem()
            .map(|mem| mem.contents().to_vec())
            .unwrap_or_default();
        self.set_ciphertext(ciphertext);
        Ok(())
    }

    /// Recover the plaintext as the recipient holding `key` / `cert`.
    pub fn decrypt_with(&self, key: &PrivateKey, cert: &Certificate) -> Pkcs7Result<Vec<u8>> {
        let context = self.open(key, cert)?;
        let ciphertext = self.encrypted_content().ciphertext().ok_or_else(|| {
            Pkcs7Error::IncompleteMessage("envelope carries no encrypted content".into())
        })?;
        let mut chain = BioChain::new(MemBio::from_bytes(ciphertext.to_vec())).push_cipher(context);
        chain.read_to_end(STREAM_BUFFER_SIZE)
    }
}
