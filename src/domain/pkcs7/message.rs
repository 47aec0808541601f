//! Top-level message handle.
//!
//! A [`Pkcs7`] moves through `Empty -> Populated -> Finalized`. Mutations
//! are rejected once finalized; streaming (`data_init`/`data_final`),
//! encoding and verification live in `services`.

use crate::domain::crypto::{Certificate, CipherSpec, Crl, DigestAlgorithm, PrivateKey};
use crate::infra::error::{Pkcs7Error, Pkcs7Result};

use super::content::{
    ContentType, DigestedContent, EnvelopedContent, MessageContent, SignedAndEnvelopedContent,
    SignedContent,
};
use super::recipient_info::RecipientInfo;
use super::signer_info::SignerInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentState {
    /// Type chosen, nothing added yet
    Empty,
    /// Signers, recipients, certificates or payload added
    Populated,
    /// Signatures computed / content encrypted; read-only from here on
    Finalized,
}

#[derive(Clone, Debug)]
pub struct Pkcs7 {
    content: MessageContent,
    state: ContentState,
    detached: bool,
}

impl Pkcs7 {
    /// New, empty message of the given type.
    ///
    /// # Errors
    /// `UnsupportedOperation` for `data` and `encryptedData`, which the
    /// engine does not build as top-level messages.
    pub fn new(content_type: ContentType) -> Pkcs7Result<Self> {
        let content = match content_type {
            ContentType::Signed => MessageContent::Signed(SignedContent::default()),
            ContentType::Enveloped => MessageContent::Enveloped(EnvelopedContent::default()),
            ContentType::SignedAndEnveloped => {
                MessageContent::SignedAndEnveloped(SignedAndEnvelopedContent::default())
            }
            ContentType::Digested => {
                MessageContent::Digested(DigestedContent::new(DigestAlgorithm::Sha256))
            }
            other => return Err(Pkcs7Error::unsupported(other.name(), "new")),
        };
        Ok(Self::from_content(content, ContentState::Empty))
    }

    #[must_use]
    pub fn new_signed() -> Self {
        Self::from_content(MessageContent::Signed(SignedContent::default()), ContentState::Empty)
    }

    #[must_use]
    pub fn new_enveloped() -> Self {
        Self::from_content(
            MessageContent::Enveloped(EnvelopedContent::default()),
            ContentState::Empty,
        )
    }

    #[must_use]
    pub fn new_signed_and_enveloped() -> Self {
        Self::from_content(
            MessageContent::SignedAndEnveloped(SignedAndEnvelopedContent::default()),
            ContentState::Empty,
        )
    }

    #[must_use]
    pub fn new_digested(algorithm: DigestAlgorithm) -> Self {
        Self::from_content(
            MessageContent::Digested(DigestedContent::new(algorithm)),
            ContentState::Empty,
        )
    }

    pub(crate) fn from_content(content: MessageContent, state: ContentState) -> Self {
        Self {
            content,
            state,
            detached: false,
        }
    }

    #[must_use]
    pub fn content(&self) -> &MessageContent {
        &self.content
    }

    pub(crate) fn content_mut(&mut self) -> &mut MessageContent {
        &mut self.content
    }

    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.content.content_type()
    }
    #[must_use]
    pub fn state(&self) -> ContentState {
        self.state
    }
    #[must_use]
    pub fn is_signed(&self) -> bool {
        matches!(self.content, MessageContent::Signed(_))
    }
    #[must_use]
    pub fn is_enveloped(&self) -> bool {
        matches!(self.content, MessageContent::Enveloped(_))
    }
    #[must_use]
    pub fn is_signed_and_enveloped(&self) -> bool {
        matches!(self.content, MessageContent::SignedAndEnveloped(_))
    }
    #[must_use]
    pub fn is_digested(&self) -> bool {
        matches!(self.content, MessageContent::Digested(_))
    }

    #[must_use]
    pub fn as_signed(&self) -> Option<&SignedContent> {
        match &self.content {
            MessageContent::Signed(c) => Some(c),
            _ => None,
        }
    }
    #[must_use]
    pub fn as_enveloped(&self) -> Option<&EnvelopedContent> {
        match &self.content {
            MessageContent::Enveloped(c) => Some(c),
            _ => None,
        }
    }
    #[must_use]
    pub fn as_signed_and_enveloped(&self) -> Option<&SignedAndEnvelopedContent> {
        match &self.content {
            MessageContent::SignedAndEnveloped(c) => Some(c),
            _ => None,
        }
    }
    #[must_use]
    pub fn as_digested(&self) -> Option<&DigestedContent> {
        match &self.content {
            MessageContent::Digested(c) => Some(c),
            _ => None,
        }
    }

    /// Whether the payload is carried outside the message.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Mark the payload as external; only signed and digested messages
    /// have an embedded payload to omit.
    pub fn set_detached(&mut self, detached: bool) -> Pkcs7Result<()> {
        self.ensure_mutable("set_detached")?;
        match self.content {
            MessageContent::Signed(_) | MessageContent::Digested(_) => {
                self.detached = detached;
                Ok(())
            }
            _ => Err(Pkcs7Error::unsupported(self.content_type().name(), "set_detached")),
        }
    }

    pub(crate) fn mark_detached(&mut self, detached: bool) {
        self.detached = detached;
    }

    /// Embed the payload directly (no streaming); for signed messages the
    /// signatures are still produced by `data_final`.
    pub fn set_content(&mut self, data: Vec<u8>) -> Pkcs7Result<()> {
        self.ensure_mutable("set_content")?;
        match &mut self.content {
            MessageContent::Signed(c) => c.contents.set_bytes(data),
            MessageContent::Digested(c) => c.contents.set_bytes(data),
            _ => return Err(Pkcs7Error::unsupported(self.content_type().name(), "set_content")),
        }
        self.touch();
        Ok(())
    }

    /// Embedded payload of a signed or digested message.
    #[must_use]
    pub fn embedded_content(&self) -> Option<&[u8]> {
        match &self.content {
            MessageContent::Signed(c) => c.contents.bytes(),
            MessageContent::Digested(c) => c.contents.bytes(),
            _ => None,
        }
    }

    pub fn set_cipher(&mut self, cipher: CipherSpec) -> Pkcs7Result<()> {
        self.ensure_mutable("set_cipher")?;
        self.content.as_content_mut().set_cipher(cipher)?;
        self.touch();
        Ok(())
    }

    pub fn cipher(&self) -> Pkcs7Result<Option<&CipherSpec>> {
        self.content.as_content().cipher()
    }

    pub fn add_recipient_info(&mut self, recipient: RecipientInfo) -> Pkcs7Result<()> {
        self.ensure_mutable("add_recipient_info")?;
        self.content.as_content_mut().add_recipient_info(recipient)?;
        self.touch();
        Ok(())
    }

    /// Add a recipient addressed by `cert` (RSA key transport).
    pub fn add_recipient(&mut self, cert: &Certificate) -> Pkcs7Result<()> {
        log::debug!("Adding recipient {}", cert.subject());
        self.add_recipient_info(RecipientInfo::new(cert))
    }

    pub fn recipient_infos(&self) -> Pkcs7Result<&[RecipientInfo]> {
        self.content.as_content().recipient_infos()
    }

    pub fn add_signer(&mut self, signer: SignerInfo) -> Pkcs7Result<()> {
        self.ensure_mutable("add_signer")?;
        self.content.as_content_mut().add_signer(signer)?;
        self.touch();
        Ok(())
    }

    /// Add a signer for `cert`/`key` and return it for attribute tweaking.
    pub fn add_signature(
        &mut self,
        cert: &Certificate,
        key: PrivateKey,
        digest: DigestAlgorithm,
    ) -> Pkcs7Result<&mut SignerInfo> {
        // Check the variant before doing any key work.
        self.content.as_content().signer_infos()?;
        let signer = SignerInfo::new(cert, key, digest)?;
        log::debug!("Adding {} signer for {}", digest, cert.subject());
        self.add_signer(signer)?;
        self.content
            .as_content_mut()
            .signer_infos_mut()?
            .last_mut()
            .ok_or_else(|| Pkcs7Error::IncompleteMessage("signer was not recorded".into()))
    }

    pub fn signer_infos(&self) -> Pkcs7Result<&[SignerInfo]> {
        self.content.as_content().signer_infos()
    }

    pub fn signer_infos_mut(&mut self) -> Pkcs7Result<&mut [SignerInfo]> {
        self.ensure_mutable("signer_infos_mut")?;
        self.content.as_content_mut().signer_infos_mut()
    }

    pub fn add_certificate(&mut self, cert: Certificate) -> Pkcs7Result<()> {
        self.ensure_mutable("add_certificate")?;
        self.content.as_content_mut().add_certificate(cert)?;
        self.touch();
        Ok(())
    }

    pub fn certificates(&self) -> Pkcs7Result<&[Certificate]> {
        self.content.as_content().certificates()
    }

    pub fn add_crl(&mut self, crl: Crl) -> Pkcs7Result<()> {
        self.ensure_mutable("add_crl")?;
        self.content.as_content_mut().add_crl(crl)?;
        self.touch();
        Ok(())
    }

    pub fn crls(&self) -> Pkcs7Result<&[Crl]> {
        self.content.as_content().crls()
    }

    pub(crate) fn ensure_mutable(&self, operation: &str) -> Pkcs7Result<()> {
        if self.state == ContentState::Finalized {
            return Err(Pkcs7Error::unsupported(
                format!("finalized {}", self.content_type().name()),
                operation,
            ));
        }
        Ok(())
    }

    pub(crate) fn set_state(&mut self, state: ContentState) {
        self.state = state;
    }

    fn touch(&mut self) {
        if self.state == ContentState::Empty {
            self.state = ContentState::Populated;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::crypto::CipherAlgorithm;

    #[test]
    fn state_moves_to_populated_on_first_mutation() {
        let mut p7 = Pkcs7::new_enveloped();
        assert_eq!(p7.state(), ContentState::Empty);
        p7.set_cipher(CipherSpec::new(CipherAlgorithm::Aes128Cbc)).unwrap();
        assert_eq!(p7.state(), ContentState::Populated);
    }

    #[test]
    fn finalized_rejects_mutation() {
        let mut p7 = Pkcs7::new_signed();
        p7.set_state(ContentState::Finalized);
        let err = p7.set_detached(true).unwrap_err();
        assert!(matches!(err, Pkcs7Error::UnsupportedOperation { .. }));
    }

    #[test]
    fn data_is_not_a_top_level_message() {
        assert!(Pkcs7::new(ContentType::Data).is_err());
        assert!(Pkcs7::new(ContentType::Encrypted).is_err());
        assert!(Pkcs7::new(ContentType::Signed).unwrap().is_signed());
    }

    #[test]
    fn enveloped_cannot_be_detached() {
        let mut p7 = Pkcs7::new_enveloped();
        assert!(p7.set_detached(true).is_err());
        assert!(p7.certificates().is_err());
    }
}
