//! Streaming construction and decoding of messages.
//!
//! `data_init` builds the filter chain a caller writes the payload into:
//! a memory endpoint, a cipher stage for enveloped variants and one digest
//! stage per digest algorithm on top. `data_final` harvests the chain:
//! it signs, records digests and stores the (possibly encrypted) payload.
//! `data_decode` builds the mirror-image chain for reading a received
//! message back.

use std::time::SystemTime;

use crate::domain::crypto::{sign_data, Certificate, CipherContext, DigestAlgorithm, PrivateKey};
use crate::domain::pkcs7::{
    Attribute, ContentState, EncapsulatedContent, MessageContent, Pkcs7, SignerInfo,
};
use crate::domain::registry;
use crate::infra::error::{Pkcs7Error, Pkcs7Result};
use crate::services::bio::{BioChain, MemBio};
use x509_cert::spki::AlgorithmIdentifierOwned;

/// Key material identifying the recipient when decoding an envelope.
#[derive(Debug, Clone, Copy)]
pub struct RecipientKey<'a> {
    pub key: &'a PrivateKey,
    pub certificate: &'a Certificate,
}

impl<'a> RecipientKey<'a> {
    #[must_use]
    pub fn new(key: &'a PrivateKey, certificate: &'a Certificate) -> Self {
        Self { key, certificate }
    }
}

fn digest_algorithms(algs: &[AlgorithmIdentifierOwned]) -> Pkcs7Result<Vec<DigestAlgorithm>> {
    algs.iter()
        .map(|alg| registry::digest_for_oid(&alg.oid))
        .collect()
}

fn build_chain(
    endpoint: MemBio,
    cipher: Option<CipherContext>,
    digests: &[DigestAlgorithm],
) -> Pkcs7Result<BioChain> {
    let mut chain = BioChain::new(endpoint);
    if let Some(context) = cipher {
        chain = chain.push_cipher(context);
    }
    for alg in digests.iter().rev() {
        chain = chain.push_digest(alg.context()?);
    }
    Ok(chain)
}

fn memory_contents(chain: &BioChain) -> Pkcs7Result<Vec<u8>> {
    chain
        .find_mem()
        .map(|mem| mem.contents().to_vec())
        .ok_or_else(|| Pkcs7Error::IncompleteMessage("filter chain has no memory endpoint".into()))
}

/// Add the mandatory signed attributes and compute the signature.
fn sign_signer(
    signer: &mut SignerInfo,
    key: &PrivateKey,
    chain: &BioChain,
    content_type: &EncapsulatedContent,
) -> Pkcs7Result<()> {
    let alg = signer.digest_kind()?;
    let digest = chain
        .find_digest(alg)
        .ok_or_else(|| {
            Pkcs7Error::CryptographicError(format!("no {alg} digest stage in the filter chain"))
        })?
        .digest()?;

    if signer.signed_attributes().content_type()?.is_none() {
        signer.add_signed_attribute(Attribute::content_type(content_type.content_type())?);
    }
    if signer.signed_attributes().signing_time()?.is_none() {
        signer.add_signed_attribute(Attribute::signing_time(SystemTime::now())?);
    }
    signer.add_signed_attribute(Attribute::message_digest(digest.as_slice())?);

    let to_be_signed = signer.signed_attributes().canonical_der()?;
    signer.set_signature(sign_data(key, alg, &to_be_signed)?);
    Ok(())
}

fn sign_all(
    signers: &mut [SignerInfo],
    chain: &BioChain,
    contents: &EncapsulatedContent,
) -> Pkcs7Result<()> {
    for signer in signers {
        let Some(key) = signer.signing_key().cloned() else {
            log::debug!("Skipping signer {} without private key", signer.issuer());
            continue;
        };
        sign_signer(signer, &key, chain, contents)?;
    }
    Ok(())
}

impl Pkcs7 {
    fn check_complete(&self) -> Pkcs7Result<()> {
        let name = self.content_type().name();
        match self.content() {
            MessageContent::Signed(c) if c.signer_infos.is_empty() => Err(
                Pkcs7Error::IncompleteMessage(format!("{name} has no signers")),
            ),
            MessageContent::SignedAndEnveloped(c) if c.signer_infos.is_empty() => Err(
                Pkcs7Error::IncompleteMessage(format!("{name} has no signers")),
            ),
            _ => Ok(()),
        }
    }

    /// Start streaming the payload into the message.
    ///
    /// # Errors
    /// `IncompleteMessage` when signers, recipients or the cipher are
    /// missing; `UnsupportedOperation` once finalized.
    pub fn data_init(&mut self) -> Pkcs7Result<BioChain> {
        self.ensure_mutable("data_init")?;
        self.check_complete()?;

        let (cipher, digests) = match self.content_mut() {
            MessageContent::Signed(c) => (None, digest_algorithms(&c.digest_algorithms)?),
            MessageContent::Digested(c) => {
                (None, digest_algorithms(std::slice::from_ref(&c.digest_algorithm))?)
            }
            MessageContent::Enveloped(c) => (Some(c.envelope.seal()?), Vec::new()),
            MessageContent::SignedAndEnveloped(c) => {
                let digests = digest_algorithms(&c.digest_algorithms)?;
                (Some(c.envelope.seal()?), digests)
            }
        };
        log::debug!(
            "Initialized {} stream (cipher: {}, digests: {:?})",
            self.content_type(),
            cipher.is_some(),
            digests
        );
        build_chain(MemBio::new(), cipher, &digests)
    }

    /// Complete the message from the chain returned by [`Pkcs7::data_init`].
    pub fn data_final(&mut self, mut chain: BioChain) -> Pkcs7Result<()> {
        self.ensure_mutable("data_final")?;
        self.check_complete()?;
        chain.flush()?;
        let detached = self.is_detached();

        match self.content_mut() {
            MessageContent::Signed(c) => {
                let contents = c.contents.clone();
                sign_all(&mut c.signer_infos, &chain, &contents)?;
                if detached {
                    c.contents.clear();
                } else {
                    c.contents.set_bytes(memory_contents(&chain)?);
                }
            }
            MessageContent::SignedAndEnveloped(c) => {
                let contents = EncapsulatedContent::from_parts(
                    c.envelope.encrypted_content().content_type(),
                    None,
                    None,
                );
                sign_all(&mut c.signer_infos, &chain, &contents)?;
                c.envelope.set_ciphertext(memory_contents(&chain)?);
            }
            MessageContent::Enveloped(c) => {
                c.envelope.set_ciphertext(memory_contents(&chain)?);
            }
            MessageContent::Digested(c) => {
                let alg = registry::digest_for_oid(&c.digest_algorithm.oid)?;
                let digest = chain
                    .find_digest(alg)
                    .ok_or_else(|| {
                        Pkcs7Error::CryptographicError(format!("no {alg} digest stage"))
                    })?
                    .digest()?;
                c.digest = Some(digest.into_vec());
                if detached {
                    c.contents.clear();
                } else {
                    c.contents.set_bytes(memory_contents(&chain)?);
                }
            }
        }

        self.set_state(ContentState::Finalized);
        log::info!("Finalized {} message", self.content_type());
        Ok(())
    }

    /// `data_init`, write all of `data`, `data_final`.
    pub fn finalize(&mut self, data: &[u8]) -> Pkcs7Result<()> {
        let mut chain = self.data_init()?;
        chain.write_all(data)?;
        self.data_final(chain)
    }

    /// Chain that yields the payload of a received message.
    ///
    /// Reading it to the end returns the plaintext; the digest stages can
    /// then be queried for signature verification. Enveloped variants need
    /// `recipient`; signed and digested messages with a detached payload
    /// need `detached_content`.
    pub fn data_decode(
        &self,
        recipient: Option<RecipientKey<'_>>,
        detached_content: Option<&[u8]>,
    ) -> Pkcs7Result<BioChain> {
        let require_recipient = || {
            recipient.ok_or_else(|| {
                Pkcs7Error::InvalidInput(
                    "recipient key and certificate are required to decrypt".into(),
                )
            })
        };
        let embedded_or_detached = |contents: &EncapsulatedContent| {
            detached_content
                .or_else(|| contents.bytes())
                .map(<[u8]>::to_vec)
                .ok_or_else(|| {
                    Pkcs7Error::IncompleteMessage(
                        "content is detached and none was supplied".into(),
                    )
                })
        };
        let encrypted = |envelope: &crate::domain::pkcs7::Envelope| {
            envelope
                .encrypted_content()
                .ciphertext()
                .map(<[u8]>::to_vec)
                .ok_or_else(|| {
                    Pkcs7Error::IncompleteMessage("no encrypted content present".into())
                })
        };

        let (body, cipher, digests) = match self.content() {
            MessageContent::Signed(c) => (
                embedded_or_detached(&c.contents)?,
                None,
                digest_algorithms(&c.digest_algorithms)?,
            ),
            MessageContent::Digested(c) => (
                embedded_or_detached(&c.contents)?,
                None,
                digest_algorithms(std::slice::from_ref(&c.digest_algorithm))?,
            ),
            MessageContent::Enveloped(c) => {
                let rk = require_recipient()?;
                (
                    encrypted(&c.envelope)?,
                    Some(c.envelope.open(rk.key, rk.certificate)?),
                    Vec::new(),
                )
            }
            MessageContent::SignedAndEnveloped(c) => {
                let rk = require_recipient()?;
                (
                    encrypted(&c.envelope)?,
                    Some(c.envelope.open(rk.key, rk.certificate)?),
                    digest_algorithms(&c.digest_algorithms)?,
                )
            }
        };
        build_chain(MemBio::from_bytes(body), cipher, &digests)
    }
}
