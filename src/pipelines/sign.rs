//! `SignWorkflow`: one-shot construction of a `signedData` message.

use std::io::Read;

use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::domain::crypto::{Certificate, CipherAlgorithm, PrivateKey};
use crate::domain::pkcs7::{Attribute, Pkcs7};
use crate::infra::config::EngineConfiguration;
use crate::infra::error::Pkcs7Result;

/// Caller choices for [`SignWorkflow::sign`].
#[derive(Debug, Clone, Default)]
pub struct SignOptions {
    /// Leave the payload out of the message.
    pub detached: bool,
    /// Do not embed the signer and extra certificates.
    pub no_certs: bool,
    /// Drop the optional signed attributes (S/MIME capabilities and
    /// `signed_attributes`). contentType, signingTime and messageDigest
    /// are always present.
    pub no_attributes: bool,
    pub no_smime_capabilities: bool,
    /// Extra authenticated attributes added to the signer.
    pub signed_attributes: Vec<Attribute>,
}

/// Ciphers advertised in the S/MIME capabilities attribute, strongest first.
fn smime_capabilities() -> Vec<AlgorithmIdentifierOwned> {
    [
        CipherAlgorithm::Aes256Cbc,
        CipherAlgorithm::Aes192Cbc,
        CipherAlgorithm::Aes128Cbc,
        CipherAlgorithm::DesEde3Cbc,
    ]
    .into_iter()
    .map(|alg| AlgorithmIdentifierOwned {
        oid: alg.oid(),
        parameters: None,
    })
    .collect()
}

pub struct SignWorkflow {
    config: EngineConfiguration,
}

impl Default for SignWorkflow {
    fn default() -> Self {
        Self::new(EngineConfiguration::default())
    }
}

impl SignWorkflow {
    #[must_use]
    pub fn new(config: EngineConfiguration) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfiguration {
        &self.config
    }

    /// Sign everything readable from `data` with `key`.
    ///
    /// The digest comes from the configuration. `extra_certs` are embedded
    /// after the signer's certificate unless `no_certs` is set.
    pub fn sign<R: Read>(
        &self,
        cert: &Certificate,
        key: PrivateKey,
        extra_certs: &[Certificate],
        data: &mut R,
        options: &SignOptions,
    ) -> Pkcs7Result<Pkcs7> {
        let digest = self.config.digest_algorithm()?;
        log::info!("Signing as {} with {}", cert.subject(), digest);

        let mut p7 = Pkcs7::new_signed();
        let signer = p7.add_signature(cert, key, digest)?;
        if !options.no_attributes {
            if self.config.include_smime_capabilities && !options.no_smime_capabilities {
                signer.add_signed_attribute(Attribute::smime_capabilities(smime_capabilities())?);
            }
            for attribute in &options.signed_attributes {
                signer.add_signed_attribute(attribute.clone());
            }
        }

        if !options.no_certs {
            p7.add_certificate(cert.clone())?;
            for extra in extra_certs {
                p7.add_certificate(extra.clone())?;
            }
        }
        if options.detached {
            p7.set_detached(true)?;
        }

        let mut chain = p7.data_init()?;
        let copied = chain.copy_from(data, self.config.stream_buffer_size)?;
        p7.data_final(chain)?;
        log::info!(
            "Signed {copied} bytes ({})",
            if options.detached { "detached" } else { "embedded" }
        );
        Ok(p7)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_list_is_strongest_first() {
        let caps = smime_capabilities();
        assert_eq!(caps[0].oid, CipherAlgorithm::Aes256Cbc.oid());
        assert!(caps.iter().all(|c| c.parameters.is_none()));
    }
}
