use std::any::Any;

use super::{Bio, BioType};
use crate::domain::crypto::{DigestAlgorithm, DigestBytes, DigestContext};
use crate::infra::error::Pkcs7Result;

/// Pass-through stage that digests every byte flowing through it, in
/// either direction. Only the bytes the downstream stage actually took
/// (or produced) are digested.
pub struct DigestBio {
    context: DigestContext,
    next: Box<dyn Bio>,
}

impl DigestBio {
    pub fn new(context: DigestContext, next: Box<dyn Bio>) -> Self {
        Self { context, next }
    }

    #[must_use]
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.context.algorithm()
    }

    /// Digest of the data seen so far; the stage keeps running.
    pub fn digest(&self) -> Pkcs7Result<DigestBytes> {
        self.context.snapshot()
    }
}

impl Bio for DigestBio {
    fn bio_type(&self) -> BioType {
        BioType::Digest
    }

    fn read(&mut self, buf: &mut [u8]) -> Pkcs7Result<usize> {
        let n = self.next.read(buf)?;
        self.context.update(&buf[..n])?;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Pkcs7Result<usize> {
        let n = self.next.write(buf)?;
        self.context.update(&buf[..n])?;
        Ok(n)
    }

    fn flush(&mut self) -> Pkcs7Result<()> {
        self.next.flush()
    }

    fn next(&self) -> Option<&dyn Bio> {
        Some(self.next.as_ref())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
