use std::any::Any;

use super::{write_all, Bio, BioType};
use crate::domain::crypto::{CipherAlgorithm, CipherContext};
use crate::infra::error::Pkcs7Result;

/// Symmetric cipher stage. Writes are transformed and passed down; the
/// padded final block is produced on the first `flush`. Reads pull from
/// downstream and finalize at end of stream.
pub struct CipherBio {
    context: CipherContext,
    next: Box<dyn Bio>,
    out: Vec<u8>,
    out_pos: usize,
    eof: bool,
}

impl CipherBio {
    pub fn new(context: CipherContext, next: Box<dyn Bio>) -> Self {
        Self {
            context,
            next,
            out: Vec::new(),
            out_pos: 0,
            eof: false,
        }
    }

    #[must_use]
    pub fn algorithm(&self) -> CipherAlgorithm {
        self.context.algorithm()
    }
}

impl Bio for CipherBio {
    fn bio_type(&self) -> BioType {
        BioType::Cipher
    }

    fn read(&mut self, buf: &mut [u8]) -> Pkcs7Result<usize> {
        let mut chunk = [0u8; 4096];
        loop {
            if self.out_pos < self.out.len() {
                let available = &self.out[self.out_pos..];
                let n = available.len().min(buf.len());
                buf[..n].copy_from_slice(&available[..n]);
                self.out_pos += n;
                return Ok(n);
            }
            if self.eof || buf.is_empty() {
                return Ok(0);
            }
            let n = self.next.read(&mut chunk)?;
            self.out = if n == 0 {
                self.eof = true;
                self.context.finish()?
            } else {
                self.context.update(&chunk[..n])?
            };
            self.out_pos = 0;
        }
    }

    fn write(&mut self, buf: &[u8]) -> Pkcs7Result<usize> {
        let transformed = self.context.update(buf)?;
        write_all(self.next.as_mut(), &transformed)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Pkcs7Result<()> {
        if !self.context.is_finished() {
            let tail = self.context.finish()?;
            write_all(self.next.as_mut(), &tail)?;
        }
        self.next.flush()
    }

    fn next(&self) -> Option<&dyn Bio> {
        Some(self.next.as_ref())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
