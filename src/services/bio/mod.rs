//! Streaming filter chain.
//!
//! A chain is a stack of [`Bio`] stages ending in an endpoint (memory
//! buffer, null sink, reader or writer). Each filter stage owns the stage
//! below it, so chains are built bottom-up: start from the endpoint and
//! push filters on top. Writes enter at the top and flow down; reads pull
//! from the bottom up through every stage.
//!
//! `read` returns `Ok(0)` at end of stream, and keeps returning it.
//! `flush` propagates down the chain and is where buffering stages
//! (base64, cipher) emit their final block.

mod base64;
mod cipher;
mod digest;
mod mem;

use std::any::Any;
use std::io::{Read, Write};

pub use self::base64::Base64Bio;
pub use self::cipher::CipherBio;
pub use self::digest::DigestBio;
pub use self::mem::{MemBio, NullBio, ReaderBio, WriterBio};

use crate::domain::crypto::{CipherContext, DigestAlgorithm, DigestContext};
use crate::infra::error::{Pkcs7Error, Pkcs7Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BioType {
    Mem,
    Null,
    Source,
    Sink,
    Digest,
    Base64,
    Cipher,
}

impl BioType {
    #[must_use]
    pub fn is_filter(&self) -> bool {
        matches!(self, BioType::Digest | BioType::Base64 | BioType::Cipher)
    }
}

/// One stage of a filter chain.
pub trait Bio {
    fn bio_type(&self) -> BioType;

    /// Read up to `buf.len()` bytes; `Ok(0)` means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Pkcs7Result<usize>;

    /// Accept up to `buf.len()` bytes, returning how many were taken.
    fn write(&mut self, buf: &[u8]) -> Pkcs7Result<usize>;

    fn flush(&mut self) -> Pkcs7Result<()>;

    /// Downstream neighbour; `None` for endpoints.
    fn next(&self) -> Option<&dyn Bio> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// Write all of `data` into `bio`, retrying on short writes.
pub(crate) fn write_all(bio: &mut dyn Bio, mut data: &[u8]) -> Pkcs7Result<()> {
    while !data.is_empty() {
        let written = bio.write(data)?;
        if written == 0 {
            return Err(Pkcs7Error::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!("{:?} stage accepted no data", bio.bio_type()),
            )));
        }
        data = &data[written..];
    }
    Ok(())
}

/// Owned filter chain, addressed through its top stage.
pub struct BioChain {
    top: Box<dyn Bio>,
}

impl BioChain {
    /// Chain consisting of just `endpoint`.
    pub fn new<B: Bio + 'static>(endpoint: B) -> Self {
        Self {
            top: Box::new(endpoint),
        }
    }

    /// Install `stage` on top; `wrap` receives the current top as its
    /// downstream neighbour.
    #[must_use]
    pub fn push<F>(self, wrap: F) -> Self
    where
        F: FnOnce(Box<dyn Bio>) -> Box<dyn Bio>,
    {
        Self {
            top: wrap(self.top),
        }
    }

    #[must_use]
    pub fn push_digest(self, context: DigestContext) -> Self {
        self.push(|next| Box::new(DigestBio::new(context, next)))
    }

    #[must_use]
    pub fn push_base64(self, line_length: usize) -> Self {
        self.push(|next| Box::new(Base64Bio::new(next, line_length)))
    }

    #[must_use]
    pub fn push_cipher(self, context: CipherContext) -> Self {
        self.push(|next| Box::new(CipherBio::new(context, next)))
    }

    /// Type of the top stage.
    #[must_use]
    pub fn bio_type(&self) -> BioType {
        self.top.bio_type()
    }

    /// Stage types from top to bottom.
    #[must_use]
    pub fn stages(&self) -> Vec<BioType> {
        self.iter().map(|bio| bio.bio_type()).collect()
    }

    fn iter(&self) -> impl Iterator<Item = &dyn Bio> + '_ {
        let top: &dyn Bio = self.top.as_ref();
        std::iter::successors(Some(top), |bio| bio.next())
    }

    /// First stage of concrete type `T`, searching from the top.
    #[must_use]
    pub fn find<T: Bio + 'static>(&self) -> Option<&T> {
        self.iter().find_map(|bio| bio.as_any().downcast_ref::<T>())
    }

    /// Digest stage computing `algorithm`, searching from the top.
    #[must_use]
    pub fn find_digest(&self, algorithm: DigestAlgorithm) -> Option<&DigestBio> {
        self.iter()
            .filter_map(|bio| bio.as_any().downcast_ref::<DigestBio>())
            .find(|stage| stage.algorithm() == algorithm)
    }

    #[must_use]
    pub fn find_mem(&self) -> Option<&MemBio> {
        self.find::<MemBio>()
    }

    pub fn read(&mut self, buf: &mut [u8]) -> Pkcs7Result<usize> {
        self.top.read(buf)
    }

    pub fn write(&mut self, buf: &[u8]) -> Pkcs7Result<usize> {
        self.top.write(buf)
    }

    pub fn write_all(&mut self, data: &[u8]) -> Pkcs7Result<()> {
        write_all(self.top.as_mut(), data)
    }

    pub fn flush(&mut self) -> Pkcs7Result<()> {
        self.top.flush()
    }

    /// Pump `reader` into the chain in `buffer_size` chunks. Returns the
    /// number of bytes copied.
    pub fn copy_from<R: Read>(&mut self, reader: &mut R, buffer_size: usize) -> Pkcs7Result<u64> {
        let mut buf = vec![0u8; buffer_size.max(1)];
        let mut total = 0u64;
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            self.write_all(&buf[..n])?;
            total += n as u64;
        }
        Ok(total)
    }

    /// Read the chain to end of stream into `writer`. Returns the number of
    /// bytes written.
    pub fn drain_to<W: Write>(&mut self, writer: &mut W, buffer_size: usize) -> Pkcs7Result<u64> {
        let mut buf = vec![0u8; buffer_size.max(1)];
        let mut total = 0u64;
        loop {
            let n = self.read(&mut buf)?;
            if n == 0 {
                writer.flush()?;
                return Ok(total);
            }
            writer.write_all(&buf[..n])?;
            total += n as u64;
        }
    }

    /// Read the chain to end of stream.
    pub fn read_to_end(&mut self, buffer_size: usize) -> Pkcs7Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut buf = vec![0u8; buffer_size.max(1)];
        loop {
            let n = self.read(&mut buf)?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&buf[..n]);
        }
    }
}

impl std::fmt::Debug for BioChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.stages()).finish()
    }
}
