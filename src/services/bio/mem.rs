//! Chain endpoints.

use std::any::Any;
use std::io::{ErrorKind, Read, Write};

use super::{Bio, BioType};
use crate::infra::error::{Pkcs7Error, Pkcs7Result};

/// In-memory buffer. Writes append; reads consume from the front.
#[derive(Debug, Default, Clone)]
pub struct MemBio {
    buffer: Vec<u8>,
    position: usize,
}

impl MemBio {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer pre-loaded with `data` for reading.
    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            buffer: data,
            position: 0,
        }
    }

    /// Bytes written and not yet read.
    #[must_use]
    pub fn contents(&self) -> &[u8] {
        &self.buffer[self.position..]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len() - self.position
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Bio for MemBio {
    fn bio_type(&self) -> BioType {
        BioType::Mem
    }

    fn read(&mut self, buf: &mut [u8]) -> Pkcs7Result<usize> {
        let available = self.contents();
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.position += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Pkcs7Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Pkcs7Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Discards writes; always at end of stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBio;

impl Bio for NullBio {
    fn bio_type(&self) -> BioType {
        BioType::Null
    }
    fn read(&mut self, _buf: &mut [u8]) -> Pkcs7Result<usize> {
        Ok(0)
    }
    fn write(&mut self, buf: &[u8]) -> Pkcs7Result<usize> {
        Ok(buf.len())
    }
    fn flush(&mut self) -> Pkcs7Result<()> {
        Ok(())
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Read-only endpoint over any `std::io::Read`.
pub struct ReaderBio<R> {
    inner: R,
}

impl<R: Read> ReaderBio<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
    pub fn get_ref(&self) -> &R {
        &self.inner
    }
}

impl<R: Read + 'static> Bio for ReaderBio<R> {
    fn bio_type(&self) -> BioType {
        BioType::Source
    }

    fn read(&mut self, buf: &mut [u8]) -> Pkcs7Result<usize> {
        loop {
            match self.inner.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn write(&mut self, _buf: &[u8]) -> Pkcs7Result<usize> {
        Err(Pkcs7Error::unsupported("read-only stream endpoint", "write"))
    }

    fn flush(&mut self) -> Pkcs7Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Write-only endpoint over any `std::io::Write`.
pub struct WriterBio<W> {
    inner: W,
}

impl<W: Write> WriterBio<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
    pub fn get_ref(&self) -> &W {
        &self.inner
    }
}

impl<W: Write + 'static> Bio for WriterBio<W> {
    fn bio_type(&self) -> BioType {
        BioType::Sink
    }

    fn read(&mut self, _buf: &mut [u8]) -> Pkcs7Result<usize> {
        Err(Pkcs7Error::unsupported("write-only stream endpoint", "read"))
    }

    fn write(&mut self, buf: &[u8]) -> Pkcs7Result<usize> {
        loop {
            match self.inner.write(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn flush(&mut self) -> Pkcs7Result<()> {
        Ok(self.inner.flush()?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_read_is_repeatable_at_eof() {
        let mut mem = MemBio::from_bytes(b"abc".to_vec());
        let mut buf = [0u8; 2];
        assert_eq!(mem.read(&mut buf).unwrap(), 2);
        assert_eq!(mem.read(&mut buf).unwrap(), 1);
        assert_eq!(mem.read(&mut buf).unwrap(), 0);
        assert_eq!(mem.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn reader_errors_keep_their_kind() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(ErrorKind::ConnectionReset, "reset"))
            }
        }
        let mut bio = ReaderBio::new(Broken);
        match bio.read(&mut [0u8; 4]) {
            Err(Pkcs7Error::Io(e)) => assert_eq!(e.kind(), ErrorKind::ConnectionReset),
            other => panic!("unexpected {other:?}"),
        }
        assert!(bio.write(b"x").is_err());
    }
}
