use std::any::Any;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::{write_all, Bio, BioType};
use crate::infra::error::{Pkcs7Error, Pkcs7Result};

/// Base64 stage.
///
/// Writing encodes: input is buffered to whole 3-byte groups, output is
/// broken into lines of `line_length` characters (0 disables wrapping),
/// and `flush` emits the padded tail plus a final newline. Reading
/// decodes, skipping any whitespace in the encoded stream.
pub struct Base64Bio {
    next: Box<dyn Bio>,
    line_length: usize,
    // encode side
    pending: Vec<u8>,
    column: usize,
    // decode side
    quantum: Vec<u8>,
    decoded: Vec<u8>,
    decoded_pos: usize,
    eof: bool,
}

impl Base64Bio {
    pub fn new(next: Box<dyn Bio>, line_length: usize) -> Self {
        Self {
            next,
            line_length,
            pending: Vec::new(),
            column: 0,
            quantum: Vec::new(),
            decoded: Vec::new(),
            decoded_pos: 0,
            eof: false,
        }
    }

    /// Push `encoded` downstream; line position is only advanced once the
    /// write has gone through.
    fn emit(&mut self, encoded: &str) -> Pkcs7Result<()> {
        let mut out = Vec::with_capacity(encoded.len() + encoded.len() / 64 + 1);
        let mut column = self.column;
        for byte in encoded.bytes() {
            out.push(byte);
            column += 1;
            if self.line_length > 0 && column == self.line_length {
                out.push(b'\n');
                column = 0;
            }
        }
        write_all(self.next.as_mut(), &out)?;
        self.column = column;
        Ok(())
    }

    fn fill(&mut self) -> Pkcs7Result<()> {
        let mut chunk = [0u8; 1024];
        let n = self.next.read(&mut chunk)?;
        if n == 0 {
            self.eof = true;
            if !self.quantum.is_empty() {
                let leftover = std::mem::take(&mut self.quantum);
                return Err(Pkcs7Error::Base64(format!(
                    "truncated input: {} trailing characters",
                    leftover.len()
                )));
            }
            return Ok(());
        }
        self.quantum
            .extend(chunk[..n].iter().copied().filter(|b| !b.is_ascii_whitespace()));
        let usable = self.quantum.len() / 4 * 4;
        if usable > 0 {
            self.decoded = STANDARD
                .decode(&self.quantum[..usable])
                .map_err(|e| Pkcs7Error::Base64(e.to_string()))?;
            self.decoded_pos = 0;
            self.quantum.drain(..usable);
        }
        Ok(())
    }
}

impl Bio for Base64Bio {
    fn bio_type(&self) -> BioType {
        BioType::Base64
    }

    fn read(&mut self, buf: &mut [u8]) -> Pkcs7Result<usize> {
        loop {
            if self.decoded_pos < self.decoded.len() {
                let available = &self.decoded[self.decoded_pos..];
                let n = available.len().min(buf.len());
                buf[..n].copy_from_slice(&available[..n]);
                self.decoded_pos += n;
                return Ok(n);
            }
            if self.eof || buf.is_empty() {
                return Ok(0);
            }
            self.fill()?;
        }
    }

    fn write(&mut self, buf: &[u8]) -> Pkcs7Result<usize> {
        let held = self.pending.len();
        self.pending.extend_from_slice(buf);
        let whole = self.pending.len() / 3 * 3;
        if whole > 0 {
            let encoded = STANDARD.encode(&self.pending[..whole]);
            if let Err(e) = self.emit(&encoded) {
                // `buf` was not taken; leave the earlier tail in place.
                self.pending.truncate(held);
                return Err(e);
            }
            self.pending.drain(..whole);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Pkcs7Result<()> {
        if !self.pending.is_empty() {
            let encoded = STANDARD.encode(&self.pending);
            self.emit(&encoded)?;
            self.pending.clear();
        }
        if self.column > 0 {
            self.column = 0;
            write_all(self.next.as_mut(), b"\n")?;
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
