//! PEM armor for DER-encoded messages.

use crate::domain::constants::{
    BASE64_LINE_LENGTH, PEM_PKCS7_BEGIN, PEM_PKCS7_END, STREAM_BUFFER_SIZE,
};
use crate::domain::pkcs7::Pkcs7;
use crate::infra::error::{Pkcs7Error, Pkcs7Result};
use crate::services::bio::{BioChain, MemBio};

/// Base64-encode `der` through a filter chain, wrapped at `line_length`.
pub(crate) fn encode_base64(der: &[u8], line_length: usize) -> Pkcs7Result<String> {
    let mut chain = BioChain::new(MemBio::new()).push_base64(line_length);
    chain.write_all(der)?;
    chain.flush()?;
    let mem = chain
        .find_mem()
        .ok_or_else(|| Pkcs7Error::IncompleteMessage("filter chain has no memory endpoint".into()))?;
    String::from_utf8(mem.contents().to_vec()).map_err(|e| Pkcs7Error::Base64(e.to_string()))
}

/// Decode a base64 body (whitespace tolerated) through a filter chain.
pub(crate) fn decode_base64(text: &[u8], buffer_size: usize) -> Pkcs7Result<Vec<u8>> {
    let mut chain = BioChain::new(MemBio::from_bytes(text.to_vec())).push_base64(0);
    chain.read_to_end(buffer_size)
}

impl Pkcs7 {
    /// `-----BEGIN PKCS7-----` armored DER, 64 characters per line.
    pub fn to_pem(&self) -> Pkcs7Result<String> {
        let body = encode_base64(&self.to_der()?, BASE64_LINE_LENGTH)?;
        Ok(format!("{PEM_PKCS7_BEGIN}\n{body}{PEM_PKCS7_END}\n"))
    }

    /// Parse a PEM-armored message. Text outside the armor is ignored.
    ///
    /// # Errors
    /// `MalformedMessage` when either armor line is missing; `Base64` for a
    /// corrupt body.
    pub fn from_pem(pem: &str) -> Pkcs7Result<Self> {
        let start = pem
            .find(PEM_PKCS7_BEGIN)
            .ok_or_else(|| Pkcs7Error::malformed("missing PEM header"))?
            + PEM_PKCS7_BEGIN.len();
        let end = pem[start..]
            .find(PEM_PKCS7_END)
            .ok_or_else(|| Pkcs7Error::malformed("missing PEM footer"))?
            + start;
        let der = decode_base64(pem[start..end].as_bytes(), STREAM_BUFFER_SIZE)?;
        Self::from_der(&der)
    }
}
