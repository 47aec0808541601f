//! Opaque S/MIME framing (`application/x-pkcs7-mime`).
//!
//! Only the opaque form is handled: one header block followed by the
//! base64-encoded DER body. Clear-signed `multipart/signed` documents are
//! rejected.

use crate::domain::constants::STREAM_BUFFER_SIZE;
use crate::domain::mime::MimeHeader;
use crate::domain::pkcs7::{ContentType, Pkcs7};
use crate::infra::error::{Pkcs7Error, Pkcs7Result};
use crate::services::pem::{decode_base64, encode_base64};

const SMIME_FILENAME: &str = "smime.p7m";
const PKCS7_MIME_TYPES: [&str; 2] = ["application/x-pkcs7-mime", "application/pkcs7-mime"];

/// Parsed S/MIME document: its header block and the decoded message.
#[derive(Debug, Clone)]
pub struct SmimeDocument {
    pub headers: Vec<MimeHeader>,
    pub message: Pkcs7,
}

impl SmimeDocument {
    /// First header named `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&MimeHeader> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [MimeHeader], name: &str) -> Option<&'a MimeHeader> {
    headers.iter().find(|h| h.name().eq_ignore_ascii_case(name))
}

fn smime_type(p7: &Pkcs7) -> Option<&'static str> {
    match p7.content_type() {
        ContentType::Signed => match p7.signer_infos() {
            Ok([]) => Some("certs-only"),
            _ => Some("signed-data"),
        },
        ContentType::Enveloped => Some("enveloped-data"),
        _ => None,
    }
}

/// Render `p7` as an opaque S/MIME entity with base64 lines of
/// `line_length` characters.
pub fn write_smime(p7: &Pkcs7, line_length: usize) -> Pkcs7Result<String> {
    let mut content_type = MimeHeader::new("Content-Type", PKCS7_MIME_TYPES[0]);
    if let Some(kind) = smime_type(p7) {
        content_type = content_type.with_param("smime-type", kind);
    }
    let content_type = content_type.with_param("name", SMIME_FILENAME);

    let headers = [
        MimeHeader::new("MIME-Version", "1.0"),
        MimeHeader::new("Content-Disposition", "attachment").with_param("filename", SMIME_FILENAME),
        content_type,
        MimeHeader::new("Content-Transfer-Encoding", "base64"),
    ];

    let mut out = String::new();
    for header in &headers {
        out.push_str(&header.to_string());
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&encode_base64(&p7.to_der()?, line_length)?);
    log::debug!("Wrote S/MIME entity for {}", p7.content_type());
    Ok(out)
}

/// Split an entity into its unfolded header block and body.
///
/// Continuation lines (leading whitespace) are joined onto the previous
/// header. Lines that are not `name: value` pairs are skipped.
pub fn parse_headers(input: &str) -> (Vec<MimeHeader>, &str) {
    let mut headers = Vec::new();
    let mut current: Option<String> = None;
    let mut consumed = 0;

    for raw in input.split_inclusive('\n') {
        consumed += raw.len();
        let line = raw.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            break;
        }
        if line.starts_with([' ', '\t']) {
            if let Some(unfolded) = current.as_mut() {
                unfolded.push(' ');
                unfolded.push_str(line.trim());
            }
            continue;
        }
        if let Some(done) = current.replace(line.to_string()) {
            headers.extend(MimeHeader::parse(&done));
        }
    }
    if let Some(done) = current {
        headers.extend(MimeHeader::parse(&done));
    }
    (headers, &input[consumed..])
}

/// Byte offset split at the first blank line.
fn split_entity(input: &[u8]) -> (&[u8], &[u8]) {
    let mut offset = 0;
    for line in input.split_inclusive(|&b| b == b'\n') {
        offset += line.len();
        if line.iter().all(u8::is_ascii_whitespace) {
            return (&input[..offset], &input[offset..]);
        }
    }
    (input, &input[input.len()..])
}

/// Parse an opaque S/MIME entity.
///
/// # Errors
/// `UnsupportedOperation` for `multipart/signed`, `MalformedMessage` when
/// the content type is missing or is not a PKCS#7 MIME type.
pub fn read_smime(input: &[u8]) -> Pkcs7Result<SmimeDocument> {
    let (head, body) = split_entity(input);
    let head = std::str::from_utf8(head)
        .map_err(|e| Pkcs7Error::malformed(format!("S/MIME headers are not text: {e}")))?;
    let (headers, _) = parse_headers(head);

    let content_type = find_header(&headers, "content-type")
        .ok_or_else(|| Pkcs7Error::malformed("no Content-Type header"))?;
    match content_type.value() {
        "multipart/signed" => {
            return Err(Pkcs7Error::unsupported("multipart/signed", "read_smime"));
        }
        value if PKCS7_MIME_TYPES.contains(&value) => {}
        other => {
            return Err(Pkcs7Error::malformed(format!("invalid MIME type: {other}")));
        }
    }

    let encoding = find_header(&headers, "content-transfer-encoding")
        .map_or("base64", MimeHeader::value);
    let der = match encoding {
        "base64" => decode_base64(body, STREAM_BUFFER_SIZE)?,
        "binary" | "8bit" | "7bit" => body.to_vec(),
        other => {
            return Err(Pkcs7Error::unsupported(
                format!("transfer encoding {other}"),
                "read_smime",
            ))
        }
    };

    let message = Pkcs7::from_der(&der)?;
    log::debug!("Read S/MIME entity carrying {}", message.content_type());
    Ok(SmimeDocument { headers, message })
}

/// Prefix `data` with a `text/plain` header and convert bare `\n` line
/// endings to `\r\n`.
#[must_use]
pub fn add_text_header(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 32 + 32);
    out.extend_from_slice(b"Content-Type: text/plain\r\n\r\n");
    let mut previous = 0u8;
    for &byte in data {
        if byte == b'\n' && previous != b'\r' {
            out.push(b'\r');
        }
        out.push(byte);
        previous = byte;
    }
    out
}

/// Inverse of [`add_text_header`]: require a `text/plain` header block
/// and return the body that follows it.
pub fn strip_text_header(data: &[u8]) -> Pkcs7Result<Vec<u8>> {
    let (head, body) = split_entity(data);
    let head = String::from_utf8_lossy(head);
    let (headers, _) = parse_headers(&head);
    match find_header(&headers, "content-type").map(MimeHeader::value) {
        Some("text/plain") => Ok(body.to_vec()),
        Some(other) => Err(Pkcs7Error::malformed(format!("invalid MIME type: {other}"))),
        None => Err(Pkcs7Error::malformed("no Content-Type header")),
    }
}
