//! MIME header model for S/MIME framing.
//!
//! Header names and values are case-folded to lower case on construction;
//! parameter names are folded too, parameter values are kept verbatim.
//! Parameters keep their insertion order.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MimeParam {
    name: String,
    value: String,
}

impl MimeParam {
    #[must_use]
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.trim().to_ascii_lowercase(),
            value: value.trim().to_string(),
        }
    }
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MimeHeader {
    name: String,
    value: String,
    params: Vec<MimeParam>,
}

impl MimeHeader {
    #[must_use]
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.trim().to_ascii_lowercase(),
            value: value.trim().to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.push(MimeParam::new(name, value));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
    #[must_use]
    pub fn params(&self) -> &[MimeParam] {
        &self.params
    }

    /// Parameter value by (case-insensitive) name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(MimeParam::value)
    }

    /// Parse one unfolded header line, `Name: value; key=val; key2="v 2"`.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let (name, rest) = line.split_once(':')?;
        if name.trim().is_empty() {
            return None;
        }
        let mut segments = split_unquoted(rest, ';').into_iter();
        let mut header = Self::new(name, &segments.next().unwrap_or_default());
        for segment in segments {
            if let Some((key, value)) = segment.split_once('=') {
                header = header.with_param(key, unquote(value.trim()));
            }
        }
        Some(header)
    }
}

impl fmt::Display for MimeHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", canonical_name(&self.name), self.value)?;
        for param in &self.params {
            if param.value.contains(|c: char| c.is_whitespace() || c == ';' || c == '"') {
                write!(f, "; {}=\"{}\"", param.name, param.value.replace('"', "\\\""))?;
            } else {
                write!(f, "; {}={}", param.name, param.value)?;
            }
        }
        Ok(())
    }
}

/// `content-type` -> `Content-Type`
fn canonical_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn split_unquoted(input: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut escaped = false;
    for c in input.chars() {
        match c {
            _ if escaped => {
                current.push(c);
                escaped = false;
            }
            '\\' if quoted => {
                current.push(c);
                escaped = true;
            }
            '"' => {
                current.push(c);
                quoted = !quoted;
            }
            c if c == separator && !quoted => parts.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    parts.push(current);
    parts
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_folds_case_and_keeps_param_order() {
        let h = MimeHeader::parse(
            "Content-Type: Application/X-PKCS7-MIME; smime-type=enveloped-data; Name=\"smime.p7m\"",
        )
        .unwrap();
        assert_eq!(h.name(), "content-type");
        assert_eq!(h.value(), "application/x-pkcs7-mime");
        let names: Vec<_> = h.params().iter().map(MimeParam::name).collect();
        assert_eq!(names, ["smime-type", "name"]);
        assert_eq!(h.param("NAME"), Some("smime.p7m"));
    }

    #[test]
    fn quoted_separator_stays_in_value() {
        let h = MimeHeader::parse("Content-Disposition: attachment; filename=\"a;b.p7m\"").unwrap();
        assert_eq!(h.param("filename"), Some("a;b.p7m"));
    }

    #[test]
    fn display_uses_canonical_name() {
        let h = MimeHeader::new("content-transfer-encoding", "BASE64");
        assert_eq!(h.to_string(), "Content-Transfer-Encoding: base64");
        assert!(MimeHeader::parse("no colon here").is_none());
    }
}
