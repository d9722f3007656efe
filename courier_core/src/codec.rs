use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use bytes::Bytes;

pub(crate) mod json;
pub(crate) mod text;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Format {
    Binary,
    Text,
}

pub trait FormatType {
    const FORMAT_TYPE: Format;
}

pub(crate) fn format_bytes_for_debug(format: Format, bytes: &[u8], max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    match format {
        Format::Text => {
            // Worst case UTF-8 expansion for lossy preview: cap by ~4 bytes per char.
            let max_bytes = max_chars.saturating_mul(4).max(1);
            let slice_len = bytes.len().min(max_bytes);
            let s0 = String::from_utf8_lossy(&bytes[..slice_len]).to_string();
            let mut s = truncate_for_debug(&s0, max_chars);
            if slice_len < bytes.len() && !s.ends_with('…') {
                s.push('…');
            }
            s
        }
        Format::Binary => {
            // base64: 3 bytes -> 4 chars.
            let max_bytes = max_chars.saturating_mul(3).div_ceil(4).max(1);
            let slice_len = bytes.len().min(max_bytes);
            let s0 = STANDARD_NO_PAD.encode(&bytes[..slice_len]);
            let mut s = truncate_for_debug(&s0, max_chars);
            if slice_len < bytes.len() && !s.ends_with('…') {
                s.push('…');
            }
            s
        }
    }
}

/// Guess a preview format from a `Content-Type` value.
pub(crate) fn format_for_content_type(ct: Option<&str>) -> Format {
    match ct {
        Some(ct)
            if ct.starts_with("text/")
                || ct.starts_with("application/json")
                || ct.starts_with("application/x-www-form-urlencoded") =>
        {
            Format::Text
        }
        None => Format::Text,
        Some(_) => Format::Binary,
    }
}

pub(crate) fn truncate_for_debug(s: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    let mut it = s.chars();
    let mut out = String::new();
    for _ in 0..max_chars {
        match it.next() {
            Some(c) => out.push(c),
            None => return out,
        }
    }
    if it.next().is_some() {
        out.push('…');
    }
    out
}

pub trait ContentType {
    /// Empty string: the codec has no meaningful `Content-Type` / `Accept`.
    const CONTENT_TYPE: &'static str;
}

/// Serializer collaborator, decode side.
pub trait Decodes<T>: ContentType + FormatType {
    type Error: std::error::Error + Send + Sync + 'static;
    fn decode(bytes: &Bytes) -> Result<T, Self::Error>;
}

/// Serializer collaborator, encode side.
pub trait Encodes<T>: ContentType + FormatType {
    type Error: std::error::Error + Send + Sync + 'static;
    fn encode(value: &T) -> Result<Bytes, Self::Error>;
}

pub struct NoContent;

impl ContentType for NoContent {
    const CONTENT_TYPE: &'static str = "";
}

impl FormatType for NoContent {
    const FORMAT_TYPE: Format = Format::Text;
}

impl Encodes<()> for NoContent {
    type Error = std::convert::Infallible;
    fn encode(_value: &()) -> Result<Bytes, Self::Error> {
        Ok(Bytes::new())
    }
}

impl Decodes<()> for NoContent {
    type Error = std::convert::Infallible;
    fn decode(_bytes: &Bytes) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Pass-through codec for opaque payloads.
pub struct Raw;

impl ContentType for Raw {
    const CONTENT_TYPE: &'static str = "application/octet-stream";
}

impl FormatType for Raw {
    const FORMAT_TYPE: Format = Format::Binary;
}

impl Encodes<Bytes> for Raw {
    type Error = std::convert::Infallible;
    fn encode(value: &Bytes) -> Result<Bytes, Self::Error> {
        Ok(value.clone())
    }
}

impl Decodes<Bytes> for Raw {
    type Error = std::convert::Infallible;
    fn decode(bytes: &Bytes) -> Result<Bytes, Self::Error> {
        Ok(bytes.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn debug_preview_truncates_text_and_base64_encodes_binary() {
        let s = format_bytes_for_debug(Format::Text, b"hello world", 5);
        assert_eq!(s, "hello…");

        let s = format_bytes_for_debug(Format::Binary, &[0x00, 0x01, 0x02], 1024);
        assert_eq!(s, "AAEC");

        assert_eq!(format_bytes_for_debug(Format::Text, b"abc", 0), "");
    }

    #[test]
    fn preview_format_follows_content_type() {
        assert_eq!(format_for_content_type(Some("application/json")), Format::Text);
        assert_eq!(format_for_content_type(Some("image/png")), Format::Binary);
        assert_eq!(format_for_content_type(None), Format::Text);
    }
}
