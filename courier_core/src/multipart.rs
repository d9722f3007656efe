use bytes::{BufMut, Bytes, BytesMut};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::error::CourierError;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum MimeType {
    ImagePng,
    ImageJpeg,
    Other(String),
}

impl MimeType {
    pub fn name(&self) -> &str {
        match self {
            MimeType::ImagePng => "image/png",
            MimeType::ImageJpeg => "image/jpeg",
            MimeType::Other(s) => s.as_str(),
        }
    }

    pub fn extension(&self) -> Option<&'static str> {
        match self {
            MimeType::ImagePng => Some("png"),
            MimeType::ImageJpeg => Some("jpg"),
            MimeType::Other(_) => None,
        }
    }
}

impl From<&str> for MimeType {
    fn from(s: &str) -> Self {
        match s {
            "image/png" => MimeType::ImagePng,
            "image/jpeg" => MimeType::ImageJpeg,
            other => MimeType::Other(other.to_string()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MultipartPart {
    pub filename: String,
    pub mime: MimeType,
    pub data: Bytes,
}

impl MultipartPart {
    /// Part with an explicit, final filename.
    pub fn file(filename: impl Into<String>, mime: impl Into<MimeType>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            mime: mime.into(),
            data: data.into(),
        }
    }

    /// Filename derived from the mime type: `"{name}.{ext}"`, where `name`
    /// defaults to the current unix timestamp.
    pub fn with_type(name: Option<&str>, mime: MimeType, data: impl Into<Bytes>) -> Self {
        let stem = match name {
            Some(n) => n.to_string(),
            None => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs_f64()
                .to_string(),
        };
        let filename = match mime.extension() {
            Some(ext) => format!("{stem}.{ext}"),
            None => stem,
        };
        Self {
            filename,
            mime,
            data: data.into(),
        }
    }
}

/// Ordered field name → part mapping; encoding follows insertion order.
#[derive(Clone, Debug, Default)]
pub struct MultipartForm {
    parts: Vec<(String, MultipartPart)>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn part(mut self, name: impl Into<String>, part: MultipartPart) -> Self {
        self.push(name, part);
        self
    }

    /// Replaces an existing field with the same name in place.
    pub fn push(&mut self, name: impl Into<String>, part: MultipartPart) {
        let name = name.into();
        match self.parts.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = part,
            None => self.parts.push((name, part)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MultipartPart)> {
        self.parts.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, MultipartPart)> for MultipartForm {
    fn from_iter<I: IntoIterator<Item = (N, MultipartPart)>>(iter: I) -> Self {
        let mut form = MultipartForm::new();
        for (n, p) in iter {
            form.push(n, p);
        }
        form
    }
}

#[derive(Clone, Debug)]
pub struct EncodedMultipart {
    pub boundary: String,
    pub body: Bytes,
}

impl EncodedMultipart {
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

#[derive(Clone, Debug, Default)]
pub struct MultipartEncoder {
    boundary: Option<String>,
}

impl MultipartEncoder {
    /// Fresh random boundary per `encode` call.
    pub fn new() -> Self {
        Self { boundary: None }
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: Some(boundary.into()),
        }
    }

    pub fn encode(&self, form: &MultipartForm) -> Result<EncodedMultipart, CourierError> {
        let boundary = match &self.boundary {
            Some(b) => {
                if let Some(field) = colliding_field(form, b) {
                    return Err(CourierError::BoundaryCollision {
                        boundary: b.clone(),
                        field: field.to_string(),
                    });
                }
                b.clone()
            }
            None => loop {
                let candidate = format!("Boundary-{}", Uuid::new_v4());
                if colliding_field(form, &candidate).is_none() {
                    break candidate;
                }
            },
        };
        Ok(EncodedMultipart {
            body: write_body(form, &boundary),
            boundary,
        })
    }
}

fn colliding_field<'a>(form: &'a MultipartForm, boundary: &str) -> Option<&'a str> {
    let needle = boundary.as_bytes();
    form.iter()
        .find(|(_, p)| contains(&p.data, needle))
        .map(|(n, _)| n)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Percent-escapes the bytes that could end a quoted `Content-Disposition`
/// parameter or start a new header line, as browsers do for form data.
fn escape_disposition_param(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("%22"),
            '\r' => out.push_str("%0D"),
            '\n' => out.push_str("%0A"),
            c => out.push(c),
        }
    }
    out
}

fn write_body(form: &MultipartForm, boundary: &str) -> Bytes {
    let payload: usize = form.iter().map(|(_, p)| p.data.len() + 128).sum();
    let mut buf = BytesMut::with_capacity(payload + boundary.len() + 8);
    for (name, part) in form.iter() {
        buf.put_slice(format!("--{boundary}\r\n").as_bytes());
        buf.put_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                escape_disposition_param(name),
                escape_disposition_param(&part.filename)
            )
            .as_bytes(),
        );
        buf.put_slice(format!("Content-Type: {}\r\n\r\n", part.mime.name()).as_bytes());
        buf.put_slice(&part.data);
        buf.put_slice(b"\r\n");
    }
    buf.put_slice(format!("--{boundary}--").as_bytes());
    buf.freeze()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn quotes_and_line_breaks_cannot_inject_part_headers() {
        let form = MultipartForm::new().part(
            "f\"ield",
            MultipartPart::file("a.txt\"\r\nX-Evil: 1", "text/plain", "d"),
        );
        let enc = MultipartEncoder::with_boundary("B").encode(&form).unwrap();
        let body = std::str::from_utf8(&enc.body).unwrap();
        assert!(body.contains(
            "Content-Disposition: form-data; name=\"f%22ield\"; filename=\"a.txt%22%0D%0AX-Evil: 1\"\r\n"
        ));
        assert!(!body.contains("\r\nX-Evil"));
    }

    #[test]
    fn single_field_matches_wire_format() {
        let form = MultipartForm::new().part("photo", MultipartPart::file("a.png", "image/png", "X"));
        let enc = MultipartEncoder::with_boundary("B").encode(&form).unwrap();
        assert_eq!(
            enc.body.as_ref(),
            b"--B\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"a.png\"\r\nContent-Type: image/png\r\n\r\nX\r\n--B--"
        );
        assert_eq!(enc.content_type(), "multipart/form-data; boundary=B");
    }

    #[test]
    fn fields_keep_insertion_order() {
        let form = MultipartForm::new()
            .part("z", MultipartPart::file("z.bin", "application/octet-stream", "1"))
            .part("a", MultipartPart::file("a.bin", "application/octet-stream", "2"));
        let enc = MultipartEncoder::with_boundary("B").encode(&form).unwrap();
        let body = String::from_utf8(enc.body.to_vec()).unwrap();
        assert!(body.find("name=\"z\"").unwrap() < body.find("name=\"a\"").unwrap());
        assert!(body.ends_with("\r\n--B--"));
    }

    #[test]
    fn empty_form_is_only_the_closing_marker() {
        let enc = MultipartEncoder::with_boundary("B").encode(&MultipartForm::new()).unwrap();
        assert_eq!(enc.body.as_ref(), b"--B--");
    }

    #[test]
    fn explicit_boundary_inside_payload_is_rejected() {
        let form = MultipartForm::new().part("f", MultipartPart::file("f.txt", "text/plain", "xx--Bxx"));
        let err = MultipartEncoder::with_boundary("--B").encode(&form).unwrap_err();
        match err {
            CourierError::BoundaryCollision { field, .. } => assert_eq!(field, "f"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn generated_boundaries_are_unique_per_call() {
        let form = MultipartForm::new().part("f", MultipartPart::file("f", "text/plain", "data"));
        let enc = MultipartEncoder::new();
        let a = enc.encode(&form).unwrap();
        let b = enc.encode(&form).unwrap();
        assert_ne!(a.boundary, b.boundary);
        assert!(a.boundary.starts_with("Boundary-"));
    }

    #[test]
    fn typed_part_derives_filename_from_mime() {
        let p = MultipartPart::with_type(Some("avatar"), MimeType::ImageJpeg, Bytes::from_static(b"j"));
        assert_eq!(p.filename, "avatar.jpg");
        let p = MultipartPart::with_type(None, MimeType::ImagePng, Bytes::new());
        assert!(p.filename.ends_with(".png"));
    }
}
