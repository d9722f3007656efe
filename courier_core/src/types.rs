/// Normalized URL path: always rooted, no `//`, no trailing slash except root.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UrlPath {
    inner: String,
}

impl UrlPath {
    pub fn new() -> Self {
        Self {
            inner: "/".to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        if self.inner.is_empty() {
            "/"
        } else {
            self.inner.as_str()
        }
    }

    /// Appends a trusted literal; may contain `/`. Not for caller data, see
    /// [`push_segment_encoded`](Self::push_segment_encoded).
    pub fn push_raw(&mut self, piece: &str) {
        let piece = piece.trim();
        if piece.is_empty() || piece == "/" {
            return;
        }

        if self.inner.is_empty() {
            self.inner.push('/');
        } else if !self.inner.starts_with('/') {
            self.inner.insert(0, '/');
        }

        let left_slash = self.inner.ends_with('/');
        let right_slash = piece.starts_with('/');

        match (left_slash, right_slash) {
            (true, true) => {
                self.inner.pop();
                self.inner.push_str(piece);
            }
            (false, false) => {
                self.inner.push('/');
                self.inner.push_str(piece);
            }
            _ => {
                self.inner.push_str(piece);
            }
        }

        if self.inner.len() > 1 && self.inner.ends_with('/') {
            self.inner.pop();
        }
    }

    fn percent_encode_path_segment(seg: &str) -> String {
        // RFC3986 "unreserved": ALPHA / DIGIT / "-" / "." / "_" / "~"
        const HEX: &[u8; 16] = b"0123456789ABCDEF";
        let bytes = seg.as_bytes();
        let mut out = String::with_capacity(bytes.len());
        for &b in bytes {
            let unreserved = matches!(
              b,
              b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~'
            );
            if unreserved {
                out.push(b as char);
            } else {
                out.push('%');
                out.push(HEX[(b >> 4) as usize] as char);
                out.push(HEX[(b & 0x0F) as usize] as char);
            }
        }
        out
    }

    /// Exactly one segment: slashes inside `seg` are percent-encoded, leading
    /// and trailing ones dropped.
    pub fn push_segment_encoded(&mut self, seg: &str) {
        let seg = seg.trim_matches('/');
        if seg.is_empty() {
            return;
        }
        let enc = Self::percent_encode_path_segment(seg);
        self.push_raw(&enc);
    }
}
