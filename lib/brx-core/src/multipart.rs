//! `multipart/form-data` payloads.
//!
//! The Request Service treats a [`Form`] as opaque: it is encoded here and
//! sent with its own content type, never touched by the JSON path.
//!
//! ```
//! use brx_core::{Form, Part};
//!
//! let form = Form::new()
//!     .text("text", "Buy milk")
//!     .part(Part::file("attachment", "list.txt", "milk\neggs"));
//!
//! let (content_type, body) = form.into_body();
//! assert!(content_type.starts_with("multipart/form-data; boundary="));
//! assert!(!body.is_empty());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::{BufMut, Bytes, BytesMut};

const CRLF: &[u8] = b"\r\n";

/// One field of a [`Form`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl Part {
    /// A plain text field. No content type is written for it.
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: Bytes::from(value.into()),
        }
    }

    /// A file field, typed from the file extension.
    #[must_use]
    pub fn file(name: impl Into<String>, filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let filename = filename.into();
        Self {
            name: name.into(),
            content_type: Some(content_type_of(&filename).to_string()),
            filename: Some(filename),
            data: data.into(),
        }
    }

    /// Replace the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name of a file field.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Declared content type.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn write_to(&self, buf: &mut BytesMut) {
        buf.put_slice(b"Content-Disposition: form-data; name=\"");
        buf.put_slice(self.name.as_bytes());
        buf.put_u8(b'"');
        if let Some(filename) = &self.filename {
            buf.put_slice(b"; filename=\"");
            buf.put_slice(filename.as_bytes());
            buf.put_u8(b'"');
        }
        buf.put_slice(CRLF);

        if let Some(content_type) = &self.content_type {
            buf.put_slice(b"Content-Type: ");
            buf.put_slice(content_type.as_bytes());
            buf.put_slice(CRLF);
        }

        buf.put_slice(CRLF);
        buf.put_slice(&self.data);
        buf.put_slice(CRLF);
    }
}

fn content_type_of(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("json") => "application/json",
        Some("txt" | "md") => "text/plain",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

/// An ordered list of [`Part`]s and the boundary separating them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// An empty form with a fresh boundary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(fresh_boundary())
    }

    /// An empty form with a fixed boundary.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    /// Append a part.
    #[must_use]
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Append a text field.
    #[must_use]
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.part(Part::text(name, value))
    }

    /// The parts, in order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// The `Content-Type` header value, boundary included.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Encode into `(content type, body)`.
    #[must_use]
    pub fn into_body(self) -> (String, Bytes) {
        let delimiter = format!("--{}", self.boundary);
        let mut buf = BytesMut::new();

        for part in &self.parts {
            buf.put_slice(delimiter.as_bytes());
            buf.put_slice(CRLF);
            part.write_to(&mut buf);
        }
        buf.put_slice(delimiter.as_bytes());
        buf.put_slice(b"--");
        buf.put_slice(CRLF);

        (self.content_type(), buf.freeze())
    }
}

fn fresh_boundary() -> String {
    static SEQUENCE: AtomicU64 = AtomicU64::new(0);

    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos());
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);

    format!("brx-{nanos:x}-{sequence}")
}
