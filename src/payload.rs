//! Synthetic payload generation
//!
//! Output depends only on `(kind, id, size_kb)`; nothing here is random.

use std::fmt::Write as _;

use bytes::Bytes;

use crate::params::ContentKind;

/// Repeated body of a synthetic stylesheet
pub const CSS_SNIPPET: &str =
    "body { background: #f5f5f5; }\n.item { margin: 4px; padding: 4px; }\n";

/// Repeated body of a synthetic script
pub const JS_SNIPPET: &str = "function foo(){ return 42; }\nconst x = foo();\n";

/// Bytes per kilobyte
pub const KB: usize = 1024;

/// Generated response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Stylesheet or script text
    Text(String),
    /// Raw bytes
    Binary(Vec<u8>),
}

impl Payload {
    /// Length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    /// Whether the payload is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume into a response body buffer
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Text(text) => Bytes::from(text),
            Self::Binary(bytes) => Bytes::from(bytes),
        }
    }
}

/// Produce a payload of at least `size_kb` KB for `kind`
#[must_use]
pub fn synthesize(kind: ContentKind, id: Option<i32>, size_kb: u32) -> Payload {
    match kind {
        ContentKind::Css => Payload::Text(stylesheet(id, size_kb)),
        ContentKind::Js => Payload::Text(script(id, size_kb)),
        ContentKind::Image => Payload::Binary(image_bytes(size_kb)),
    }
}

/// Synthetic stylesheet text
#[must_use]
pub fn stylesheet(id: Option<i32>, size_kb: u32) -> String {
    let mut header = String::from("/* fake css file");
    push_header_fields(&mut header, id, size_kb);
    header.push_str(" */\n");

    fill_text(header, CSS_SNIPPET, size_kb)
}

/// Synthetic script text
#[must_use]
pub fn script(id: Option<i32>, size_kb: u32) -> String {
    let mut header = String::from("// fake js file");
    push_header_fields(&mut header, id, size_kb);
    header.push('\n');

    fill_text(header, JS_SNIPPET, size_kb)
}

/// `size_kb` KB where byte `i` is `i mod 256`
#[must_use]
pub fn image_bytes(size_kb: u32) -> Vec<u8> {
    let len = target_len(size_kb);
    // Truncation to u8 is the ramp.
    (0..len).map(|i| i as u8).collect()
}

fn push_header_fields(header: &mut String, id: Option<i32>, size_kb: u32) {
    if let Some(id) = id {
        let _ = write!(header, " id={id}");
    }
    let _ = write!(header, " size\u{2248}{size_kb}KB");
}

fn fill_text(header: String, snippet: &str, size_kb: u32) -> String {
    let target = target_len(size_kb);
    let mut text = header;
    text.reserve((target + snippet.len()).saturating_sub(text.len()));

    while text.len() < target {
        text.push_str(snippet);
    }

    text
}

fn target_len(size_kb: u32) -> usize {
    size_kb as usize * KB
}
