//! Body decoding: pick a charset, then turn the raw bytes into UTF-8.
//!
//! Remote blogs are old and messy, so decoding is lossy. A page with a
//! stray invalid byte still gets link-checked.

use encoding_rs::Encoding;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Only the head of a document is scanned for `<meta>` charset hints.
const META_SCAN_BYTES: usize = 4096;

static CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static META_CHARSET_REGEXES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#).unwrap(),
        Regex::new(r#"(?i)<meta\s+[^>]*?http-equiv\s*=\s*["']?content-type["']?[^>]*?content\s*=\s*["']?[^"'>]*?charset\s*=\s*([^"'\s;/>]+)"#).unwrap(),
    ]
});

/// Decode a response body given its `Content-Type` header value (if any).
pub fn decode_body(content_type: Option<&str>, body: &[u8]) -> String {
    let encoding = detect_encoding(content_type, body);
    let (decoded, used, had_errors) = encoding.decode(body);
    if had_errors {
        debug!(encoding = used.name(), "body contained undecodable bytes");
    }
    decoded.into_owned()
}

/// Charset resolution order: `Content-Type` header, `<meta>` hints in the
/// first 4KB, then statistical detection.
pub fn detect_encoding(content_type: Option<&str>, body: &[u8]) -> &'static Encoding {
    if let Some(encoding) = content_type.and_then(|ct| label_from(&CHARSET_REGEX, ct)) {
        return encoding;
    }

    let head = &body[..body.len().min(META_SCAN_BYTES)];
    let head_str = String::from_utf8_lossy(head);
    if let Some(encoding) = META_CHARSET_REGEXES
        .iter()
        .find_map(|regex| label_from(regex, &head_str))
    {
        return encoding;
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(head, body.len() <= META_SCAN_BYTES);
    detector.guess(None, true)
}

fn label_from(regex: &Regex, haystack: &str) -> Option<&'static Encoding> {
    let label = regex.captures(haystack)?.get(1)?.as_str().to_ascii_lowercase();
    Encoding::for_label(label.as_bytes())
}
