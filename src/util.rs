//! Input decoding.

use std::borrow::Cow;

/// How far into a document to look for a `<meta charset>` declaration.
const META_SCAN_LEN: usize = 1024;

/// Decode HTML bytes to a string.
///
/// 1. A byte order mark, or valid UTF-8, wins
/// 2. Otherwise the `<meta charset>` declaration, if the label is known
/// 3. Otherwise Windows-1252, which never fails
///
/// Borrows when the input is valid UTF-8 without a BOM.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    // Sniffs UTF-8 and UTF-16 BOMs
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }

    if let Some(label) = extract_meta_charset(bytes)
        && let Some(encoding) = encoding_rs::Encoding::for_label(label.as_bytes())
    {
        tracing::debug!(charset = %label, "decoding with declared charset");
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// The charset label from `<meta charset="...">` or
/// `<meta http-equiv="Content-Type" content="text/html; charset=...">`
/// near the start of a document.
pub(crate) fn extract_meta_charset(bytes: &[u8]) -> Option<String> {
    let prefix = &bytes[..bytes.len().min(META_SCAN_LEN)];
    let lower = prefix.to_ascii_lowercase();

    let mut from = 0;
    while let Some(pos) = find(&lower[from..], b"<meta") {
        let tag_start = from + pos;
        let tag_end = find(&lower[tag_start..], b">").map_or(lower.len(), |e| tag_start + e);
        let tag = &lower[tag_start..tag_end];

        if let Some(cs) = find(tag, b"charset=") {
            let value = &tag[cs + b"charset=".len()..];
            let value = value
                .strip_prefix(b"\"")
                .or_else(|| value.strip_prefix(b"'"))
                .unwrap_or(value);
            let end = value
                .iter()
                .position(|&b| matches!(b, b'"' | b'\'' | b';' | b' ' | b'/' | b'>'))
                .unwrap_or(value.len());
            let label = std::str::from_utf8(&value[..end]).ok()?.trim();
            if !label.is_empty() {
                return Some(label.to_string());
            }
        }
        from = tag_end;
    }
    None
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
