//! Input decoding.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::bytes::Regex;

static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([A-Za-z0-9_\-:.]+)"#).expect("valid regex")
});

/// The charset declared by a `<meta>` tag near the start of the document.
pub(crate) fn sniff_charset(bytes: &[u8]) -> Option<&str> {
    let head = &bytes[..bytes.len().min(1024)];
    let caps = META_CHARSET.captures(head)?;
    std::str::from_utf8(caps.get(1)?.as_bytes()).ok()
}

/// Decode bytes to a string.
///
/// UTF-8 (with or without a BOM) is tried first, then `hint_encoding`, and
/// finally Windows-1252, which accepts any input.
pub(crate) fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8_with_bom() {
        assert_eq!(decode_text(b"\xEF\xBB\xBFcaf\xC3\xA9", None), "café");
    }

    #[test]
    fn test_decode_hint_and_fallback() {
        assert_eq!(decode_text(b"caf\xE9", Some("iso-8859-1")), "café");
        assert_eq!(decode_text(b"caf\xE9", Some("bogus")), "café");
        assert_eq!(decode_text(b"\x93hi\x94", None), "\u{201C}hi\u{201D}");
    }

    #[test]
    fn test_sniff_charset() {
        assert_eq!(sniff_charset(br#"<html><head><meta charset="koi8-r">"#), Some("koi8-r"));
        assert_eq!(
            sniff_charset(br#"<meta http-equiv="Content-Type" content="text/html; charset=windows-1251">"#),
            Some("windows-1251")
        );
        assert_eq!(sniff_charset(b"<p>plain</p>"), None);
    }
}
