//! Escaping for source text stored inside the carrier node.
//!
//! Two payload encodings exist:
//! - [`Payload::Text`]: entity-escaped text, readable in any text editor
//! - [`Payload::Hex`]: lowercase hex of the UTF-8 bytes, used only when the
//!   source holds characters that XML 1.0 cannot represent at all

use std::borrow::Cow;

/// Characters that must not appear literally in carrier text.
const ESCAPE_CHARS: [char; 6] = ['<', '>', '&', '"', '\'', '\r'];

/// Entity for a special character.
#[inline]
fn escape_char(c: char) -> Option<&'static str> {
    match c {
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '&' => Some("&amp;"),
        '"' => Some("&quot;"),
        '\'' => Some("&#39;"),
        // XML parsers fold CR and CRLF into LF; a reference survives
        '\r' => Some("&#13;"),
        _ => None,
    }
}

/// Escape markup-significant characters in carrier text.
///
/// Uses `Cow` to avoid allocation when no escaping is needed.
#[inline]
pub fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(ESCAPE_CHARS) {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match escape_char(c) {
            Some(entity) => result.push_str(entity),
            None => result.push(c),
        }
    }
    Cow::Owned(result)
}

/// Unescape carrier text.
///
/// Strict inverse of [`escape`]: accepts the five XML entities plus decimal
/// and hex character references. Returns `None` on a dangling `&` or an
/// unknown entity instead of guessing.
pub fn unescape(s: &str) -> Option<Cow<'_, str>> {
    if !s.contains('&') {
        return Some(Cow::Borrowed(s));
    }

    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find('&') {
        result.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find(';')?;
        result.push(decode_entity(&after[..end])?);
        rest = &after[end + 1..];
    }
    result.push_str(rest);

    Some(Cow::Owned(result))
}

/// Decode a single entity body (the part between `&` and `;`).
fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Whether XML 1.0 can carry `c` as character data.
#[inline]
fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Encoded form of a source document, ready to be written into a carrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload<'a> {
    /// Entity-escaped text.
    Text(Cow<'a, str>),
    /// Hex-encoded UTF-8 bytes.
    Hex(String),
}

impl<'a> Payload<'a> {
    /// Value of the `data-encoding` attribute, if one is needed.
    pub fn encoding(&self) -> Option<&'static str> {
        match self {
            Self::Text(_) => None,
            Self::Hex(_) => Some(HEX_ENCODING),
        }
    }

    /// Escaped text to place between the carrier tags.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Hex(hex) => hex,
        }
    }
}

/// `data-encoding` value marking a hex payload.
pub const HEX_ENCODING: &str = "hex";

/// Encode source text for a carrier.
pub fn encode(source: &str) -> Payload<'_> {
    if source.chars().all(is_xml_char) {
        Payload::Text(escape(source))
    } else {
        Payload::Hex(hex::encode(source.as_bytes()))
    }
}

/// Decode raw (still escaped) carrier text.
///
/// `encoding` is the carrier's `data-encoding` attribute. Unknown encodings
/// and undecodable payloads yield `None`.
pub fn decode(raw: &str, encoding: Option<&str>) -> Option<String> {
    let text = unescape(raw)?;
    match encoding {
        None => Some(text.into_owned()),
        Some(HEX_ENCODING) => {
            let bytes = hex::decode(text.trim()).ok()?;
            String::from_utf8(bytes).ok()
        }
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_borrowed_when_clean() {
        assert!(matches!(escape("\\draw (0,0) -- (1,1);"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_escape_specials() {
        assert_eq!(
            escape(r#"<a href="x">&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;"
        );
        assert_eq!(escape("a\r\nb"), "a&#13;\nb");
    }

    #[test]
    fn test_unescape_references() {
        assert_eq!(unescape("&lt;&gt;&amp;&quot;&apos;").unwrap(), "<>&\"'");
        assert_eq!(unescape("&#65;&#x42;&#X43;").unwrap(), "ABC");
        assert_eq!(unescape("plain").unwrap(), "plain");
    }

    #[test]
    fn test_unescape_rejects_garbage() {
        assert_eq!(unescape("a & b"), None);
        assert_eq!(unescape("&nbsp;"), None);
        assert_eq!(unescape("&#xD800;"), None);
        assert_eq!(unescape("&#;"), None);
    }

    #[test]
    fn test_encode_picks_hex_for_control_chars() {
        assert!(matches!(encode("tab\tok\n"), Payload::Text(_)));
        let payload = encode("nul\0here");
        assert_eq!(payload.encoding(), Some(HEX_ENCODING));
        assert_eq!(decode(payload.as_str(), payload.encoding()).unwrap(), "nul\0here");
    }

    #[test]
    fn test_decode_unknown_encoding() {
        assert_eq!(decode("abcd", Some("base85")), None);
        assert_eq!(decode("zz", Some(HEX_ENCODING)), None);
    }

    #[test]
    fn test_text_round_trip() {
        for s in ["", "   ", "\n\t", "]]>", "&amp;", "</script>", "\r\n\r", "𝔗𝔦𝔨𝔝 ∫"] {
            let payload = encode(s);
            assert_eq!(decode(payload.as_str(), payload.encoding()).as_deref(), Some(s));
        }
    }
}
