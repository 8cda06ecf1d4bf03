//! Character reference decoding and the escaping rules used by the serializer.

/// Named references we decode. Anything else passes through unchanged.
///
/// Only the semicolon-terminated forms are recognized; legacy no-semicolon references
/// (`&amp` at end of text) are left alone.
const NAMED: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{00A0}'),
    ("copy", '\u{00A9}'),
    ("reg", '\u{00AE}'),
    ("trade", '\u{2122}'),
    ("hellip", '\u{2026}'),
    ("mdash", '\u{2014}'),
    ("ndash", '\u{2013}'),
    ("lsquo", '\u{2018}'),
    ("rsquo", '\u{2019}'),
    ("ldquo", '\u{201C}'),
    ("rdquo", '\u{201D}'),
    ("laquo", '\u{00AB}'),
    ("raquo", '\u{00BB}'),
    ("bull", '\u{2022}'),
    ("middot", '\u{00B7}'),
    ("times", '\u{00D7}'),
    ("divide", '\u{00F7}'),
    ("deg", '\u{00B0}'),
    ("plusmn", '\u{00B1}'),
    ("sect", '\u{00A7}'),
    ("para", '\u{00B6}'),
    ("euro", '\u{20AC}'),
    ("pound", '\u{00A3}'),
    ("yen", '\u{00A5}'),
    ("cent", '\u{00A2}'),
    ("iexcl", '\u{00A1}'),
    ("iquest", '\u{00BF}'),
    ("rarr", '\u{2192}'),
    ("larr", '\u{2190}'),
];

const MAX_NAME_LEN: usize = 8;
const MAX_HEX_DIGITS: usize = 6; // 0x10FFFF
const MAX_DEC_DIGITS: usize = 7; // 1114111

/// Decode character references in text or attribute values.
///
/// Contract:
/// - Named references from a fixed table, semicolon-terminated.
/// - Numeric references (`&#215;`, `&#xD7;`) when well-formed, semicolon-terminated and a
///   valid Unicode scalar value.
/// - Everything else, including unknown names and malformed numerics, is copied unchanged.
pub(crate) fn decode_entities(s: &str) -> String {
    let Some(first) = memchr::memchr(b'&', s.as_bytes()) else {
        return s.to_string();
    };
    let mut out = String::with_capacity(s.len());
    out.push_str(&s[..first]);
    let mut rest = &s[first..];

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match decode_reference(rest) {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// `input` starts with `&`. Returns the decoded char and the byte length consumed.
fn decode_reference(input: &str) -> Option<(char, usize)> {
    let body = &input[1..];
    if let Some(num) = body.strip_prefix('#') {
        let (digits_src, radix, prefix) = match num.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16, 3),
            None => (num, 10, 2),
        };
        let max = if radix == 16 {
            MAX_HEX_DIGITS
        } else {
            MAX_DEC_DIGITS
        };
        let end = digits_src
            .bytes()
            .take(max + 1)
            .position(|b| b == b';')?;
        let digits = &digits_src[..end];
        if digits.is_empty() || !digits.bytes().all(|b| (b as char).is_digit(radix)) {
            return None;
        }
        let ch = u32::from_str_radix(digits, radix)
            .ok()
            .and_then(char::from_u32)?;
        return Some((ch, prefix + end + 1));
    }

    let end = body
        .bytes()
        .take(MAX_NAME_LEN + 1)
        .position(|b| b == b';')?;
    let name = &body[..end];
    NAMED
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, ch)| (ch, end + 2))
}

/// Escape text content the way `outerHTML` does.
pub(crate) fn escape_text(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

/// Escape a double-quoted attribute value the way `outerHTML` does.
pub(crate) fn escape_attr(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_entities_preserves_utf8() {
        assert_eq!(decode_entities("120×32"), "120×32");
        assert_eq!(decode_entities("π &amp; σ"), "π & σ");
    }

    #[test]
    fn decode_entities_decodes_named_and_numeric() {
        assert_eq!(decode_entities("a &amp; b"), "a & b");
        assert_eq!(decode_entities("&lt;tag&gt;"), "<tag>");
        assert_eq!(decode_entities("a&nbsp;b"), "a\u{00A0}b");
        assert_eq!(decode_entities("&copy; 2024"), "© 2024");
        assert_eq!(decode_entities("&#215;"), "×");
        assert_eq!(decode_entities("&#xD7;"), "×");
        assert_eq!(decode_entities("&#x10FFFF;"), "\u{10FFFF}");
    }

    #[test]
    fn decode_entities_passes_through_unknown_and_malformed() {
        for s in [
            "&",
            "&&",
            "&;",
            "&#;",
            "&#x;",
            "&amp",
            "loose &amp space",
            "&notanentity;",
            "&#xZZ;",
            "&#xD800;",
            "&#x110000;",
            "&#11141111;",
            "&#-1;",
            "&#123",
        ] {
            assert_eq!(decode_entities(s), s, "input {s:?}");
        }
    }

    #[test]
    fn malformed_reference_does_not_swallow_following_one() {
        assert_eq!(decode_entities("&#xZZ;&amp;"), "&#xZZ;&");
    }

    #[test]
    fn escape_round_trips_through_decode() {
        let original = "a < b & \"c\" > d\u{00A0}e";
        let mut text = String::new();
        escape_text(original, &mut text);
        assert_eq!(text, "a &lt; b &amp; \"c\" &gt; d&nbsp;e");
        assert_eq!(decode_entities(&text), original);

        let mut attr = String::new();
        escape_attr(original, &mut attr);
        assert_eq!(attr, "a < b &amp; &quot;c&quot; > d&nbsp;e");
        assert_eq!(decode_entities(&attr), original);
    }
}
