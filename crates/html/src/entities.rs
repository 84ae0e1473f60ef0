/// Decode the small entity subset that round-trips through `serialize`.
///
/// Contract:
/// - Named entities: `&amp;`, `&lt;`, `&gt;`, `&quot;`, `&apos;`, `&nbsp;`.
/// - Numeric entities only when semicolon-terminated and a valid scalar value:
///   `&#169;` and `&#xA9;`.
/// - Anything else (unknown names, missing `;`, bad digits) is copied unchanged.
pub(crate) fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match decode_one(rest) {
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

const NAMED: &[(&str, char)] = &[
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
    ("&apos;", '\''),
    ("&nbsp;", '\u{00A0}'),
];

// 0x10FFFF / 1114111
const MAX_HEX_DIGITS: usize = 6;
const MAX_DEC_DIGITS: usize = 7;

/// Decode the entity at the start of `s` (which begins with `&`).
/// Returns the character and the number of bytes consumed.
fn decode_one(s: &str) -> Option<(char, usize)> {
    for (name, ch) in NAMED {
        if s.starts_with(name) {
            return Some((*ch, name.len()));
        }
    }

    let body = s.strip_prefix("&#")?;
    let (digits, radix, prefix_len, max) = match body.strip_prefix(['x', 'X']) {
        Some(hex) => (hex, 16, 3, MAX_HEX_DIGITS),
        None => (body, 10, 2, MAX_DEC_DIGITS),
    };
    let end = digits.find(';')?;
    if end == 0 || end > max {
        return None;
    }
    let digits = &digits[..end];
    if !digits.bytes().all(|b| (b as char).is_digit(radix)) {
        return None;
    }
    let ch = u32::from_str_radix(digits, radix)
        .ok()
        .and_then(char::from_u32)?;
    Some((ch, prefix_len + end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_entities() {
        assert_eq!(decode_entities("a &amp; b"), "a & b");
        assert_eq!(decode_entities("&lt;tag&gt;"), "<tag>");
        assert_eq!(decode_entities("&quot;hi&quot; &apos;x&apos;"), "\"hi\" 'x'");
        assert_eq!(decode_entities("a&nbsp;b"), "a\u{00A0}b");
    }

    #[test]
    fn decodes_numeric_entities() {
        assert_eq!(decode_entities("&#215;"), "×");
        assert_eq!(decode_entities("&#xD7;"), "×");
        assert_eq!(decode_entities("&#x10FFFF;"), "\u{10FFFF}");
    }

    #[test]
    fn leaves_malformed_input_alone() {
        for s in [
            "&",
            "&&",
            "&;",
            "&#;",
            "&#x;",
            "&amp",
            "&unknown;",
            "&#xZZ;",
            "&#xD800;",
            "&#x110000;",
            "&#11141111;",
            "&#215 ",
        ] {
            assert_eq!(decode_entities(s), s, "input {s:?}");
        }
    }

    #[test]
    fn malformed_entity_does_not_swallow_the_next_one() {
        assert_eq!(decode_entities("&#xZZ;&amp;"), "&#xZZ;&");
        assert_eq!(decode_entities("π &amp; σ"), "π & σ");
    }
}
