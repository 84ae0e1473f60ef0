//! Small markup tokenizer used for whole documents and for `innerMarkup`
//! fragments.
//!
//! Supported tag/attribute name characters (ASCII only): `[A-Za-z0-9:_-]`.
//! Names are folded to ASCII lowercase through the stream's `AtomTable`.
//!
//! Known limitations:
//! - Not an HTML5 state machine; no parse-error recovery beyond skipping.
//! - Rawtext (`script`, `style`) close tags accept only ASCII whitespace
//!   before `>`.
use crate::entities::decode_entities;
use crate::types::{AtomId, AtomTable, Token, TokenStream};
use memchr::memchr;

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";
const SCRIPT_CLOSE_TAG: &[u8] = b"</script";
const STYLE_CLOSE_TAG: &[u8] = b"</style";

fn starts_with_ignore_ascii_case_at(haystack: &[u8], start: usize, needle: &[u8]) -> bool {
    haystack
        .get(start..start + needle.len())
        .is_some_and(|s| s.eq_ignore_ascii_case(needle))
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

/// Returns `(start, end)` of the first `</tag\s*>` in `haystack`.
fn find_rawtext_close_tag(haystack: &str, close_tag: &[u8]) -> Option<(usize, usize)> {
    let bytes = haystack.as_bytes();
    let n = close_tag.len();
    let mut i = 0;
    while i + n <= bytes.len() {
        // '<' never appears inside a UTF-8 continuation byte.
        i += memchr(b'<', &bytes[i..])?;
        if starts_with_ignore_ascii_case_at(bytes, i, close_tag) {
            let mut k = i + n;
            while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < bytes.len() && bytes[k] == b'>' {
                return Some((i, k + 1));
            }
        }
        i += 1;
    }
    None
}

pub(crate) fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

pub(crate) fn is_rawtext_element(name: &str) -> bool {
    name == "script" || name == "style"
}

struct Cursor<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    // Slices are only cut at ASCII bytes, so endpoints stay on char boundaries.
    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }
}

/// Tokenizes `input` into a stream with interned tag/attribute names.
pub(crate) fn tokenize(input: &str) -> TokenStream {
    let mut out = Vec::new();
    let mut atoms = AtomTable::new();
    let mut cur = Cursor::new(input);

    while !cur.at_end() {
        if cur.peek() != Some(b'<') {
            let text = cur.take_while(|b| b != b'<');
            let decoded = decode_entities(text);
            if !decoded.is_empty() {
                out.push(Token::Text(decoded));
            }
            continue;
        }

        if cur.rest().starts_with(COMMENT_START) {
            let body = &cur.rest()[COMMENT_START.len()..];
            match body.find(COMMENT_END) {
                Some(end) => {
                    out.push(Token::Comment(body[..end].to_string()));
                    cur.pos += COMMENT_START.len() + end + COMMENT_END.len();
                    continue;
                }
                None => {
                    out.push(Token::Comment(body.to_string()));
                    break;
                }
            }
        }

        if starts_with_ignore_ascii_case_at(cur.bytes, cur.pos, b"<!doctype") {
            let body = &cur.rest()["<!doctype".len()..];
            let Some(end) = body.find('>') else {
                break;
            };
            out.push(Token::Doctype(body[..end].trim().to_string()));
            cur.pos += "<!doctype".len() + end + 1;
            continue;
        }

        if cur.bytes.get(cur.pos + 1) == Some(&b'/') {
            cur.pos += 2;
            let name = cur.take_while(is_name_byte);
            let name = atoms.intern_ascii_lowercase(name);
            cur.take_while(|b| b != b'>');
            if !cur.at_end() {
                cur.pos += 1;
            }
            out.push(Token::EndTag(name));
            continue;
        }

        cur.pos += 1;
        let raw_name = cur.take_while(is_name_byte);
        if raw_name.is_empty() {
            // A lone '<' is text.
            out.push(Token::Text("<".to_string()));
            continue;
        }
        let name = atoms.intern_ascii_lowercase(raw_name);
        let (attributes, mut self_closing) = read_attributes(&mut cur, &mut atoms);
        let name_str = atoms.resolve(name);
        if is_void_element(name_str) {
            self_closing = true;
        }
        let rawtext = is_rawtext_element(name_str) && !self_closing;
        let close_tag = if name_str == "script" {
            SCRIPT_CLOSE_TAG
        } else {
            STYLE_CLOSE_TAG
        };

        out.push(Token::StartTag {
            name,
            attributes,
            self_closing,
        });

        if rawtext {
            let body = cur.rest();
            match find_rawtext_close_tag(body, close_tag) {
                Some((start, end)) => {
                    if start > 0 {
                        out.push(Token::Text(body[..start].to_string()));
                    }
                    out.push(Token::EndTag(name));
                    cur.pos += end;
                }
                None => {
                    // Unterminated rawtext swallows the remainder.
                    if !body.is_empty() {
                        out.push(Token::Text(body.to_string()));
                    }
                    out.push(Token::EndTag(name));
                    break;
                }
            }
        }
    }

    TokenStream::new(out, atoms)
}

fn read_attributes(
    cur: &mut Cursor<'_>,
    atoms: &mut AtomTable,
) -> (Vec<(AtomId, Option<String>)>, bool) {
    let mut attributes = Vec::new();
    loop {
        cur.skip_whitespace();
        match cur.peek() {
            None => return (attributes, false),
            Some(b'>') => {
                cur.pos += 1;
                return (attributes, false);
            }
            Some(b'/') => {
                cur.pos += 1;
                if cur.peek() == Some(b'>') {
                    cur.pos += 1;
                    return (attributes, true);
                }
                continue;
            }
            Some(_) => {}
        }

        let name = cur.take_while(is_name_byte);
        if name.is_empty() {
            // Skip one byte we cannot interpret; step over a whole char.
            let skip = cur.rest().chars().next().map_or(1, char::len_utf8);
            cur.pos += skip;
            continue;
        }
        let name = atoms.intern_ascii_lowercase(name);

        cur.skip_whitespace();
        if cur.peek() != Some(b'=') {
            attributes.push((name, None));
            continue;
        }
        cur.pos += 1;
        cur.skip_whitespace();
        let value = match cur.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                cur.pos += 1;
                let raw = cur.take_while(|b| b != quote);
                if !cur.at_end() {
                    cur.pos += 1;
                }
                decode_entities(raw)
            }
            _ => {
                let start = cur.pos;
                while let Some(b) = cur.peek() {
                    let closes = b == b'/' && cur.bytes.get(cur.pos + 1) == Some(&b'>');
                    if b.is_ascii_whitespace() || b == b'>' || closes {
                        break;
                    }
                    cur.pos += 1;
                }
                decode_entities(&cur.input[start..cur.pos])
            }
        };
        attributes.push((name, Some(value)));
    }
}
