//! Simplified HTML tokenizer with a constrained, practical tag-name character set.
//!
//! Supported tag-name and attribute-name characters (ASCII only): `[A-Za-z0-9:_-]`,
//! with tag names required to start with an ASCII letter.
//!
//! Known limitations (intentional):
//! - Not the HTML5 tokenizer state machine; there is no parse-error recovery beyond what the
//!   tree builder does.
//! - `script`/`style` are raw text, `title`/`textarea` are escapable raw text. Their close-tag
//!   scan accepts only ASCII whitespace before `>`.
//! - A `<` that does not start a tag, end tag, comment, or doctype is literal text.
use crate::entities::decode_entities;
use crate::types::{Attribute, Token};
use memchr::memchr;

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

fn starts_with_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack[..needle.len()].eq_ignore_ascii_case(needle)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TextMode {
    Raw,
    EscapableRaw,
}

fn text_mode(name: &str) -> Option<TextMode> {
    match name {
        "script" | "style" => Some(TextMode::Raw),
        "title" | "textarea" => Some(TextMode::EscapableRaw),
        _ => None,
    }
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

/// Find `</name` followed by optional ASCII whitespace and `>` (case-insensitive).
///
/// Returns `(start_of_close_tag, end_after_gt)` relative to `haystack`.
fn find_close_tag(haystack: &str, name: &str) -> Option<(usize, usize)> {
    let bytes = haystack.as_bytes();
    let n = name.len();
    let mut i = 0;
    while i < bytes.len() {
        i += memchr(b'<', &bytes[i..])?;
        let tag = i + 2;
        if bytes.get(i + 1) == Some(&b'/')
            && bytes.len() >= tag + n
            && bytes[tag..tag + n].eq_ignore_ascii_case(name.as_bytes())
        {
            let mut k = tag + n;
            while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if bytes.get(k) == Some(&b'>') {
                return Some((i, k + 1));
            }
        }
        i += 1;
    }
    None
}

struct Tokenizer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    out: Vec<Token>,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            out: Vec::new(),
        }
    }

    fn emit(&mut self, token: Token) {
        #[cfg(feature = "parser-trace")]
        log::trace!(target: "html.tokenizer", "emit token: {token:?}");
        self.out.push(token);
    }

    fn push_text(&mut self, raw: &str, decode: bool) {
        if raw.is_empty() {
            return;
        }
        let text = if decode {
            decode_entities(raw)
        } else {
            raw.to_string()
        };
        // Adjacent text (e.g. after a literal `<`) collapses into a single token.
        if let Some(Token::Text(prev)) = self.out.last_mut() {
            prev.push_str(&text);
        } else {
            self.emit(Token::Text(text));
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    /// Reads a name at the cursor. Slice endpoints are ASCII so they stay on char boundaries.
    fn read_name(&mut self) -> &'a str {
        let input = self.input;
        let start = self.pos;
        while self.pos < self.bytes.len() && is_name_char(self.bytes[self.pos]) {
            self.pos += 1;
        }
        &input[start..self.pos]
    }

    fn run(mut self) -> Vec<Token> {
        let input = self.input;
        while self.pos < self.bytes.len() {
            let Some(lt) = memchr(b'<', &self.bytes[self.pos..]) else {
                self.push_text(&input[self.pos..], true);
                break;
            };
            if lt > 0 {
                let text = &input[self.pos..self.pos + lt];
                self.push_text(text, true);
                self.pos += lt;
            }
            self.markup();
        }
        self.out
    }

    /// Cursor is on `<`.
    fn markup(&mut self) {
        let bytes = self.bytes;
        let rest = &bytes[self.pos..];
        if rest.starts_with(COMMENT_START.as_bytes()) {
            self.comment();
        } else if starts_with_ignore_ascii_case(rest, b"<!doctype") {
            self.doctype();
        } else if rest.get(1) == Some(&b'/') && rest.get(2).is_some_and(u8::is_ascii_alphabetic) {
            self.end_tag();
        } else if rest.get(1).is_some_and(u8::is_ascii_alphabetic) {
            self.start_tag();
        } else if matches!(rest.get(1), Some(b'!') | Some(b'?') | Some(b'/')) {
            self.bogus_comment();
        } else {
            self.push_text("<", false);
            self.pos += 1;
        }
    }

    fn comment(&mut self) {
        let body_start = self.pos + COMMENT_START.len();
        match self.input[body_start..].find(COMMENT_END) {
            Some(end) => {
                let body = self.input[body_start..body_start + end].to_string();
                self.emit(Token::Comment(body));
                self.pos = body_start + end + COMMENT_END.len();
            }
            None => {
                let body = self.input[body_start..].to_string();
                self.emit(Token::Comment(body));
                self.pos = self.bytes.len();
            }
        }
    }

    /// `<!foo>`, `<?xml ...?>` and `</ >` become comments, as in browsers.
    fn bogus_comment(&mut self) {
        let body_start = self.pos + 2;
        let end = memchr(b'>', &self.bytes[body_start..]).map(|e| body_start + e);
        let body_end = end.unwrap_or(self.bytes.len());
        let body = self.input[body_start..body_end].to_string();
        self.emit(Token::Comment(body));
        self.pos = end.map_or(self.bytes.len(), |e| e + 1);
    }

    fn doctype(&mut self) {
        let body_start = self.pos + "<!doctype".len();
        let end = memchr(b'>', &self.bytes[body_start..]).map(|e| body_start + e);
        let body_end = end.unwrap_or(self.bytes.len());
        let value = self.input[body_start..body_end].trim().to_string();
        self.emit(Token::Doctype(value));
        self.pos = end.map_or(self.bytes.len(), |e| e + 1);
    }

    fn end_tag(&mut self) {
        self.pos += 2;
        let name = self.read_name().to_ascii_lowercase();
        // Anything up to `>` (attributes on end tags) is ignored.
        match memchr(b'>', &self.bytes[self.pos..]) {
            Some(gt) => self.pos += gt + 1,
            None => self.pos = self.bytes.len(),
        }
        self.emit(Token::EndTag(name));
    }

    fn start_tag(&mut self) {
        self.pos += 1;
        let name = self.read_name().to_ascii_lowercase();
        let mut attributes: Vec<Attribute> = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            let Some(&b) = self.bytes.get(self.pos) else {
                break;
            };
            match b {
                b'>' => {
                    self.pos += 1;
                    break;
                }
                b'/' => {
                    self.pos += 1;
                    if self.bytes.get(self.pos) == Some(&b'>') {
                        self_closing = true;
                        self.pos += 1;
                        break;
                    }
                }
                _ if !is_name_char(b) => self.pos += 1,
                _ => {
                    let attr_name = self.read_name().to_ascii_lowercase();
                    let value = self.attribute_value();
                    // Duplicate attributes are dropped; the first one wins.
                    if !attributes.iter().any(|(k, _)| *k == attr_name) {
                        attributes.push((attr_name, value));
                    }
                }
            }
        }

        let mode = text_mode(&name);
        let void = is_void_element(&name);
        self.emit(Token::StartTag {
            name: name.clone(),
            attributes,
            self_closing: self_closing || void,
        });

        if let Some(mode) = mode
            && !self_closing
        {
            self.raw_text(&name, mode);
        }
    }

    fn attribute_value(&mut self) -> Option<String> {
        self.skip_whitespace();
        if self.bytes.get(self.pos) != Some(&b'=') {
            return None;
        }
        self.pos += 1;
        self.skip_whitespace();
        match self.bytes.get(self.pos).copied() {
            Some(quote @ (b'"' | b'\'')) => {
                let start = self.pos + 1;
                let end = memchr(quote, &self.bytes[start..]).map(|e| start + e);
                let value_end = end.unwrap_or(self.bytes.len());
                let value = decode_entities(&self.input[start..value_end]);
                self.pos = end.map_or(self.bytes.len(), |e| e + 1);
                Some(value)
            }
            _ => {
                let start = self.pos;
                while let Some(&b) = self.bytes.get(self.pos) {
                    if b.is_ascii_whitespace() || b == b'>' {
                        break;
                    }
                    if b == b'/' && self.bytes.get(self.pos + 1) == Some(&b'>') {
                        break;
                    }
                    self.pos += 1;
                }
                Some(decode_entities(&self.input[start..self.pos]))
            }
        }
    }

    /// Consume everything up to the matching close tag as a single text token.
    fn raw_text(&mut self, name: &str, mode: TextMode) {
        let input = self.input;
        let body = &input[self.pos..];
        let decode = mode == TextMode::EscapableRaw;
        match find_close_tag(body, name) {
            Some((start, end)) => {
                let raw = &body[..start];
                if !raw.is_empty() {
                    let text = if decode {
                        decode_entities(raw)
                    } else {
                        raw.to_string()
                    };
                    self.emit(Token::Text(text));
                }
                self.emit(Token::EndTag(name.to_string()));
                self.pos += end;
            }
            None => {
                // Missing close tag: the remainder is the element's content.
                if !body.is_empty() {
                    let text = if decode {
                        decode_entities(body)
                    } else {
                        body.to_string()
                    };
                    self.emit(Token::Text(text));
                }
                self.emit(Token::EndTag(name.to_string()));
                self.pos = self.bytes.len();
            }
        }
    }
}

/// Tokenize a complete input string.
pub fn tokenize(input: &str) -> Vec<Token> {
    Tokenizer::new(input).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(name: &str, attributes: &[(&str, Option<&str>)]) -> Token {
        Token::StartTag {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
                .collect(),
            self_closing: false,
        }
    }

    #[test]
    fn tokenize_preserves_utf8_text_nodes() {
        let tokens = tokenize("<p>120×32 café 😊</p>");
        assert_eq!(
            tokens,
            vec![
                start("p", &[]),
                Token::Text("120×32 café 😊".into()),
                Token::EndTag("p".into()),
            ]
        );
    }

    #[test]
    fn tokenize_handles_mixed_case_doctype_and_tags() {
        let tokens = tokenize("<!DoCtYpE html><DIV Class=x></div>");
        assert_eq!(tokens[0], Token::Doctype("html".into()));
        assert_eq!(tokens[1], start("div", &[("class", Some("x"))]));
        assert_eq!(tokens[2], Token::EndTag("div".into()));
    }

    #[test]
    fn tokenize_reads_all_attribute_forms() {
        let tokens = tokenize(r#"<a href="/x?a=1&amp;b=2" data-v='q"s' hidden title=plain>"#);
        assert_eq!(
            tokens,
            vec![start(
                "a",
                &[
                    ("href", Some("/x?a=1&b=2")),
                    ("data-v", Some("q\"s")),
                    ("hidden", None),
                    ("title", Some("plain")),
                ]
            )]
        );
    }

    #[test]
    fn tokenize_drops_duplicate_attributes() {
        let tokens = tokenize(r#"<p id="a" id="b">"#);
        assert_eq!(tokens, vec![start("p", &[("id", Some("a"))])]);
    }

    #[test]
    fn tokenize_marks_void_and_self_closing() {
        let tokens = tokenize("<br><img src=a.png/><x-icon />");
        let closing: Vec<bool> = tokens
            .iter()
            .map(|t| matches!(t, Token::StartTag { self_closing: true, .. }))
            .collect();
        assert_eq!(closing, vec![true, true, true]);
    }

    #[test]
    fn tokenize_treats_stray_lt_as_text() {
        let tokens = tokenize("<p>1 < 2 <= 3</p>");
        assert_eq!(tokens[1], Token::Text("1 < 2 <= 3".into()));
    }

    #[test]
    fn tokenize_script_is_raw_and_case_insensitive_close() {
        let tokens = tokenize("<script>if (a < b && c) {}</ScRiPt >after");
        assert_eq!(
            tokens,
            vec![
                start("script", &[]),
                Token::Text("if (a < b && c) {}".into()),
                Token::EndTag("script".into()),
                Token::Text("after".into()),
            ]
        );
    }

    #[test]
    fn tokenize_title_decodes_but_does_not_parse_tags() {
        let tokens = tokenize("<title>A &amp; <b>B</b></title>");
        assert_eq!(tokens[1], Token::Text("A & <b>B</b>".into()));
    }

    #[test]
    fn tokenize_unterminated_rawtext_takes_the_rest() {
        let tokens = tokenize("<style>body{}");
        assert_eq!(tokens[1], Token::Text("body{}".into()));
        assert_eq!(tokens[2], Token::EndTag("style".into()));
    }

    #[test]
    fn tokenize_comments_and_bogus_comments() {
        let tokens = tokenize("<!-- a --><?xml v?><!x>");
        assert_eq!(
            tokens,
            vec![
                Token::Comment(" a ".into()),
                Token::Comment("xml v?".into()),
                Token::Comment("x".into()),
            ]
        );
    }

    #[test]
    fn tokenize_dense_near_match_rawtext_body() {
        let body = "</scripX>".repeat(20_000);
        let input = format!("<script>{body}</script>");
        let tokens = tokenize(&input);
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1], Token::Text(body));
    }
}
