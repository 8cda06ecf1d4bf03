//! Minimal selector engine.
//!
//! Grammar (whitespace around `>` is optional):
//!
//! ```text
//! selector  := compound (combinator compound)*
//! combinator:= '>' | <whitespace>
//! compound  := (tag | '*')? ('#' ident | '.' ident | ':nth-of-type(' n ')')*
//! ```
//!
//! Identifiers accept CSS escapes (`\31 23`, `\:`), so anything produced by [`css_escape`]
//! parses back to the original string.
use crate::document::Document;
use crate::types::NodeId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected `{found}` at byte {at} in selector `{input}`")]
    Unexpected {
        input: String,
        at: usize,
        found: char,
    },
    #[error("expected an identifier at byte {at} in selector `{input}`")]
    MissingIdent { input: String, at: usize },
    #[error("invalid :nth-of-type argument in selector `{input}`")]
    InvalidNth { input: String },
    #[error("unsupported pseudo-class `:{name}` in selector `{input}`")]
    UnsupportedPseudo { input: String, name: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub nth_of_type: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    Child,
    Descendant,
}

/// A parsed selector: compounds left to right, each joined to the previous by a combinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    parts: Vec<(Combinator, Compound)>,
}

impl std::str::FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn unexpected(&self, found: char) -> SelectorError {
        SelectorError::Unexpected {
            input: self.input.to_string(),
            at: self.pos,
            found,
        }
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.bump();
                self.escape(&mut out);
            } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() {
                self.bump();
                out.push(c);
            } else {
                break;
            }
        }
        if out.is_empty() {
            return Err(SelectorError::MissingIdent {
                input: self.input.to_string(),
                at: self.pos,
            });
        }
        Ok(out)
    }

    /// Cursor is just past a backslash.
    fn escape(&mut self, out: &mut String) {
        let start = self.pos;
        while self.pos - start < 6 && self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            self.pos += 1;
        }
        if self.pos > start {
            let code = u32::from_str_radix(&self.input[start..self.pos], 16).unwrap_or(0xFFFD);
            let ch = match code {
                0 | 0xD800..=0xDFFF => '\u{FFFD}',
                _ => char::from_u32(code).unwrap_or('\u{FFFD}'),
            };
            out.push(ch);
            // A single whitespace terminates a hex escape.
            if self.peek().is_some_and(|c| c == ' ' || c == '\t' || c == '\n') {
                self.pos += 1;
            }
        } else if let Some(c) = self.bump() {
            out.push(c);
        }
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut any = true;
        match self.peek() {
            Some('*') => {
                self.bump();
            }
            Some(c) if c.is_ascii_alphabetic() => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase());
            }
            _ => any = false,
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.ident()?);
                }
                Some(':') => {
                    self.bump();
                    let name = self.ident()?;
                    if !name.eq_ignore_ascii_case("nth-of-type") {
                        return Err(SelectorError::UnsupportedPseudo {
                            input: self.input.to_string(),
                            name,
                        });
                    }
                    compound.nth_of_type = Some(self.nth_argument()?);
                }
                _ => break,
            }
            any = true;
        }
        if !any {
            return Err(match self.peek() {
                Some(c) => self.unexpected(c),
                None => SelectorError::MissingIdent {
                    input: self.input.to_string(),
                    at: self.pos,
                },
            });
        }
        Ok(compound)
    }

    fn nth_argument(&mut self) -> Result<usize, SelectorError> {
        let input = self.input;
        let invalid = || SelectorError::InvalidNth {
            input: input.to_string(),
        };
        if self.bump() != Some('(') {
            return Err(invalid());
        }
        let rest = &self.input[self.pos..];
        let close = rest.find(')').ok_or_else(invalid)?;
        let n: usize = rest[..close].trim().parse().map_err(|_| invalid())?;
        if n == 0 {
            return Err(invalid());
        }
        self.pos += close + 1;
        Ok(n)
    }
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut p = Parser { input, pos: 0 };
        p.skip_whitespace();
        if p.peek().is_none() {
            return Err(SelectorError::Empty);
        }
        let mut parts = vec![(Combinator::Descendant, p.compound()?)];
        loop {
            let had_space = p.skip_whitespace();
            let combinator = match p.peek() {
                None => break,
                Some('>') => {
                    p.bump();
                    p.skip_whitespace();
                    Combinator::Child
                }
                Some(_) if had_space => Combinator::Descendant,
                Some(c) => return Err(p.unexpected(c)),
            };
            parts.push((combinator, p.compound()?));
        }
        Ok(Self { parts })
    }

    pub fn compounds(&self) -> impl Iterator<Item = &Compound> {
        self.parts.iter().map(|(_, c)| c)
    }

    /// Whether `id` matches the whole selector, considering ancestors up to (not beyond) `scope`.
    pub fn matches_within(&self, doc: &Document, id: NodeId, scope: NodeId) -> bool {
        self.match_from(doc, id, self.parts.len() - 1, scope)
    }

    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        self.matches_within(doc, id, NodeId::ROOT)
    }

    fn match_from(&self, doc: &Document, id: NodeId, index: usize, scope: NodeId) -> bool {
        let (combinator, compound) = &self.parts[index];
        if !compound_matches(doc, id, compound) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => doc
                .parent(id)
                .filter(|&p| p != scope && doc.is_element(p))
                .is_some_and(|p| self.match_from(doc, p, index - 1, scope)),
            Combinator::Descendant => doc
                .ancestors(id)
                .take_while(|&a| a != scope)
                .filter(|&a| doc.is_element(a))
                .any(|a| self.match_from(doc, a, index - 1, scope)),
        }
    }

    /// First descendant of `scope` in document order matching the selector (`querySelector`).
    pub fn query_first(&self, doc: &Document, scope: NodeId) -> Option<NodeId> {
        doc.descendants(scope)
            .filter(|&d| doc.is_element(d))
            .find(|&d| self.matches(doc, d))
    }

    /// Nearest inclusive ancestor of `id` matching the selector (`Element.closest`).
    pub fn closest(&self, doc: &Document, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(doc.ancestors(id))
            .filter(|&a| doc.is_element(a))
            .find(|&a| self.matches(doc, a))
    }
}

fn compound_matches(doc: &Document, id: NodeId, compound: &Compound) -> bool {
    let Some(name) = doc.element_name(id) else {
        return false;
    };
    if compound
        .tag
        .as_ref()
        .is_some_and(|tag| !name.eq_ignore_ascii_case(tag))
    {
        return false;
    }
    if compound
        .id
        .as_ref()
        .is_some_and(|want| doc.attr(id, "id") != Some(want.as_str()))
    {
        return false;
    }
    if !compound
        .classes
        .iter()
        .all(|c| doc.classes(id).any(|have| have == c))
    {
        return false;
    }
    if compound
        .nth_of_type
        .is_some_and(|n| doc.index_of_type(id) != n)
    {
        return false;
    }
    true
}

/// Serialize an identifier per the CSSOM `CSS.escape()` algorithm.
pub fn css_escape(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    let chars: Vec<char> = ident.chars().collect();
    if chars.len() == 1 && chars[0] == '-' {
        return "\\-".to_string();
    }
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '\0' => out.push('\u{FFFD}'),
            '\u{1}'..='\u{1F}' | '\u{7F}' => {
                out.push_str(&format!("\\{:x} ", c as u32));
            }
            '0'..='9' if i == 0 || (i == 1 && chars[0] == '-') => {
                out.push_str(&format!("\\{:x} ", c as u32));
            }
            c if !c.is_ascii() || c.is_ascii_alphanumeric() || c == '-' || c == '_' => {
                out.push(c);
            }
            c => {
                out.push('\\');
                out.push(c);
            }
        }
    }
    out
}
