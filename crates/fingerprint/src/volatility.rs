use regex::{Regex, RegexBuilder};

/// Substrings marking ids and classes that reflect transient UI state.
pub const DEFAULT_VOLATILE_PATTERN: &str = "(active|current|open|close|show|hide|hidden|visible|slick|swiper|lazy|clone|tmp|draggable|loading|loaded|mount|hydr|portal)";

/// Case-insensitive filter for volatile id and class tokens.
#[derive(Clone, Debug)]
pub struct Volatility {
    re: Regex,
}

impl Volatility {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let re = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self { re })
    }

    /// Whether the token should be kept out of signatures.
    pub fn is_volatile(&self, token: &str) -> bool {
        self.re.is_match(token)
    }

    pub fn pattern(&self) -> &str {
        self.re.as_str()
    }
}

impl Default for Volatility {
    fn default() -> Self {
        Self::new(DEFAULT_VOLATILE_PATTERN).expect("default volatile pattern compiles")
    }
}
