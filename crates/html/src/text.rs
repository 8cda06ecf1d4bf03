/// Collapse every run of whitespace to a single space and trim both ends.
///
/// "Whitespace" is Unicode `White_Space`, so `&nbsp;` collapses too. All text comparisons
/// between a live page and its source files go through this.
pub fn clean_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for word in s.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}
