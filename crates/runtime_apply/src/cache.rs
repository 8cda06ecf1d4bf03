use std::collections::BTreeMap;

/// Latest serialized markup per source file.
///
/// Once a path has an entry every later read within the session comes from here, so edits
/// from successive apply passes accumulate instead of being re-applied to a stale fetch.
#[derive(Clone, Debug, Default)]
pub struct FileCache {
    files: BTreeMap<String, String>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Full replace; never merges.
    pub fn set(&mut self, path: impl Into<String>, text: String) {
        self.files.insert(path.into(), text);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// `(path, markup)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, t)| (p.as_str(), t.as_str()))
    }
}
