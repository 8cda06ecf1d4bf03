//! Collaborators at the edge of the engine: reading source files and handing updated files
//! to whatever persists them.

mod fetch;
mod publish;

pub use fetch::{FetchError, FsFetcher, HttpFetcher, SourceFetcher, StaticFetcher};
pub use publish::{DirPublisher, PublishError, Publisher, publish_all};

use std::path::{Component, Path};

/// Normalize a source path to one relative to the site root.
///
/// A leading `/` means the site root and is dropped. `..` components and OS path prefixes
/// are rejected; `./` segments are kept and resolve to the root.
pub(crate) fn relative_source_path(path: &str) -> Result<&str, &'static str> {
    let rel = path.trim_start_matches('/');
    if rel.trim().is_empty() {
        return Err("empty path");
    }
    for component in Path::new(rel).components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => return Err("path escapes the root"),
            Component::RootDir | Component::Prefix(_) => return Err("absolute path"),
        }
    }
    Ok(rel)
}

#[cfg(test)]
mod tests {
    use super::relative_source_path;

    #[test]
    fn only_relative_paths_inside_the_root() {
        assert_eq!(relative_source_path("index.html"), Ok("index.html"));
        assert!(relative_source_path("./partials/footer.html").is_ok());
        assert_eq!(
            relative_source_path("/partials/footer.html"),
            Ok("partials/footer.html")
        );
        assert_eq!(relative_source_path("//footer.html"), Ok("footer.html"));
        assert!(relative_source_path("/../etc/passwd").is_err());
        assert!(relative_source_path("a/../../b.html").is_err());
        assert!(relative_source_path("/").is_err());
        assert!(relative_source_path("  ").is_err());
    }
}
