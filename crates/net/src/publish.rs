use crate::relative_source_path;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("invalid target path `{path}`: {reason}")]
    InvalidPath { path: String, reason: &'static str },
    #[error("writing `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("`{path}` changed remotely (revision {revision:?})")]
    Conflict {
        path: String,
        revision: Option<String>,
    },
    #[error("publishing `{path}` failed: {message}")]
    Remote { path: String, message: String },
}

/// Persists updated files.
///
/// Content-versioning backends first read the file's current revision marker, then submit
/// the new content keyed to it. Retry and conflict handling on stale markers belong to the
/// implementation.
pub trait Publisher {
    /// Current revision marker of `path`, `None` when the file is new or the backend is not
    /// versioned.
    fn revision(&mut self, path: &str) -> Result<Option<String>, PublishError>;

    fn submit(
        &mut self,
        path: &str,
        content: &str,
        revision: Option<&str>,
    ) -> Result<(), PublishError>;
}

/// Hand every `(path, content)` pair to `publisher`. A failure is reported for its file only
/// and never stops the others.
pub fn publish_all<'a, P, I>(publisher: &mut P, files: I) -> Vec<(String, Result<(), PublishError>)>
where
    P: Publisher + ?Sized,
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    files
        .into_iter()
        .map(|(path, content)| {
            let result = publisher
                .revision(path)
                .and_then(|rev| publisher.submit(path, content, rev.as_deref()));
            match &result {
                Ok(()) => log::info!(target: "net", "published {path}"),
                Err(err) => log::warn!(target: "net", "publishing {path} failed: {err}"),
            }
            (path.to_string(), result)
        })
        .collect()
}

/// Writes files under an output directory, creating parent directories as needed.
#[derive(Clone, Debug)]
pub struct DirPublisher {
    root: PathBuf,
}

impl DirPublisher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn target(&self, path: &str) -> Result<PathBuf, PublishError> {
        let rel = relative_source_path(path).map_err(|reason| PublishError::InvalidPath {
            path: path.to_string(),
            reason,
        })?;
        Ok(self.root.join(rel))
    }
}

impl Publisher for DirPublisher {
    fn revision(&mut self, path: &str) -> Result<Option<String>, PublishError> {
        self.target(path)?;
        Ok(None)
    }

    fn submit(
        &mut self,
        path: &str,
        content: &str,
        _revision: Option<&str>,
    ) -> Result<(), PublishError> {
        let target = self.target(path)?;
        let io_err = |source: io::Error| PublishError::Io {
            path: path.to_string(),
            source,
        };
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(&target, content).map_err(io_err)
    }
}
