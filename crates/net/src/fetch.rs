use crate::relative_source_path;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const USER_AGENT: &str = "livetext/0.1";
const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid source path `{path}`: {reason}")]
    InvalidPath { path: String, reason: &'static str },
    #[error("`{path}` not found")]
    NotFound { path: String },
    #[error("reading `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("bad url for `{path}`: {source}")]
    Url {
        path: String,
        #[source]
        source: url::ParseError,
    },
    #[error("GET {url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("GET {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("tls setup failed: {0}")]
    Tls(String),
}

/// Returns the current persisted markup of a source file.
pub trait SourceFetcher {
    fn fetch(&mut self, path: &str) -> Result<String, FetchError>;
}

impl<F: SourceFetcher + ?Sized> SourceFetcher for &mut F {
    fn fetch(&mut self, path: &str) -> Result<String, FetchError> {
        (**self).fetch(path)
    }
}

fn checked(path: &str) -> Result<&str, FetchError> {
    relative_source_path(path).map_err(|reason| FetchError::InvalidPath {
        path: path.to_string(),
        reason,
    })
}

/// Reads source files below a site root directory.
#[derive(Clone, Debug)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl SourceFetcher for FsFetcher {
    fn fetch(&mut self, path: &str) -> Result<String, FetchError> {
        let full = self.root.join(checked(path)?);
        log::debug!(target: "net", "read {}", full.display());
        std::fs::read_to_string(&full).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => FetchError::NotFound {
                path: path.to_string(),
            },
            _ => FetchError::Io {
                path: path.to_string(),
                source,
            },
        })
    }
}

/// Fetches source files relative to a base URL.
pub struct HttpFetcher {
    base: Url,
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(base: &str) -> Result<Self, FetchError> {
        let agent = ureq::AgentBuilder::new()
            .timeout(TIMEOUT)
            .user_agent(USER_AGENT)
            .build();
        Ok(Self {
            base: parse_base(base)?,
            agent,
        })
    }

    /// Like [`new`](Self::new) but trusting the platform's root certificates instead of the
    /// bundled set.
    pub fn with_native_roots(base: &str) -> Result<Self, FetchError> {
        let agent = ureq::AgentBuilder::new()
            .timeout(TIMEOUT)
            .user_agent(USER_AGENT)
            .tls_config(native_tls_config()?)
            .build();
        Ok(Self {
            base: parse_base(base)?,
            agent,
        })
    }

    pub fn url_for(&self, path: &str) -> Result<Url, FetchError> {
        self.base.join(checked(path)?).map_err(|source| FetchError::Url {
            path: path.to_string(),
            source,
        })
    }
}

/// A base without a trailing slash would have its last segment replaced by `join`.
fn parse_base(base: &str) -> Result<Url, FetchError> {
    let mut url = Url::parse(base).map_err(|source| FetchError::Url {
        path: base.to_string(),
        source,
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn native_tls_config() -> Result<Arc<rustls::ClientConfig>, FetchError> {
    let loaded = rustls_native_certs::load_native_certs();
    for err in &loaded.errors {
        log::warn!(target: "net", "native certificate error: {err}");
    }
    let mut roots = rustls::RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(loaded.certs);
    log::debug!(target: "net", "native roots: {added} added, {ignored} ignored");
    if added == 0 {
        return Err(FetchError::Tls("no usable native root certificates".into()));
    }
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| FetchError::Tls(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(Arc::new(config))
}

impl SourceFetcher for HttpFetcher {
    fn fetch(&mut self, path: &str) -> Result<String, FetchError> {
        let url = self.url_for(path)?;
        let start = std::time::Instant::now();
        match self.agent.get(url.as_str()).call() {
            Ok(resp) => {
                if !html::is_html(resp.header("content-type")) {
                    log::warn!(
                        target: "net",
                        "{url} served {:?}, parsing as HTML anyway",
                        resp.header("content-type")
                    );
                }
                let body = resp.into_string().map_err(|source| FetchError::Io {
                    path: path.to_string(),
                    source,
                })?;
                log::debug!(
                    target: "net",
                    "GET {url}: {} bytes in {} ms",
                    body.len(),
                    start.elapsed().as_millis()
                );
                Ok(body)
            }
            Err(ureq::Error::Status(status, _)) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
            Err(ureq::Error::Transport(t)) => Err(FetchError::Transport {
                url: url.to_string(),
                message: t.to_string(),
            }),
        }
    }
}

/// In-memory source files; remembers every requested path.
#[derive(Clone, Debug, Default)]
pub struct StaticFetcher {
    files: HashMap<String, String>,
    requested: Vec<String>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }

    /// Paths passed to [`fetch`](SourceFetcher::fetch), in call order.
    pub fn requested(&self) -> &[String] {
        &self.requested
    }
}

impl SourceFetcher for StaticFetcher {
    fn fetch(&mut self, path: &str) -> Result<String, FetchError> {
        self.requested.push(path.to_string());
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                path: path.to_string(),
            })
    }
}
