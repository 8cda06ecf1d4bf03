use crate::config::ConfigError;
use edit_core::ChangeLogError;
use html::SelectorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("change log: {0}")]
    ChangeLog(#[from] ChangeLogError),
    #[error("reading `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("bad selector: {0}")]
    Selector(#[from] SelectorError),
    #[error("no element matches `{selector}`")]
    NoMatch { selector: String },
    #[error("`{selector}` matched <{tag}>, which is not editable")]
    NotEditable { selector: String, tag: String },
}
