use clap::{Parser, Subcommand};
use core_types::{EditKey, Fingerprint};
use edit_core::{ChangeLog, ChangeLogError};
use editor::{ConfigError, EditSession, EditorConfig, LivePage, SessionError};
use html::clean_text;
use net::{DirPublisher, FetchError, FsFetcher, HttpFetcher, SourceFetcher, publish_all};
use runtime_apply::{FileOutcome, PassReport};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use thiserror::Error;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Edit the text of a static site in place and write the edits back to its source files
#[derive(Parser)]
#[command(name = "livetext")]
#[command(version, about)]
struct Cli {
    /// Editor settings (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output; repeat for more
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every editable element of a page with its fingerprint, as JSON
    Inspect {
        /// Page file on disk
        page: PathBuf,
        /// URL path the page is served at (default: `/<file name>`)
        #[arg(long)]
        path: Option<String>,
    },
    /// Change the text of one element and record the edit in a change log
    Edit {
        page: PathBuf,
        #[arg(long)]
        path: Option<String>,
        /// Selector of the element to edit; the first match is used
        #[arg(long = "select")]
        selector: String,
        /// New text
        #[arg(long)]
        text: String,
        /// Change log to extend (created when missing; default: print to stdout)
        #[arg(long)]
        changes: Option<PathBuf>,
    },
    /// Write the edits of a change log back into the source files
    Apply {
        #[arg(long)]
        changes: PathBuf,
        /// Site root to read sources from
        #[arg(long, required_unless_present = "base_url", conflicts_with = "base_url")]
        site: Option<PathBuf>,
        /// Base URL to fetch sources from
        #[arg(long)]
        base_url: Option<String>,
        /// Output directory (default: the site root)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    ChangeLog(#[from] ChangeLogError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Usage(&'static str),
    #[error("{0} of {1} files could not be written")]
    Publish(usize, usize),
}

/// One editable element, as printed by `inspect`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Editable {
    key: EditKey,
    tag: String,
    text: String,
    source_file: String,
    #[serde(flatten)]
    fingerprint: Fingerprint,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    match cli.command {
        Commands::Inspect { page, path } => inspect(config, &page, path),
        Commands::Edit {
            page,
            path,
            selector,
            text,
            changes,
        } => edit(config, &page, path, &selector, &text, changes.as_deref()),
        Commands::Apply {
            changes,
            site,
            base_url,
            out,
        } => apply(config, &changes, site, base_url, out),
    }
}

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn write(path: &Path, text: &str) -> Result<(), CliError> {
    std::fs::write(path, text).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn url_path(page: &Path, path: Option<String>) -> String {
    path.unwrap_or_else(|| {
        let name = page
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("/{name}")
    })
}

fn open_page(
    session: &mut EditSession,
    page: &Path,
    path: Option<String>,
) -> Result<LivePage, CliError> {
    let markup = read(page)?;
    let live = session.load_page(&url_path(page, path), &markup);
    session.enable_editing(&live);
    Ok(live)
}

fn inspect(config: EditorConfig, page: &Path, path: Option<String>) -> Result<(), CliError> {
    let mut session = EditSession::new(config)?;
    let live = open_page(&mut session, page, path)?;
    let page_file = live.page_file(&session.config().default_page);
    let doc = live.doc();
    let editables: Vec<Editable> = session
        .editables()
        .map(|(key, node)| Editable {
            key,
            tag: doc.element_name(node).unwrap_or_default().to_ascii_uppercase(),
            text: clean_text(&doc.text_content(node)),
            source_file: session.builder().source_file(doc, node, &page_file),
            fingerprint: session.fingerprint(&live, node),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&editables)?);
    Ok(())
}

fn edit(
    config: EditorConfig,
    page: &Path,
    path: Option<String>,
    selector: &str,
    text: &str,
    changes: Option<&Path>,
) -> Result<(), CliError> {
    let log = match changes {
        Some(file) if file.exists() => ChangeLog::from_json(&read(file)?)?,
        _ => ChangeLog::new(),
    };
    let mut session = EditSession::with_change_log(config, log)?;
    let mut live = open_page(&mut session, page, path)?;
    let now = Instant::now();
    let key = session.edit_text(&mut live, selector, text, now)?;
    if session.flush(&live, now).is_empty() {
        log::warn!("`{selector}` already reads {text:?}; nothing recorded");
    } else {
        log::info!("recorded {key}");
    }

    let json = session.change_log().to_json()?;
    match changes {
        Some(file) => write(file, &json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn apply(
    config: EditorConfig,
    changes: &Path,
    site: Option<PathBuf>,
    base_url: Option<String>,
    out: Option<PathBuf>,
) -> Result<(), CliError> {
    let log = ChangeLog::from_json(&read(changes)?)?;
    let mut session = EditSession::with_change_log(config, log)?;

    let (mut fetcher, out): (Box<dyn SourceFetcher>, PathBuf) = match (site, base_url) {
        (Some(site), _) => {
            let out = out.unwrap_or_else(|| site.clone());
            (Box::new(FsFetcher::new(site)), out)
        }
        (None, Some(url)) => {
            let out = out.ok_or(CliError::Usage("--out is required with --base-url"))?;
            (Box::new(HttpFetcher::with_native_roots(&url)?), out)
        }
        (None, None) => return Err(CliError::Usage("one of --site or --base-url is required")),
    };

    let pass = session.apply(fetcher.as_mut());
    print_pass(&pass);

    let changed: Vec<(&str, &str)> = pass
        .files
        .iter()
        .filter(|(_, outcome)| matches!(outcome, FileOutcome::Applied(r) if r.updated > 0))
        .filter_map(|(path, _)| {
            session
                .file_cache()
                .get(path)
                .map(|text| (path.as_str(), text))
        })
        .collect();
    let total = changed.len();
    let mut publisher = DirPublisher::new(out);
    let mut failed = 0;
    for (path, result) in publish_all(&mut publisher, changed) {
        match result {
            Ok(()) => println!("wrote {path}"),
            Err(err) => {
                failed += 1;
                eprintln!("{err}");
            }
        }
    }
    if failed > 0 {
        return Err(CliError::Publish(failed, total));
    }
    Ok(())
}

fn print_pass(pass: &PassReport) {
    for (path, outcome) in &pass.files {
        match outcome {
            FileOutcome::Applied(r) => println!(
                "{path}: {} updated, {} already applied, {} unmatched",
                r.updated, r.already_applied, r.unmatched
            ),
            FileOutcome::Skipped { reason } => println!("{path}: skipped ({reason})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn apply_needs_a_source() {
        assert!(Cli::try_parse_from(["livetext", "apply", "--changes", "c.json"]).is_err());
        assert!(
            Cli::try_parse_from([
                "livetext", "apply", "--changes", "c.json", "--site", "s", "--base-url", "http://x/"
            ])
            .is_err()
        );
        assert!(Cli::try_parse_from(["livetext", "-v", "apply", "--changes", "c.json", "--site", "s"]).is_ok());
    }

    #[test]
    fn url_path_defaults_to_the_file_name() {
        assert_eq!(url_path(Path::new("site/about.html"), None), "/about.html");
        assert_eq!(url_path(Path::new("site/about.html"), Some("/x/".into())), "/x/");
    }
}
