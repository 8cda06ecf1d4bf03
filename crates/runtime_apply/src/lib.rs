//! Matcher & apply engine: writes change records back into their source files.
//!
//! One apply pass groups records by source file and, per file:
//! 1. loads the text from the [`FileCache`], else the fetcher, else a registered baseline;
//! 2. parses it;
//! 3. resolves and writes every record targeting the file, in log order;
//! 4. serializes the document and stores it in the cache.
//!
//! Files are independent: a file that cannot be loaded is skipped without affecting others,
//! and a record without a candidate is counted as unmatched, never an error.

mod cache;
pub mod matcher;
mod write;

pub use cache::FileCache;
pub use matcher::{Strategy, resolve};
pub use write::{WriteOutcome, replace_markup, replace_plain_text, write_record};

use core_types::ChangeRecord;
use fingerprint::FingerprintBuilder;
use fingerprint::similarity::{ancestor_overlap, text_similarity};
use html::{Document, NodeId, ParseOptions, clean_text, parse_document_with, serialize_document};
use net::SourceFetcher;
use std::collections::HashMap;

/// Counts for one file in one pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileReport {
    pub updated: usize,
    pub already_applied: usize,
    pub unmatched: usize,
    /// How many records each strategy resolved.
    pub strategies: Vec<(Strategy, usize)>,
}

impl FileReport {
    fn count_strategy(&mut self, strategy: Strategy) {
        match self.strategies.iter_mut().find(|(s, _)| *s == strategy) {
            Some((_, n)) => *n += 1,
            None => self.strategies.push((strategy, 1)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileOutcome {
    Applied(FileReport),
    /// No cached copy, the fetch failed and no baseline was registered.
    Skipped { reason: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    pub files: Vec<(String, FileOutcome)>,
}

impl PassReport {
    fn reports(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter_map(|(_, o)| match o {
            FileOutcome::Applied(r) => Some(r),
            FileOutcome::Skipped { .. } => None,
        })
    }

    pub fn updated(&self) -> usize {
        self.reports().map(|r| r.updated).sum()
    }

    pub fn already_applied(&self) -> usize {
        self.reports().map(|r| r.already_applied).sum()
    }

    pub fn unmatched(&self) -> usize {
        self.reports().map(|r| r.unmatched).sum()
    }

    pub fn skipped(&self) -> usize {
        self.files
            .iter()
            .filter(|(_, o)| matches!(o, FileOutcome::Skipped { .. }))
            .count()
    }

    pub fn outcome(&self, path: &str) -> Option<&FileOutcome> {
        self.files.iter().find(|(p, _)| p == path).map(|(_, o)| o)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ApplyEngine {
    builder: FingerprintBuilder,
    parse: ParseOptions,
}

impl ApplyEngine {
    pub fn new(builder: FingerprintBuilder, parse: ParseOptions) -> Self {
        Self { builder, parse }
    }

    /// Apply `records` to one file's text. Returns the serialized document and its counts.
    pub fn apply_to_text<'r>(
        &self,
        path: &str,
        text: &str,
        records: impl IntoIterator<Item = &'r ChangeRecord>,
    ) -> (String, FileReport) {
        let mut doc = parse_document_with(text, &self.parse);
        let mut report = FileReport::default();
        for record in records {
            match resolve(&self.builder, &doc, record) {
                Some((strategy, node)) => {
                    self.log_match(&doc, node, record, strategy, path);
                    report.count_strategy(strategy);
                    match write_record(&mut doc, node, record) {
                        WriteOutcome::Updated => report.updated += 1,
                        WriteOutcome::AlreadyApplied => report.already_applied += 1,
                    }
                }
                None => {
                    report.unmatched += 1;
                    log::warn!(
                        target: "apply",
                        "{path}: no candidate for record {} <{}> {:?}",
                        record.key,
                        record.tag,
                        record.old_text
                    );
                    self.log_near_miss(&doc, record);
                }
            }
        }
        (serialize_document(&doc), report)
    }

    fn log_match(
        &self,
        doc: &Document,
        node: NodeId,
        record: &ChangeRecord,
        strategy: Strategy,
        path: &str,
    ) {
        if !log::log_enabled!(target: "apply", log::Level::Debug) {
            return;
        }
        let chain = self.builder.ancestor_signature(doc, node, NodeId::ROOT);
        log::debug!(
            target: "apply",
            "{path}: record {} matched by {strategy} (ancestor overlap {:.2})",
            record.key,
            ancestor_overlap(&record.fingerprint.ancestor_signature, &chain)
        );
    }

    fn log_near_miss(&self, doc: &Document, record: &ChangeRecord) {
        if !log::log_enabled!(target: "apply", log::Level::Debug) {
            return;
        }
        let best = doc
            .elements_by_tag(&record.tag_name())
            .map(|e| {
                let text = clean_text(&doc.text_content(e));
                (text_similarity(&text, &record.old_text), text)
            })
            .max_by(|a, b| a.0.total_cmp(&b.0));
        if let Some((score, text)) = best {
            log::debug!(
                target: "apply",
                "record {}: closest <{}> text {text:?} (similarity {score:.2})",
                record.key,
                record.tag
            );
        }
    }

    /// Run one apply pass over `groups` (records grouped by source file, in log order).
    ///
    /// `baselines` maps paths to text used when a file is neither cached nor fetchable.
    pub fn apply_pass<'r, F>(
        &self,
        groups: impl IntoIterator<Item = (&'r str, Vec<&'r ChangeRecord>)>,
        cache: &mut FileCache,
        fetcher: &mut F,
        baselines: &HashMap<String, String>,
    ) -> PassReport
    where
        F: SourceFetcher + ?Sized,
    {
        let mut pass = PassReport::default();
        for (path, records) in groups {
            let text = match load_source(path, cache, fetcher, baselines) {
                Ok(text) => text,
                Err(reason) => {
                    log::warn!(target: "apply", "skipping {path}: {reason}");
                    pass.files
                        .push((path.to_string(), FileOutcome::Skipped { reason }));
                    continue;
                }
            };
            let (output, report) = self.apply_to_text(path, &text, records);
            log::info!(
                target: "apply",
                "{path}: {} updated, {} already applied, {} unmatched",
                report.updated,
                report.already_applied,
                report.unmatched
            );
            cache.set(path, output);
            pass.files.push((path.to_string(), FileOutcome::Applied(report)));
        }
        pass
    }
}

fn load_source<F>(
    path: &str,
    cache: &FileCache,
    fetcher: &mut F,
    baselines: &HashMap<String, String>,
) -> Result<String, String>
where
    F: SourceFetcher + ?Sized,
{
    if let Some(text) = cache.get(path) {
        log::debug!(target: "apply", "{path}: from cache");
        return Ok(text.to_string());
    }
    match fetcher.fetch(path) {
        Ok(text) => Ok(text),
        Err(err) => match baselines.get(path) {
            Some(text) => {
                log::warn!(target: "apply", "{path}: {err}; using the page baseline");
                Ok(text.clone())
            }
            None => Err(err.to_string()),
        },
    }
}
