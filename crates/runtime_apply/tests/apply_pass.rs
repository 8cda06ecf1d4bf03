use core_types::{ChangeRecord, ContentKind, EditKey, Fingerprint, NthStep};
use net::{FetchError, SourceFetcher, StaticFetcher};
use runtime_apply::{ApplyEngine, FileCache, FileOutcome, Strategy};
use std::collections::HashMap;

const FOOTER: &str = include_str!("fixtures/footer.html");
const INDEX: &str = include_str!("fixtures/index.html");

fn record(key: u64, file: &str, tag: &str, old: &str, new: &str) -> ChangeRecord {
    ChangeRecord {
        key: EditKey::from_raw(key),
        source_file: file.into(),
        tag: tag.into(),
        old_text: old.into(),
        new_text: new.into(),
        content: ContentKind::PlainText,
        new_markup: None,
        fingerprint: Fingerprint {
            anchor_selector: "body".into(),
            ..Fingerprint::default()
        },
        timestamp_ms: 0,
    }
}

fn contact_record() -> ChangeRecord {
    let mut r = record(1, "footer.html", "A", "Contact", "Contact Us");
    r.fingerprint.class_signature = vec!["nav-link".into()];
    r.fingerprint.nth_path = vec![
        NthStep {
            tag: "footer".into(),
            nth: 1,
        },
        NthStep {
            tag: "ul".into(),
            nth: 1,
        },
        NthStep {
            tag: "li".into(),
            nth: 2,
        },
        NthStep {
            tag: "a".into(),
            nth: 1,
        },
    ];
    r
}

fn one_file<'r>(path: &'r str, records: &'r [ChangeRecord]) -> Vec<(&'r str, Vec<&'r ChangeRecord>)> {
    vec![(path, records.iter().collect())]
}

#[test]
fn contact_link_is_updated_in_footer_source() {
    let engine = ApplyEngine::default();
    let records = [contact_record()];
    let (out, report) = engine.apply_to_text("footer.html", FOOTER, &records);
    assert_eq!(report.updated, 1);
    assert_eq!(report.unmatched, 0);
    assert_eq!(report.strategies, vec![(Strategy::ClassSignature, 1)]);
    assert!(out.starts_with("<!DOCTYPE html>\n<html>"));
    assert!(out.contains(r#"<a class="nav-link" href="/contact.html">Contact Us</a>"#));
    assert!(out.contains(r#"<a class="nav-link" href="/about.html">About</a>"#));
    assert!(out.contains("&copy; 2024") || out.contains("\u{00A9} 2024"));
}

#[test]
fn second_pass_updates_nothing() {
    let engine = ApplyEngine::default();
    let records = [contact_record()];
    let (once, first) = engine.apply_to_text("footer.html", FOOTER, &records);
    let (twice, second) = engine.apply_to_text("footer.html", &once, &records);
    assert_eq!(first.updated, 1);
    assert_eq!(second.updated, 0);
    assert_eq!(second.already_applied, 1);
    assert_eq!(once, twice);
}

#[test]
fn fallback_only_record_is_idempotent_too() {
    // Tag and text only: once applied, the baseline text is gone and nothing re-matches.
    let engine = ApplyEngine::default();
    let records = [record(1, "index.html", "LI", "Ann", "Anna")];
    let (once, first) = engine.apply_to_text("index.html", INDEX, &records);
    assert_eq!(first.updated, 1);
    assert_eq!(first.strategies, vec![(Strategy::TagText, 1)]);
    let (twice, second) = engine.apply_to_text("index.html", &once, &records);
    assert_eq!(second.updated, 0);
    assert_eq!(once, twice);
    assert!(once.contains("<li>Anna</li>"));
}

#[test]
fn identical_siblings_resolve_to_the_first() {
    let engine = ApplyEngine::default();
    let records = [record(1, "index.html", "P", "We build things.", "We ship things.")];
    let (out, report) = engine.apply_to_text("index.html", INDEX, &records);
    assert_eq!(report.updated, 1);
    assert!(out.contains("<p>We ship things.</p>"));
    assert!(out.contains(r#"<p id="mission">We build things.</p>"#));
}

#[test]
fn stable_id_wins_over_identical_text() {
    let engine = ApplyEngine::default();
    let mut r = record(1, "index.html", "P", "We build things.", "Our mission.");
    r.fingerprint.stable_id = "mission".into();
    r.fingerprint.anchor_selector = "#mission".into();
    let (out, report) = engine.apply_to_text("index.html", INDEX, &[r]);
    assert_eq!(report.strategies, vec![(Strategy::StableId, 1)]);
    assert!(out.contains("<p>We build things.</p>"));
    assert!(out.contains(r#"<p id="mission">Our mission.</p>"#));
}

#[test]
fn rich_inline_records_replace_markup() {
    let engine = ApplyEngine::default();
    let mut r = record(1, "index.html", "H1", "Welcome", "Welcome home");
    r.content = ContentKind::RichInline;
    r.new_markup = Some("Welcome <b>home</b>".into());
    let (out, report) = engine.apply_to_text("index.html", INDEX, &[r]);
    assert_eq!(report.updated, 1);
    assert!(out.contains(r#"<h1 class="hero-title is-visible">Welcome <b>home</b></h1>"#));
}

#[test]
fn unmatched_records_are_counted_not_fatal() {
    let engine = ApplyEngine::default();
    let records = [
        record(1, "index.html", "SPAN", "nowhere", "x"),
        record(2, "index.html", "LI", "Bob", "Robert"),
    ];
    let (out, report) = engine.apply_to_text("index.html", INDEX, &records);
    assert_eq!(report.unmatched, 1);
    assert_eq!(report.updated, 1);
    assert!(out.contains("<li>Robert</li>"));
}

/// Counts fetches so cache hits are observable.
struct Counting {
    inner: StaticFetcher,
    calls: HashMap<String, usize>,
}

impl SourceFetcher for Counting {
    fn fetch(&mut self, path: &str) -> Result<String, FetchError> {
        *self.calls.entry(path.to_string()).or_default() += 1;
        self.inner.fetch(path)
    }
}

#[test]
fn cache_accumulates_edits_across_passes() {
    let engine = ApplyEngine::default();
    let mut cache = FileCache::new();
    let mut fetcher = Counting {
        inner: StaticFetcher::new().with("footer.html", FOOTER),
        calls: HashMap::new(),
    };
    let baselines = HashMap::new();

    let first = [contact_record()];
    let pass = engine.apply_pass(one_file("footer.html", &first), &mut cache, &mut fetcher, &baselines);
    assert_eq!(pass.updated(), 1);

    let second = [record(2, "footer.html", "A", "About", "About us")];
    let pass = engine.apply_pass(one_file("footer.html", &second), &mut cache, &mut fetcher, &baselines);
    assert_eq!(pass.updated(), 1);

    assert_eq!(fetcher.calls["footer.html"], 1);
    let text = cache.get("footer.html").expect("cached");
    assert!(text.contains(">Contact Us</a>"));
    assert!(text.contains(">About us</a>"));
}

#[test]
fn unreachable_files_fall_back_or_skip() {
    let engine = ApplyEngine::default();
    let mut cache = FileCache::new();
    let mut fetcher = StaticFetcher::new();
    let mut baselines = HashMap::new();
    baselines.insert("index.html".to_string(), INDEX.to_string());

    let records = [
        record(1, "index.html", "LI", "Ann", "Anna"),
        record(2, "header.html", "A", "Home", "Start"),
        record(3, "index.html", "LI", "Bob", "Robert"),
    ];
    let mut groups: Vec<(&str, Vec<&ChangeRecord>)> = Vec::new();
    groups.push(("index.html", vec![&records[0], &records[2]]));
    groups.push(("header.html", vec![&records[1]]));

    let pass = engine.apply_pass(groups, &mut cache, &mut fetcher, &baselines);
    assert_eq!(pass.updated(), 2);
    assert_eq!(pass.skipped(), 1);
    assert!(matches!(
        pass.outcome("header.html"),
        Some(FileOutcome::Skipped { .. })
    ));
    assert!(!cache.contains("header.html"));
    let index = cache.get("index.html").expect("index cached");
    assert!(index.contains("<li>Anna</li>"));
    assert!(index.contains("<li>Robert</li>"));
}

#[test]
fn files_without_matches_are_still_cached() {
    let engine = ApplyEngine::default();
    let mut cache = FileCache::new();
    let mut fetcher = StaticFetcher::new().with("footer.html", FOOTER);
    let records = [record(1, "footer.html", "H1", "Missing", "x")];
    let pass = engine.apply_pass(one_file("footer.html", &records), &mut cache, &mut fetcher, &HashMap::new());
    assert_eq!(pass.unmatched(), 1);
    assert!(cache.contains("footer.html"));
}

#[test]
fn bare_footer_link_gets_the_new_text() {
    let engine = ApplyEngine::default();
    let source = r#"<footer><ul><li><a class="nav-link">Home</a></li><li><a class="nav-link">Contact</a></li></ul></footer>"#;
    let (out, report) = engine.apply_to_text("footer.html", source, &[contact_record()]);
    assert_eq!(report.updated, 1);
    assert!(out.contains(r#"<a class="nav-link">Contact Us</a>"#));
}

fn nested_page(depth: usize) -> String {
    let mut out = String::new();
    for level in 1..=depth {
        out.push_str("<div>");
        if level == 15 {
            out.push_str("<span>decoy</span>");
        }
    }
    out.push_str("<span>deep</span>");
    for _ in 0..depth {
        out.push_str("</div>");
    }
    out
}

#[test]
fn deep_nodes_are_not_confused_with_shallower_namesakes() {
    let markup = nested_page(20);
    let live = html::parse_document(&markup);
    let builder = fingerprint::FingerprintBuilder::default();
    let deep = live
        .elements_by_tag("span")
        .find(|&s| live.text_content(s) == "deep")
        .expect("deep span");

    let mut r = record(1, "index.html", "SPAN", "deep", "DEEP EDITED");
    r.fingerprint = builder.build(&live, deep);
    assert!(r.fingerprint.nth_path.is_empty());

    let engine = ApplyEngine::default();
    let (out, report) = engine.apply_to_text("index.html", &markup, &[r]);
    assert_eq!(report.updated, 1);
    assert_eq!(report.strategies, vec![(Strategy::TagText, 1)]);
    assert!(out.contains("<span>decoy</span>"));
    assert!(out.contains("<span>DEEP EDITED</span>"));
}

#[test]
fn text_fallback_can_reach_an_untouched_twin_on_a_later_pass() {
    // The anchor id is gone from the source, so only the text scan is left.
    let engine = ApplyEngine::default();
    let source = "<ul><li>Same</li><li>Same</li></ul>";
    let mut r = record(1, "index.html", "LI", "Same", "Changed");
    r.fingerprint.anchor_selector = "#removed".into();
    r.fingerprint.nth_path = vec![NthStep {
        tag: "li".into(),
        nth: 2,
    }];
    let records = [r];

    let (once, first) = engine.apply_to_text("index.html", source, &records);
    assert_eq!(first.strategies, vec![(Strategy::TagText, 1)]);
    assert!(once.contains("<li>Changed</li><li>Same</li>"));

    let (twice, second) = engine.apply_to_text("index.html", &once, &records);
    assert_eq!(second.updated, 1);
    assert!(twice.contains("<li>Changed</li><li>Changed</li>"));
}
