use core_types::{ChangeRecord, EditKey};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChangeLogError {
    #[error("change log is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("change log contains key {0} more than once")]
    DuplicateKey(EditKey),
}

/// Result of [`ChangeLog::upsert`], carrying the record's position in the log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upsert {
    Inserted(usize),
    Updated(usize),
}

/// Ordered change records, one per edited node.
///
/// Records are never removed. A second upsert for the same key supersedes the mutable fields
/// in place and keeps the record's position, baseline and fingerprint.
#[derive(Clone, Debug, Default)]
pub struct ChangeLog {
    records: Vec<ChangeRecord>,
    index: HashMap<EditKey, usize>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: EditKey) -> Option<&ChangeRecord> {
        self.index.get(&key).map(|&i| &self.records[i])
    }

    pub fn contains(&self, key: EditKey) -> bool {
        self.index.contains_key(&key)
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChangeRecord> {
        self.records.iter()
    }

    /// Largest key in the log, so a resumed session can allocate past it.
    pub fn max_key(&self) -> Option<EditKey> {
        self.index.keys().copied().max()
    }

    /// Insert `record`, or overwrite `new_text`, `content`, `new_markup` and `timestamp_ms`
    /// of the existing record with the same key.
    pub fn upsert(&mut self, record: ChangeRecord) -> Upsert {
        if let Some(&i) = self.index.get(&record.key) {
            let existing = &mut self.records[i];
            existing.new_text = record.new_text;
            existing.content = record.content;
            existing.new_markup = record.new_markup;
            existing.timestamp_ms = record.timestamp_ms;
            return Upsert::Updated(i);
        }
        let i = self.records.len();
        self.index.insert(record.key, i);
        self.records.push(record);
        Upsert::Inserted(i)
    }

    /// Records grouped by source file, files in order of first appearance and records in log
    /// order within each file.
    pub fn group_by_file(&self) -> Vec<(&str, Vec<&ChangeRecord>)> {
        let mut groups: Vec<(&str, Vec<&ChangeRecord>)> = Vec::new();
        let mut slots: HashMap<&str, usize> = HashMap::new();
        for record in &self.records {
            let slot = *slots.entry(record.source_file.as_str()).or_insert_with(|| {
                groups.push((record.source_file.as_str(), Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(record);
        }
        groups
    }

    pub fn to_json(&self) -> Result<String, ChangeLogError> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    pub fn from_json(text: &str) -> Result<Self, ChangeLogError> {
        let records: Vec<ChangeRecord> = serde_json::from_str(text)?;
        Self::from_records(records)
    }

    pub fn from_records(records: Vec<ChangeRecord>) -> Result<Self, ChangeLogError> {
        let mut index = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if index.insert(record.key, i).is_some() {
                return Err(ChangeLogError::DuplicateKey(record.key));
            }
        }
        log::debug!(target: "edit_core", "loaded {} change records", records.len());
        Ok(Self { records, index })
    }
}

impl<'a> IntoIterator for &'a ChangeLog {
    type Item = &'a ChangeRecord;
    type IntoIter = std::slice::Iter<'a, ChangeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{ContentKind, Fingerprint};

    fn record(key: u64, file: &str, old: &str, new: &str, ts: u64) -> ChangeRecord {
        ChangeRecord {
            key: EditKey::from_raw(key),
            source_file: file.into(),
            tag: "P".into(),
            old_text: old.into(),
            new_text: new.into(),
            content: ContentKind::PlainText,
            new_markup: None,
            fingerprint: Fingerprint {
                anchor_selector: "body".into(),
                ..Fingerprint::default()
            },
            timestamp_ms: ts,
        }
    }

    #[test]
    fn upsert_updates_in_place() {
        let mut log = ChangeLog::new();
        assert_eq!(log.upsert(record(1, "a.html", "x", "y", 10)), Upsert::Inserted(0));
        assert_eq!(log.upsert(record(2, "a.html", "p", "q", 20)), Upsert::Inserted(1));

        let mut later = record(1, "a.html", "IGNORED", "z", 30);
        later.fingerprint.anchor_selector = "#ignored".into();
        assert_eq!(log.upsert(later), Upsert::Updated(0));

        assert_eq!(log.len(), 2);
        let first = log.get(EditKey::from_raw(1)).expect("record");
        assert_eq!(first.old_text, "x");
        assert_eq!(first.new_text, "z");
        assert_eq!(first.timestamp_ms, 30);
        assert_eq!(first.fingerprint.anchor_selector, "body");
        assert_eq!(log.records()[1].key, EditKey::from_raw(2));
    }

    #[test]
    fn groups_preserve_first_appearance() {
        let mut log = ChangeLog::new();
        log.upsert(record(1, "footer.html", "a", "b", 1));
        log.upsert(record(2, "index.html", "c", "d", 2));
        log.upsert(record(3, "footer.html", "e", "f", 3));
        let groups = log.group_by_file();
        let summary: Vec<(&str, Vec<u64>)> = groups
            .iter()
            .map(|(file, records)| (*file, records.iter().map(|r| r.key.as_raw()).collect()))
            .collect();
        assert_eq!(
            summary,
            vec![("footer.html", vec![1, 3]), ("index.html", vec![2])]
        );
    }

    #[test]
    fn json_round_trip_rebuilds_index() {
        let mut log = ChangeLog::new();
        log.upsert(record(4, "a.html", "x", "y", 1));
        log.upsert(record(9, "b.html", "p", "q", 2));
        let text = log.to_json().expect("json");
        let back = ChangeLog::from_json(&text).expect("parse");
        assert_eq!(back.records(), log.records());
        assert!(back.contains(EditKey::from_raw(9)));
        assert_eq!(back.max_key(), Some(EditKey::from_raw(9)));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let text = serde_json::to_string(&vec![
            record(1, "a.html", "x", "y", 1),
            record(1, "a.html", "x", "z", 2),
        ])
        .expect("json");
        assert!(matches!(
            ChangeLog::from_json(&text),
            Err(ChangeLogError::DuplicateKey(k)) if k == EditKey::from_raw(1)
        ));
        assert!(matches!(
            ChangeLog::from_json("{"),
            Err(ChangeLogError::Json(_))
        ));
    }
}
