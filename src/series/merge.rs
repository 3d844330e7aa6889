//! Historical merge.
//!
//! The history holds at most one record per `(product_id, date)`. New
//! observations only ever add records for keys that are not present yet; an
//! existing record is never replaced.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDate;

use crate::domain::{HistoricalRecord, Observation};

/// The deduplicated, append-only price history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    records: Vec<HistoricalRecord>,
    keys: HashSet<(String, NaiveDate)>,
}

/// What a merge did with each incoming observation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// Newly added records, ordered by `(product_id, date)`.
    pub appended: Vec<HistoricalRecord>,
    /// Observations for a day that was already in the history.
    pub skipped_existing: usize,
    /// Later observations for a day first seen in this same batch.
    pub skipped_duplicate: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a history from stored records, keeping the first record per day.
    ///
    /// Well-formed stores never hold duplicates; anything after the first record
    /// for a key is ignored so the uniqueness invariant holds in memory.
    pub fn from_records(records: impl IntoIterator<Item = HistoricalRecord>) -> Self {
        let mut history = Self::new();
        for record in records {
            history.insert(record);
        }
        history
    }

    pub fn records(&self) -> &[HistoricalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, product_id: &str, date: NaiveDate) -> bool {
        self.keys.contains(&(product_id.to_string(), date))
    }

    pub fn product_count(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.product_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Merge new observations into the history (first write wins per day).
    ///
    /// Within one batch, the earliest observation of a day wins (ties: lower
    /// price), so the result does not depend on batch order. Re-merging the
    /// same batch is a no-op.
    pub fn merge(&mut self, observations: &[Observation]) -> MergeOutcome {
        let mut incoming: Vec<&Observation> = observations.iter().collect();
        incoming.sort_by(|a, b| compare_observations(a, b));

        let mut outcome = MergeOutcome::default();
        let mut seen_in_batch: HashSet<(&str, NaiveDate)> = HashSet::new();

        for obs in incoming {
            if self.contains(&obs.product_id, obs.date) {
                outcome.skipped_existing += 1;
                continue;
            }
            if !seen_in_batch.insert((obs.product_id.as_str(), obs.date)) {
                outcome.skipped_duplicate += 1;
                continue;
            }
            outcome.appended.push(HistoricalRecord::from(obs.clone()));
        }

        for record in &outcome.appended {
            self.insert(record.clone());
        }

        outcome
    }

    fn insert(&mut self, record: HistoricalRecord) -> bool {
        if !self.keys.insert((record.product_id.clone(), record.date)) {
            return false;
        }
        self.records.push(record);
        true
    }
}

fn compare_observations(a: &Observation, b: &Observation) -> Ordering {
    a.product_id
        .cmp(&b.product_id)
        .then(a.date.cmp(&b.date))
        .then(a.observed_at.cmp(&b.observed_at))
        .then(a.price.total_cmp(&b.price))
}
