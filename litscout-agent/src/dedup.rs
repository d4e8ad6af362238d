//! Near-duplicate detection for candidate batches

use litscout_core::{text, CandidateSet, PaperRecord};
use tracing::debug;

/// Filters incoming candidate batches against papers already seen.
///
/// Identifier-exact duplicates are always dropped. Title near-duplicates are
/// dropped unless `keep_duplicates` is set; similarity is Jaccard over the
/// normalized title word sets.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    threshold: f64,
    keep_duplicates: bool,
}

impl Deduplicator {
    pub fn new(threshold: f64, keep_duplicates: bool) -> Self {
        Self {
            threshold,
            keep_duplicates,
        }
    }

    /// Return the records from `batch` that are genuinely new, plus the
    /// number of near-duplicates dropped. The first occurrence in a batch
    /// wins; later ones are compared against both `seen` and the keepers.
    pub fn filter_new(
        &self,
        batch: Vec<PaperRecord>,
        seen: &CandidateSet,
    ) -> (Vec<PaperRecord>, usize) {
        let mut kept: Vec<PaperRecord> = Vec::new();
        let mut dropped = 0;

        'next: for record in batch {
            if seen.contains(&record.id) || kept.iter().any(|k| k.id == record.id) {
                continue;
            }

            if !self.keep_duplicates {
                for other in seen.iter().map(|r| &r.title).chain(kept.iter().map(|k| &k.title)) {
                    if text::title_similarity(&record.title, other) >= self.threshold {
                        debug!(
                            id = %record.id,
                            title = %record.title,
                            "Dropping near-duplicate title"
                        );
                        dropped += 1;
                        continue 'next;
                    }
                }
            }

            kept.push(record);
        }

        (kept, dropped)
    }
}
