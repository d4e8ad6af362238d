//! Citation graph expansion

use litscout_core::{CandidateSet, PaperRecord};
use std::collections::HashSet;

/// Computes the expansion frontier: identifiers reachable by one citation
/// edge from the highest-relevance accepted papers that are not yet in the
/// candidate set.
///
/// Pure bookkeeping; fetching the records is the caller's job.
#[derive(Debug, Clone)]
pub struct CitationExpander {
    max_expand_papers: usize,
    max_edges_per_paper: usize,
}

impl CitationExpander {
    pub fn new(max_expand_papers: usize, max_edges_per_paper: usize) -> Self {
        Self {
            max_expand_papers,
            max_edges_per_paper,
        }
    }

    /// Pick the papers worth expanding: accepted records ranked by score
    /// descending, limited to the configured count.
    pub fn pick_sources<'a>(&self, accepted: &[&'a PaperRecord]) -> Vec<&'a PaperRecord> {
        let mut sources: Vec<&PaperRecord> = accepted.to_vec();
        sources.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sources.truncate(self.max_expand_papers);
        sources
    }

    /// Frontier identifiers as `(candidate_id, source_id)` pairs. References
    /// and citations are merged per source; each source contributes at most
    /// `max_edges_per_paper` edges, and a candidate is attributed to the
    /// first source that reaches it.
    pub fn frontier(
        &self,
        sources: &[&PaperRecord],
        seen: &CandidateSet,
    ) -> Vec<(String, String)> {
        let mut queued: HashSet<String> = HashSet::new();
        let mut frontier = Vec::new();

        for source in sources {
            let mut taken = 0;
            for edge_id in source.reference_ids.iter().chain(source.cited_by_ids.iter()) {
                if taken >= self.max_edges_per_paper {
                    break;
                }
                if seen.contains(edge_id) || queued.contains(edge_id) {
                    continue;
                }
                queued.insert(edge_id.clone());
                frontier.push((edge_id.clone(), source.id.clone()));
                taken += 1;
            }
        }

        frontier
    }
}
