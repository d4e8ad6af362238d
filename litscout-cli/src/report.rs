//! Markdown and BibTeX rendering of review results

use litscout_agent::ReviewOutcome;
use litscout_core::PaperRecord;

/// BibTeX citation key: last name of the first author plus the year
fn bibtex_key(paper: &PaperRecord) -> String {
    let first_author = paper
        .authors
        .first()
        .and_then(|name| name.split_whitespace().last())
        .map(|last| {
            last.chars()
                .filter(|c| c.is_ascii_alphabetic())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "anonymous".to_string());

    let year = paper
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    format!("{first_author}{year}")
}

/// Render one paper as a BibTeX entry
pub fn to_bibtex(paper: &PaperRecord) -> String {
    let venue_lower = paper.venue.as_deref().unwrap_or("").to_lowercase();
    let entry_type =
        if venue_lower.contains("conference") || venue_lower.contains("proceedings") {
            "inproceedings"
        } else {
            "article"
        };

    let authors = if paper.authors.is_empty() {
        "Unknown".to_string()
    } else {
        paper.authors.join(" and ")
    };

    let mut entry = format!("@{}{{{},\n", entry_type, bibtex_key(paper));
    entry.push_str(&format!("  title = {{{}}},\n", paper.title));
    entry.push_str(&format!("  author = {{{}}},\n", authors));
    if let Some(year) = paper.year {
        entry.push_str(&format!("  year = {{{}}},\n", year));
    }
    if let Some(venue) = &paper.venue {
        let field = if entry_type == "article" {
            "journal"
        } else {
            "booktitle"
        };
        entry.push_str(&format!("  {} = {{{}}},\n", field, venue));
    }
    if let Some(url) = &paper.url {
        entry.push_str(&format!("  url = {{{}}},\n", url));
    }
    entry.push_str("}\n");
    entry
}

/// BibTeX file with every accepted paper
pub fn render_bibliography(outcome: &ReviewOutcome) -> String {
    outcome
        .papers
        .iter()
        .map(to_bibtex)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full markdown report: ranked papers plus run diagnostics
pub fn render_report(outcome: &ReviewOutcome) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Literature review: {}\n\n", outcome.target.title));

    if !outcome.plan.research_questions.is_empty() {
        out.push_str("## Research questions\n\n");
        for question in &outcome.plan.research_questions {
            out.push_str(&format!("- {}\n", question));
        }
        out.push('\n');
    }

    out.push_str(&format!("## Papers ({})\n\n", outcome.papers.len()));
    for (i, paper) in outcome.papers.iter().enumerate() {
        out.push_str(&format!("### {}. {}\n\n", i + 1, paper.title));
        if !paper.authors.is_empty() {
            out.push_str(&format!("- Authors: {}\n", paper.authors.join(", ")));
        }
        if let Some(year) = paper.year {
            out.push_str(&format!("- Year: {}\n", year));
        }
        if let Some(venue) = &paper.venue {
            out.push_str(&format!("- Venue: {}\n", venue));
        }
        if let Some(score) = paper.relevance_score {
            let degraded = if paper.score_degraded { " (degraded)" } else { "" };
            out.push_str(&format!("- Relevance: {:.2}{}\n", score, degraded));
        }
        if let Some(url) = &paper.url {
            out.push_str(&format!("- URL: {}\n", url));
        }
        if let Some(abstract_text) = &paper.abstract_text {
            out.push_str(&format!("\n{}\n", abstract_text));
        }
        out.push('\n');
    }

    out.push_str(&outcome.progress.to_markdown());
    out
}
