//! Best-effort genre/style backfill over persisted rows.
//!
//! Runs as a separate enrichment pass, per distinct show (rows sharing a
//! listing page) rather than per occurrence, and only ever fills fields
//! that are still NULL — an editor's value is never touched. Safe to re-run
//! at any time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::RideauError;
use crate::models::Representation;
use crate::normalize::{contains_word, match_text};
use crate::storage::Storage;

pub const GENRE_COMEDY: &str = "comédie";
pub const GENRE_DRAMA: &str = "drame";
pub const GENRE_OTHER: &str = "autre";
pub const STYLE_CLASSIC: &str = "classique";
pub const STYLE_CONTEMPORARY: &str = "contemporain";

/// Keyword tables driving the tagger. Loaded from config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaggerKeywords {
    pub comedy: Vec<String>,
    pub drama: Vec<String>,
    /// Classic-repertoire hints, mostly author names.
    pub classic: Vec<String>,
    pub contemporary: Vec<String>,
}

pub struct GenreStyleTagger {
    comedy: Vec<String>,
    drama: Vec<String>,
    classic: Vec<String>,
    contemporary: Vec<String>,
}

/// Counts from one tagging pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaggingOutcome {
    pub shows: usize,
    pub genres_applied: usize,
    pub styles_applied: usize,
}

impl GenreStyleTagger {
    pub fn new(keywords: &TaggerKeywords) -> Self {
        Self {
            comedy: normalize(&keywords.comedy),
            drama: normalize(&keywords.drama),
            classic: normalize(&keywords.classic),
            contemporary: normalize(&keywords.contemporary),
        }
    }

    /// Infer a genre from show text, or `None` when nothing fires — a
    /// later run with a richer description may still tag it. A tie with at
    /// least one hit on each side is explicitly "autre".
    pub fn infer_genre(&self, text: &str) -> Option<&'static str> {
        let text = match_text(text);
        let comedy = hits(&text, &self.comedy);
        let drama = hits(&text, &self.drama);
        if comedy == 0 && drama == 0 {
            None
        } else if comedy > drama {
            Some(GENRE_COMEDY)
        } else if drama > comedy {
            Some(GENRE_DRAMA)
        } else {
            Some(GENRE_OTHER)
        }
    }

    /// Infer a style. Defaults to "contemporain" when no hint fires: most
    /// active programming is new work.
    pub fn infer_style(&self, text: &str) -> &'static str {
        let text = match_text(text);
        if hits(&text, &self.classic) > hits(&text, &self.contemporary) {
            STYLE_CLASSIC
        } else {
            STYLE_CONTEMPORARY
        }
    }
}

/// Run the tagging pass: group persisted rows into shows by `source_url`,
/// infer missing fields from the show's pooled title+description text, and
/// patch only rows where the field is still NULL.
pub fn run_tagging_pass(
    storage: &Storage,
    tagger: &GenreStyleTagger,
) -> Result<TaggingOutcome, RideauError> {
    let rows = storage.all_representations()?;
    let mut shows: BTreeMap<&str, Vec<&Representation>> = BTreeMap::new();
    for row in &rows {
        shows.entry(&row.record.source_url).or_default().push(row);
    }

    let mut outcome = TaggingOutcome {
        shows: shows.len(),
        ..Default::default()
    };
    for (source_url, group) in &shows {
        let missing_genre = group.iter().all(|r| r.record.genre.is_none());
        let missing_style = group.iter().all(|r| r.record.style.is_none());
        if !missing_genre && !missing_style {
            continue;
        }

        let text = show_text(group);
        if missing_genre {
            if let Some(genre) = tagger.infer_genre(&text) {
                let n = storage.update_genre_where_missing(source_url, genre)?;
                outcome.genres_applied += n;
                debug!(source_url = %source_url, genre, rows = n, "genre backfilled");
            }
        }
        if missing_style {
            let style = tagger.infer_style(&text);
            let n = storage.update_style_where_missing(source_url, style)?;
            outcome.styles_applied += n;
            debug!(source_url = %source_url, style, rows = n, "style backfilled");
        }
    }

    info!(
        shows = outcome.shows,
        genres = outcome.genres_applied,
        styles = outcome.styles_applied,
        "tagging pass complete"
    );
    Ok(outcome)
}

/// Pool the distinct titles and descriptions of a show's rows into one
/// text blob for inference.
fn show_text(group: &[&Representation]) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for row in group {
        if !parts.contains(&row.record.titre.as_str()) {
            parts.push(&row.record.titre);
        }
        if let Some(description) = row.record.description.as_deref() {
            if !parts.contains(&description) {
                parts.push(description);
            }
        }
    }
    parts.join(" ")
}

fn normalize(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|kw| match_text(kw).trim().to_string())
        .filter(|kw| !kw.is_empty())
        .collect()
}

fn hits(text: &str, keywords: &[String]) -> usize {
    keywords.iter().filter(|kw| contains_word(text, kw)).count()
}
