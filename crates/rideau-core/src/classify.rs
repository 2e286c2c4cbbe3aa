//! Heuristic theatre / non-theatre classification.
//!
//! Most source sites mix plays with concerts, exhibitions, film screenings,
//! workshops and club nights. The classifier scores weighted keyword hits
//! over title, description and URL, then gates emission on the resulting
//! decision. It is keyword heuristics, not ML, and makes no claim of
//! completeness: the tables are data, injected at construction, tuned in
//! config.

use serde::{Deserialize, Serialize};

use crate::models::CandidateRecord;
use crate::normalize::{contains_word, match_text};

/// Keyword tables driving the classifier. Loaded from config; see
/// `config/default.toml` for the shipped defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierKeywords {
    /// Theatre signals: "théâtre", "pièce", "mise en scène", …
    pub positive: Vec<String>,
    /// Non-theatre signals: concert/club formats, exhibitions, screenings,
    /// talks, workshops, dance.
    pub negative: Vec<String>,
    /// Mild doubts that are not a hard veto — festivals often do contain
    /// plays.
    #[serde(default)]
    pub soft_negative: Vec<String>,
    /// Credit phrasings ("mise en scène", "texte de", …) that mark
    /// produced stage work.
    #[serde(default)]
    pub credit_markers: Vec<String>,
}

/// Outcome of scoring a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Theatre,
    NonTheatre,
    Unknown,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Theatre => write!(f, "theatre"),
            Self::NonTheatre => write!(f, "non-theatre"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Full scoring result. `confidence` is diagnostic only; gating uses the
/// classification.
#[derive(Debug, Clone, Copy)]
pub struct Verdict {
    pub score: i32,
    pub classification: Classification,
    pub confidence: f32,
}

/// Result of the emission gate.
#[derive(Debug, Clone, Copy)]
pub struct EmitDecision {
    pub ok: bool,
    pub classification: Classification,
}

// Weights and thresholds. Tuned empirically against the live sources;
// changing any of these reclassifies real listings.
const POSITIVE_TITLE: i32 = 3;
const POSITIVE_DESCRIPTION: i32 = 1;
const NEGATIVE_TITLE: i32 = -4;
const NEGATIVE_DESCRIPTION: i32 = -2;
const NEGATIVE_URL: i32 = -1;
const SOFT_NEGATIVE: i32 = -1;
const CREDITS_BONUS: i32 = 1;
const THEATRE_AT: i32 = 2;
const NON_THEATRE_AT: i32 = -2;

pub struct TheatreClassifier {
    positive: Vec<String>,
    negative: Vec<String>,
    soft_negative: Vec<String>,
    credit_markers: Vec<String>,
}

impl TheatreClassifier {
    /// Build a classifier from keyword tables. Keywords are normalized to
    /// match-text form and deduplicated, so "théâtre" and "theatre" in the
    /// same table count once.
    pub fn new(keywords: &ClassifierKeywords) -> Self {
        Self {
            positive: normalize_keywords(&keywords.positive),
            negative: normalize_keywords(&keywords.negative),
            soft_negative: normalize_keywords(&keywords.soft_negative),
            credit_markers: normalize_keywords(&keywords.credit_markers),
        }
    }

    /// Score a record. Case- and diacritic-insensitive; each configured
    /// keyword counts once per field.
    pub fn score(&self, record: &CandidateRecord) -> Verdict {
        let title = match_text(&record.titre);
        let description = match_text(record.description.as_deref().unwrap_or(""));
        let url = match_text(record.url.as_deref().unwrap_or(&record.source_url));

        let mut score = 0;
        for kw in &self.positive {
            if contains_word(&title, kw) {
                score += POSITIVE_TITLE;
            }
            if contains_word(&description, kw) {
                score += POSITIVE_DESCRIPTION;
            }
        }
        for kw in &self.negative {
            if contains_word(&title, kw) {
                score += NEGATIVE_TITLE;
            }
            if contains_word(&description, kw) {
                score += NEGATIVE_DESCRIPTION;
            }
            if contains_word(&url, kw) {
                score += NEGATIVE_URL;
            }
        }
        for kw in &self.soft_negative {
            if contains_word(&title, kw) {
                score += SOFT_NEGATIVE;
            }
            if contains_word(&description, kw) {
                score += SOFT_NEGATIVE;
            }
        }
        if self
            .credit_markers
            .iter()
            .any(|kw| contains_word(&title, kw) || contains_word(&description, kw))
        {
            score += CREDITS_BONUS;
        }

        let classification = if score >= THEATRE_AT {
            Classification::Theatre
        } else if score <= NON_THEATRE_AT {
            Classification::NonTheatre
        } else {
            Classification::Unknown
        };
        Verdict {
            score,
            classification,
            confidence: ((score + 6) as f32 / 12.0).clamp(0.0, 1.0),
        }
    }

    /// Emission gate.
    ///
    /// A connector-supplied `is_theatre = false` is an unconditional veto,
    /// applied before any scoring: connector certainty beats heuristics.
    /// Otherwise `theatre` passes, `non-theatre` is dropped, and `unknown`
    /// passes only in lenient mode (small mixed venues publish sparse text
    /// and still deserve a listing).
    pub fn should_emit(&self, record: &CandidateRecord, strict: bool) -> EmitDecision {
        if record.is_theatre == Some(false) {
            return EmitDecision {
                ok: false,
                classification: Classification::NonTheatre,
            };
        }
        let verdict = self.score(record);
        let ok = match verdict.classification {
            Classification::Theatre => true,
            Classification::Unknown => !strict,
            Classification::NonTheatre => false,
        };
        EmitDecision {
            ok,
            classification: verdict.classification,
        }
    }
}

fn normalize_keywords(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for kw in raw {
        let normalized = match_text(kw).trim().to_string();
        if !normalized.is_empty() && !out.contains(&normalized) {
            out.push(normalized);
        }
    }
    out
}
