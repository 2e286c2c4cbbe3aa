use serde::{Deserialize, Serialize};

/// A scraped performance occurrence, as yielded by a connector.
///
/// Transient: connectors rebuild their whole batch on every run and keep no
/// state. `date` is the only hard requirement (`YYYY-MM-DD`); everything
/// else degrades to empty/`None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Identifier of the producing connector. Provenance only: two
    /// connectors discovering the same performance must still collapse to
    /// one row, so this never participates in identity.
    #[serde(default)]
    pub source: String,
    /// Listing page the connector fetched this from.
    #[serde(default)]
    pub source_url: String,
    /// Performance date, ISO 8601 (`YYYY-MM-DD`).
    pub date: String,
    /// Time of day (`HH:MM:SS`); some sources never expose one.
    #[serde(default)]
    pub heure: Option<String>,
    /// Raw title as scraped; may carry a glued-on venue name or HTML
    /// entity artifacts.
    pub titre: String,
    /// Human-readable venue name.
    #[serde(default)]
    pub theatre_nom: String,
    #[serde(default)]
    pub theatre_adresse: Option<String>,
    /// Most specific public link for this occurrence (ticketing preferred);
    /// `source_url` is the fallback.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Explicit connector hint. `Some(false)` is an unconditional veto,
    /// whatever the classifier would have said.
    #[serde(default)]
    pub is_theatre: Option<bool>,
    /// Sold-out flag.
    #[serde(default)]
    pub is_complet: Option<bool>,
}

/// A persisted row: a [`CandidateRecord`] plus its computed identity and
/// the moderation marker maintained by external tooling.
#[derive(Debug, Clone, Serialize)]
pub struct Representation {
    pub id: i64,
    pub fingerprint: String,
    #[serde(flatten)]
    pub record: CandidateRecord,
    /// Soft-delete marker. A non-null value excludes the row from every
    /// public read path; the core itself never sets or clears it during
    /// ingestion.
    pub hidden_at: Option<String>,
    pub hidden_reason: Option<String>,
}
