//! Stable content identity for scraped performances.
//!
//! The fingerprint is what makes reruns idempotent and lets two connectors
//! discover the same real-world performance independently: same identity
//! material, same row. `source` is deliberately excluded — provenance must
//! never split identity.

use sha2::{Digest, Sha256};

use crate::models::CandidateRecord;
use crate::normalize::{canonicalize_title, norm_key, normalize_url};

/// Segment separator. None of the segments can contain it: the URL is
/// percent-encoded and the other segments are reduced to `[a-z0-9:-]`.
const SEP: &str = "|";

/// Compute the identity of a candidate record.
///
/// Material, in order: normalized URL (ticketing link preferred, listing
/// page as fallback), date, time, venue key, canonical title key. The URL
/// carries most of the weight — it is usually globally unique per
/// occurrence — but date+time narrow a multi-date page down to one
/// performance, and venue+title keep manually entered rows without any URL
/// apart. Absent fields become empty segments; this never fails.
pub fn fingerprint(record: &CandidateRecord) -> String {
    let key_url = record
        .url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .or_else(|| Some(record.source_url.as_str()).filter(|u| !u.trim().is_empty()))
        .map(normalize_url)
        .unwrap_or_default();
    let venue_key = norm_key(&record.theatre_nom);
    let title_key = norm_key(&canonicalize_title(&record.titre, &record.theatre_nom));

    let material = [
        key_url.as_str(),
        record.date.as_str(),
        record.heure.as_deref().unwrap_or(""),
        venue_key.as_str(),
        title_key.as_str(),
    ]
    .join(SEP);

    hex::encode(Sha256::digest(material.as_bytes()))
}
