//! Text canonicalization shared by fingerprinting, classification and
//! tagging.
//!
//! Listings for the same performance rarely agree byte-for-byte across
//! sites: accents get dropped, venue names get glued onto titles, tracking
//! junk gets appended to URLs, HTML entities leak through scrapers. Every
//! function here is pure and total over arbitrary input.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use url::Url;

// ── Diacritics ────────────────────────────────────────────────────────

/// Remove diacritical marks: decompose to NFD, drop combining marks.
///
/// Idempotent: stripping an already-stripped string is a no-op.
pub fn strip_diacritics(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Loose equality key: strip diacritics, lowercase, keep only `[a-z0-9]`.
///
/// Two venue names or titles differing only in case, accents or
/// punctuation produce the same key.
pub fn norm_key(s: &str) -> String {
    strip_diacritics(s)
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

// ── URLs ──────────────────────────────────────────────────────────────

/// Canonical string form of a URL: fragment dropped, tracking query
/// parameters (`utm_*`, `fbclid`, `gclid`) removed.
///
/// On parse failure, falls back to truncating the raw string at `#`.
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_fragment(None);
            let kept: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(k, _)| !is_tracking_param(k))
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            if kept.is_empty() {
                url.set_query(None);
            } else {
                let mut pairs = url.query_pairs_mut();
                pairs.clear();
                for (k, v) in &kept {
                    pairs.append_pair(k, v);
                }
            }
            url.to_string()
        }
        Err(_) => raw.split('#').next().unwrap_or_default().to_string(),
    }
}

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || key == "fbclid" || key == "gclid"
}

// ── Titles ────────────────────────────────────────────────────────────

/// Separators sites use between a title and a glued-on venue name.
const TITLE_VENUE_SEPARATORS: &[char] = &['—', '–', '-', '|', ':'];

/// Canonical title: decode HTML entities, trim a trailing venue-name
/// suffix, collapse whitespace.
///
/// Many sites render listings as `"Title — VenueName"`; without stripping
/// the suffix, the same show scraped from the venue's own site and from an
/// aggregator would fingerprint differently. The suffix is recognized in
/// three forms: the venue name verbatim, diacritic-stripped, and
/// diacritic-stripped + lowercased.
pub fn canonicalize_title(titre: &str, venue: &str) -> String {
    let decoded = decode_entities(titre);
    let title = decoded.trim();

    let stripped = strip_diacritics(venue.trim());
    let variants = [
        venue.trim().to_string(),
        stripped.clone(),
        stripped.to_lowercase(),
    ];
    for variant in &variants {
        if variant.is_empty() {
            continue;
        }
        if let Some(head) = strip_venue_suffix(title, variant) {
            return collapse_whitespace(head);
        }
    }
    collapse_whitespace(title)
}

/// Strip `"<head> <sep> <venue>"` down to `<head>`, or `None` if the title
/// does not end that way. Refuses to strip the whole title.
fn strip_venue_suffix<'a>(title: &'a str, venue: &str) -> Option<&'a str> {
    let head = title.strip_suffix(venue)?.trim_end();
    let head = head.strip_suffix(TITLE_VENUE_SEPARATORS)?.trim_end();
    if head.is_empty() {
        None
    } else {
        Some(head)
    }
}

/// Trim and collapse whitespace runs to a single space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── HTML entities ─────────────────────────────────────────────────────

/// Best-effort decoding of the entities that actually show up in scraped
/// listing titles. Unknown entities pass through untouched.
pub fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match tail.find(';') {
            // Entity names are short; a distant ';' means a bare ampersand.
            Some(end) if end > 1 && end <= 10 => match decode_entity(&tail[1..end]) {
                Some(decoded) => {
                    out.push_str(&decoded);
                    rest = &tail[end + 1..];
                }
                None => {
                    out.push('&');
                    rest = &tail[1..];
                }
            },
            _ => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = if let Some(hex) = num.strip_prefix(['x', 'X']) {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            num.parse::<u32>().ok()?
        };
        return char::from_u32(code).map(|c| c.to_string());
    }
    let text = match name {
        "amp" => "&",
        "nbsp" => " ",
        "quot" => "\"",
        "apos" => "'",
        "lt" => "<",
        "gt" => ">",
        "eacute" => "é",
        "egrave" => "è",
        "ecirc" => "ê",
        "euml" => "ë",
        "agrave" => "à",
        "acirc" => "â",
        "ccedil" => "ç",
        "icirc" => "î",
        "iuml" => "ï",
        "ocirc" => "ô",
        "ucirc" => "û",
        "ugrave" => "ù",
        "oelig" => "œ",
        "rsquo" => "\u{2019}",
        "lsquo" => "\u{2018}",
        "hellip" => "…",
        "ndash" => "–",
        "mdash" => "—",
        _ => return None,
    };
    Some(text.to_string())
}

// ── Keyword-matching helpers ──────────────────────────────────────────

/// Reduce text to a space-padded, diacritic-free, lowercase word sequence
/// so keyword phrases can be located on word boundaries with a plain
/// substring search.
pub(crate) fn match_text(s: &str) -> String {
    let stripped = strip_diacritics(s).to_lowercase();
    let words: Vec<&str> = stripped
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    format!(" {} ", words.join(" "))
}

/// Whole-word(s) containment test over [`match_text`] output. `keyword`
/// must itself be in match-text form, unpadded.
pub(crate) fn contains_word(text: &str, keyword: &str) -> bool {
    text.contains(&format!(" {keyword} "))
}
