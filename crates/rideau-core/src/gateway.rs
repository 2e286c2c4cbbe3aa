//! Deduplication and idempotent persistence of connector batches.
//!
//! One connector run hands its whole batch to [`Gateway::ingest`]:
//! explicit vetoes are dropped, every survivor gets its fingerprint,
//! in-batch duplicates collapse (first seen wins), missing preview images
//! are recovered within a bounded budget, and the result is committed in a
//! single upsert transaction keyed on fingerprint. Re-running the same
//! batch converges: no new rows, fields refreshed.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::classify::TheatreClassifier;
use crate::connector::PreviewFetcher;
use crate::error::RideauError;
use crate::fingerprint::fingerprint;
use crate::models::CandidateRecord;
use crate::storage::Storage;

/// Default per-run budget of outbound preview-image lookups.
pub const DEFAULT_IMAGE_BUDGET: usize = 20;

/// Operator-facing counts from one batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOutcome {
    pub received: usize,
    /// Dropped on a connector-supplied `is_theatre = false`.
    pub vetoed: usize,
    /// Dropped by the classifier gate (only set via [`run_batch`]).
    pub rejected: usize,
    /// Dropped as malformed — no `date` (only set via [`run_batch`]).
    pub invalid: usize,
    /// In-batch duplicates collapsed by fingerprint.
    pub duplicates: usize,
    pub images_recovered: usize,
    pub upserted: usize,
}

pub struct Gateway<'a> {
    storage: &'a Storage,
    image_budget: usize,
}

impl<'a> Gateway<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self {
            storage,
            image_budget: DEFAULT_IMAGE_BUDGET,
        }
    }

    pub fn with_image_budget(mut self, budget: usize) -> Self {
        self.image_budget = budget;
        self
    }

    /// Collapse and commit one batch.
    ///
    /// A persistence error aborts the whole batch (nothing is committed);
    /// a failed image lookup only leaves that record without an image.
    pub async fn ingest<F: PreviewFetcher>(
        &self,
        batch: Vec<CandidateRecord>,
        fetcher: &F,
    ) -> Result<IngestOutcome, RideauError> {
        let mut outcome = IngestOutcome {
            received: batch.len(),
            ..Default::default()
        };

        // Explicit connector veto, independent of any classifier run.
        let surviving: Vec<CandidateRecord> = batch
            .into_iter()
            .filter(|record| {
                if record.is_theatre == Some(false) {
                    outcome.vetoed += 1;
                    false
                } else {
                    true
                }
            })
            .collect();

        // Identity, then in-batch dedup. Batch order is connector yield
        // order, so "first seen wins" is stable across runs.
        let mut seen: HashSet<String> = HashSet::new();
        let mut unique: Vec<(String, CandidateRecord)> = Vec::with_capacity(surviving.len());
        for record in surviving {
            let fp = fingerprint(&record);
            if seen.insert(fp.clone()) {
                unique.push((fp, record));
            } else {
                outcome.duplicates += 1;
            }
        }

        // Best-effort preview recovery. The budget counts outbound
        // attempts; once spent, remaining records go through unenriched.
        let mut budget = self.image_budget;
        for (_, record) in unique.iter_mut() {
            if budget == 0 {
                debug!(budget = self.image_budget, "image recovery budget exhausted");
                break;
            }
            if record.image_url.is_some() {
                continue;
            }
            let Some(url) = record.url.clone() else {
                continue;
            };
            budget -= 1;
            match fetcher.fetch_preview_image(&url).await {
                Some(image) => {
                    record.image_url = Some(image);
                    outcome.images_recovered += 1;
                }
                None => debug!(url = %url, "no preview image recovered"),
            }
        }

        outcome.upserted = self.storage.upsert_representations(&unique)?;
        info!(
            received = outcome.received,
            vetoed = outcome.vetoed,
            duplicates = outcome.duplicates,
            images = outcome.images_recovered,
            upserted = outcome.upserted,
            "batch committed"
        );
        Ok(outcome)
    }
}

/// Full connector-batch pipeline: malformed-input skip and classifier gate
/// in front of [`Gateway::ingest`].
///
/// Records without a `date` are excluded here rather than repaired; the
/// classifier gate runs strict or lenient per the caller's source policy.
pub async fn run_batch<F: PreviewFetcher>(
    classifier: &TheatreClassifier,
    gateway: &Gateway<'_>,
    records: Vec<CandidateRecord>,
    strict: bool,
    fetcher: &F,
) -> Result<IngestOutcome, RideauError> {
    let received = records.len();
    let mut rejected = 0usize;
    let mut invalid = 0usize;

    let gated: Vec<CandidateRecord> = records
        .into_iter()
        .filter(|record| {
            if record.date.trim().is_empty() {
                invalid += 1;
                warn!(titre = %record.titre, source = %record.source, "record without date, skipped");
                return false;
            }
            let decision = classifier.should_emit(record, strict);
            if !decision.ok {
                rejected += 1;
                debug!(
                    titre = %record.titre,
                    classification = %decision.classification,
                    "rejected by classifier gate"
                );
            }
            decision.ok
        })
        .collect();

    let mut outcome = gateway.ingest(gated, fetcher).await?;
    outcome.received = received;
    outcome.rejected = rejected;
    outcome.invalid = invalid;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::classify::ClassifierKeywords;
    use crate::connector::NoopPreviewFetcher;

    /// Stub fetcher that counts calls and answers from a fixed result.
    struct StubFetcher {
        calls: AtomicUsize,
        image: Option<String>,
    }

    impl StubFetcher {
        fn returning(image: Option<&str>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                image: image.map(Into::into),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PreviewFetcher for StubFetcher {
        async fn fetch_preview_image(&self, _page_url: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.image.clone()
        }
    }

    fn record(titre: &str, url: Option<&str>) -> CandidateRecord {
        CandidateRecord {
            source: "test".into(),
            source_url: "https://x.be/agenda".into(),
            date: "2026-04-10".into(),
            heure: Some("20:00:00".into()),
            titre: titre.into(),
            theatre_nom: "Théâtre X".into(),
            url: url.map(Into::into),
            ..Default::default()
        }
    }

    fn classifier() -> TheatreClassifier {
        TheatreClassifier::new(&ClassifierKeywords {
            positive: vec!["théâtre".into(), "pièce".into()],
            negative: vec!["concert".into()],
            soft_negative: vec![],
            credit_markers: vec![],
        })
    }

    #[tokio::test]
    async fn in_batch_duplicates_collapse_first_seen_wins() {
        let storage = Storage::open_memory().unwrap();
        let gateway = Gateway::new(&storage);

        let mut first = record("Hamlet", Some("https://tickets.example/1"));
        first.description = Some("première version".into());
        let mut second = record("Hamlet", Some("https://tickets.example/1"));
        second.description = Some("seconde version".into());

        let outcome = gateway
            .ingest(vec![first, second], &NoopPreviewFetcher)
            .await
            .unwrap();
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(outcome.upserted, 1);

        let rows = storage.all_representations().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.description.as_deref(), Some("première version"));
    }

    #[tokio::test]
    async fn explicit_veto_is_dropped_before_anything_else() {
        let storage = Storage::open_memory().unwrap();
        let gateway = Gateway::new(&storage);

        let mut vetoed = record("Pièce de théâtre magnifique", None);
        vetoed.is_theatre = Some(false);

        let outcome = gateway
            .ingest(vec![vetoed, record("Hamlet", None)], &NoopPreviewFetcher)
            .await
            .unwrap();
        assert_eq!(outcome.vetoed, 1);
        assert_eq!(outcome.upserted, 1);
        assert_eq!(storage.all_representations().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reingesting_the_same_batch_is_a_no_op() {
        let storage = Storage::open_memory().unwrap();
        let gateway = Gateway::new(&storage);
        let batch = vec![
            record("Hamlet", Some("https://tickets.example/1")),
            record("La Mouette", Some("https://tickets.example/2")),
        ];

        gateway
            .ingest(batch.clone(), &NoopPreviewFetcher)
            .await
            .unwrap();
        let rows_once = storage.all_representations().unwrap();

        gateway.ingest(batch, &NoopPreviewFetcher).await.unwrap();
        let rows_twice = storage.all_representations().unwrap();

        assert_eq!(rows_once.len(), rows_twice.len());
        let fps_once: Vec<_> = rows_once.iter().map(|r| &r.fingerprint).collect();
        let fps_twice: Vec<_> = rows_twice.iter().map(|r| &r.fingerprint).collect();
        assert_eq!(fps_once, fps_twice);
    }

    #[tokio::test]
    async fn image_recovery_fills_missing_only() {
        let storage = Storage::open_memory().unwrap();
        let gateway = Gateway::new(&storage);
        let fetcher = StubFetcher::returning(Some("https://cdn.example/og.jpg"));

        let mut has_image = record("Hamlet", Some("https://x.be/1"));
        has_image.image_url = Some("https://cdn.example/existing.jpg".into());
        let needs_image = record("La Mouette", Some("https://x.be/2"));
        let no_url = record("Dom Juan", None);

        let outcome = gateway
            .ingest(vec![has_image, needs_image, no_url], &fetcher)
            .await
            .unwrap();
        assert_eq!(outcome.images_recovered, 1);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn image_recovery_budget_is_bounded() {
        let storage = Storage::open_memory().unwrap();
        let gateway = Gateway::new(&storage).with_image_budget(2);
        let fetcher = StubFetcher::returning(Some("https://cdn.example/og.jpg"));

        let batch: Vec<CandidateRecord> = (0..5)
            .map(|i| record(&format!("Pièce {i}"), Some(&format!("https://x.be/{i}"))))
            .collect();

        let outcome = gateway.ingest(batch, &fetcher).await.unwrap();
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(outcome.images_recovered, 2);
        assert_eq!(outcome.upserted, 5);
    }

    #[tokio::test]
    async fn failed_lookups_are_swallowed() {
        let storage = Storage::open_memory().unwrap();
        let gateway = Gateway::new(&storage);
        let fetcher = StubFetcher::returning(None);

        let outcome = gateway
            .ingest(vec![record("Hamlet", Some("https://x.be/1"))], &fetcher)
            .await
            .unwrap();
        assert_eq!(outcome.images_recovered, 0);
        assert_eq!(outcome.upserted, 1);
        let rows = storage.all_representations().unwrap();
        assert!(rows[0].record.image_url.is_none());
    }

    #[tokio::test]
    async fn run_batch_gates_and_counts() {
        let storage = Storage::open_memory().unwrap();
        let gateway = Gateway::new(&storage);

        let mut dateless = record("Pièce de théâtre", None);
        dateless.date = String::new();

        let batch = vec![
            record("Pièce de théâtre: Hamlet", None),
            record("Grand concert", None),
            dateless,
        ];
        let outcome = run_batch(&classifier(), &gateway, batch, true, &NoopPreviewFetcher)
            .await
            .unwrap();
        assert_eq!(outcome.received, 3);
        assert_eq!(outcome.invalid, 1);
        assert_eq!(outcome.rejected, 1);
        assert_eq!(outcome.upserted, 1);
    }
}
