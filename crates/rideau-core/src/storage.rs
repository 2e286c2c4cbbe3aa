//! SQLite-backed store for persisted representations.
//!
//! One table, unique on `fingerprint`. Ingestion writes through a batched
//! upsert; the tagging pass patches fields that are still NULL; moderation
//! tooling sets the soft-delete marker. Every public listing read excludes
//! hidden rows.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::RideauError;
use crate::models::{CandidateRecord, Representation};

const SCHEMA_V1: &str = include_str!("../../../migrations/001_initial.sql");
const SCHEMA_V2: &str = include_str!("../../../migrations/002_add_moderation.sql");

const COLUMNS: &str = "id, fingerprint, source, source_url, date, heure, titre, theatre_nom, \
     theatre_adresse, url, genre, style, description, image_url, is_theatre, is_complet, \
     hidden_at, hidden_reason";

pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, RideauError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, RideauError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    // ── Ingestion ───────────────────────────────────────────────

    /// Upsert a batch of fingerprinted records in one transaction.
    ///
    /// On fingerprint collision the scraped fields are overwritten so
    /// reruns refresh titles and dates, while enrichment fields only ever
    /// improve: an incoming NULL never clobbers a stored description,
    /// image, tag or address. The moderation marker is untouched.
    pub fn upsert_representations(
        &self,
        records: &[(String, CandidateRecord)],
    ) -> Result<usize, RideauError> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO representation (
                     fingerprint, source, source_url, date, heure, titre, theatre_nom,
                     theatre_adresse, url, genre, style, description, image_url,
                     is_theatre, is_complet, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                           datetime('now'))
                 ON CONFLICT(fingerprint) DO UPDATE SET
                     source = excluded.source,
                     source_url = excluded.source_url,
                     date = excluded.date,
                     heure = excluded.heure,
                     titre = excluded.titre,
                     theatre_nom = excluded.theatre_nom,
                     theatre_adresse = COALESCE(excluded.theatre_adresse, representation.theatre_adresse),
                     url = COALESCE(excluded.url, representation.url),
                     genre = COALESCE(excluded.genre, representation.genre),
                     style = COALESCE(excluded.style, representation.style),
                     description = COALESCE(excluded.description, representation.description),
                     image_url = COALESCE(excluded.image_url, representation.image_url),
                     is_theatre = COALESCE(excluded.is_theatre, representation.is_theatre),
                     is_complet = COALESCE(excluded.is_complet, representation.is_complet),
                     updated_at = datetime('now')",
            )?;
            for (fingerprint, r) in records {
                stmt.execute(params![
                    fingerprint,
                    r.source,
                    r.source_url,
                    r.date,
                    r.heure,
                    r.titre,
                    r.theatre_nom,
                    r.theatre_adresse,
                    r.url,
                    r.genre,
                    r.style,
                    r.description,
                    r.image_url,
                    r.is_theatre,
                    r.is_complet,
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    // ── Reads ───────────────────────────────────────────────────

    /// All rows, hidden included. For enrichment passes and maintenance.
    pub fn all_representations(&self) -> Result<Vec<Representation>, RideauError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM representation ORDER BY date, heure, id"
        ))?;
        let rows = stmt
            .query_map([], |row| Ok(row_to_representation(row)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Publicly listable rows: soft-hidden ones are excluded.
    pub fn visible_representations(&self) -> Result<Vec<Representation>, RideauError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM representation
             WHERE hidden_at IS NULL
             ORDER BY date, heure, id"
        ))?;
        let rows = stmt
            .query_map([], |row| Ok(row_to_representation(row)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Publicly listable rows on one date.
    pub fn visible_on_date(&self, date: &str) -> Result<Vec<Representation>, RideauError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM representation
             WHERE hidden_at IS NULL AND date = ?1
             ORDER BY heure, id"
        ))?;
        let rows = stmt
            .query_map(params![date], |row| Ok(row_to_representation(row)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn get_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<Representation>, RideauError> {
        self.conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM representation WHERE fingerprint = ?1"),
                params![fingerprint],
                |row| Ok(row_to_representation(row)),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn count(&self) -> Result<i64, RideauError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM representation", [], |row| row.get(0))
            .map_err(Into::into)
    }

    // ── Tag patches ─────────────────────────────────────────────

    /// Set `genre` on every row of a show that still lacks one. Returns
    /// the number of rows patched.
    pub fn update_genre_where_missing(
        &self,
        source_url: &str,
        genre: &str,
    ) -> Result<usize, RideauError> {
        let n = self.conn.execute(
            "UPDATE representation SET genre = ?1, updated_at = datetime('now')
             WHERE source_url = ?2 AND genre IS NULL",
            params![genre, source_url],
        )?;
        Ok(n)
    }

    /// Set `style` on every row of a show that still lacks one.
    pub fn update_style_where_missing(
        &self,
        source_url: &str,
        style: &str,
    ) -> Result<usize, RideauError> {
        let n = self.conn.execute(
            "UPDATE representation SET style = ?1, updated_at = datetime('now')
             WHERE source_url = ?2 AND style IS NULL",
            params![style, source_url],
        )?;
        Ok(n)
    }

    // ── Moderation ──────────────────────────────────────────────

    /// Soft-hide a row. The row stays in the store and keeps absorbing
    /// upserts, but no public read returns it.
    pub fn hide(&self, fingerprint: &str, reason: Option<&str>) -> Result<bool, RideauError> {
        let n = self.conn.execute(
            "UPDATE representation
             SET hidden_at = datetime('now'), hidden_reason = ?1
             WHERE fingerprint = ?2",
            params![reason, fingerprint],
        )?;
        Ok(n > 0)
    }

    /// Clear the soft-delete marker.
    pub fn unhide(&self, fingerprint: &str) -> Result<bool, RideauError> {
        let n = self.conn.execute(
            "UPDATE representation SET hidden_at = NULL, hidden_reason = NULL
             WHERE fingerprint = ?1",
            params![fingerprint],
        )?;
        Ok(n > 0)
    }

    /// Hard delete, for maintenance tooling only — ingestion never deletes.
    pub fn delete_by_fingerprint(&self, fingerprint: &str) -> Result<bool, RideauError> {
        let n = self.conn.execute(
            "DELETE FROM representation WHERE fingerprint = ?1",
            params![fingerprint],
        )?;
        Ok(n > 0)
    }
}

// ── Migrations ──────────────────────────────────────────────────

/// Run schema migrations using `PRAGMA user_version` for version tracking.
fn run_migrations(conn: &Connection) -> Result<(), RideauError> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", 1)?;
    }
    if version < 2 {
        conn.execute_batch(SCHEMA_V2)?;
        conn.pragma_update(None, "user_version", 2)?;
    }
    Ok(())
}

// ── Row mapping ─────────────────────────────────────────────────

fn row_to_representation(row: &rusqlite::Row<'_>) -> Representation {
    Representation {
        id: row.get(0).unwrap_or(0),
        fingerprint: row.get(1).unwrap_or_default(),
        record: CandidateRecord {
            source: row.get(2).unwrap_or_default(),
            source_url: row.get(3).unwrap_or_default(),
            date: row.get(4).unwrap_or_default(),
            heure: row.get(5).unwrap_or(None),
            titre: row.get(6).unwrap_or_default(),
            theatre_nom: row.get(7).unwrap_or_default(),
            theatre_adresse: row.get(8).unwrap_or(None),
            url: row.get(9).unwrap_or(None),
            genre: row.get(10).unwrap_or(None),
            style: row.get(11).unwrap_or(None),
            description: row.get(12).unwrap_or(None),
            image_url: row.get(13).unwrap_or(None),
            is_theatre: row.get(14).unwrap_or(None),
            is_complet: row.get(15).unwrap_or(None),
        },
        hidden_at: row.get(16).unwrap_or(None),
        hidden_reason: row.get(17).unwrap_or(None),
    }
}
