use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::classify::ClassifierKeywords;
use crate::error::RideauError;
use crate::tagger::TaggerKeywords;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level application configuration, including the keyword tables.
///
/// The tables are data on purpose: classifier tuning happens in config,
/// never in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub ingest: IngestConfig,
    pub classifier: ClassifierKeywords,
    pub tagger: TaggerKeywords,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Per-run budget of outbound preview-image lookups.
    pub image_budget: usize,
    /// Reject ambiguous records instead of accepting them.
    pub strict: bool,
}

impl AppConfig {
    /// Load config: the user file if present, built-in defaults otherwise.
    pub fn load() -> Result<Self, RideauError> {
        let user_path = Self::config_path();
        if user_path.exists() {
            let content = std::fs::read_to_string(&user_path)?;
            toml::from_str(&content).map_err(|e| RideauError::Config(e.to_string()))
        } else {
            toml::from_str(DEFAULT_CONFIG).map_err(|e| RideauError::Config(e.to_string()))
        }
    }

    /// Save current config to the user config file.
    pub fn save(&self) -> Result<(), RideauError> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| RideauError::Config(e.to_string()))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Path to the user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Path to the database file.
    pub fn db_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.data_dir().join("rideau.db"))
            .unwrap_or_else(|| PathBuf::from("rideau.db"))
    }

    /// Ensure the data directory exists and return the DB path.
    pub fn ensure_db_path() -> Result<PathBuf, RideauError> {
        let path = Self::db_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "rideau")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Classification, TheatreClassifier};
    use crate::models::CandidateRecord;

    #[test]
    fn default_config_parses() {
        let config = AppConfig::default();
        assert_eq!(config.ingest.image_budget, 20);
        assert!(!config.ingest.strict);
        assert!(!config.classifier.positive.is_empty());
        assert!(!config.classifier.negative.is_empty());
        assert!(!config.tagger.classic.is_empty());
    }

    #[test]
    fn roundtrip() {
        let config = AppConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.ingest.image_budget, config.ingest.image_budget);
        assert_eq!(
            deserialized.classifier.positive.len(),
            config.classifier.positive.len()
        );
    }

    #[test]
    fn shipped_keywords_satisfy_the_reference_scenarios() {
        let config = AppConfig::default();
        let classifier = TheatreClassifier::new(&config.classifier);

        let play = CandidateRecord {
            titre: "Pièce de théâtre: Le Misanthrope, mise en scène par X".into(),
            date: "2026-04-10".into(),
            ..Default::default()
        };
        assert_eq!(
            classifier.score(&play).classification,
            Classification::Theatre
        );

        let concert = CandidateRecord {
            titre: "Concert live DJ set".into(),
            date: "2026-04-10".into(),
            ..Default::default()
        };
        assert_eq!(
            classifier.score(&concert).classification,
            Classification::NonTheatre
        );

        let ambiguous = CandidateRecord {
            titre: "Afternoon at the venue".into(),
            date: "2026-04-10".into(),
            ..Default::default()
        };
        assert_eq!(
            classifier.score(&ambiguous).classification,
            Classification::Unknown
        );
    }
}
