//! Import configuration.
//!
//! Plain values with sensible defaults. Credentials are the only setting read
//! from the environment.

use std::env;
use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{OptionExt, Result};
use crate::source::{CreatorFilter, TourFilter, TourOwner};
use crate::sport::Sport;
use crate::tour::TourStatus;

pub const EMAIL_ENV: &str = "KOMOOT_EMAIL";
pub const PASSWORD_ENV: &str = "KOMOOT_PASSWORD";

/// Account used to log in to the tour source.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Read `KOMOOT_EMAIL` and `KOMOOT_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self> {
        let read = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_config(&format!("{} is not set", key))
        };
        Ok(Self::new(read(EMAIL_ENV)?, read(PASSWORD_ENV)?))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Reconciler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Sport assigned when the external tag is unknown or missing
    pub default_sport: Sport,
    /// Extension of derived track file names
    pub track_extension: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            default_sport: Sport::Other,
            track_extension: "gpx".to_string(),
        }
    }
}

/// One listing to import, stored as a collection with the same slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub slug: String,
    pub name: String,
    pub owner: TourOwner,
    pub filter: TourFilter,
}

impl SourceConfig {
    pub fn new(slug: &str, name: &str, owner: TourOwner, filter: TourFilter) -> Self {
        Self {
            slug: slug.to_string(),
            name: name.to_string(),
            owner,
            filter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    pub sources: Vec<SourceConfig>,
    /// Track files are cached under `<download_dir>/<source slug>/<sport>/`
    pub download_dir: PathBuf,
    pub reconcile: ReconcileConfig,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                SourceConfig::new(
                    "personal",
                    "Personal",
                    TourOwner::Me,
                    TourFilter::planned().with_creator(CreatorFilter::SelfOnly),
                ),
                SourceConfig::new(
                    "gravelritten",
                    "Gravelritten",
                    TourOwner::User("751970492203".to_string()),
                    TourFilter::planned().with_status(TourStatus::Public),
                ),
                SourceConfig::new(
                    "gijs_bruinsma",
                    "Gijs Bruinsma",
                    TourOwner::User("753944379383".to_string()),
                    TourFilter::planned().with_status(TourStatus::Public),
                ),
            ],
            download_dir: PathBuf::from("downloads"),
            reconcile: ReconcileConfig::default(),
        }
    }
}

impl ImportConfig {
    /// Resolve requested source slugs. An empty request selects every source;
    /// unknown slugs are skipped with a warning.
    pub fn select_sources(&self, requested: &[String]) -> Vec<&SourceConfig> {
        if requested.is_empty() {
            return self.sources.iter().collect();
        }

        for slug in requested {
            if !self.sources.iter().any(|s| &s.slug == slug) {
                warn!("[ImportConfig] Unknown source '{}', skipping", slug);
            }
        }

        self.sources
            .iter()
            .filter(|s| requested.contains(&s.slug))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouteError;

    #[test]
    fn test_default_sources() {
        let config = ImportConfig::default();
        let slugs: Vec<_> = config.sources.iter().map(|s| s.slug.as_str()).collect();
        assert_eq!(slugs, vec!["personal", "gravelritten", "gijs_bruinsma"]);
        assert_eq!(config.reconcile.default_sport, Sport::Other);
        assert_eq!(config.reconcile.track_extension, "gpx");
    }

    #[test]
    fn test_select_sources() {
        let config = ImportConfig::default();
        assert_eq!(config.select_sources(&[]).len(), 3);

        let picked = config.select_sources(&["gravelritten".to_string(), "nope".to_string()]);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].slug, "gravelritten");
    }

    #[test]
    fn test_credentials_lookup() {
        let creds = Credentials::from_lookup(|key| match key {
            EMAIL_ENV => Some("rider@example.com".to_string()),
            PASSWORD_ENV => Some("hunter2".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(creds.email, "rider@example.com");
        assert!(!format!("{:?}", creds).contains("hunter2"));

        let missing = Credentials::from_lookup(|key| match key {
            EMAIL_ENV => Some("rider@example.com".to_string()),
            PASSWORD_ENV => Some("  ".to_string()),
            _ => None,
        });
        match missing {
            Err(RouteError::Config { message }) => assert!(message.contains(PASSWORD_ENV)),
            other => panic!("expected config error, got {:?}", other),
        }
    }
}
