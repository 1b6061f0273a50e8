//! Track file lookup.
//!
//! The reconciler never touches the network or the filesystem itself; it asks a
//! [`TrackProvider`] for the raw track text of a record. A missing track is
//! `Ok(None)`, not an error.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::ReconcileConfig;
use crate::error::Result;
use crate::source::TourSource;
use crate::sport::Sport;
use crate::tour::TourRecord;

/// Filesystem-safe track file name for a route name.
pub fn track_file_name(name: &str, extension: &str) -> String {
    format!("{}.{}", sanitize(name), extension)
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect()
}

pub trait TrackProvider {
    /// Raw track text for `record`, stored as `file_name`.
    fn track_for(&self, record: &TourRecord, file_name: &str) -> Result<Option<String>>;
}

/// Track files laid out as `<root>/<sport slug>/<file name>`.
#[derive(Debug, Clone)]
pub struct TrackDirectory {
    root: PathBuf,
    default_sport: Sport,
}

impl TrackDirectory {
    pub fn new(root: impl Into<PathBuf>, config: &ReconcileConfig) -> Self {
        Self {
            root: root.into(),
            default_sport: config.default_sport,
        }
    }

    fn sport_dir(&self, record: &TourRecord) -> PathBuf {
        let sport = record
            .sport
            .as_deref()
            .map(|tag| Sport::from_komoot(tag, self.default_sport))
            .unwrap_or(self.default_sport);
        self.root.join(sport.slug())
    }

    pub fn path_for(&self, record: &TourRecord, file_name: &str) -> PathBuf {
        self.sport_dir(record).join(file_name)
    }

    /// Location of a downloaded track: `<root>/<sport slug>/<record id>/<file name>`.
    ///
    /// Tours sharing a name get the same `file_name`, so downloads are keyed on
    /// the record id to keep their geometry apart.
    pub fn download_path_for(&self, record: &TourRecord, file_name: &str) -> PathBuf {
        self.sport_dir(record).join(sanitize(&record.id)).join(file_name)
    }
}

fn read_track(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("[TrackDirectory] No track file at {}", path.display());
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn write_track(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(())
}

impl TrackProvider for TrackDirectory {
    fn track_for(&self, record: &TourRecord, file_name: &str) -> Result<Option<String>> {
        read_track(&self.path_for(record, file_name))
    }
}

/// Directory-backed cache in front of a tour source.
///
/// Tracks already downloaded for a record are reused; missing ones are
/// fetched once and written under [`TrackDirectory::download_path_for`].
pub struct CachedTracks<'a, S: TourSource + ?Sized> {
    dir: TrackDirectory,
    source: &'a S,
}

impl<'a, S: TourSource + ?Sized> CachedTracks<'a, S> {
    pub fn new(dir: TrackDirectory, source: &'a S) -> Self {
        Self { dir, source }
    }
}

impl<S: TourSource + ?Sized> TrackProvider for CachedTracks<'_, S> {
    fn track_for(&self, record: &TourRecord, file_name: &str) -> Result<Option<String>> {
        let path = self.dir.download_path_for(record, file_name);
        if let Some(text) = read_track(&path)? {
            debug!("[CachedTracks] Reusing {}", path.display());
            return Ok(Some(text));
        }

        match self.source.fetch_track(&record.id)? {
            Some(text) => {
                write_track(&path, &text)?;
                info!("[CachedTracks] Downloaded {}", path.display());
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }
}
