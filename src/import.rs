//! # Bulk Import
//!
//! Drives the reconciler over lists of tour records.
//!
//! [`import_tours`] runs one batch: a single outer transaction with a savepoint
//! per record. A failing record is rolled back on its own and reported in its
//! [`ImportOutcome`]; the rest of the batch carries on. Only a failure of the
//! outer transaction fails the batch as a whole.
//!
//! [`run_import`] is the entry point over configured sources. It always returns
//! an [`ImportReport`].

use log::{info, warn};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::config::{ImportConfig, ReconcileConfig, SourceConfig};
use crate::error::{Result, RouteError};
use crate::persistence::RouteStore;
use crate::reconcile::{reconcile_tour_with, Reconciled};
use crate::source::TourSource;
use crate::tour::TourRecord;
use crate::tracks::{CachedTracks, TrackDirectory, TrackProvider};

// ============================================================================
// Outcomes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    /// New route created
    Imported,
    /// Existing route gained fields or a collection membership
    Updated,
    /// Existing route left unchanged
    Skipped,
    Failed,
}

/// Per-record result of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub record_id: String,
    pub status: ImportStatus,
    pub route_id: Option<i64>,
    pub error: Option<String>,
}

impl ImportOutcome {
    fn reconciled(record: &TourRecord, reconciled: Reconciled) -> Self {
        Self {
            record_id: record.id.clone(),
            status: reconciled.status,
            route_id: Some(reconciled.route_id),
            error: None,
        }
    }

    fn failed(record: &TourRecord, error: &RouteError) -> Self {
        Self {
            record_id: record.id.clone(),
            status: ImportStatus::Failed,
            route_id: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Records that created or changed a route
    pub imported_count: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[ImportOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut acc, o| {
            match o.status {
                ImportStatus::Imported | ImportStatus::Updated => acc.imported_count += 1,
                ImportStatus::Skipped => acc.skipped_count += 1,
                ImportStatus::Failed => acc.failed_count += 1,
            }
            acc
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub outcomes: Vec<ImportOutcome>,
    pub summary: BatchSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Success,
    Error,
}

/// Summary returned by [`run_import`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub status: ReportStatus,
    pub imported: usize,
    pub message: String,
}

// ============================================================================
// Batch
// ============================================================================

/// Reconcile `records` in order as one batch.
///
/// Each record runs inside its own savepoint; a savepoint that cannot be
/// opened or released fails only its record. Returns [`RouteError::Batch`]
/// if the batch cannot be opened or an item cannot be rolled back, and
/// [`RouteError::BatchCommit`] if the final commit fails. In both cases nothing
/// from the batch is kept.
pub fn import_tours<P: TrackProvider + ?Sized>(
    store: &mut RouteStore,
    records: &[TourRecord],
    collection: Option<&str>,
    tracks: &P,
    config: &ReconcileConfig,
) -> Result<ImportBatch> {
    let mut batch = store.begin_batch()?;
    let mut outcomes = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let item = match batch.item(index) {
            Ok(item) => item,
            Err(e) => {
                warn!("[Importer] Cannot isolate tour {}: {}", record.id, e);
                outcomes.push(ImportOutcome::failed(record, &e));
                continue;
            }
        };

        let outcome = match import_one(item.conn(), record, collection, tracks, config) {
            Ok(reconciled) => match item.release() {
                Ok(()) => ImportOutcome::reconciled(record, reconciled),
                Err(e) => {
                    warn!("[Importer] Tour {} not kept: {}", record.id, e);
                    ImportOutcome::failed(record, &e)
                }
            },
            Err(e) => {
                warn!("[Importer] Tour {} failed: {}", record.id, e);
                item.rollback()?;
                ImportOutcome::failed(record, &e)
            }
        };
        outcomes.push(outcome);
    }

    let summary = BatchSummary::from_outcomes(&outcomes);
    batch.commit()?;

    info!(
        "[Importer] Batch of {} tours: {} imported, {} skipped, {} failed",
        records.len(),
        summary.imported_count,
        summary.skipped_count,
        summary.failed_count
    );

    Ok(ImportBatch { outcomes, summary })
}

/// The provider is asked only when the stored route still lacks a track, and
/// under the stored track file name.
fn import_one<P: TrackProvider + ?Sized>(
    conn: &Connection,
    record: &TourRecord,
    collection: Option<&str>,
    tracks: &P,
    config: &ReconcileConfig,
) -> Result<Reconciled> {
    reconcile_tour_with(conn, record, collection, config, |file_name| {
        tracks.track_for(record, file_name)
    })
}

// ============================================================================
// Sources
// ============================================================================

/// Import every requested source. An empty request imports all configured
/// sources.
///
/// Listing failures and failed batches are recorded in the report and the
/// next source still runs.
pub fn run_import<S: TourSource + ?Sized>(
    store: &mut RouteStore,
    source: &S,
    config: &ImportConfig,
    requested: &[String],
) -> ImportReport {
    let selected = config.select_sources(requested);
    if selected.is_empty() {
        return ImportReport {
            status: ReportStatus::Error,
            imported: 0,
            message: "No matching sources to import".to_string(),
        };
    }

    let mut imported = 0;
    let mut failures = 0;
    let mut lines = Vec::with_capacity(selected.len());

    for source_config in selected {
        info!(
            "[Importer] Syncing source: {} ({})",
            source_config.name, source_config.slug
        );
        match import_source(store, source, source_config, config) {
            Ok(summary) => {
                imported += summary.imported_count;
                lines.push(format!(
                    "{}: {} imported, {} skipped, {} failed",
                    source_config.slug,
                    summary.imported_count,
                    summary.skipped_count,
                    summary.failed_count
                ));
            }
            Err(e) => {
                warn!("[Importer] Source {} failed: {}", source_config.slug, e);
                failures += 1;
                lines.push(format!("{}: {}", source_config.slug, e));
            }
        }
    }

    ImportReport {
        status: if failures == 0 {
            ReportStatus::Success
        } else {
            ReportStatus::Error
        },
        imported,
        message: lines.join("; "),
    }
}

fn import_source<S: TourSource + ?Sized>(
    store: &mut RouteStore,
    source: &S,
    source_config: &SourceConfig,
    config: &ImportConfig,
) -> Result<BatchSummary> {
    store.create_collection(&source_config.slug, &source_config.name)?;
    let records = source.list_tours(&source_config.owner, &source_config.filter)?;

    let tracks = CachedTracks::new(
        TrackDirectory::new(config.download_dir.join(&source_config.slug), &config.reconcile),
        source,
    );
    let batch = import_tours(
        store,
        &records,
        Some(&source_config.slug),
        &tracks,
        &config.reconcile,
    )?;
    Ok(batch.summary)
}

/// Log in with credentials from the environment and import.
///
/// Missing credentials are the only error; login failures are reported in
/// the returned summary.
#[cfg(feature = "http")]
pub fn import_from_komoot(
    store: &mut RouteStore,
    config: &ImportConfig,
    requested: &[String],
) -> Result<ImportReport> {
    let credentials = crate::config::Credentials::from_env()?;
    let client = match crate::http::KomootClient::login(&credentials) {
        Ok(client) => client,
        Err(e) if e.is_batch_fatal() => return Err(e),
        Err(e) => {
            return Ok(ImportReport {
                status: ReportStatus::Error,
                imported: 0,
                message: format!("Login failed: {}", e),
            })
        }
    };
    Ok(run_import(store, &client, config, requested))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let outcome = |status| ImportOutcome {
            record_id: "x".to_string(),
            status,
            route_id: None,
            error: None,
        };
        let summary = BatchSummary::from_outcomes(&[
            outcome(ImportStatus::Imported),
            outcome(ImportStatus::Updated),
            outcome(ImportStatus::Skipped),
            outcome(ImportStatus::Failed),
        ]);
        assert_eq!(
            summary,
            BatchSummary {
                imported_count: 2,
                skipped_count: 1,
                failed_count: 1,
            }
        );
    }

    #[test]
    fn test_report_serializes_lowercase_status() {
        let report = ImportReport {
            status: ReportStatus::Success,
            imported: 3,
            message: "ok".to_string(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["imported"], 3);
    }
}
