//! Import-manifest lifecycle.
//!
//! A manifest is created `pending`, fills up while its batches ingest, and
//! becomes visible to the resolver only on activation. Activation archives
//! the previously active manifest in the same immediate transaction, so the
//! partial unique index on `status='active'` can never observe two active
//! rows.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::error::{EngineError, EngineResult};
use crate::models::{ImportManifestRow, NewImportManifestRow};
use crate::schema::import_manifests::dsl as im;
use crate::schema::raw_vehicles::dsl as rv;
use crate::tz;

/// Where an import's rows came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportSource {
    /// Produced by a scraping session.
    Scrape,
    /// Uploaded as a CSV file.
    CsvUpload,
}

impl ImportSource {
    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportSource::Scrape => "scrape",
            ImportSource::CsvUpload => "csv_upload",
        }
    }
}

/// Creates a new `pending` manifest.
pub fn create_manifest(
    conn: &mut SqliteConnection,
    import_id: &str,
    source: ImportSource,
    file_name: Option<&str>,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    let import_date = tz::to_rfc3339_millis(now);
    let row = NewImportManifestRow {
        import_id,
        import_date: &import_date,
        import_source: source.as_str(),
        file_name,
        status: "pending",
    };
    let inserted = diesel::insert_or_ignore_into(im::import_manifests)
        .values(&row)
        .execute(conn)?;
    if inserted == 0 {
        let status = status_of(conn, import_id)?.unwrap_or_else(|| "unknown".to_string());
        return Err(EngineError::IngestConflict {
            import_id: import_id.to_string(),
            status,
        });
    }
    Ok(())
}

/// Fetches a manifest by id.
pub fn get_manifest(
    conn: &mut SqliteConnection,
    import_id: &str,
) -> EngineResult<Option<ImportManifestRow>> {
    Ok(im::import_manifests
        .find(import_id)
        .select(ImportManifestRow::as_select())
        .first(conn)
        .optional()?)
}

/// The currently active manifest, if any.
///
/// The resolver snapshots this at job entry; it goes through the
/// transient-failure retry because activation writes race against it.
pub fn active_manifest(conn: &mut SqliteConnection) -> EngineResult<Option<ImportManifestRow>> {
    crate::db::retry::with_retry(|| {
        im::import_manifests
            .filter(im::status.eq("active"))
            .select(ImportManifestRow::as_select())
            .first(conn)
            .optional()
    })
}

fn status_of(conn: &mut SqliteConnection, import_id: &str) -> EngineResult<Option<String>> {
    Ok(im::import_manifests
        .find(import_id)
        .select(im::status)
        .first::<String>(conn)
        .optional()?)
}

/// Activates a manifest, atomically archiving the previously active one.
///
/// Activating the already-active manifest is a no-op. The manifest's
/// `dealership_count` aggregate is computed here, once its row set is final.
pub fn activate_manifest(conn: &mut SqliteConnection, import_id: &str) -> EngineResult<()> {
    let import_id = import_id.to_string();
    conn.immediate_transaction::<_, EngineError, _>(|tx| {
        let status = status_of(tx, &import_id)?
            .ok_or_else(|| EngineError::InvalidInput(format!("unknown import '{import_id}'")))?;
        if status == "active" {
            return Ok(());
        }

        let dealership_count: i64 = rv::raw_vehicles
            .filter(rv::import_id.eq(&import_id))
            .select(diesel::dsl::count_distinct(rv::location))
            .first(tx)?;

        diesel::update(im::import_manifests.filter(im::status.eq("active")))
            .set(im::status.eq("archived"))
            .execute(tx)?;

        diesel::update(im::import_manifests.find(&import_id))
            .set((
                im::status.eq("active"),
                im::dealership_count.eq(dealership_count as i32),
            ))
            .execute(tx)?;

        Ok(())
    })
}

/// Sets a manifest's status to `active` or `archived`, enforcing
/// at-most-one-active.
///
/// Activating re-runs the archive-then-activate transaction; archiving an
/// already-archived manifest is a no-op.
pub fn toggle_status(
    conn: &mut SqliteConnection,
    import_id: &str,
    target: &str,
) -> EngineResult<()> {
    match target {
        "active" => activate_manifest(conn, import_id),
        "archived" => {
            let updated = diesel::update(im::import_manifests.find(import_id))
                .set(im::status.eq("archived"))
                .execute(conn)?;
            if updated == 0 {
                return Err(EngineError::InvalidInput(format!(
                    "unknown import '{import_id}'"
                )));
            }
            Ok(())
        }
        other => Err(EngineError::InvalidInput(format!(
            "unknown manifest status '{other}'"
        ))),
    }
}

/// Adds to a pending manifest's raw-row count.
pub fn bump_vehicle_count(
    conn: &mut SqliteConnection,
    import_id: &str,
    added: usize,
) -> EngineResult<()> {
    diesel::update(im::import_manifests.find(import_id))
        .set(im::vehicle_count.eq(im::vehicle_count + added as i32))
        .execute(conn)?;
    Ok(())
}
