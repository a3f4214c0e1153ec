use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::model::Restaurant;
use crate::normalize::{clean_text, create_reference};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Which side of the linkage a snapshot feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceId {
    /// Candidate collection.
    A,
    /// Driving collection.
    B,
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::A => f.write_str("A"),
            SourceId::B => f.write_str("B"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source {side} ({label}): cannot read {path:?}: {source}")]
    Read {
        side: SourceId,
        label: String,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("source {side} ({label}): malformed snapshot {path:?}: {source}")]
    Parse {
        side: SourceId,
        label: String,
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl LoadError {
    pub fn side(&self) -> SourceId {
        match self {
            LoadError::Read { side, .. } | LoadError::Parse { side, .. } => *side,
        }
    }
}

/// A snapshot file to load.
#[derive(Debug, Clone)]
pub struct SnapshotSpec {
    pub side: SourceId,
    pub label: String,
    pub path: PathBuf,
}

impl SnapshotSpec {
    pub fn new(side: SourceId, label: impl Into<String>, path: impl AsRef<Path>) -> Self {
        SnapshotSpec {
            side,
            label: label.into(),
            path: path.as_ref().to_path_buf(),
        }
    }
}

/// Load-time additions applied to every record. Scraped fields are never
/// rewritten; only missing values may be filled in.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrepareOptions {
    /// Fill an absent `reference` from the record's name.
    pub derive_missing_reference: bool,
}

/// Read one JSON array of restaurants.
///
/// `null` entries (pages the scraper failed on) are skipped.
pub fn load(spec: &SnapshotSpec) -> Result<Vec<Restaurant>, LoadError> {
    let raw = fs::read_to_string(&spec.path).map_err(|source| LoadError::Read {
        side: spec.side,
        label: spec.label.clone(),
        path: spec.path.clone(),
        source,
    })?;
    let entries: Vec<Option<Restaurant>> =
        serde_json::from_str(&raw).map_err(|source| LoadError::Parse {
            side: spec.side,
            label: spec.label.clone(),
            path: spec.path.clone(),
            source,
        })?;

    let total = entries.len();
    let records: Vec<Restaurant> = entries.into_iter().flatten().collect();
    if records.len() < total {
        warn!(
            source = %spec.side,
            label = %spec.label,
            skipped = total - records.len(),
            "null entries in snapshot"
        );
    }
    if records.is_empty() {
        warn!(source = %spec.side, label = %spec.label, "snapshot has no records");
    }
    info!(source = %spec.side, label = %spec.label, records = records.len(), "snapshot loaded");
    Ok(records)
}

/// Load both snapshots. Either failure aborts before any matching starts.
pub fn load_pair(
    a: &SnapshotSpec,
    b: &SnapshotSpec,
    options: PrepareOptions,
) -> Result<(Vec<Restaurant>, Vec<Restaurant>), LoadError> {
    let a_records = load(a)?;
    let b_records = load(b)?;
    Ok((prepare(a_records, options), prepare(b_records, options)))
}

#[cfg(feature = "rayon")]
pub fn prepare(records: Vec<Restaurant>, options: PrepareOptions) -> Vec<Restaurant> {
    records
        .into_par_iter()
        .map(|r| prepare_one(r, options))
        .collect()
}

#[cfg(not(feature = "rayon"))]
pub fn prepare(records: Vec<Restaurant>, options: PrepareOptions) -> Vec<Restaurant> {
    records
        .into_iter()
        .map(|r| prepare_one(r, options))
        .collect()
}

fn prepare_one(mut record: Restaurant, options: PrepareOptions) -> Restaurant {
    if options.derive_missing_reference && record.reference().is_none() {
        let name = clean_text(&record.name);
        if !name.is_empty() {
            record.reference = Some(create_reference(&name));
        }
    }
    record
}
