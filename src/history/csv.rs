//! CSV ingestion for historical sub-periods (typically one file per month).

use crate::history::{AttractionId, HistoryError, Observation, SampleStore};
use std::path::{Path, PathBuf};
use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing::{debug, info, warn};

const TIMESTAMP_COLUMNS: &[&str] = &["Date/Time", "timestamp"];
const WAIT_COLUMNS: &[&str] = &["Wait Time", "wait_minutes"];
const ATTRACTION_COLUMNS: &[&str] = &["attraction_name", "Ride", "Attraction"];

const TIMESTAMP_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    format_description!(
        "[month padding:none]/[day padding:none]/[year] [hour padding:none]:[minute]:[second]"
    ),
    format_description!("[month padding:none]/[day padding:none]/[year] [hour padding:none]:[minute]"),
];

/// Where one attraction's history lives.
#[derive(Debug, Clone, Default)]
pub struct HistorySources {
    pub files: Vec<PathBuf>,
    pub dir: Option<PathBuf>,
}

/// Rows of one sub-period that made it into the store, plus how many were dropped.
#[derive(Debug)]
pub struct ParsedSubPeriod {
    pub observations: Vec<Observation>,
    pub skipped_rows: usize,
}

struct Columns {
    timestamp: usize,
    wait: usize,
    attraction: Option<usize>,
}

/// Parse one sub-period's contents.
///
/// Rows with an unparseable timestamp, an empty/invalid/negative wait, or a
/// different attraction name are skipped. A header without the timestamp or
/// wait columns is a format error.
pub fn parse_sub_period(
    attraction_id: &AttractionId,
    path: &Path,
    contents: &str,
) -> Result<ParsedSubPeriod, HistoryError> {
    // Spreadsheet exports often start with a byte-order mark.
    let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);
    let mut lines = contents.lines().filter(|line| !line.trim().is_empty());
    let header = lines.next().ok_or_else(|| HistoryError::Format {
        path: path.to_path_buf(),
        reason: "missing header row".to_string(),
    })?;
    let columns = resolve_columns(&split_record(header)).map_err(|reason| HistoryError::Format {
        path: path.to_path_buf(),
        reason,
    })?;

    let mut observations = Vec::new();
    let mut skipped_rows = 0usize;
    for line in lines {
        let fields = split_record(line);
        match parse_row(attraction_id, &columns, &fields) {
            Some(observation) => observations.push(observation),
            None => skipped_rows += 1,
        }
    }

    Ok(ParsedSubPeriod {
        observations,
        skipped_rows,
    })
}

/// Read and parse one sub-period file.
pub fn load_sub_period(
    attraction_id: &AttractionId,
    path: &Path,
) -> Result<ParsedSubPeriod, HistoryError> {
    let contents = std::fs::read_to_string(path).map_err(|source| HistoryError::Source {
        path: path.to_path_buf(),
        source,
    })?;
    parse_sub_period(attraction_id, path, &contents)
}

/// Load every sub-period of one attraction.
///
/// Missing or unreadable files are logged and skipped so the remaining
/// periods still contribute. Format errors abort.
pub fn load_attraction(
    attraction_id: &AttractionId,
    sources: &HistorySources,
) -> Result<Vec<Observation>, HistoryError> {
    let mut observations = Vec::new();
    for path in sub_period_paths(sources) {
        match load_sub_period(attraction_id, &path) {
            Ok(parsed) => {
                debug!(
                    attraction = %attraction_id,
                    path = %path.display(),
                    rows = parsed.observations.len(),
                    skipped = parsed.skipped_rows,
                    "Loaded history sub-period"
                );
                observations.extend(parsed.observations);
            }
            Err(err @ HistoryError::Source { .. }) => {
                warn!(attraction = %attraction_id, error = %err, "Skipping history sub-period");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(observations)
}

/// Build the store for every configured attraction.
pub fn load_store<'a>(
    attractions: impl IntoIterator<Item = (&'a AttractionId, &'a HistorySources)>,
) -> Result<SampleStore, HistoryError> {
    let mut store = SampleStore::new();
    for (attraction_id, sources) in attractions {
        let observations = load_attraction(attraction_id, sources)?;
        if observations.is_empty() {
            warn!(attraction = %attraction_id, "No historical samples loaded");
        } else {
            info!(
                attraction = %attraction_id,
                samples = observations.len(),
                "Historical samples loaded"
            );
        }
        store.insert(observations);
    }
    Ok(store.finish())
}

fn sub_period_paths(sources: &HistorySources) -> Vec<PathBuf> {
    let mut paths = sources.files.clone();
    if let Some(dir) = &sources.dir {
        match std::fs::read_dir(dir) {
            Ok(entries) => {
                let mut found: Vec<PathBuf> = entries
                    .filter_map(Result::ok)
                    .map(|entry| entry.path())
                    .filter(|path| {
                        path.extension()
                            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
                    })
                    .collect();
                found.sort();
                paths.extend(found);
            }
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "Failed to list history directory");
            }
        }
    }
    paths
}

fn resolve_columns(header: &[String]) -> Result<Columns, String> {
    let find = |names: &[&str]| {
        header
            .iter()
            .position(|column| names.iter().any(|name| column.eq_ignore_ascii_case(name)))
    };
    let timestamp = find(TIMESTAMP_COLUMNS)
        .ok_or_else(|| format!("no timestamp column (expected one of {TIMESTAMP_COLUMNS:?})"))?;
    let wait =
        find(WAIT_COLUMNS).ok_or_else(|| format!("no wait column (expected one of {WAIT_COLUMNS:?})"))?;
    Ok(Columns {
        timestamp,
        wait,
        attraction: find(ATTRACTION_COLUMNS),
    })
}

fn parse_row(
    attraction_id: &AttractionId,
    columns: &Columns,
    fields: &[String],
) -> Option<Observation> {
    if let Some(index) = columns.attraction {
        let name = fields.get(index)?;
        if !name.is_empty() && name != attraction_id.as_str() {
            return None;
        }
    }
    let timestamp = parse_timestamp(fields.get(columns.timestamp)?)?;
    let wait_minutes = fields.get(columns.wait)?.parse::<f64>().ok()?;
    Observation::new(attraction_id.clone(), timestamp, wait_minutes)
}

pub fn parse_timestamp(value: &str) -> Option<PrimitiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| PrimitiveDateTime::parse(value, format).ok())
}

/// Split one CSV record, honouring double-quoted fields and `""` escapes.
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}
