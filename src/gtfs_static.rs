//! Reader for static GTFS schedule bundles.
//!
//! Only the tables the watchdog cross-checks are loaded: `agency.txt` and the
//! service calendar (`calendar.txt` plus `calendar_dates.txt`).

use std::collections::{BTreeMap, HashSet};
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use bytes::Bytes;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::{Result, WatchdogError};

/// An agency row from `agency.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agency {
    pub id: String,
    pub name: String,
}

/// A service with the last date on which it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub service_id: String,
    pub end_date: NaiveDate,
}

/// The parts of a static bundle the checks need.
#[derive(Debug, Clone, Default)]
pub struct StaticBundle {
    pub agencies: Vec<Agency>,
    pub services: Vec<Service>,
}

#[derive(Deserialize)]
struct AgencyRow {
    #[serde(default)]
    agency_id: String,
    #[serde(default)]
    agency_name: String,
}

#[derive(Deserialize)]
struct CalendarRow {
    service_id: String,
    end_date: String,
}

#[derive(Deserialize)]
struct CalendarDateRow {
    service_id: String,
    date: String,
    exception_type: u8,
}

const SERVICE_ADDED: u8 = 1;
const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

impl StaticBundle {
    /// Reads a bundle archive from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(Bytes::from(bytes))
    }

    /// Parses a bundle archive held in memory.
    ///
    /// # Errors
    ///
    /// [`WatchdogError::Parse`] if the archive is not a zip, lacks
    /// `agency.txt`, or contains malformed rows or dates.
    pub fn from_bytes(bytes: Bytes) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let agencies = read_table::<AgencyRow, _>(&mut archive, "agency.txt")?
            .ok_or_else(|| WatchdogError::Parse("bundle has no agency.txt".to_string()))?
            .into_iter()
            .map(|row| Agency {
                id: row.agency_id,
                name: row.agency_name,
            })
            .collect();

        let calendar =
            read_table::<CalendarRow, _>(&mut archive, "calendar.txt")?.unwrap_or_default();
        let calendar_dates = read_table::<CalendarDateRow, _>(&mut archive, "calendar_dates.txt")?
            .unwrap_or_default();

        Ok(Self {
            agencies,
            services: build_services(calendar, calendar_dates)?,
        })
    }

    /// Number of distinct agencies; rows sharing an `agency_id` count once.
    pub fn agency_count(&self) -> usize {
        self.agencies
            .iter()
            .map(|a| a.id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Earliest and latest service end dates, if there are any services.
    pub fn end_date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let earliest = self.services.iter().map(|s| s.end_date).min()?;
        let latest = self.services.iter().map(|s| s.end_date).max()?;
        Some((earliest, latest))
    }
}

/// Merges `calendar.txt` services with services that only exist as added
/// dates in `calendar_dates.txt`.
fn build_services(
    calendar: Vec<CalendarRow>,
    calendar_dates: Vec<CalendarDateRow>,
) -> Result<Vec<Service>> {
    let mut services: BTreeMap<String, NaiveDate> = BTreeMap::new();

    for row in calendar {
        let end_date = parse_date(&row.end_date)?;
        services.insert(row.service_id, end_date);
    }

    let mut added_only: BTreeMap<String, NaiveDate> = BTreeMap::new();
    for row in calendar_dates {
        if row.exception_type != SERVICE_ADDED || services.contains_key(&row.service_id) {
            continue;
        }
        let date = parse_date(&row.date)?;
        added_only
            .entry(row.service_id)
            .and_modify(|d| *d = (*d).max(date))
            .or_insert(date);
    }
    services.extend(added_only);

    Ok(services
        .into_iter()
        .map(|(service_id, end_date)| Service {
            service_id,
            end_date,
        })
        .collect())
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .map_err(|e| WatchdogError::Parse(format!("invalid GTFS date '{value}': {e}")))
}

/// Deserializes every row of `name`, or `None` when the archive lacks it.
fn read_table<T, R>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<Vec<T>>>
where
    T: DeserializeOwned,
    R: Read + Seek,
{
    let mut raw = Vec::new();
    match archive.by_name(name) {
        Ok(mut file) => {
            file.read_to_end(&mut raw)
                .map_err(|e| WatchdogError::Parse(format!("failed to read {name}: {e}")))?;
        }
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    // Feeds in legacy encodings only lose characters in free-text columns.
    let raw = raw.strip_prefix(UTF8_BOM).unwrap_or(&raw);
    let contents = String::from_utf8_lossy(raw);
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(contents.as_bytes());

    let rows = rdr
        .deserialize()
        .collect::<std::result::Result<Vec<T>, _>>()?;
    Ok(Some(rows))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Builds an in-memory zip from `(file name, contents)` pairs.
    pub fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
        let raw: Vec<(&str, &[u8])> = files.iter().map(|(n, c)| (*n, c.as_bytes())).collect();
        zip_raw(&raw)
    }

    /// Like [`zip_bytes`] but with arbitrary, possibly non-UTF-8 contents.
    pub fn zip_raw(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, contents) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}
