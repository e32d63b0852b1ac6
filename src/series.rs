//! Delimited series tables.
//!
//! Loads header-keyed columns of raw sample text from reference fixtures and
//! simulator output.

use std::io::{BufRead, BufReader, Read};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::trace;

/// Errors raised while loading a series table.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Input had no header row.
    #[error("input is empty (no header row)")]
    Empty,
    /// A data row had fewer fields than the header.
    #[error("line {line}: expected {expected} fields, found {found}")]
    ShortRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    /// A data row had more fields than the header.
    #[error("line {line}: expected {expected} fields, found {found} (extra fields)")]
    LongRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    /// Two header columns share a name.
    #[error("duplicate series '{name}' in header")]
    DuplicateSeries { name: String },
    /// The reader failed.
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// Folds every whitespace run in a series name to a single underscore.
///
/// Used as a lookup key only; tables keep the original header text.
pub fn series_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_space {
                key.push('_');
            }
            in_space = true;
        } else {
            key.push(c);
            in_space = false;
        }
    }
    key
}

/// Strips one pair of surrounding double quotes and undoubles inner `""`.
///
/// Delimiters inside quotes are not supported.
fn unquote(field: &str) -> String {
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .map_or_else(|| field.to_string(), |inner| inner.replace("\"\"", "\""))
}

/// Columns of raw sample text keyed by header name, in header order.
///
/// The first column is the time index; every column has one value per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesTable {
    series: IndexMap<String, Vec<String>>,
    /// Normalized key -> position in `series`.
    keys: IndexMap<String, usize>,
}

impl SeriesTable {
    /// Parses delimited text with a header row.
    pub fn load<R: Read>(reader: R, delimiter: char) -> Result<Self, LoadError> {
        let mut lines = BufReader::new(reader).lines().enumerate();

        let header = loop {
            match lines.next() {
                Some((_, line)) => {
                    let line = line?;
                    let line = line.trim_end_matches('\r');
                    if !line.is_empty() {
                        break line.to_string();
                    }
                }
                None => return Err(LoadError::Empty),
            }
        };

        let mut series = IndexMap::new();
        let mut keys = IndexMap::new();
        for (i, name) in header.split(delimiter).map(unquote).enumerate() {
            if series.insert(name.clone(), Vec::new()).is_some() {
                return Err(LoadError::DuplicateSeries { name });
            }
            keys.entry(series_key(&name)).or_insert(i);
        }
        let expected = series.len();

        for (index, line) in lines {
            let line_no = index + 1;
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split(delimiter).collect();
            if fields.len() < expected {
                return Err(LoadError::ShortRow {
                    line: line_no,
                    expected,
                    found: fields.len(),
                });
            }
            if fields.len() > expected {
                return Err(LoadError::LongRow {
                    line: line_no,
                    expected,
                    found: fields.len(),
                });
            }

            for (column, field) in series.values_mut().zip(fields) {
                column.push(unquote(field));
            }
        }

        trace!(
            columns = expected,
            rows = series.first().map_or(0, |(_, v)| v.len()),
            "series table loaded"
        );

        Ok(Self { series, keys })
    }

    /// Parses an in-memory string, e.g. captured simulator stdout.
    pub fn parse(text: &str, delimiter: char) -> Result<Self, LoadError> {
        Self::load(text.as_bytes(), delimiter)
    }

    /// Name of the time column (the first header field).
    pub fn time_name(&self) -> Option<&str> {
        self.series.keys().next().map(String::as_str)
    }

    /// Time-step labels.
    pub fn time(&self) -> &[String] {
        self.series
            .first()
            .map(|(_, v)| v.as_slice())
            .unwrap_or_default()
    }

    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.time().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a series by name with whitespace folded on both sides.
    pub fn lookup(&self, name: &str) -> Option<&[String]> {
        let index = *self.keys.get(&series_key(name))?;
        self.series.get_index(index).map(|(_, v)| v.as_slice())
    }

    /// All series, including time, in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.series.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Series other than the time column, in header order.
    pub fn data_series(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.iter().skip(1)
    }
}
