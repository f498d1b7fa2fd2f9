//! Line-oriented text snapshots.
//!
//! A snapshot holds one record per line, `key<delimiter>value\n`, in
//! ascending key order. Nothing is escaped:
//!
//! - a value may contain the delimiter, since only the first delimiter on a
//!   line splits key from value;
//! - a key containing the delimiter, or any field containing a line break,
//!   is written as-is but will not reload as written;
//! - a key or value that renders as an empty string is written as-is and
//!   is skipped as malformed on reload.
//!
//! Records that will not reload as written are reported with a warning
//! when dumped.
//!
//! On load, lines without a delimiter, with an empty key or value, or whose
//! fields do not parse are skipped and counted as malformed.

use std::fmt::Display;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

/// Delimiter used when none is configured.
pub const DEFAULT_DELIMITER: char = ':';

/// Errors from writing or reading a snapshot.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// The snapshot file could not be created, opened, read or written.
    #[error("snapshot I/O error on {}: {source}", .path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Line breaks separate records and cannot double as the delimiter.
    #[error("invalid snapshot delimiter {0:?}")]
    InvalidDelimiter(char),
}

/// Result type for snapshot operations.
pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Records read from a snapshot, in file order.
#[derive(Debug)]
pub struct Records<K, V> {
    /// Well-formed records.
    pub parsed: Vec<(K, V)>,
    /// Number of skipped lines.
    pub malformed: usize,
}

/// The snapshot line format, parameterized by its delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotFormat {
    delimiter: char,
}

impl SnapshotFormat {
    /// Create a format splitting key and value at `delimiter`.
    pub fn new(delimiter: char) -> Result<Self> {
        if delimiter == '\n' || delimiter == '\r' {
            return Err(SnapshotError::InvalidDelimiter(delimiter));
        }
        Ok(Self { delimiter })
    }

    /// The configured delimiter.
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Write `records` to `out`, one per line. Returns the number written.
    pub fn write_records<'a, K, V, W, I>(&self, mut out: W, records: I) -> io::Result<usize>
    where
        K: Display + 'a,
        V: Display + 'a,
        W: Write,
        I: IntoIterator<Item = (&'a K, &'a V)>,
    {
        let mut written = 0usize;
        for (key, value) in records {
            let key = key.to_string();
            let value = value.to_string();
            if key.contains(self.delimiter) {
                warn!(
                    key = %key,
                    delimiter = %self.delimiter,
                    "key contains the snapshot delimiter; it will reload split at the delimiter"
                );
            }
            if has_line_break(&key) || has_line_break(&value) {
                warn!(key = %key, "record contains a line break; it will not reload as written");
            }
            if key.is_empty() || value.is_empty() {
                warn!(key = %key, "record has an empty field; it will be skipped on reload");
            }
            writeln!(out, "{}{}{}", key, self.delimiter, value)?;
            written += 1;
        }
        out.flush()?;
        Ok(written)
    }

    /// Split a line at its first delimiter. `None` if the line is malformed.
    pub fn split_line<'l>(&self, line: &'l str) -> Option<(&'l str, &'l str)> {
        let (key, value) = line.split_once(self.delimiter)?;
        if key.is_empty() || value.is_empty() {
            return None;
        }
        Some((key, value))
    }

    /// Split and parse a line into a typed record.
    pub fn parse_line<K: FromStr, V: FromStr>(&self, line: &str) -> Option<(K, V)> {
        let (key, value) = self.split_line(line)?;
        Some((key.parse().ok()?, value.parse().ok()?))
    }

    /// Read every line of `input`, keeping well-formed records.
    pub fn read_records<K, V, R>(&self, input: R) -> io::Result<Records<K, V>>
    where
        K: FromStr,
        V: FromStr,
        R: BufRead,
    {
        let mut records = Records {
            parsed: Vec::new(),
            malformed: 0,
        };
        for (idx, line) in input.lines().enumerate() {
            let line = line?;
            match self.parse_line(&line) {
                Some(record) => records.parsed.push(record),
                None => {
                    warn!(line = idx + 1, "skipping malformed snapshot line");
                    records.malformed += 1;
                }
            }
        }
        Ok(records)
    }

    /// Create or truncate the file at `path` and write `records` into it.
    ///
    /// Missing parent directories are created.
    pub fn dump_file<'a, K, V, I>(&self, path: &Path, records: I) -> Result<usize>
    where
        K: Display + 'a,
        V: Display + 'a,
        I: IntoIterator<Item = (&'a K, &'a V)>,
    {
        let io_err = |source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = File::create(path).map_err(io_err)?;
        self.write_records(BufWriter::new(file), records).map_err(io_err)
    }

    /// Read the snapshot file at `path`.
    pub fn load_file<K: FromStr, V: FromStr>(&self, path: &Path) -> Result<Records<K, V>> {
        let io_err = |source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_err)?;
        self.read_records(BufReader::new(file)).map_err(io_err)
    }
}

impl Default for SnapshotFormat {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

fn has_line_break(s: &str) -> bool {
    s.contains(|c: char| c == '\n' || c == '\r')
}
