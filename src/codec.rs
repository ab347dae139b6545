//! Line-oriented CSV codec
//!
//! Each line is split on the literal `,` character. There is no quoting or
//! escaping, so a field that contains a comma comes back as two fields. Files
//! are read in a single pass through a `BufRead`, one line at a time.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::store::{Record, RowStore};

pub const DELIMITER: char = ',';

/// Reasons a file could not be turned into a `RowStore`
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("read failed at line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },
    #[error("line {line} is not valid UTF-8")]
    InvalidUtf8 { line: usize },
}

impl DecodeError {
    /// True when the file itself is gone, as opposed to unreadable
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Open { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Split one line (terminator already removed) into a record
pub fn split_line(line: &str) -> Record {
    line.split(DELIMITER).collect()
}

/// Decode every line of `reader` into a store
pub fn decode<R: BufRead>(mut reader: R) -> Result<RowStore, DecodeError> {
    let mut records = Vec::new();
    let mut buf = Vec::new();
    let mut line = 0;

    loop {
        buf.clear();
        line += 1;
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source| DecodeError::Read { line, source })?;
        if read == 0 {
            break;
        }

        let text = std::str::from_utf8(&buf).map_err(|_| DecodeError::InvalidUtf8 { line })?;
        let text = text.strip_suffix('\n').unwrap_or(text);
        let text = text.strip_suffix('\r').unwrap_or(text);
        records.push(split_line(text));
    }

    Ok(RowStore::new(records))
}

/// Open `path` and decode it
pub fn decode_file(path: &Path) -> Result<RowStore, DecodeError> {
    let file = File::open(path).map_err(|source| DecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    decode(BufReader::new(file))
}

/// Encoded lines, one per record, without terminators
pub fn encode(store: &RowStore) -> impl Iterator<Item = String> + '_ {
    store.iter().map(|record| record.join(","))
}

/// Write the encoded store, one newline after every record
pub fn write<W: Write>(store: &RowStore, mut writer: W) -> io::Result<()> {
    for line in encode(store) {
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}
