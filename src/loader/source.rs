use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use super::errors::LoadError;

/// One spreadsheet row: trimmed cells, left to right, shallowest first.
pub type Row = Vec<String>;

pub fn normalize_path(raw: &str) -> Result<String, LoadError> {
    let path = Path::new(raw);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let normalized = if absolute.exists() {
        absolute.canonicalize().unwrap_or(absolute)
    } else {
        absolute
    };
    Ok(normalized.to_string_lossy().to_string())
}

/// Resolves `--file` to an existing regular file or fails with `MissingInput`.
pub fn require_input(raw: Option<&str>) -> Result<String, LoadError> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(LoadError::MissingInput(
            "please specify the filename of the csv you are trying to import".to_string(),
        ));
    }
    let source_ref = normalize_path(raw)?;
    if !Path::new(&source_ref).is_file() {
        return Err(LoadError::MissingInput(format!("missing file: {}", raw)));
    }
    Ok(source_ref)
}

pub fn parse_delimiter(raw: &str) -> Result<u8, LoadError> {
    if raw == "\\t" || raw == "tab" {
        return Ok(b'\t');
    }
    match raw.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(LoadError::InvalidDelimiter(raw.to_string())),
    }
}

/// Streams data rows from a delimited file. The header row is consumed by the
/// reader and never surfaces.
pub struct CsvRows {
    records: csv::StringRecordsIntoIter<File>,
}

impl CsvRows {
    pub fn open(path: &str, delimiter: u8) -> Result<Self, LoadError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .delimiter(delimiter)
            .from_path(path)?;
        Ok(Self {
            records: reader.into_records(),
        })
    }
}

impl Iterator for CsvRows {
    type Item = Result<Row, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        Some(
            record
                .map(|record| record.iter().map(str::to_string).collect())
                .map_err(LoadError::from),
        )
    }
}

/// Reads every data row up front. Only opening the file is fatal; a row the
/// reader rejects is kept as its error.
pub fn read_rows(
    path: &str,
    delimiter: u8,
) -> Result<Vec<Result<Row, LoadError>>, LoadError> {
    Ok(CsvRows::open(path, delimiter)?.collect())
}

pub fn sha256_file(path: &str) -> Result<String, LoadError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(out, "{:02x}", byte);
    }
    Ok(out)
}
