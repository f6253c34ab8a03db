use std::error::Error;
use std::fmt;
use std::path::Path;

use rusqlite::Connection;

use crate::config::{ConfigError, MigrantConfig, DEFAULT_CONFIG_PATH};
use crate::loader::{
    self, parse_delimiter, AmbiguousParent, ImportOptions, ImportRunRecord, ImportSummary,
    LoadError, TermEvent, TermLoader,
};
use crate::store::{SqliteTermStore, StoreError, Taxonomy, Term};

pub const DEFAULT_DB_PATH: &str = ".migrant/site.sqlite";
const DEFAULT_DELIMITER: &str = ",";

pub struct App {
    store: SqliteTermStore,
    config: MigrantConfig,
}

impl App {
    /// Opens the store named by `db`, else the config file, else the default
    /// path. Taxonomies listed in the config are registered on open.
    pub fn open(db: Option<&str>, config_path: Option<&Path>) -> Result<Self, AppError> {
        let config = match config_path {
            Some(path) => MigrantConfig::load(path, true)?,
            None => MigrantConfig::load(Path::new(DEFAULT_CONFIG_PATH), false)?,
        };
        let db_path = db
            .map(str::to_string)
            .or_else(|| config.db.clone())
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        ensure_parent_dir(&db_path)?;
        tracing::debug!(db = %db_path, "opening term store");

        let store = SqliteTermStore::open(&db_path)?;
        for taxonomy in &config.taxonomies {
            store.register_taxonomy(taxonomy.name.trim(), taxonomy.hierarchical)?;
        }
        Ok(Self { store, config })
    }

    pub fn import_terms(
        &mut self,
        taxonomy: &str,
        file: Option<&str>,
        delimiter: Option<&str>,
        strict: bool,
        dry_run: bool,
        on_event: &mut dyn FnMut(&TermEvent),
    ) -> Result<ImportSummary, AppError> {
        let options = ImportOptions {
            delimiter: self.delimiter(delimiter)?,
            strict: strict || self.config.strict,
            dry_run,
        };
        let result =
            TermLoader::new(&mut self.store).import_file(taxonomy, file, &options, on_event);
        record_outcome(self.store.conn(), result)
    }

    pub fn check(
        &mut self,
        taxonomy: &str,
        file: Option<&str>,
        delimiter: Option<&str>,
    ) -> Result<Vec<AmbiguousParent>, AppError> {
        let delimiter = self.delimiter(delimiter)?;
        Ok(TermLoader::new(&mut self.store).check_file(taxonomy, file, delimiter)?)
    }

    pub fn add_taxonomy(&self, name: &str, hierarchical: bool) -> Result<Taxonomy, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidArgument(
                "taxonomy name cannot be empty".to_string(),
            ));
        }
        Ok(self.store.register_taxonomy(name, hierarchical)?)
    }

    pub fn list_taxonomies(&self) -> Result<Vec<Taxonomy>, AppError> {
        Ok(self.store.list_taxonomies()?)
    }

    pub fn list_terms(&self, taxonomy: &str) -> Result<Vec<Term>, AppError> {
        Ok(self.store.list_terms(taxonomy)?)
    }

    pub fn list_runs(&self, limit: usize) -> Result<Vec<ImportRunRecord>, AppError> {
        Ok(loader::list_runs(self.store.conn(), limit)?)
    }

    fn delimiter(&self, flag: Option<&str>) -> Result<u8, AppError> {
        let raw = flag
            .or(self.config.delimiter.as_deref())
            .unwrap_or(DEFAULT_DELIMITER);
        Ok(parse_delimiter(raw)?)
    }
}

/// Writes the run to the ledger when it got far enough to have a summary,
/// including runs that aborted part way.
fn record_outcome(
    conn: &Connection,
    result: Result<ImportSummary, LoadError>,
) -> Result<ImportSummary, AppError> {
    match result {
        Ok(summary) => {
            loader::record_run(conn, &summary)?;
            Ok(summary)
        }
        Err(LoadError::Aborted { summary, source }) => {
            loader::record_run(conn, &summary)?;
            Err(AppError::Load(LoadError::Aborted { summary, source }))
        }
        Err(err) => Err(err.into()),
    }
}

fn ensure_parent_dir(path: &str) -> Result<(), AppError> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Db(rusqlite::Error),
    Store(StoreError),
    Load(LoadError),
    Config(ConfigError),
    InvalidArgument(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "I/O error: {}", err),
            AppError::Db(err) => write!(f, "database error: {}", err),
            AppError::Store(err) => write!(f, "{}", err),
            AppError::Load(err) => write!(f, "{}", err),
            AppError::Config(err) => write!(f, "{}", err),
            AppError::InvalidArgument(message) => write!(f, "{}", message),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Db(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Load(err) => Some(err),
            AppError::Config(err) => Some(err),
            AppError::InvalidArgument(_) => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        AppError::Db(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        AppError::Store(value)
    }
}

impl From<LoadError> for AppError {
    fn from(value: LoadError) -> Self {
        AppError::Load(value)
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value)
    }
}
