use std::path::PathBuf;

use crate::domain::CatalogStatus;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("legacy record encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PNG metadata error: {0}")]
    Png(#[from] png::DecodingError),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("path is missing or unreadable: {}", .0.display())]
    Unreadable(PathBuf),

    #[error("not a recognized catalog format: {}", .0.display())]
    FormatUnrecognized(PathBuf),

    #[error("replacement of {} was declined", .0.display())]
    UserDeclinedOverwrite(PathBuf),

    #[error("archiver failed with exit code {}", .code.map_or_else(|| "none (terminated by signal)".to_string(), |c| c.to_string()))]
    ArchiveToolFailure { code: Option<i32> },

    #[error("archiver `{}` could not be started: {source}", .program.display())]
    ArchiverUnavailable {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("fin has no modified image to package: {}", .0.display())]
    MissingModifiedImage(PathBuf),

    #[error("catalog already exists: {}", .0.display())]
    CatalogExists(PathBuf),

    #[error("catalog {} is not loaded (status: {status})", .path.display())]
    CatalogNotLoaded { path: PathBuf, status: CatalogStatus },

    #[error("catalog stream is closed: {}", .0.display())]
    StreamClosed(PathBuf),

    #[error("legacy catalogs are read-only: {}", .0.display())]
    ReadOnlyCatalog(PathBuf),

    #[error("damage category `{0}` is not part of the catalog scheme")]
    UnknownCategory(String),

    #[error("malformed legacy catalog {} at line {line}: {message}", .path.display())]
    LegacyParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("renamed legacy catalog already exists: {}", .0.display())]
    LegacyBackupExists(PathBuf),

    #[error("catalog path does not sit inside a survey area: {}", .0.display())]
    InvalidCatalogPath(PathBuf),

    #[error("no fin with id code `{0}` in catalog")]
    FinNotFound(String),

    #[error("finz package holds no fin: {}", .0.display())]
    EmptyPackage(PathBuf),

    #[error("catalog schema version {db} is newer than supported version {code}")]
    SchemaTooNew { db: u32, code: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
